use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade values in thousands of USD. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.06 = 6%). Never as percentages.
pub type Rate = Decimal;

/// Logistics performance scores (LPI scale, typically 1 to 5)
pub type Score = Decimal;

/// Calendar year of an import observation
pub type Year = i32;

/// Canonical country identity shared by every source after resolution
pub type CountryId = String;

/// A hand-curated mapping from a non-standard source label to a canonical country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryAlias {
    pub raw_label: String,
    pub canonical_id: CountryId,
}

impl CountryAlias {
    pub fn new(raw_label: impl Into<String>, canonical_id: impl Into<String>) -> Self {
        Self {
            raw_label: raw_label.into(),
            canonical_id: canonical_id.into(),
        }
    }
}

/// Annual import value for one partner country, as delivered by the trade source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecord {
    #[serde(alias = "Country", alias = "PartnerName")]
    pub country: String,
    #[serde(alias = "Year")]
    pub year: Year,
    /// Null when the source has no value for the year
    #[serde(alias = "ImportValue", default)]
    pub import_value: Option<Money>,
}

/// Logistics timeliness score (2023 snapshot, reused for every year).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinessRecord {
    #[serde(alias = "Country", alias = "Economy")]
    pub country: String,
    #[serde(alias = "TimelinessScore", default)]
    pub timeliness_score: Option<Score>,
}

/// Country risk premium (single snapshot, reused for every year).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskRecord {
    #[serde(alias = "Country", alias = "Economy")]
    pub country: String,
    #[serde(alias = "RiskPremium", default)]
    pub risk_premium: Option<Rate>,
}

/// One computed Risk-Adjusted Import Value. The serialized column names are
/// the contract consumed by downstream reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaivRow {
    #[serde(rename = "Country")]
    pub country: CountryId,
    #[serde(rename = "Year")]
    pub year: Year,
    #[serde(rename = "ImportValue")]
    pub import_value: Money,
    #[serde(rename = "TimelinessScore")]
    pub timeliness_score: Score,
    #[serde(rename = "RiskPremium")]
    pub risk_premium: Rate,
    #[serde(rename = "t_value")]
    pub t: u32,
    #[serde(rename = "RAIV")]
    pub raiv: Money,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
