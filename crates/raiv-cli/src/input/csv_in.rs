use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use raiv_core::{ImportRecord, RiskRecord, TimelinessRecord, Year};

use super::file::resolve_path;

// Decimal cells are read as text. Letting csv infer a number would route
// them through f64 and drop digits before they reach `Decimal`.

#[derive(Debug, Deserialize)]
struct ImportRow {
    #[serde(alias = "Country", alias = "PartnerName")]
    country: String,
    #[serde(alias = "Year")]
    year: Year,
    #[serde(alias = "ImportValue", default)]
    import_value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimelinessRow {
    #[serde(alias = "Country", alias = "Economy")]
    country: String,
    #[serde(alias = "TimelinessScore", default)]
    timeliness_score: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RiskRow {
    #[serde(alias = "Country", alias = "Economy")]
    country: String,
    #[serde(alias = "RiskPremium", default)]
    risk_premium: Option<String>,
}

/// Parse a decimal cell exactly. Empty cells are `None`; scientific
/// notation is accepted.
pub fn parse_decimal_cell(
    cell: Option<&str>,
    column: &str,
    at: &str,
) -> Result<Option<Decimal>, Box<dyn std::error::Error>> {
    let Some(text) = cell.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map(Some)
        .map_err(|e| format!("{at}: {column} '{text}' is not a decimal ({e})").into())
}

fn reader_for(path: &Path) -> Result<(csv::Reader<std::fs::File>, String), Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(&canonical)
        .map_err(|e| format!("Failed to open '{}': {}", canonical.display(), e))?;
    Ok((rdr, canonical.display().to_string()))
}

/// Deserialize every row of a headed CSV source. Headers are matched against
/// the row's field names and aliases; empty cells become `None`.
pub fn read_from<R: Read, T: DeserializeOwned>(
    mut rdr: csv::Reader<R>,
    source: &str,
) -> Result<Vec<(String, T)>, Box<dyn std::error::Error>> {
    let mut records = Vec::new();
    for (i, row) in rdr.deserialize().enumerate() {
        // Header is line 1.
        let at = format!("{} line {}", source, i + 2);
        let record: T = row.map_err(|e| format!("{at}: {e}"))?;
        records.push((at, record));
    }
    tracing::debug!(source, rows = records.len(), "csv loaded");
    Ok(records)
}

pub fn imports_from<R: Read>(
    rdr: csv::Reader<R>,
    source: &str,
) -> Result<Vec<ImportRecord>, Box<dyn std::error::Error>> {
    let mut records = Vec::new();
    for (at, row) in read_from::<_, ImportRow>(rdr, source)? {
        records.push(ImportRecord {
            import_value: parse_decimal_cell(row.import_value.as_deref(), "ImportValue", &at)?,
            country: row.country,
            year: row.year,
        });
    }
    Ok(records)
}

pub fn timeliness_from<R: Read>(
    rdr: csv::Reader<R>,
    source: &str,
) -> Result<Vec<TimelinessRecord>, Box<dyn std::error::Error>> {
    let mut records = Vec::new();
    for (at, row) in read_from::<_, TimelinessRow>(rdr, source)? {
        records.push(TimelinessRecord {
            timeliness_score: parse_decimal_cell(
                row.timeliness_score.as_deref(),
                "TimelinessScore",
                &at,
            )?,
            country: row.country,
        });
    }
    Ok(records)
}

pub fn risk_from<R: Read>(
    rdr: csv::Reader<R>,
    source: &str,
) -> Result<Vec<RiskRecord>, Box<dyn std::error::Error>> {
    let mut records = Vec::new();
    for (at, row) in read_from::<_, RiskRow>(rdr, source)? {
        records.push(RiskRecord {
            risk_premium: parse_decimal_cell(row.risk_premium.as_deref(), "RiskPremium", &at)?,
            country: row.country,
        });
    }
    Ok(records)
}

pub fn read_imports(path: &Path) -> Result<Vec<ImportRecord>, Box<dyn std::error::Error>> {
    let (rdr, source) = reader_for(path)?;
    imports_from(rdr, &source)
}

pub fn read_timeliness(path: &Path) -> Result<Vec<TimelinessRecord>, Box<dyn std::error::Error>> {
    let (rdr, source) = reader_for(path)?;
    timeliness_from(rdr, &source)
}

pub fn read_risk(path: &Path) -> Result<Vec<RiskRecord>, Box<dyn std::error::Error>> {
    let (rdr, source) = reader_for(path)?;
    risk_from(rdr, &source)
}
