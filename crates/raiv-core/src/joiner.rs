//! Inner join of imports, timeliness and risk on canonical country.
//!
//! A (country, year) pair reaches the calculator only when all three values
//! are present and non-null. Anything else is excluded and recorded with its
//! reason; partial rows are never filled with defaults.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::resolver::AliasTable;
use crate::tables::{ImportTable, RiskTable, TimelinessTable};
use crate::types::{CountryId, ImportRecord, Money, Rate, RiskRecord, Score, TimelinessRecord, Year};
use crate::RaivResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A complete (country, year) observation ready for RAIV computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedRow {
    pub country: CountryId,
    pub year: Year,
    pub import_value: Money,
    pub timeliness_score: Score,
    pub risk_premium: Rate,
}

/// Why a (country, year) pair produced no output row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Label was blank or an aggregate such as `World`
    UnresolvedLabel,
    /// Import row present but its value is null
    MissingImportValue,
    /// No non-null timeliness score for the country
    MissingTimeliness,
    /// No non-null risk premium for the country
    MissingRisk,
}

/// One excluded import observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    /// Canonical country, or the raw label when it did not resolve
    pub country: String,
    pub year: Year,
    pub reasons: Vec<ExclusionReason>,
}

/// Join result plus the audit trail of what was dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinOutput {
    pub rows: Vec<JoinedRow>,
    pub exclusions: Vec<Exclusion>,
    /// Import records considered, including unresolved ones
    pub imports_seen: usize,
}

impl JoinOutput {
    pub fn excluded_count(&self) -> usize {
        self.exclusions.len()
    }

    /// Number of exclusions citing each reason. An exclusion with two
    /// missing inputs counts once under each.
    pub fn exclusion_counts(&self) -> BTreeMap<ExclusionReason, usize> {
        let mut counts = BTreeMap::new();
        for exclusion in &self.exclusions {
            for reason in &exclusion.reasons {
                *counts.entry(*reason).or_insert(0) += 1;
            }
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Resolve, validate and join the three raw sources.
pub fn join(
    imports: &[ImportRecord],
    timeliness: &[TimelinessRecord],
    risk: &[RiskRecord],
    aliases: &AliasTable,
) -> RaivResult<JoinOutput> {
    let imports = ImportTable::load(imports, aliases)?;
    let timeliness = TimelinessTable::load(timeliness, aliases)?;
    let risk = RiskTable::load(risk, aliases)?;
    Ok(join_tables(&imports, &timeliness, &risk))
}

/// Join already-loaded tables. Output is ordered by (country, year).
pub fn join_tables(
    imports: &ImportTable,
    timeliness: &TimelinessTable,
    risk: &RiskTable,
) -> JoinOutput {
    let mut output = JoinOutput {
        imports_seen: imports.len() + imports.unresolved().len(),
        ..JoinOutput::default()
    };

    for (label, year) in imports.unresolved() {
        output.exclusions.push(Exclusion {
            country: label.clone(),
            year: *year,
            reasons: vec![ExclusionReason::UnresolvedLabel],
        });
    }

    for (country, year, source) in imports.iter() {
        let score = timeliness.score(country);
        let premium = risk.premium(country);

        match (source.value, score, premium) {
            (Some(import_value), Some(timeliness_score), Some(risk_premium)) => {
                output.rows.push(JoinedRow {
                    country: country.clone(),
                    year,
                    import_value,
                    timeliness_score,
                    risk_premium,
                });
            }
            _ => {
                let mut reasons = Vec::new();
                if source.value.is_none() {
                    reasons.push(ExclusionReason::MissingImportValue);
                }
                if score.is_none() {
                    reasons.push(ExclusionReason::MissingTimeliness);
                }
                if premium.is_none() {
                    reasons.push(ExclusionReason::MissingRisk);
                }
                debug!(%country, year, ?reasons, "excluded from join");
                output.exclusions.push(Exclusion {
                    country: country.clone(),
                    year,
                    reasons,
                });
            }
        }
    }

    info!(
        joined = output.rows.len(),
        excluded = output.exclusions.len(),
        "join complete"
    );
    output
}

/// Countries with both a timeliness score and a risk premium. Bounds the
/// number of distinct countries any join can produce.
pub fn joinable_countries(timeliness: &TimelinessTable, risk: &RiskTable) -> BTreeSet<CountryId> {
    let with_risk: BTreeSet<&CountryId> = risk.countries_with_value().collect();
    timeliness
        .countries_with_value()
        .filter(|c| with_risk.contains(c))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
