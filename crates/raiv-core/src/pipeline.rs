//! End-to-end RAIV run: resolve → join → compute → summarize.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::aggregator::{self, Summary, SummaryOptions};
use crate::calculator::{self, time_factor};
use crate::error::RaivError;
use crate::joiner::{self, Exclusion, ExclusionReason};
use crate::resolver::AliasTable;
use crate::types::{
    with_metadata, ComputationOutput, CountryAlias, ImportRecord, RaivRow, RiskRecord,
    TimelinessRecord, Year,
};
use crate::RaivResult;

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_top_n() -> usize {
    10
}

fn default_base_year() -> Year {
    2022
}

fn default_compare_year() -> Year {
    2024
}

/// Run-level settings for the aggregation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Years every summary must cover. `None` uses the years present in the
    /// computed table.
    #[serde(default)]
    pub years: Option<Vec<Year>>,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_base_year")]
    pub trend_base_year: Year,
    #[serde(default = "default_compare_year")]
    pub trend_compare_year: Year,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            years: None,
            top_n: default_top_n(),
            trend_base_year: default_base_year(),
            trend_compare_year: default_compare_year(),
        }
    }
}

impl PipelineOptions {
    /// Every configured year must be on the discount schedule. A trend or
    /// summary year outside it is a configuration error, not an empty result.
    pub fn validate(&self) -> RaivResult<()> {
        let configured = self
            .years
            .iter()
            .flatten()
            .map(|y| ("options.years", *y))
            .chain([
                ("options.trend_base_year", self.trend_base_year),
                ("options.trend_compare_year", self.trend_compare_year),
            ]);
        for (setting, year) in configured {
            if time_factor(year).is_none() {
                return Err(RaivError::UnrecognizedYear {
                    country: setting.to_string(),
                    year,
                });
            }
        }
        Ok(())
    }
}

/// Everything one run needs. Each run owns its own copy of every table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaivRunInput {
    /// Aliases merged on top of the curated set
    #[serde(default)]
    pub aliases: Vec<CountryAlias>,
    #[serde(default = "default_true")]
    pub use_builtin_aliases: bool,
    /// Extra labels to treat as aggregates (in addition to `World`)
    #[serde(default)]
    pub aggregate_labels: Vec<String>,
    pub imports: Vec<ImportRecord>,
    pub timeliness: Vec<TimelinessRecord>,
    pub risk: Vec<RiskRecord>,
    #[serde(default)]
    pub options: PipelineOptions,
}

/// Result of a full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaivReport {
    pub rows: Vec<RaivRow>,
    pub summary: Summary,
    pub exclusions: Vec<Exclusion>,
    pub exclusion_counts: BTreeMap<ExclusionReason, usize>,
    pub imports_seen: usize,
    pub rows_computed: usize,
    pub rows_excluded: usize,
    pub countries_covered: usize,
    pub years_covered: Vec<Year>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the alias table a run input describes.
pub fn alias_table(input: &RaivRunInput) -> RaivResult<AliasTable> {
    let base = if input.use_builtin_aliases {
        AliasTable::builtin()?
    } else {
        AliasTable::new(&[])?
    };
    Ok(base
        .with_aliases(&input.aliases)?
        .with_aggregate_labels(&input.aggregate_labels))
}

/// Execute the whole pipeline. Any configuration error aborts the run;
/// incomplete observations are excluded and reported.
pub fn run_raiv(input: &RaivRunInput) -> RaivResult<ComputationOutput<RaivReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.options.validate()?;
    let aliases = alias_table(input)?;

    // --- Join ---
    let joined = joiner::join(&input.imports, &input.timeliness, &input.risk, &aliases)?;

    // --- Compute ---
    let rows = calculator::compute_all(&joined.rows)?;
    info!(rows = rows.len(), "RAIV computed");

    // --- Aggregate ---
    let years = match &input.options.years {
        Some(years) => years.clone(),
        None => aggregator::observed_years(&rows),
    };
    let summary_options = SummaryOptions {
        years: years.clone(),
        top_n: input.options.top_n,
        trend_base_year: input.options.trend_base_year,
        trend_compare_year: input.options.trend_compare_year,
    };
    let summary = aggregator::summarize(&rows, &summary_options)?;

    if rows.is_empty() {
        warn!("no complete country-year observations");
        warnings.push("No country-year had all three inputs; the RAIV table is empty".into());
    }
    let exclusion_counts = joined.exclusion_counts();
    if joined.excluded_count() > 0 {
        let detail: Vec<String> = exclusion_counts
            .iter()
            .map(|(reason, n)| format!("{reason:?}: {n}"))
            .collect();
        warnings.push(format!(
            "{} import observations excluded for incomplete data ({})",
            joined.excluded_count(),
            detail.join(", ")
        ));
    }

    let countries_covered = rows
        .iter()
        .map(|r| r.country.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    let report = RaivReport {
        rows_computed: rows.len(),
        rows_excluded: joined.excluded_count(),
        imports_seen: joined.imports_seen,
        countries_covered,
        years_covered: aggregator::observed_years(&rows),
        exclusion_counts,
        exclusions: joined.exclusions,
        summary,
        rows,
    };

    let assumptions = json!({
        "formula": "RAIV = ImportValue * TimelinessScore / (1 + RiskPremium)^t",
        "t_schedule": { "2022": 0, "2023": 1, "2024": 2 },
        "aliases": aliases.len(),
        "years": years,
        "options": input.options,
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Risk-Adjusted Import Value",
        &assumptions,
        warnings,
        elapsed,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input() -> RaivRunInput {
        RaivRunInput {
            aliases: vec![],
            use_builtin_aliases: true,
            aggregate_labels: vec![],
            imports: vec![
                ImportRecord {
                    country: "China".into(),
                    year: 2022,
                    import_value: Some(dec!(5769512.54)),
                },
                ImportRecord {
                    country: "World".into(),
                    year: 2022,
                    import_value: Some(dec!(99999999)),
                },
            ],
            timeliness: vec![TimelinessRecord {
                country: "China".into(),
                timeliness_score: Some(dec!(3.7)),
            }],
            risk: vec![RiskRecord {
                country: "China".into(),
                risk_premium: Some(dec!(0.06)),
            }],
            options: PipelineOptions::default(),
        }
    }

    #[test]
    fn test_run_reports_rows_and_exclusions() {
        let out = run_raiv(&input()).unwrap();
        let report = &out.result;
        assert_eq!(report.rows_computed, 1);
        assert_eq!(report.rows_excluded, 1);
        assert_eq!(report.imports_seen, 2);
        assert_eq!(report.years_covered, vec![2022]);
        assert_eq!(report.rows[0].raiv.round_dp(2), dec!(21347196.40));
        assert_eq!(report.exclusion_counts[&ExclusionReason::UnresolvedLabel], 1);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_explicit_years_must_be_covered() {
        let mut run = input();
        run.options.years = Some(vec![2022, 2023]);
        let err = run_raiv(&run).unwrap_err();
        assert!(matches!(err, RaivError::EmptyGroup { .. }));
    }

    #[test]
    fn test_unknown_option_year_rejected() {
        let mut run = input();
        run.options.years = Some(vec![2019]);
        let err = run_raiv(&run).unwrap_err();
        assert!(matches!(err, RaivError::UnrecognizedYear { year: 2019, .. }));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_trend_years_off_schedule_rejected() {
        let mut run = input();
        run.options.trend_base_year = 2019;
        run.options.trend_compare_year = 2030;
        let err = run_raiv(&run).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("trend_base_year"));

        let mut run = input();
        run.options.trend_compare_year = 2030;
        match run_raiv(&run) {
            Err(RaivError::UnrecognizedYear { country, year }) => {
                assert_eq!(country, "options.trend_compare_year");
                assert_eq!(year, 2030);
            }
            other => panic!("expected UnrecognizedYear, got {other:?}"),
        }
    }

    #[test]
    fn test_extra_alias_conflict_aborts_run() {
        let mut run = input();
        run.aliases = vec![
            CountryAlias::new("PRC", "China"),
            CountryAlias::new("PRC", "Taiwan"),
        ];
        let err = run_raiv(&run).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_without_builtin_aliases() {
        let mut run = input();
        run.use_builtin_aliases = false;
        run.imports[0].country = "Korea Rep.".into();
        let out = run_raiv(&run).unwrap();
        assert_eq!(out.result.rows_computed, 0);
        assert_eq!(out.result.rows_excluded, 2);
    }

    #[test]
    fn test_run_input_from_json() {
        let json = r#"{
            "imports": [{"Country": "Viet Nam", "Year": 2023, "ImportValue": 1060}],
            "timeliness": [{"Economy": "Vietnam", "TimelinessScore": 2}],
            "risk": [{"Country": "Vietnam", "RiskPremium": 0.06}]
        }"#;
        let run: RaivRunInput = serde_json::from_str(json).unwrap();
        assert!(run.use_builtin_aliases);
        let out = run_raiv(&run).unwrap();
        assert_eq!(out.result.rows[0].country, "Vietnam");
        assert_eq!(out.result.rows[0].raiv, dec!(2000));
    }
}
