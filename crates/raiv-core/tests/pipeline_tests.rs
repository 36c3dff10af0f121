use pretty_assertions::assert_eq;
use raiv_core::aggregator::{self, SummaryOptions};
use raiv_core::joiner::{self, joinable_countries, ExclusionReason};
use raiv_core::pipeline::{run_raiv, PipelineOptions, RaivRunInput};
use raiv_core::resolver::AliasTable;
use raiv_core::tables::{RiskTable, TimelinessTable};
use raiv_core::{calculator, CountryAlias, ImportRecord, RaivError, RiskRecord, TimelinessRecord};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures: three sources with the naming drift seen in trade data
// ===========================================================================

fn imports() -> Vec<ImportRecord> {
    let rows = [
        ("China", 2022, Some(dec!(5769512.54))),
        ("China", 2023, Some(dec!(4500000.00))),
        ("China", 2024, Some(dec!(4400000.00))),
        ("Korea Rep.", 2022, Some(dec!(100000.00))),
        ("Korea Rep.", 2023, Some(dec!(110000.00))),
        ("Korea Rep.", 2024, Some(dec!(120000.00))),
        ("Viet Nam", 2022, Some(dec!(80000.00))),
        ("Viet Nam", 2024, Some(dec!(130000.00))),
        ("Bahamas", 2022, Some(dec!(500.00))),
        ("Atlantis", 2022, Some(dec!(1.00))),
        ("World", 2022, Some(dec!(99999999.00))),
        ("Chile", 2023, None),
    ];
    rows.iter()
        .map(|(c, y, v)| ImportRecord {
            country: c.to_string(),
            year: *y,
            import_value: *v,
        })
        .collect()
}

fn timeliness() -> Vec<TimelinessRecord> {
    let rows = [
        ("China", Some(dec!(3.7))),
        ("Korea, Rep.", Some(dec!(3.8))),
        ("South Korea", Some(dec!(3.8))),
        ("Vietnam", Some(dec!(3.3))),
        ("Bahamas, The", Some(dec!(2.9))),
        ("Chile", Some(dec!(3.2))),
    ];
    rows.iter()
        .map(|(c, s)| TimelinessRecord {
            country: c.to_string(),
            timeliness_score: *s,
        })
        .collect()
}

fn risk() -> Vec<RiskRecord> {
    let rows = [
        ("China", Some(dec!(0.06))),
        ("South Korea", Some(dec!(0.008))),
        ("Viet Nam", Some(dec!(0.03))),
        ("Bahamas", Some(dec!(0.045))),
        ("Chile", Some(dec!(0.012))),
    ];
    rows.iter()
        .map(|(c, r)| RiskRecord {
            country: c.to_string(),
            risk_premium: *r,
        })
        .collect()
}

fn run_input() -> RaivRunInput {
    RaivRunInput {
        aliases: vec![],
        use_builtin_aliases: true,
        aggregate_labels: vec![],
        imports: imports(),
        timeliness: timeliness(),
        risk: risk(),
        options: PipelineOptions::default(),
    }
}

// ===========================================================================
// Join
// ===========================================================================

#[test]
fn test_join_output_bounded_and_verifiable() {
    let aliases = AliasTable::builtin().unwrap();
    let out = joiner::join(&imports(), &timeliness(), &risk(), &aliases).unwrap();

    let t_table = TimelinessTable::load(&timeliness(), &aliases).unwrap();
    let r_table = RiskTable::load(&risk(), &aliases).unwrap();
    let joinable = joinable_countries(&t_table, &r_table);

    let distinct: std::collections::BTreeSet<&str> =
        out.rows.iter().map(|r| r.country.as_str()).collect();
    assert!(out.rows.len() <= imports().len());
    assert!(distinct.len() <= joinable.len());

    // Each joined value traces back to its source table.
    for row in &out.rows {
        assert_eq!(t_table.score(&row.country), Some(row.timeliness_score));
        assert_eq!(r_table.premium(&row.country), Some(row.risk_premium));
    }
    assert_eq!(out.rows.len(), 9);
}

#[test]
fn test_unreconciled_labels_excluded_not_mismatched() {
    let aliases = AliasTable::builtin().unwrap();
    let out = joiner::join(&imports(), &timeliness(), &risk(), &aliases).unwrap();

    // "Korea, Rep." has no alias and stays a separate, risk-less identity.
    assert!(out.rows.iter().all(|r| r.country != "Korea, Rep."));
    let atlantis = out
        .exclusions
        .iter()
        .find(|e| e.country == "Atlantis")
        .unwrap();
    assert_eq!(
        atlantis.reasons,
        vec![ExclusionReason::MissingTimeliness, ExclusionReason::MissingRisk]
    );
    let chile = out.exclusions.iter().find(|e| e.country == "Chile").unwrap();
    assert_eq!(chile.reasons, vec![ExclusionReason::MissingImportValue]);
    assert_eq!(out.excluded_count(), 3);
}

#[test]
fn test_incomplete_row_with_unscheduled_year_aborts_join() {
    // Peru/2019 has neither timeliness nor risk data, so it would otherwise
    // end up as an ordinary exclusion.
    let mut imports = imports();
    imports.push(ImportRecord {
        country: "Peru".to_string(),
        year: 2019,
        import_value: Some(dec!(10)),
    });
    let aliases = AliasTable::builtin().unwrap();
    let err = joiner::join(&imports, &timeliness(), &risk(), &aliases).unwrap_err();
    assert!(matches!(err, RaivError::UnrecognizedYear { year: 2019, .. }));

    let mut input = run_input();
    input.imports = imports;
    let err = run_raiv(&input).unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn test_alias_onto_world_is_excluded() {
    let mut input = run_input();
    input.aliases = vec![CountryAlias::new("WLD", "World")];
    input.imports.push(ImportRecord {
        country: "WLD".to_string(),
        year: 2023,
        import_value: Some(dec!(123)),
    });
    let out = run_raiv(&input).unwrap();
    assert!(out.result.rows.iter().all(|r| r.country != "World"));
    assert_eq!(out.result.rows_excluded, 4);
    // World and WLD; Atlantis and Chile are excluded for missing data.
    assert_eq!(
        out.result.exclusion_counts[&ExclusionReason::UnresolvedLabel],
        2
    );
}

#[test]
fn test_alias_conflict_fixture() {
    // The source mapping that sent one label to two different countries.
    let aliases = vec![
        CountryAlias::new("Korea Rep.", "South Korea"),
        CountryAlias::new("Korea Rep.", "North Korea"),
    ];
    match AliasTable::new(&aliases) {
        Err(RaivError::ConflictingAlias { raw_label, .. }) => assert_eq!(raw_label, "Korea Rep."),
        other => panic!("expected ConflictingAlias, got {other:?}"),
    }
}

// ===========================================================================
// Aggregation
// ===========================================================================

#[test]
fn test_trend_reference_growth() {
    let rows = vec![
        raiv_core::RaivRow {
            country: "Mexico".into(),
            year: 2022,
            import_value: dec!(1),
            timeliness_score: dec!(1),
            risk_premium: dec!(0.02),
            t: 0,
            raiv: dec!(258859.77),
        },
        raiv_core::RaivRow {
            country: "Mexico".into(),
            year: 2024,
            import_value: dec!(1),
            timeliness_score: dec!(1),
            risk_premium: dec!(0.02),
            t: 2,
            raiv: dec!(365038.01),
        },
    ];
    let trends = aggregator::country_trends(&rows, 2022, 2024).unwrap();
    assert_eq!(trends.len(), 1);
    assert_eq!(trends[0].pct_change, Some(dec!(41.0)));
    assert_eq!(trends[0].absolute_change, dec!(106178.24));
}

#[test]
fn test_empty_group_fails() {
    let aliases = AliasTable::builtin().unwrap();
    let out = joiner::join(&imports(), &timeliness(), &risk(), &aliases).unwrap();
    let rows = calculator::compute_all(&out.rows).unwrap();
    let err = aggregator::summarize(
        &rows,
        &SummaryOptions {
            years: vec![2022, 2023, 2024, 2025],
            ..SummaryOptions::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, RaivError::EmptyGroup { .. }));
}

// ===========================================================================
// Full run
// ===========================================================================

#[test]
fn test_full_run() {
    let out = run_raiv(&run_input()).unwrap();
    let report = &out.result;

    assert_eq!(report.rows_computed, 9);
    assert_eq!(report.rows_excluded, 3);
    assert_eq!(report.imports_seen, 12);
    assert_eq!(report.countries_covered, 4);
    assert_eq!(report.years_covered, vec![2022, 2023, 2024]);

    // Rows are ordered by (country, year).
    let keys: Vec<(String, i32)> = report
        .rows
        .iter()
        .map(|r| (r.country.clone(), r.year))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    let top_2022 = &report.summary.top_n[0];
    assert_eq!(top_2022.year, 2022);
    assert_eq!(top_2022.rows[0].country, "China");

    assert_eq!(
        report.summary.complete_countries,
        vec!["China".to_string(), "South Korea".to_string()]
    );

    // Vietnam is in 2022 and 2024, so it has a trend; Bahamas does not.
    let countries: Vec<&str> = report
        .summary
        .trends
        .iter()
        .map(|t| t.country.as_str())
        .collect();
    assert_eq!(countries, vec!["China", "South Korea", "Vietnam"]);

    let stats_2023 = &report.summary.per_year_stats[1];
    assert_eq!(stats_2023.year, 2023);
    assert_eq!(stats_2023.count, 2);
}

#[test]
fn test_raiv_row_column_contract() {
    let out = run_raiv(&run_input()).unwrap();
    let value = serde_json::to_value(&out.result.rows[0]).unwrap();
    let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
    keys.sort();
    assert_eq!(
        keys,
        vec!["Country", "ImportValue", "RAIV", "RiskPremium", "TimelinessScore", "Year", "t_value"]
    );
}

#[test]
fn test_runs_do_not_share_state() {
    let first = run_raiv(&run_input()).unwrap();
    let mut second_input = run_input();
    second_input.aliases = vec![CountryAlias::new("Atlantis", "China")];
    // Atlantis now collides with China/2022 in imports.
    assert!(run_raiv(&second_input).is_err());
    let third = run_raiv(&run_input()).unwrap();
    assert_eq!(first.result.rows, third.result.rows);
    assert!(first.result.rows.iter().all(|r| r.raiv > Decimal::ZERO));
}
