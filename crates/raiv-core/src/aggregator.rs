//! Read-only projections over the computed RAIV table: per-year statistics,
//! top-N rankings, year-over-year trends and the multi-year completeness
//! filter.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calculator::SUPPORTED_YEARS;
use crate::error::RaivError;
use crate::types::{CountryId, Money, RaivRow, Rate, Score, Year};
use crate::RaivResult;

/// Decimal places for summary statistics.
const STATS_DP: u32 = 4;
/// Decimal places for growth percentages.
const GROWTH_DP: u32 = 1;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Summary statistics for one year of the RAIV table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearStats {
    pub year: Year,
    pub count: usize,
    pub raiv_mean: Money,
    pub raiv_median: Money,
    /// Population standard deviation
    pub raiv_std: Money,
    pub raiv_min: Money,
    pub raiv_max: Money,
    pub import_value_mean: Money,
    pub import_value_median: Money,
    pub import_value_min: Money,
    pub import_value_max: Money,
    pub timeliness_mean: Score,
    pub timeliness_median: Score,
    pub risk_premium_mean: Rate,
    pub risk_premium_median: Rate,
}

/// A row's position within its year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRow {
    pub rank: usize,
    pub country: CountryId,
    pub raiv: Money,
    pub import_value: Money,
    pub timeliness_score: Score,
    pub risk_premium: Rate,
}

/// Top-N ranking for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearRanking {
    pub year: Year,
    pub rows: Vec<RankedRow>,
}

/// RAIV movement for one country between two years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryTrend {
    pub country: CountryId,
    pub base_year: Year,
    pub compare_year: Year,
    pub base_raiv: Money,
    pub compare_raiv: Money,
    pub absolute_change: Money,
    /// Percentage change rounded to one decimal; `None` when the base is zero
    pub pct_change: Option<Decimal>,
}

/// Aggregation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryOptions {
    /// Years that must each have at least one row
    pub years: Vec<Year>,
    pub top_n: usize,
    pub trend_base_year: Year,
    pub trend_compare_year: Year,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            years: SUPPORTED_YEARS.to_vec(),
            top_n: 10,
            trend_base_year: 2022,
            trend_compare_year: 2024,
        }
    }
}

/// Everything the aggregator derives from one RAIV table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub per_year_stats: Vec<YearStats>,
    pub top_n: Vec<YearRanking>,
    pub trends: Vec<CountryTrend>,
    /// Countries with a row in every configured year
    pub complete_countries: Vec<CountryId>,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Sum that reports overflow instead of panicking.
pub(crate) fn checked_sum<I>(values: I, context: &str) -> RaivResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(v).ok_or_else(|| RaivError::overflow(context))
    })
}

/// Arithmetic mean. Falls back to summing `v / n` when the plain sum
/// leaves the decimal range, so a valid group always has a mean.
fn mean(values: &[Decimal]) -> Decimal {
    let n = Decimal::from(values.len() as i64);
    match checked_sum(values.iter().copied(), "mean") {
        Ok(sum) => sum / n,
        Err(_) => values.iter().map(|v| *v / n).sum(),
    }
}

/// Median of an unsorted slice. The midpoint of an even group is taken as
/// `lo + (hi - lo) / 2` so large values cannot overflow.
fn median(values: &[Decimal]) -> Decimal {
    let mut sorted = values.to_vec();
    sorted.sort();
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        let (lo, hi) = (sorted[n / 2 - 1], sorted[n / 2]);
        lo + (hi - lo) / dec!(2)
    }
}

/// Population standard deviation. Deviations are scaled by the largest
/// one before squaring so the squares stay within [0, 1].
fn population_std(values: &[Decimal], avg: Decimal) -> Decimal {
    let scale = values
        .iter()
        .map(|v| (*v - avg).abs())
        .max()
        .unwrap_or_default();
    if scale.is_zero() {
        return Decimal::ZERO;
    }
    let sum_sq: Decimal = values
        .iter()
        .map(|v| {
            let r = (*v - avg) / scale;
            r * r
        })
        .sum();
    let ratio = (sum_sq / Decimal::from(values.len() as i64))
        .sqrt()
        .unwrap_or(Decimal::ZERO);
    scale * ratio
}

/// Statistics for a single year. A year without rows is an `EmptyGroup`
/// error, never a zero or NaN mean.
pub fn year_stats(rows: &[RaivRow], year: Year) -> RaivResult<YearStats> {
    let group: Vec<&RaivRow> = rows.iter().filter(|r| r.year == year).collect();
    if group.is_empty() {
        return Err(RaivError::EmptyGroup {
            context: format!("no RAIV rows for year {year}"),
        });
    }

    let raiv: Vec<Decimal> = group.iter().map(|r| r.raiv).collect();
    let imports: Vec<Decimal> = group.iter().map(|r| r.import_value).collect();
    let scores: Vec<Decimal> = group.iter().map(|r| r.timeliness_score).collect();
    let premiums: Vec<Decimal> = group.iter().map(|r| r.risk_premium).collect();

    let raiv_mean = mean(&raiv);
    Ok(YearStats {
        year,
        count: group.len(),
        raiv_mean: raiv_mean.round_dp(STATS_DP),
        raiv_median: median(&raiv).round_dp(STATS_DP),
        raiv_std: population_std(&raiv, raiv_mean).round_dp(STATS_DP),
        raiv_min: raiv.iter().copied().min().unwrap_or_default(),
        raiv_max: raiv.iter().copied().max().unwrap_or_default(),
        import_value_mean: mean(&imports).round_dp(STATS_DP),
        import_value_median: median(&imports).round_dp(STATS_DP),
        import_value_min: imports.iter().copied().min().unwrap_or_default(),
        import_value_max: imports.iter().copied().max().unwrap_or_default(),
        timeliness_mean: mean(&scores).round_dp(STATS_DP),
        timeliness_median: median(&scores).round_dp(STATS_DP),
        risk_premium_mean: mean(&premiums).round_dp(STATS_DP),
        risk_premium_median: median(&premiums).round_dp(STATS_DP),
    })
}

/// Statistics for each requested year, in the order given.
pub fn per_year_stats(rows: &[RaivRow], years: &[Year]) -> RaivResult<Vec<YearStats>> {
    years.iter().map(|y| year_stats(rows, *y)).collect()
}

/// Distinct years present in the table, ascending.
pub fn observed_years(rows: &[RaivRow]) -> Vec<Year> {
    rows.iter()
        .map(|r| r.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ---------------------------------------------------------------------------
// Rankings
// ---------------------------------------------------------------------------

/// Rank rows within each year by RAIV descending, ties by country name.
pub fn top_n_by_year(rows: &[RaivRow], n: usize) -> Vec<YearRanking> {
    let mut by_year: BTreeMap<Year, Vec<&RaivRow>> = BTreeMap::new();
    for row in rows {
        by_year.entry(row.year).or_default().push(row);
    }

    by_year
        .into_iter()
        .map(|(year, mut group)| {
            group.sort_by(|a, b| b.raiv.cmp(&a.raiv).then_with(|| a.country.cmp(&b.country)));
            let rows = group
                .into_iter()
                .take(n)
                .enumerate()
                .map(|(i, r)| RankedRow {
                    rank: i + 1,
                    country: r.country.clone(),
                    raiv: r.raiv,
                    import_value: r.import_value,
                    timeliness_score: r.timeliness_score,
                    risk_premium: r.risk_premium,
                })
                .collect();
            YearRanking { year, rows }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

/// Percentage change rounded to one decimal. Undefined (`None`) for a zero
/// base; a change too large to represent is an overflow error.
pub fn growth_pct(base: Decimal, compare: Decimal) -> RaivResult<Option<Decimal>> {
    if base.is_zero() {
        return Ok(None);
    }
    (compare - base)
        .checked_div(base)
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .map(|pct| Some(pct.round_dp(GROWTH_DP)))
        .ok_or_else(|| RaivError::overflow(format!("growth from {base} to {compare}")))
}

fn raiv_by_country(rows: &[RaivRow], year: Year) -> BTreeMap<&str, Money> {
    rows.iter()
        .filter(|r| r.year == year)
        .map(|r| (r.country.as_str(), r.raiv))
        .collect()
}

/// Change in RAIV between two years for every country present in both.
pub fn country_trends(
    rows: &[RaivRow],
    base_year: Year,
    compare_year: Year,
) -> RaivResult<Vec<CountryTrend>> {
    if base_year == compare_year {
        return Err(RaivError::InvalidInput {
            field: "trend_compare_year".into(),
            reason: format!("Base and compare year are both {base_year}"),
        });
    }

    let base = raiv_by_country(rows, base_year);
    let compare = raiv_by_country(rows, compare_year);

    let mut trends = Vec::new();
    for (country, base_raiv) in &base {
        let Some(compare_raiv) = compare.get(country).copied() else {
            continue;
        };
        trends.push(CountryTrend {
            country: country.to_string(),
            base_year,
            compare_year,
            base_raiv: *base_raiv,
            compare_raiv,
            absolute_change: compare_raiv - *base_raiv,
            pct_change: growth_pct(*base_raiv, compare_raiv)?,
        });
    }
    Ok(trends)
}

// ---------------------------------------------------------------------------
// Completeness
// ---------------------------------------------------------------------------

/// Countries with a row in every one of `years`, ascending.
pub fn countries_in_all_years(rows: &[RaivRow], years: &[Year]) -> Vec<CountryId> {
    let wanted: BTreeSet<Year> = years.iter().copied().collect();
    let mut seen: BTreeMap<&str, BTreeSet<Year>> = BTreeMap::new();
    for row in rows.iter().filter(|r| wanted.contains(&r.year)) {
        seen.entry(row.country.as_str()).or_default().insert(row.year);
    }
    seen.into_iter()
        .filter(|(_, ys)| ys.len() == wanted.len())
        .map(|(c, _)| c.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run every aggregation over the table.
pub fn summarize(rows: &[RaivRow], options: &SummaryOptions) -> RaivResult<Summary> {
    let per_year_stats = per_year_stats(rows, &options.years)?;
    let trends = country_trends(rows, options.trend_base_year, options.trend_compare_year)?;
    let complete_countries = countries_in_all_years(rows, &options.years);
    if complete_countries.len() < observed_countries(rows) {
        warn!(
            complete = complete_countries.len(),
            years = options.years.len(),
            "some countries lack a row in every year"
        );
    }

    Ok(Summary {
        per_year_stats,
        top_n: top_n_by_year(rows, options.top_n),
        trends,
        complete_countries,
    })
}

fn observed_countries(rows: &[RaivRow]) -> usize {
    rows.iter()
        .map(|r| r.country.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(country: &str, year: Year, raiv: Money) -> RaivRow {
        RaivRow {
            country: country.into(),
            year,
            import_value: raiv,
            timeliness_score: dec!(3),
            risk_premium: dec!(0.05),
            t: (year - 2022) as u32,
            raiv,
        }
    }

    #[test]
    fn test_year_stats_basic() {
        let rows = vec![
            row("A", 2022, dec!(10)),
            row("B", 2022, dec!(20)),
            row("C", 2022, dec!(30)),
            row("D", 2023, dec!(99)),
        ];
        let stats = year_stats(&rows, 2022).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.raiv_mean, dec!(20));
        assert_eq!(stats.raiv_median, dec!(20));
        assert_eq!(stats.raiv_min, dec!(10));
        assert_eq!(stats.raiv_max, dec!(30));
        assert_eq!(stats.import_value_max, dec!(30));
        // sqrt(200/3) = 8.1650
        assert_eq!(stats.raiv_std, dec!(8.1650));
    }

    #[test]
    fn test_even_median() {
        let rows = vec![row("A", 2022, dec!(10)), row("B", 2022, dec!(40))];
        assert_eq!(year_stats(&rows, 2022).unwrap().raiv_median, dec!(25));
    }

    #[test]
    fn test_input_medians() {
        let mut rows = vec![
            row("A", 2022, dec!(10)),
            row("B", 2022, dec!(40)),
            row("C", 2022, dec!(70)),
            row("D", 2022, dec!(100)),
        ];
        for (r, (score, premium)) in rows.iter_mut().zip([
            (dec!(2.0), dec!(0.01)),
            (dec!(3.0), dec!(0.02)),
            (dec!(3.5), dec!(0.08)),
            (dec!(4.0), dec!(0.09)),
        ]) {
            r.timeliness_score = score;
            r.risk_premium = premium;
        }
        let stats = year_stats(&rows, 2022).unwrap();
        assert_eq!(stats.import_value_median, dec!(55));
        assert_eq!(stats.timeliness_median, dec!(3.25));
        assert_eq!(stats.risk_premium_median, dec!(0.05));
        assert_eq!(stats.timeliness_mean, dec!(3.125));
    }

    #[test]
    fn test_wide_spread_stats_do_not_overflow() {
        let rows = vec![
            row("A", 2022, Decimal::ZERO),
            row("B", 2022, dec!(1000000000000000)),
        ];
        let stats = year_stats(&rows, 2022).unwrap();
        assert_eq!(stats.raiv_mean, dec!(500000000000000));
        assert_eq!(stats.raiv_std, dec!(500000000000000));
        assert_eq!(stats.raiv_median, dec!(500000000000000));

        // Sum beyond the decimal range still has a mean.
        let big = dec!(70000000000000000000000000000);
        let rows = vec![row("A", 2023, big), row("B", 2023, big)];
        let stats = year_stats(&rows, 2023).unwrap();
        assert_eq!(stats.raiv_mean, big);
        assert_eq!(stats.raiv_std, Decimal::ZERO);
    }

    #[test]
    fn test_growth_out_of_range_is_an_error() {
        let err = growth_pct(dec!(0.0000000000000000000001), dec!(70000000000000000000000000000))
            .unwrap_err();
        assert!(matches!(err, RaivError::ArithmeticOverflow { .. }));
    }

    #[test]
    fn test_empty_year_fails() {
        let rows = vec![row("A", 2022, dec!(10))];
        let err = year_stats(&rows, 2024).unwrap_err();
        assert!(matches!(err, RaivError::EmptyGroup { .. }));
        assert!(per_year_stats(&rows, &[2022, 2024]).is_err());
    }

    #[test]
    fn test_top_n_ties_broken_by_country() {
        let rows = vec![
            row("Chile", 2022, dec!(50)),
            row("Brazil", 2022, dec!(50)),
            row("Austria", 2022, dec!(10)),
            row("Denmark", 2022, dec!(70)),
        ];
        let ranking = top_n_by_year(&rows, 3);
        assert_eq!(ranking.len(), 1);
        let countries: Vec<&str> = ranking[0].rows.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(countries, vec!["Denmark", "Brazil", "Chile"]);
        assert_eq!(ranking[0].rows[2].rank, 3);
    }

    #[test]
    fn test_growth_reference() {
        assert_eq!(growth_pct(dec!(258859.77), dec!(365038.01)).unwrap(), Some(dec!(41.0)));
    }

    #[test]
    fn test_growth_zero_base_undefined() {
        assert_eq!(growth_pct(Decimal::ZERO, dec!(100)).unwrap(), None);
    }

    #[test]
    fn test_trends_skip_partial_countries() {
        let rows = vec![
            row("A", 2022, dec!(100)),
            row("A", 2024, dec!(150)),
            row("B", 2022, dec!(0)),
            row("B", 2024, dec!(10)),
            row("C", 2024, dec!(5)),
        ];
        let trends = country_trends(&rows, 2022, 2024).unwrap();
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].absolute_change, dec!(50));
        assert_eq!(trends[0].pct_change, Some(dec!(50.0)));
        assert_eq!(trends[1].country, "B");
        assert_eq!(trends[1].pct_change, None);
        assert_eq!(trends[1].absolute_change, dec!(10));
    }

    #[test]
    fn test_trend_same_year_rejected() {
        assert!(country_trends(&[], 2022, 2022).is_err());
    }

    #[test]
    fn test_countries_in_all_years() {
        let rows = vec![
            row("A", 2022, dec!(1)),
            row("A", 2023, dec!(1)),
            row("A", 2024, dec!(1)),
            row("B", 2022, dec!(1)),
            row("B", 2024, dec!(1)),
        ];
        assert_eq!(
            countries_in_all_years(&rows, &SUPPORTED_YEARS),
            vec!["A".to_string()]
        );
        assert_eq!(
            countries_in_all_years(&rows, &[2022, 2024]),
            vec!["A".to_string(), "B".to_string()]
        );
    }

    #[test]
    fn test_summarize_requires_every_year() {
        let rows = vec![row("A", 2022, dec!(1)), row("A", 2024, dec!(2))];
        let err = summarize(&rows, &SummaryOptions::default()).unwrap_err();
        assert!(matches!(err, RaivError::EmptyGroup { .. }));

        let options = SummaryOptions {
            years: vec![2022, 2024],
            ..SummaryOptions::default()
        };
        let summary = summarize(&rows, &options).unwrap();
        assert_eq!(summary.per_year_stats.len(), 2);
        assert_eq!(summary.trends[0].pct_change, Some(dec!(100.0)));
        assert_eq!(summary.complete_countries, vec!["A".to_string()]);
    }
}
