//! Banded summaries of the RAIV table by risk premium and timeliness score.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::RaivError;
use crate::types::{Money, RaivRow};
use crate::RaivResult;

pub const DEFAULT_RISK_BOUNDS: [Decimal; 4] = [dec!(0), dec!(0.02), dec!(0.05), dec!(0.10)];
pub const DEFAULT_TIMELINESS_BOUNDS: [Decimal; 5] =
    [dec!(0), dec!(2.5), dec!(3.0), dec!(3.5), dec!(4.0)];

/// One half-open band `[lower, upper)`. The last band has no upper bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub lower: Decimal,
    pub upper: Option<Decimal>,
    pub count: usize,
    pub total_raiv: Money,
    /// `None` for an empty band
    pub mean_raiv: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub dimension: String,
    pub buckets: Vec<Bucket>,
    /// Rows below the lowest bound
    pub below_range: usize,
}

fn validate_bounds(bounds: &[Decimal], field: &str) -> RaivResult<()> {
    if bounds.is_empty() {
        return Err(RaivError::InvalidInput {
            field: field.into(),
            reason: "At least one bucket bound is required".into(),
        });
    }
    if bounds.windows(2).any(|w| w[0] >= w[1]) {
        return Err(RaivError::InvalidInput {
            field: field.into(),
            reason: "Bucket bounds must be strictly increasing".into(),
        });
    }
    Ok(())
}

fn bucketize(
    rows: &[RaivRow],
    bounds: &[Decimal],
    dimension: &str,
    value_of: impl Fn(&RaivRow) -> Decimal,
) -> RaivResult<BucketSummary> {
    validate_bounds(bounds, dimension)?;

    let mut buckets: Vec<Bucket> = bounds
        .iter()
        .enumerate()
        .map(|(i, lower)| {
            let upper = bounds.get(i + 1).copied();
            let label = match upper {
                Some(u) => format!("[{lower}, {u})"),
                None => format!(">= {lower}"),
            };
            Bucket {
                label,
                lower: *lower,
                upper,
                count: 0,
                total_raiv: Decimal::ZERO,
                mean_raiv: None,
            }
        })
        .collect();

    let mut below_range = 0;
    for row in rows {
        let v = value_of(row);
        // Last band whose lower bound is at or below the value.
        match bounds.iter().rposition(|b| v >= *b) {
            Some(i) => {
                let bucket = &mut buckets[i];
                bucket.count += 1;
                bucket.total_raiv = bucket.total_raiv.checked_add(row.raiv).ok_or_else(|| {
                    RaivError::overflow(format!("{dimension} band {} RAIV total", bucket.label))
                })?;
            }
            None => below_range += 1,
        }
    }

    for bucket in &mut buckets {
        if bucket.count > 0 {
            bucket.mean_raiv = Some(bucket.total_raiv / Decimal::from(bucket.count as i64));
        }
    }

    Ok(BucketSummary {
        dimension: dimension.to_string(),
        buckets,
        below_range,
    })
}

/// Group rows by risk premium band.
pub fn risk_buckets(rows: &[RaivRow], bounds: &[Decimal]) -> RaivResult<BucketSummary> {
    bucketize(rows, bounds, "risk_premium", |r| r.risk_premium)
}

/// Group rows by timeliness score band.
pub fn timeliness_buckets(rows: &[RaivRow], bounds: &[Decimal]) -> RaivResult<BucketSummary> {
    bucketize(rows, bounds, "timeliness_score", |r| r.timeliness_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(country: &str, premium: Decimal, score: Decimal, raiv: Money) -> RaivRow {
        RaivRow {
            country: country.into(),
            year: 2022,
            import_value: raiv,
            timeliness_score: score,
            risk_premium: premium,
            t: 0,
            raiv,
        }
    }

    #[test]
    fn test_risk_bands() {
        let rows = vec![
            row("A", dec!(0.0), dec!(4.1), dec!(100)),
            row("B", dec!(0.02), dec!(3.2), dec!(50)),
            row("C", dec!(0.049), dec!(2.1), dec!(30)),
            row("D", dec!(0.2), dec!(1.9), dec!(10)),
        ];
        let summary = risk_buckets(&rows, &DEFAULT_RISK_BOUNDS).unwrap();
        let counts: Vec<usize> = summary.buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 2, 0, 1]);
        assert_eq!(summary.buckets[1].total_raiv, dec!(80));
        assert_eq!(summary.buckets[1].mean_raiv, Some(dec!(40)));
        assert_eq!(summary.buckets[2].mean_raiv, None);
        assert_eq!(summary.buckets[3].upper, None);
        assert_eq!(summary.below_range, 0);
    }

    #[test]
    fn test_timeliness_below_range() {
        let rows = vec![row("A", dec!(0.01), dec!(2.9), dec!(10))];
        let summary = timeliness_buckets(&rows, &[dec!(3.0), dec!(4.0)]).unwrap();
        assert_eq!(summary.below_range, 1);
        assert!(summary.buckets.iter().all(|b| b.count == 0));
    }

    #[test]
    fn test_band_total_overflow_is_an_error() {
        let big = dec!(50000000000000000000000000000);
        let rows = vec![
            row("A", dec!(0.01), dec!(3), big),
            row("B", dec!(0.01), dec!(3), big),
        ];
        let err = risk_buckets(&rows, &DEFAULT_RISK_BOUNDS).unwrap_err();
        assert!(matches!(err, RaivError::ArithmeticOverflow { .. }));
    }

    #[test]
    fn test_bounds_must_increase() {
        assert!(risk_buckets(&[], &[dec!(0.05), dec!(0.02)]).is_err());
        assert!(risk_buckets(&[], &[]).is_err());
    }
}
