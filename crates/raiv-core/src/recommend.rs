//! Weighted country recommendations over one or more years of RAIV.
//!
//! Per country: RAIV summed across the selected years, timeliness and risk
//! averaged. The composite score blends the three after normalising each to
//! roughly [0, 1]:
//!
//! ```text
//! score = raiv / max_raiv       * w_raiv
//!       + timeliness / 5        * w_timeliness
//!       + (1 - risk / max_risk) * w_risk
//! ```
//!
//! Weights are rescaled to sum to one before use.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::RaivError;
use crate::types::{CountryId, Money, RaivRow, Rate, Score, Year};
use crate::RaivResult;

/// Top of the LPI scale.
const MAX_TIMELINESS: Decimal = dec!(5);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationWeights {
    pub raiv: Decimal,
    pub timeliness: Decimal,
    pub risk: Decimal,
}

impl Default for RecommendationWeights {
    fn default() -> Self {
        Self {
            raiv: dec!(0.10),
            timeliness: dec!(0.45),
            risk: dec!(0.45),
        }
    }
}

impl RecommendationWeights {
    /// Rescale to sum to one. Negative weights or a zero total are rejected.
    pub fn normalized(&self) -> RaivResult<Self> {
        for (field, w) in [
            ("raiv_weight", self.raiv),
            ("timeliness_weight", self.timeliness),
            ("risk_weight", self.risk),
        ] {
            if w < Decimal::ZERO {
                return Err(RaivError::InvalidInput {
                    field: field.into(),
                    reason: format!("Weight cannot be negative, got {w}"),
                });
            }
        }
        let total = self.raiv + self.timeliness + self.risk;
        if total.is_zero() {
            return Err(RaivError::InvalidInput {
                field: "weights".into(),
                reason: "Total weight must be greater than 0".into(),
            });
        }
        Ok(Self {
            raiv: self.raiv / total,
            timeliness: self.timeliness / total,
            risk: self.risk / total,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub rank: usize,
    pub country: CountryId,
    pub total_raiv: Money,
    pub mean_timeliness: Score,
    pub mean_risk_premium: Rate,
    pub composite_score: Decimal,
    pub years_used: usize,
}

#[derive(Default)]
struct CountryAccumulator {
    raiv: Decimal,
    timeliness: Decimal,
    risk: Decimal,
    n: usize,
}

/// Rank countries by composite score. `years` empty means every year.
pub fn recommend(
    rows: &[RaivRow],
    weights: &RecommendationWeights,
    years: &[Year],
    top_n: usize,
) -> RaivResult<Vec<Recommendation>> {
    let weights = weights.normalized()?;

    let mut by_country: BTreeMap<&str, CountryAccumulator> = BTreeMap::new();
    for row in rows
        .iter()
        .filter(|r| years.is_empty() || years.contains(&r.year))
    {
        let acc = by_country.entry(row.country.as_str()).or_default();
        acc.raiv = acc.raiv.checked_add(row.raiv).ok_or_else(|| {
            RaivError::overflow(format!("RAIV total for '{}'", row.country))
        })?;
        acc.timeliness += row.timeliness_score;
        acc.risk += row.risk_premium;
        acc.n += 1;
    }
    if by_country.is_empty() {
        return Err(RaivError::InsufficientData(
            "No RAIV rows for the selected years".into(),
        ));
    }

    let aggregated: Vec<(&str, Decimal, Decimal, Decimal, usize)> = by_country
        .into_iter()
        .map(|(country, acc)| {
            let n = Decimal::from(acc.n as i64);
            (country, acc.raiv, acc.timeliness / n, acc.risk / n, acc.n)
        })
        .collect();

    let max_raiv = aggregated.iter().map(|a| a.1).max().unwrap_or_default();
    let max_risk = aggregated.iter().map(|a| a.3).max().unwrap_or_default();

    let mut scored: Vec<Recommendation> = aggregated
        .into_iter()
        .map(|(country, raiv, timeliness, risk, n)| {
            let raiv_norm = if max_raiv > Decimal::ZERO {
                raiv / max_raiv
            } else {
                Decimal::ZERO
            };
            let risk_norm = if max_risk > Decimal::ZERO {
                risk / max_risk
            } else {
                Decimal::ZERO
            };
            let composite_score = raiv_norm * weights.raiv
                + timeliness / MAX_TIMELINESS * weights.timeliness
                + (Decimal::ONE - risk_norm) * weights.risk;
            Recommendation {
                rank: 0,
                country: country.to_string(),
                total_raiv: raiv,
                mean_timeliness: timeliness,
                mean_risk_premium: risk,
                composite_score,
                years_used: n,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.composite_score
            .cmp(&a.composite_score)
            .then_with(|| a.country.cmp(&b.country))
    });
    scored.truncate(top_n);
    for (i, rec) in scored.iter_mut().enumerate() {
        rec.rank = i + 1;
    }
    Ok(scored)
}
