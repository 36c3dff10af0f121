//! RAIV = import_value × timeliness_score / (1 + risk_premium)^t
//!
//! `t` counts years elapsed since the 2022 base year. Values are left
//! unrounded; rounding belongs to the reporting layer.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::error::RaivError;
use crate::joiner::JoinedRow;
use crate::types::{Money, RaivRow, Rate, Score, Year};
use crate::RaivResult;

/// Years with a defined discount exponent, in order.
pub const SUPPORTED_YEARS: [Year; 3] = [2022, 2023, 2024];

/// Discount exponent for a year. Years outside the schedule are rejected
/// rather than extrapolated.
pub fn time_factor(year: Year) -> Option<u32> {
    match year {
        2022 => Some(0),
        2023 => Some(1),
        2024 => Some(2),
        _ => None,
    }
}

/// Core formula on raw values. Fails instead of panicking when the product
/// leaves the 96-bit decimal range.
pub fn raiv(
    import_value: Money,
    timeliness_score: Score,
    risk_premium: Rate,
    t: u32,
) -> RaivResult<Money> {
    let discount = (Decimal::ONE + risk_premium)
        .checked_powi(t as i64)
        .ok_or_else(|| RaivError::overflow("RAIV discount factor"))?;
    import_value
        .checked_mul(timeliness_score)
        .and_then(|gross| gross.checked_div(discount))
        .ok_or_else(|| {
            RaivError::overflow(format!(
                "RAIV: {import_value} x {timeliness_score} / (1 + {risk_premium})^{t}"
            ))
        })
}

/// Compute one RAIV row.
pub fn compute(row: &JoinedRow) -> RaivResult<RaivRow> {
    let t = time_factor(row.year).ok_or_else(|| RaivError::UnrecognizedYear {
        country: row.country.clone(),
        year: row.year,
    })?;
    if row.risk_premium <= Decimal::NEGATIVE_ONE {
        return Err(RaivError::InvalidInput {
            field: "risk_premium".into(),
            reason: format!(
                "Risk premium for '{}' must be greater than -100%",
                row.country
            ),
        });
    }

    Ok(RaivRow {
        country: row.country.clone(),
        year: row.year,
        import_value: row.import_value,
        timeliness_score: row.timeliness_score,
        risk_premium: row.risk_premium,
        t,
        raiv: raiv(row.import_value, row.timeliness_score, row.risk_premium, t)
            .map_err(|_| RaivError::overflow(format!("RAIV for '{}' in {}", row.country, row.year)))?,
    })
}

/// Compute every joined row. The first failure aborts the whole batch.
pub fn compute_all(rows: &[JoinedRow]) -> RaivResult<Vec<RaivRow>> {
    rows.iter().map(compute).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
