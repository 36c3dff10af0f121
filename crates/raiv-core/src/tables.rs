//! Source tables keyed by canonical country.
//!
//! Each loader resolves labels through the shared [`AliasTable`], validates
//! values and rejects duplicate keys. Duplicates are never averaged, summed
//! or deduplicated: two rows for the same key abort the run.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;

use crate::calculator::time_factor;
use crate::error::RaivError;
use crate::resolver::AliasTable;
use crate::types::{CountryId, ImportRecord, Money, Rate, RiskRecord, Score, TimelinessRecord, Year};
use crate::RaivResult;

pub const IMPORTS_TABLE: &str = "imports";
pub const TIMELINESS_TABLE: &str = "timeliness";
pub const RISK_TABLE: &str = "risk";

/// A resolved source value together with the label it arrived under.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceValue<T> {
    pub raw_label: String,
    pub value: Option<T>,
}

/// Import values keyed by (canonical country, year).
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    entries: BTreeMap<(CountryId, Year), SourceValue<Money>>,
    unresolved: Vec<(String, Year)>,
}

/// Timeliness scores keyed by canonical country.
#[derive(Debug, Clone, Default)]
pub struct TimelinessTable {
    entries: BTreeMap<CountryId, SourceValue<Score>>,
    unresolved: Vec<String>,
}

/// Risk premiums keyed by canonical country.
#[derive(Debug, Clone, Default)]
pub struct RiskTable {
    entries: BTreeMap<CountryId, SourceValue<Rate>>,
    unresolved: Vec<String>,
}

fn insert_unique<K: Ord, T>(
    map: &mut BTreeMap<K, SourceValue<T>>,
    key: K,
    value: SourceValue<T>,
    table: &str,
    describe: impl FnOnce(&K) -> String,
) -> RaivResult<()> {
    match map.entry(key) {
        Entry::Occupied(existing) => Err(RaivError::DuplicateKey {
            table: table.to_string(),
            key: format!(
                "{} (labels '{}' and '{}')",
                describe(existing.key()),
                existing.get().raw_label,
                value.raw_label
            ),
        }),
        Entry::Vacant(slot) => {
            slot.insert(value);
            Ok(())
        }
    }
}

impl ImportTable {
    pub fn load(records: &[ImportRecord], aliases: &AliasTable) -> RaivResult<Self> {
        let mut table = ImportTable::default();
        for record in records {
            // Checked before resolution so aggregate or incomplete rows
            // cannot carry an out-of-schedule year past the loader.
            if time_factor(record.year).is_none() {
                return Err(RaivError::UnrecognizedYear {
                    country: record.country.trim().to_string(),
                    year: record.year,
                });
            }
            if let Some(value) = record.import_value {
                if value < Decimal::ZERO {
                    return Err(RaivError::InvalidInput {
                        field: format!("{IMPORTS_TABLE}.import_value"),
                        reason: format!(
                            "Import value for '{}' in {} is negative ({value})",
                            record.country, record.year
                        ),
                    });
                }
            }
            let Some(country) = aliases.resolve(&record.country) else {
                table.unresolved.push((record.country.clone(), record.year));
                continue;
            };
            insert_unique(
                &mut table.entries,
                (country, record.year),
                SourceValue {
                    raw_label: record.country.clone(),
                    value: record.import_value,
                },
                IMPORTS_TABLE,
                |(c, y)| format!("{c}/{y}"),
            )?;
        }
        debug!(
            rows = table.entries.len(),
            unresolved = table.unresolved.len(),
            "imports loaded"
        );
        Ok(table)
    }

    /// Resolved rows in (country, year) order.
    pub fn iter(&self) -> impl Iterator<Item = (&CountryId, Year, &SourceValue<Money>)> {
        self.entries.iter().map(|((c, y), v)| (c, *y, v))
    }

    /// Rows whose label did not resolve (aggregates, blanks).
    pub fn unresolved(&self) -> &[(String, Year)] {
        &self.unresolved
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TimelinessTable {
    pub fn load(records: &[TimelinessRecord], aliases: &AliasTable) -> RaivResult<Self> {
        let mut table = TimelinessTable::default();
        for record in records {
            if let Some(score) = record.timeliness_score {
                if score < Decimal::ZERO {
                    return Err(RaivError::InvalidInput {
                        field: format!("{TIMELINESS_TABLE}.timeliness_score"),
                        reason: format!(
                            "Timeliness score for '{}' is negative ({score})",
                            record.country
                        ),
                    });
                }
            }
            let Some(country) = aliases.resolve(&record.country) else {
                table.unresolved.push(record.country.clone());
                continue;
            };
            insert_unique(
                &mut table.entries,
                country,
                SourceValue {
                    raw_label: record.country.clone(),
                    value: record.timeliness_score,
                },
                TIMELINESS_TABLE,
                |c| c.clone(),
            )?;
        }
        debug!(rows = table.entries.len(), "timeliness loaded");
        Ok(table)
    }

    /// Score for a canonical country; `None` when absent or null.
    pub fn score(&self, country: &str) -> Option<Score> {
        self.entries.get(country).and_then(|v| v.value)
    }

    /// Countries with a non-null score.
    pub fn countries_with_value(&self) -> impl Iterator<Item = &CountryId> {
        self.entries
            .iter()
            .filter(|(_, v)| v.value.is_some())
            .map(|(c, _)| c)
    }

    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RiskTable {
    pub fn load(records: &[RiskRecord], aliases: &AliasTable) -> RaivResult<Self> {
        let mut table = RiskTable::default();
        for record in records {
            if let Some(premium) = record.risk_premium {
                if premium < Decimal::ZERO || premium >= Decimal::ONE {
                    return Err(RaivError::InvalidInput {
                        field: format!("{RISK_TABLE}.risk_premium"),
                        reason: format!(
                            "Risk premium for '{}' must be a fraction in [0, 1), got {premium}",
                            record.country
                        ),
                    });
                }
            }
            let Some(country) = aliases.resolve(&record.country) else {
                table.unresolved.push(record.country.clone());
                continue;
            };
            insert_unique(
                &mut table.entries,
                country,
                SourceValue {
                    raw_label: record.country.clone(),
                    value: record.risk_premium,
                },
                RISK_TABLE,
                |c| c.clone(),
            )?;
        }
        debug!(rows = table.entries.len(), "risk loaded");
        Ok(table)
    }

    /// Premium for a canonical country; `None` when absent or null.
    pub fn premium(&self, country: &str) -> Option<Rate> {
        self.entries.get(country).and_then(|v| v.value)
    }

    /// Countries with a non-null premium.
    pub fn countries_with_value(&self) -> impl Iterator<Item = &CountryId> {
        self.entries
            .iter()
            .filter(|(_, v)| v.value.is_some())
            .map(|(c, _)| c)
    }

    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
