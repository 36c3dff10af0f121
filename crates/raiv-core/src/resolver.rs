//! Country-name reconciliation.
//!
//! Trade, logistics and risk sources label the same country differently
//! ("Korea Rep." vs "South Korea", "Viet Nam" vs "Vietnam"). Every source
//! label passes through one [`AliasTable`] before any join, so all tables
//! are keyed by the same canonical identity.
//!
//! Resolution is a single hop: an explicit alias wins, otherwise the trimmed
//! label is taken as already canonical. Aggregate rows such as `World` and
//! blank labels resolve to nothing.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::RaivError;
use crate::types::{CountryAlias, CountryId};
use crate::RaivResult;

/// Labels that denote an aggregate rather than a partner country.
pub const DEFAULT_AGGREGATE_LABELS: &[&str] = &["World"];

/// Curated mapping of non-standard trade-source labels to canonical names.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("France+Monac", "France"),
    ("Switz.Leicht", "Switzerland"),
    ("Korea Rep.", "South Korea"),
    ("Norway,Sb,JM", "Norway"),
    ("Ireland", "Republic of Ireland"),
    ("Luxemberg", "Luxembourg"),
    ("Czech Rep", "Czech Republic"),
    ("Viet Nam", "Vietnam"),
    ("TFYR Macedna", "North Macedonia"),
    ("Bosnia Herzg", "Bosnia and Herzegovina"),
    ("Antigua,Barb", "Antigua and Barbuda"),
    ("Solomon Is", "Solomon Islands"),
    ("Bahamas", "Bahamas, The"),
    ("Papua N.Guin", "Papua New Guinea"),
    ("Dem.Rp.Congo", "Democratic Republic of the Congo"),
    ("Dominican Rp", "Dominican Republic"),
    ("GuineaBissau", "Guinea-Bissau"),
    ("Russian Fed", "Russia"),
    ("Rep.Moldova", "Moldova"),
    ("Trinidad Tbg", "Trinidad and Tobago"),
    ("Lao P.Dem.R", "Laos"),
    ("Gambia", "The Gambia"),
    ("Iran-Islam.R", "Iran"),
    ("Kyrgyzstan", "Kyrgyz Republic"),
    ("Venezuela", "Venezuela, RB"),
    ("Yemen", "Yemen, Rep."),
];

/// The curated alias list as owned records.
pub fn builtin_aliases() -> Vec<CountryAlias> {
    BUILTIN_ALIASES
        .iter()
        .map(|(raw, canonical)| CountryAlias::new(*raw, *canonical))
        .collect()
}

/// Read-only lookup from raw source label to canonical country.
///
/// Construction rejects any raw label mapped to two different targets, so a
/// built table always resolves deterministically.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: BTreeMap<String, CountryId>,
    aggregates: BTreeSet<String>,
}

impl AliasTable {
    /// Build a table from explicit aliases with the default aggregate labels.
    pub fn new(aliases: &[CountryAlias]) -> RaivResult<Self> {
        let table = AliasTable {
            aliases: BTreeMap::new(),
            aggregates: DEFAULT_AGGREGATE_LABELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };
        table.with_aliases(aliases)
    }

    /// The curated alias set.
    pub fn builtin() -> RaivResult<Self> {
        Self::new(&builtin_aliases())
    }

    /// Merge further aliases, applying the same conflict check.
    pub fn with_aliases(mut self, aliases: &[CountryAlias]) -> RaivResult<Self> {
        for alias in aliases {
            self.insert(alias)?;
        }
        debug!(aliases = self.aliases.len(), "alias table built");
        Ok(self)
    }

    /// Add labels that must never resolve to a country (e.g. regional totals).
    pub fn with_aggregate_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for label in labels {
            let trimmed = label.as_ref().trim();
            if !trimmed.is_empty() {
                self.aggregates.insert(trimmed.to_string());
            }
        }
        self
    }

    fn insert(&mut self, alias: &CountryAlias) -> RaivResult<()> {
        let raw = alias.raw_label.trim();
        let target = alias.canonical_id.trim();
        if raw.is_empty() {
            return Err(RaivError::InvalidInput {
                field: "raw_label".into(),
                reason: format!("Alias for '{target}' has a blank raw label"),
            });
        }
        if target.is_empty() {
            return Err(RaivError::InvalidInput {
                field: "canonical_id".into(),
                reason: format!("Alias '{raw}' has a blank canonical target"),
            });
        }

        match self.aliases.get(raw) {
            Some(existing) if existing != target => Err(RaivError::ConflictingAlias {
                raw_label: raw.to_string(),
                first: existing.clone(),
                second: target.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.aliases.insert(raw.to_string(), target.to_string());
                Ok(())
            }
        }
    }

    /// Map a raw source label to its canonical country.
    ///
    /// Returns `None` for blank labels, aggregate labels and aliases whose
    /// target is an aggregate. Whether the resulting country exists in the
    /// other sources is the joiner's concern.
    pub fn resolve(&self, raw_label: &str) -> Option<CountryId> {
        let label = raw_label.trim();
        if label.is_empty() || self.is_aggregate(label) {
            return None;
        }
        let canonical = self
            .aliases
            .get(label)
            .cloned()
            .unwrap_or_else(|| label.to_string());
        (!self.is_aggregate(&canonical)).then_some(canonical)
    }

    pub fn is_aggregate(&self, label: &str) -> bool {
        self.aggregates.contains(label.trim())
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Aliases in raw-label order.
    pub fn aliases(&self) -> Vec<CountryAlias> {
        self.aliases
            .iter()
            .map(|(raw, canonical)| CountryAlias::new(raw.as_str(), canonical.as_str()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
