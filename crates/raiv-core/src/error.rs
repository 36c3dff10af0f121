use thiserror::Error;

#[derive(Debug, Error)]
pub enum RaivError {
    #[error("Conflicting alias: '{raw_label}' maps to both '{first}' and '{second}'")]
    ConflictingAlias {
        raw_label: String,
        first: String,
        second: String,
    },

    #[error("Duplicate key in {table} table: {key}")]
    DuplicateKey { table: String, key: String },

    /// `country` holds the option name when the year came from run settings.
    #[error("Unrecognized year {year} for '{country}' (expected one of 2022, 2023, 2024)")]
    UnrecognizedYear { country: String, year: i32 },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Arithmetic overflow in {context}")]
    ArithmeticOverflow { context: String },

    #[error("Empty group: {context}")]
    EmptyGroup { context: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl RaivError {
    /// Fatal misconfiguration of the run inputs: alias conflicts, duplicate
    /// source keys, or years outside the discount schedule.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            RaivError::ConflictingAlias { .. }
                | RaivError::DuplicateKey { .. }
                | RaivError::UnrecognizedYear { .. }
        )
    }
}

impl RaivError {
    pub(crate) fn overflow(context: impl Into<String>) -> Self {
        RaivError::ArithmeticOverflow {
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for RaivError {
    fn from(e: serde_json::Error) -> Self {
        RaivError::SerializationError(e.to_string())
    }
}
