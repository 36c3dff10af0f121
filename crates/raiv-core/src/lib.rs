pub mod aggregator;
pub mod calculator;
pub mod error;
pub mod joiner;
pub mod pipeline;
pub mod resolver;
pub mod tables;
pub mod types;

#[cfg(feature = "reports")]
pub mod buckets;

#[cfg(feature = "reports")]
pub mod recommend;

pub use error::RaivError;
pub use types::*;

/// Standard result type for all RAIV operations
pub type RaivResult<T> = Result<T, RaivError>;
