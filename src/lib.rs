// PhotonFlat - packed row store and hash aggregation core
// Per-block storage for the PhotonDB analytical executor

#![warn(rust_2018_idioms)]

pub mod aggregate;
pub mod config;
pub mod flat;
pub mod hash;
pub mod memory;
pub mod metrics;
pub mod types;

// Re-exports for convenience
pub use aggregate::{AggregateSpec, Aggregator, AggregatorRegistry, Sketch, Sketcher};
pub use config::EngineConfig;
pub use flat::{FlatBuffer, FlatRow};
pub use hash::{HashFlat, Update};
pub use memory::{ExtendableSlice, PagedSlice, Pool};
pub use types::{Column, Field, Fields, Kind, OwnedRow, RowData, Schema, Value};

/// PhotonFlat error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Unsupported type: {0}")]
        UnsupportedType(String),

        #[error("Contract violation: {0}")]
        ContractViolation(String),

        #[error("Corrupted buffer: {0}")]
        Corrupted(String),

        #[error("Compression error: {0}")]
        Compression(String),

        #[error("Aggregate error: {0}")]
        Aggregate(String),

        #[error("Configuration error: {0}")]
        Config(String),
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
