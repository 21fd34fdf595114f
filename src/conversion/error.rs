//! Conversion error types
//!
//! Per-request failures, whole-batch failures, and table loading failures.

use thiserror::Error;

/// Failure of a single conversion request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Lab name is not present in the conversion table
    #[error("Unknown lab")]
    UnknownLab,

    /// Stated unit matches neither unit of the lab's rule
    #[error("Unit mismatch")]
    UnitMismatch,

    /// Value is negative, non-finite, or not a number
    #[error("Invalid value")]
    InvalidValue,
}

impl ConversionError {
    /// Stable tag used in structured responses
    pub fn kind(&self) -> &'static str {
        match self {
            ConversionError::UnknownLab => "unknown_lab",
            ConversionError::UnitMismatch => "unit_mismatch",
            ConversionError::InvalidValue => "invalid_value",
        }
    }
}

/// Failure of a whole batch submission
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("CSV must have columns: Lab, Value, Unit")]
    MissingColumns(Vec<String>),

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BatchError {
    pub fn kind(&self) -> &'static str {
        match self {
            BatchError::MissingColumns(_) => "missing_columns",
            BatchError::Csv(_) => "csv",
            BatchError::Io(_) => "io",
        }
    }
}

/// Failure while building or loading a conversion table
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Failed to read conversion table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid conversion table JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lab name must not be empty")]
    EmptyLab,

    #[error("Duplicate lab '{0}'")]
    DuplicateLab(String),

    #[error("Lab '{lab}' uses the same unit '{unit}' on both sides")]
    SameUnits { lab: String, unit: String },

    #[error("Lab '{lab}' has invalid multiplier {multiplier}")]
    InvalidMultiplier { lab: String, multiplier: f64 },
}

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;
