//! Lab value conversion module
//!
//! Conversion table, single-value converter, and CSV batch application.

pub mod batch;
pub mod converter;
pub mod error;
pub mod table;

pub use batch::{
    apply_to_csv, apply_to_csv_str, BatchOutput, BatchRow, RowOutcome, OUTPUT_FILE_NAME,
    OUTPUT_MIME_TYPE, REQUIRED_COLUMNS,
};
pub use converter::{
    convert, display_message, format_value, ConversionRequest, ConversionResult, Converted,
    Direction,
};
pub use error::{BatchError, ConversionError, TableError, TableResult};
pub use table::{ConversionRule, ConversionTable, LabEntry};
