//! Runtime configuration
//!
//! Read once from the environment at startup.

use std::path::PathBuf;

use crate::conversion::{ConversionTable, TableResult};

/// Path to a JSON conversion table; the built-in table is used when unset
pub const TABLE_PATH_VAR: &str = "LABCONV_TABLE_PATH";
/// Directory for converted CSV files; defaults to the input file's directory
pub const OUTPUT_DIR_VAR: &str = "LABCONV_OUTPUT_DIR";
/// Log directive applied on top of RUST_LOG
pub const DEFAULT_LOG_DIRECTIVE: &str = "labconv=info";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub table_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        };
        Self {
            table_path: path(TABLE_PATH_VAR),
            output_dir: path(OUTPUT_DIR_VAR),
        }
    }

    /// Load the configured conversion table
    pub fn load_table(&self) -> TableResult<ConversionTable> {
        match &self.table_path {
            Some(path) => {
                let table = ConversionTable::from_json_file(path)?;
                tracing::info!(path = %path.display(), labs = table.len(), "Loaded conversion table");
                Ok(table)
            }
            None => {
                let table = ConversionTable::builtin();
                tracing::info!(labs = table.len(), "Using built-in conversion table");
                Ok(table)
            }
        }
    }

    /// Human-readable description of where the table comes from
    pub fn table_source(&self) -> String {
        match &self.table_path {
            Some(path) => path.display().to_string(),
            None => "builtin".to_string(),
        }
    }
}
