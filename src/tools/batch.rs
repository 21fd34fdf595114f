//! CSV batch conversion MCP Tools
//!
//! Converts whole CSV tables, either passed inline or read from a file.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::conversion::{
    apply_to_csv, apply_to_csv_str, BatchError, BatchOutput, BatchRow, ConversionTable,
    OUTPUT_FILE_NAME, OUTPUT_MIME_TYPE,
};

/// Response for convert_lab_csv
#[derive(Debug, Serialize)]
pub struct CsvConversionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_columns: Vec<String>,
    pub total_rows: usize,
    pub converted: usize,
    pub failed: usize,
    pub rows: Vec<BatchRow>,
    /// Augmented table as CSV text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv: Option<String>,
    pub file_name: &'static str,
    pub mime_type: &'static str,
}

/// Response for convert_lab_csv_file. Only failed rows are listed.
#[derive(Debug, Serialize)]
pub struct CsvFileConversionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_columns: Vec<String>,
    pub input_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    pub total_rows: usize,
    pub converted: usize,
    pub failed: usize,
    pub failures: Vec<BatchRow>,
}

fn summary_message(output: &BatchOutput) -> String {
    format!(
        "Converted {} of {} rows ({} failed)",
        output.converted(),
        output.total(),
        output.failed()
    )
}

fn missing_columns(err: &BatchError) -> Vec<String> {
    match err {
        BatchError::MissingColumns(cols) => cols.clone(),
        _ => Vec::new(),
    }
}

/// Convert CSV text with `Lab`, `Value`, `Unit` columns
pub fn convert_csv_content(
    table: &ConversionTable,
    csv_text: &str,
) -> Result<CsvConversionResponse, String> {
    match apply_to_csv_str(table, csv_text) {
        Ok(output) => {
            let csv = output
                .to_csv_string()
                .map_err(|e| format!("Failed to write CSV: {}", e))?;
            Ok(CsvConversionResponse {
                success: true,
                message: summary_message(&output),
                error_kind: None,
                missing_columns: Vec::new(),
                total_rows: output.total(),
                converted: output.converted(),
                failed: output.failed(),
                rows: output.rows().to_vec(),
                csv: Some(csv),
                file_name: OUTPUT_FILE_NAME,
                mime_type: OUTPUT_MIME_TYPE,
            })
        }
        Err(BatchError::Io(e)) => Err(format!("Failed to read CSV: {}", e)),
        Err(e) => Ok(CsvConversionResponse {
            success: false,
            message: e.to_string(),
            error_kind: Some(e.kind().to_string()),
            missing_columns: missing_columns(&e),
            total_rows: 0,
            converted: 0,
            failed: 0,
            rows: Vec::new(),
            csv: None,
            file_name: OUTPUT_FILE_NAME,
            mime_type: OUTPUT_MIME_TYPE,
        }),
    }
}

/// Where converted output goes: the explicit path, else `converted_labs.csv`
/// in the output directory, else next to the input file.
pub fn resolve_output_path(
    input_path: &Path,
    output_path: Option<&Path>,
    output_dir: Option<&Path>,
) -> PathBuf {
    if let Some(path) = output_path {
        return path.to_path_buf();
    }
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input_path.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(OUTPUT_FILE_NAME)
}

/// Convert a CSV file and write the augmented table as UTF-8 CSV
pub fn convert_csv_file(
    table: &ConversionTable,
    input_path: &str,
    output_path: Option<&str>,
    output_dir: Option<&Path>,
) -> Result<CsvFileConversionResponse, String> {
    let input = Path::new(input_path);
    let file = File::open(input)
        .map_err(|e| format!("Failed to open file '{}': {}", input_path, e))?;

    let output = match apply_to_csv(table, file) {
        Ok(output) => output,
        Err(BatchError::Io(e)) => {
            return Err(format!("Failed to read file '{}': {}", input_path, e));
        }
        Err(e) => {
            return Ok(CsvFileConversionResponse {
                success: false,
                message: e.to_string(),
                error_kind: Some(e.kind().to_string()),
                missing_columns: missing_columns(&e),
                input_path: input_path.to_string(),
                output_path: None,
                total_rows: 0,
                converted: 0,
                failed: 0,
                failures: Vec::new(),
            });
        }
    };

    let dest = resolve_output_path(input, output_path.map(Path::new), output_dir);
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create directory '{}': {}", parent.display(), e))?;
    }
    let out_file = File::create(&dest)
        .map_err(|e| format!("Failed to create file '{}': {}", dest.display(), e))?;
    output
        .write_csv(out_file)
        .map_err(|e| format!("Failed to write file '{}': {}", dest.display(), e))?;

    tracing::info!(input = %input.display(), output = %dest.display(), "Wrote converted CSV");

    let failures: Vec<BatchRow> = output
        .rows()
        .iter()
        .filter(|r| !r.outcome.is_converted())
        .cloned()
        .collect();

    Ok(CsvFileConversionResponse {
        success: true,
        message: summary_message(&output),
        error_kind: None,
        missing_columns: Vec::new(),
        input_path: input_path.to_string(),
        output_path: Some(dest.display().to_string()),
        total_rows: output.total(),
        converted: output.converted(),
        failed: output.failed(),
        failures,
    })
}
