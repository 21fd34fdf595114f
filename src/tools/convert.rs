//! Single-value conversion MCP Tools

use serde::Serialize;

use crate::conversion::{convert, display_message, ConversionTable, Direction};

/// Response for convert_lab_value. Domain failures are reported here with
/// `success: false` rather than as tool errors.
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub success: bool,
    pub lab: String,
    pub value: f64,
    pub from_unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Ready-to-show line, e.g. "Converted Value: 90.09 mg/dL"
    pub display: String,
}

/// Convert one lab value
pub fn convert_lab_value(
    table: &ConversionTable,
    lab: &str,
    value: f64,
    from_unit: &str,
) -> ConvertResponse {
    let result = convert(table, lab, value, from_unit);
    let display = display_message(&result);

    let mut resp = ConvertResponse {
        success: result.is_ok(),
        lab: lab.to_string(),
        value,
        from_unit: from_unit.to_string(),
        converted_value: None,
        converted_unit: None,
        direction: None,
        error_kind: None,
        message: None,
        display,
    };

    match result {
        Ok(c) => {
            resp.converted_value = Some(c.value);
            resp.converted_unit = Some(c.unit);
            resp.direction = Some(c.direction);
        }
        Err(e) => {
            tracing::info!(lab, from_unit, "Conversion rejected: {}", e);
            resp.error_kind = Some(e.kind().to_string());
            resp.message = Some(e.to_string());
        }
    }

    resp
}
