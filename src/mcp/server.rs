//! labconv MCP Server Implementation
//!
//! Implements the MCP server with all labconv tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::conversion::ConversionTable;
use crate::tools::batch;
use crate::tools::convert;
use crate::tools::labs;
use crate::tools::status::StatusTracker;

/// labconv MCP Service
#[derive(Clone)]
pub struct LabconvService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    table: Arc<ConversionTable>,
    output_dir: Option<PathBuf>,
    tool_router: ToolRouter<LabconvService>,
}

impl LabconvService {
    pub fn new(config: &Config, table: ConversionTable) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(
                config.table_source(),
                table.len(),
            ))),
            table: Arc::new(table),
            output_dir: config.output_dir.clone(),
            tool_router: Self::tool_router(),
        }
    }

    pub fn table(&self) -> &ConversionTable {
        &self.table
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))
}

// ============================================================================
// Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetLabUnitsParams {
    /// Exact lab name (case-sensitive), e.g. "Glucose"
    pub lab: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConvertLabValueParams {
    /// Exact lab name (case-sensitive), e.g. "Glucose"
    pub lab: String,
    /// Measured value, 0 or greater
    pub value: f64,
    /// Unit the value is currently in, e.g. "mmol/L"
    pub from_unit: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConvertLabCsvParams {
    /// CSV text with a header containing Lab, Value and Unit columns
    pub csv: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConvertLabCsvFileParams {
    /// Full path to the CSV file to convert
    pub file_path: String,
    /// Where to write the result (default: converted_labs.csv in the output directory or next to the input)
    pub output_path: Option<String>,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl LabconvService {
    // --- Status ---

    #[tool(description = "Get the current status of the labconv service including build info, conversion table source, and process information")]
    async fn labconv_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status();
        let json = serde_json::to_string_pretty(&status)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Get step-by-step instructions for converting lab values. Call this when unsure how to use the conversion tools.")]
    fn conversion_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::CONVERSION_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(CONVERSION_INSTRUCTIONS)]))
    }

    // --- Labs ---

    #[tool(description = "List every supported lab test with its two units and conversion multiplier")]
    fn list_labs(&self) -> Result<CallToolResult, McpError> {
        let result = labs::list_labs(&self.table);
        Ok(CallToolResult::success(vec![Content::text(to_json(&result)?)]))
    }

    #[tool(description = "Get the two units accepted for a lab test")]
    fn get_lab_units(&self, Parameters(p): Parameters<GetLabUnitsParams>) -> Result<CallToolResult, McpError> {
        let json = match labs::get_lab_units(&self.table, &p.lab) {
            Some(resp) => to_json(&resp)?,
            None => to_json(&serde_json::json!({ "error": "Unknown lab", "lab": p.lab }))?,
        };
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    // --- Conversion ---

    #[tool(description = "Convert one lab value to the lab's other unit. Returns the converted value rounded to 2 decimals, or an error (Unknown lab, Unit mismatch, Invalid value).")]
    fn convert_lab_value(&self, Parameters(p): Parameters<ConvertLabValueParams>) -> Result<CallToolResult, McpError> {
        let result = convert::convert_lab_value(&self.table, &p.lab, p.value, &p.from_unit);
        Ok(CallToolResult::success(vec![Content::text(to_json(&result)?)]))
    }

    #[tool(description = "Convert every row of CSV text with Lab, Value, Unit columns. Returns per-row results and the augmented CSV with Converted_Value and Converted_Unit columns.")]
    fn convert_lab_csv(&self, Parameters(p): Parameters<ConvertLabCsvParams>) -> Result<CallToolResult, McpError> {
        let result = batch::convert_csv_content(&self.table, &p.csv)
            .map_err(|e| McpError::internal_error(e, None))?;
        Ok(CallToolResult::success(vec![Content::text(to_json(&result)?)]))
    }

    #[tool(description = "Convert a CSV file with Lab, Value, Unit columns and write the augmented table as converted_labs.csv (UTF-8). Returns a summary and any failed rows.")]
    fn convert_lab_csv_file(&self, Parameters(p): Parameters<ConvertLabCsvFileParams>) -> Result<CallToolResult, McpError> {
        let result = batch::convert_csv_file(
            &self.table,
            &p.file_path,
            p.output_path.as_deref(),
            self.output_dir.as_deref(),
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        Ok(CallToolResult::success(vec![Content::text(to_json(&result)?)]))
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for LabconvService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "labconv".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Lab Value Converter".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Lab Value Converter (labconv) - Convert lab test results between units (e.g., mmol/L <-> mg/dL). \
                 Call conversion_instructions for a usage guide. \
                 Labs: list_labs, get_lab_units. \
                 Single value: convert_lab_value. \
                 CSV (columns Lab, Value, Unit): convert_lab_csv for inline text, convert_lab_csv_file for files. \
                 Status: labconv_status."
                    .into(),
            ),
        }
    }
}
