//! Lab listing MCP Tools
//!
//! Exposes the conversion table so callers can offer valid lab and unit choices.

use serde::Serialize;

use crate::conversion::{ConversionTable, LabEntry};

/// Lab summary for listing
#[derive(Debug, Serialize)]
pub struct LabSummary {
    pub lab: String,
    pub source_unit: String,
    pub target_unit: String,
    pub multiplier: f64,
}

impl From<&LabEntry> for LabSummary {
    fn from(entry: &LabEntry) -> Self {
        Self {
            lab: entry.lab.clone(),
            source_unit: entry.rule.source_unit.clone(),
            target_unit: entry.rule.target_unit.clone(),
            multiplier: entry.rule.multiplier,
        }
    }
}

/// Response for list_labs
#[derive(Debug, Serialize)]
pub struct ListLabsResponse {
    pub labs: Vec<LabSummary>,
    pub total: usize,
}

/// Response for get_lab_units
#[derive(Debug, Serialize)]
pub struct LabUnitsResponse {
    pub lab: String,
    pub units: Vec<String>,
}

/// List every lab in table order
pub fn list_labs(table: &ConversionTable) -> ListLabsResponse {
    let labs: Vec<LabSummary> = table.entries().iter().map(LabSummary::from).collect();
    let total = labs.len();
    ListLabsResponse { labs, total }
}

/// The two units accepted for a lab, source unit first
pub fn get_lab_units(table: &ConversionTable, lab: &str) -> Option<LabUnitsResponse> {
    table.units_for(lab).map(|(source, target)| LabUnitsResponse {
        lab: lab.to_string(),
        units: vec![source.to_string(), target.to_string()],
    })
}
