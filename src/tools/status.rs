//! labconv Status Tool
//!
//! Provides runtime status information about the labconv service.

use serde::Serialize;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;

/// Lab conversion instructions for AI assistants
pub const CONVERSION_INSTRUCTIONS: &str = r#"
# Lab Value Conversion Instructions

This guide explains how to convert lab test results with the Lab Value Converter (labconv) tools.

## Overview

Each supported lab test has exactly two units and one multiplier:

**value in source unit × multiplier = value in target unit**

Conversions work in both directions. State the unit the value is currently in;
the result comes back in the other unit, rounded to 2 decimal places
(halves round up).

---

## Step 1: Check Supported Labs

**Tool:** `list_labs`
- Returns every lab with its source unit, target unit and multiplier
- Lab names are case-sensitive: use "Glucose", not "glucose"

**Tool:** `get_lab_units`
- Returns the two units accepted for one lab

## Step 2: Convert a Single Value

**Tool:** `convert_lab_value`
- `lab`: exact lab name (e.g., "Glucose")
- `value`: the measured value (must be 0 or greater)
- `from_unit`: the unit the value is in (e.g., "mmol/L")

**Example:**
- Input: lab "Glucose", value 5.0, from_unit "mmol/L"
- Output: `Converted Value: 90.09 mg/dL`

## Step 3: Convert Many Values (CSV)

The CSV must have a header with the columns **Lab, Value, Unit**. Other
columns are kept as they are.

**Tool:** `convert_lab_csv` - pass the CSV text directly
**Tool:** `convert_lab_csv_file` - pass a file path; writes `converted_labs.csv`

Two columns are added to every row:
- `Converted_Value` - the converted number (empty if the row failed)
- `Converted_Unit` - the new unit, or the error message if the row failed

---

## Errors

| Message | Meaning |
|---------|---------|
| Unknown lab | The lab name is not in the table |
| Unit mismatch | The unit is neither of the lab's two units |
| Invalid value | The value is negative or not a number |
| CSV must have columns: Lab, Value, Unit | A required column is missing; nothing was converted |

A failed row never stops the rest of a CSV from converting.
"#;

/// Runtime status of the labconv service
#[derive(Debug, Clone, Serialize)]
pub struct LabconvStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Conversion table information
    pub table_source: String,
    pub lab_count: usize,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    table_source: String,
    lab_count: usize,
}

impl StatusTracker {
    pub fn new(table_source: String, lab_count: usize) -> Self {
        Self {
            start_time: Instant::now(),
            table_source,
            lab_count,
        }
    }

    /// Get the current status
    pub fn get_status(&self) -> LabconvStatus {
        let build_info = BuildInfo::current();

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        LabconvStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            table_source: self.table_source.clone(),
            lab_count: self.lab_count,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
