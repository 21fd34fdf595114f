//! Conversion table
//!
//! Maps lab test names to the rule used to convert between their two units.
//! Built once at startup and read-only afterwards.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{TableError, TableResult};

/// value in `source_unit` * `multiplier` = value in `target_unit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRule {
    pub source_unit: String,
    pub target_unit: String,
    pub multiplier: f64,
}

impl ConversionRule {
    pub fn new(source_unit: &str, target_unit: &str, multiplier: f64) -> Self {
        Self {
            source_unit: source_unit.to_string(),
            target_unit: target_unit.to_string(),
            multiplier,
        }
    }

    /// Whether `unit` is one of the two units this rule converts between
    pub fn accepts(&self, unit: &str) -> bool {
        unit == self.source_unit || unit == self.target_unit
    }
}

/// A lab name paired with its rule, as stored in table files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabEntry {
    pub lab: String,
    #[serde(flatten)]
    pub rule: ConversionRule,
}

// ============================================================================
// Seed Table
// ============================================================================

/// mmol/L -> mg/dL for glucose
pub const GLUCOSE_MMOL_TO_MGDL: f64 = 18.0182;
/// mmol/L -> mg/dL for cholesterol
pub const CHOLESTEROL_MMOL_TO_MGDL: f64 = 38.67;
/// mg/dL -> µmol/L for creatinine
pub const CREATININE_MGDL_TO_UMOL: f64 = 88.4;
/// mmol/L -> mg/dL for calcium
pub const CALCIUM_MMOL_TO_MGDL: f64 = 4.0;

fn seed_entries() -> Vec<LabEntry> {
    vec![
        LabEntry {
            lab: "Glucose".into(),
            rule: ConversionRule::new("mmol/L", "mg/dL", GLUCOSE_MMOL_TO_MGDL),
        },
        LabEntry {
            lab: "Cholesterol".into(),
            rule: ConversionRule::new("mmol/L", "mg/dL", CHOLESTEROL_MMOL_TO_MGDL),
        },
        LabEntry {
            lab: "Creatinine".into(),
            rule: ConversionRule::new("mg/dL", "µmol/L", CREATININE_MGDL_TO_UMOL),
        },
        LabEntry {
            lab: "Calcium".into(),
            rule: ConversionRule::new("mmol/L", "mg/dL", CALCIUM_MMOL_TO_MGDL),
        },
    ]
}

// ============================================================================
// Table
// ============================================================================

/// Immutable lab -> rule registry. Lookups are exact and case-sensitive.
#[derive(Debug, Clone)]
pub struct ConversionTable {
    entries: Vec<LabEntry>,
    index: HashMap<String, usize>,
}

impl ConversionTable {
    /// The built-in table of common lab tests
    pub fn builtin() -> Self {
        // Seed entries satisfy every invariant checked by from_entries
        let entries = seed_entries();
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.lab.clone(), i))
            .collect();
        Self { entries, index }
    }

    /// Build a table, validating every rule
    pub fn from_entries(entries: Vec<LabEntry>) -> TableResult<Self> {
        let mut index = HashMap::with_capacity(entries.len());

        for (i, entry) in entries.iter().enumerate() {
            validate_entry(entry)?;
            if index.insert(entry.lab.clone(), i).is_some() {
                return Err(TableError::DuplicateLab(entry.lab.clone()));
            }
        }

        Ok(Self { entries, index })
    }

    /// Parse a JSON array of `{lab, source_unit, target_unit, multiplier}`
    pub fn from_json_str(json: &str) -> TableResult<Self> {
        let entries: Vec<LabEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// Load a JSON table file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> TableResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn lookup(&self, lab: &str) -> Option<&ConversionRule> {
        self.index.get(lab).map(|&i| &self.entries[i].rule)
    }

    /// The two units a lab accepts, source first
    pub fn units_for(&self, lab: &str) -> Option<(&str, &str)> {
        self.lookup(lab)
            .map(|rule| (rule.source_unit.as_str(), rule.target_unit.as_str()))
    }

    /// Entries in the order they were defined
    pub fn entries(&self) -> &[LabEntry] {
        &self.entries
    }

    pub fn lab_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.lab.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ConversionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn validate_entry(entry: &LabEntry) -> TableResult<()> {
    if entry.lab.is_empty() {
        return Err(TableError::EmptyLab);
    }
    if entry.rule.source_unit == entry.rule.target_unit {
        return Err(TableError::SameUnits {
            lab: entry.lab.clone(),
            unit: entry.rule.source_unit.clone(),
        });
    }
    let m = entry.rule.multiplier;
    if !m.is_finite() || m <= 0.0 {
        return Err(TableError::InvalidMultiplier {
            lab: entry.lab.clone(),
            multiplier: m,
        });
    }
    Ok(())
}
