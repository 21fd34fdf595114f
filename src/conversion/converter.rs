//! Lab value conversion
//!
//! Applies a table rule in whichever direction the stated unit calls for.
//! Arithmetic is done in `Decimal` and rounded half-up to two places so
//! results do not depend on binary float rounding.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::error::ConversionError;
use super::table::ConversionTable;

/// Decimal places kept in converted values
pub const RESULT_DECIMAL_PLACES: u32 = 2;

/// Which way a rule was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// source unit -> target unit (multiply)
    Forward,
    /// target unit -> source unit (divide)
    Inverse,
}

/// A single value to convert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub lab: String,
    pub value: f64,
    pub from_unit: String,
}

/// A successful conversion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Converted {
    pub value: f64,
    pub unit: String,
    pub direction: Direction,
}

pub type ConversionResult = Result<Converted, ConversionError>;

impl ConversionRequest {
    pub fn new(lab: &str, value: f64, from_unit: &str) -> Self {
        Self {
            lab: lab.to_string(),
            value,
            from_unit: from_unit.to_string(),
        }
    }

    pub fn convert(&self, table: &ConversionTable) -> ConversionResult {
        convert(table, &self.lab, self.value, &self.from_unit)
    }
}

/// Convert `value` stated in `from_unit` to the other unit of `lab`.
///
/// Lab lookup happens first, so an unknown lab is reported even when the
/// unit is also wrong.
pub fn convert(
    table: &ConversionTable,
    lab: &str,
    value: f64,
    from_unit: &str,
) -> ConversionResult {
    let rule = table.lookup(lab).ok_or(ConversionError::UnknownLab)?;

    let (direction, unit) = if from_unit == rule.source_unit {
        (Direction::Forward, &rule.target_unit)
    } else if from_unit == rule.target_unit {
        (Direction::Inverse, &rule.source_unit)
    } else {
        return Err(ConversionError::UnitMismatch);
    };

    if !value.is_finite() || value < 0.0 {
        return Err(ConversionError::InvalidValue);
    }

    // Decimal covers magnitudes up to ~7.9e28; beyond that use f64
    let rounded = match convert_decimal(value, rule.multiplier, direction) {
        Some(v) => v,
        None => convert_float(value, rule.multiplier, direction)?,
    };

    tracing::debug!(lab, value, from_unit, result = rounded, to_unit = %unit, "Converted lab value");

    Ok(Converted {
        value: rounded,
        unit: unit.clone(),
        direction,
    })
}

/// Exact decimal conversion rounded half-up. `None` when a value does not
/// fit in `Decimal` or the arithmetic overflows.
fn convert_decimal(value: f64, multiplier: f64, direction: Direction) -> Option<f64> {
    let amount = to_decimal(value)?;
    let factor = to_decimal(multiplier)?;
    let raw = match direction {
        Direction::Forward => amount.checked_mul(factor),
        Direction::Inverse => amount.checked_div(factor),
    }?;
    raw.round_dp_with_strategy(RESULT_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
}

/// Shortest round-trip text keeps literals like 18.0182 exact in Decimal.
fn to_decimal(value: f64) -> Option<Decimal> {
    value
        .to_string()
        .parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_f64(value))
}

/// Binary float conversion for magnitudes `Decimal` cannot hold
fn convert_float(value: f64, multiplier: f64, direction: Direction) -> Result<f64, ConversionError> {
    let raw = match direction {
        Direction::Forward => value * multiplier,
        Direction::Inverse => value / multiplier,
    };
    if !raw.is_finite() {
        return Err(ConversionError::InvalidValue);
    }
    Ok(round_half_up(raw))
}

/// Half-up rounding to two places. Above 1e15 an f64 has no hundredths left
/// to round.
fn round_half_up(raw: f64) -> f64 {
    if raw.abs() >= 1e15 {
        raw
    } else {
        (raw * 100.0).round() / 100.0
    }
}

/// Format a number the way results are displayed and written to CSV:
/// whole numbers keep one decimal place ("4.0"), others use the shortest
/// representation ("90.09").
pub fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// User-facing line for a single conversion
pub fn display_message(result: &ConversionResult) -> String {
    match result {
        Ok(c) => format!("Converted Value: {} {}", format_value(c.value), c.unit),
        Err(e) => format!("Error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ConversionTable {
        ConversionTable::builtin()
    }

    #[test]
    fn test_glucose_forward() {
        let c = convert(&table(), "Glucose", 5.0, "mmol/L").unwrap();
        assert_eq!(c.value, 90.09);
        assert_eq!(c.unit, "mg/dL");
        assert_eq!(c.direction, Direction::Forward);
    }

    #[test]
    fn test_glucose_inverse() {
        let c = convert(&table(), "Glucose", 90.09, "mg/dL").unwrap();
        assert_eq!(c.value, 5.0);
        assert_eq!(c.unit, "mmol/L");
        assert_eq!(c.direction, Direction::Inverse);
    }

    #[test]
    fn test_creatinine_forward() {
        // 88.4 * 88.4 = 7814.56
        let c = convert(&table(), "Creatinine", 88.4, "mg/dL").unwrap();
        assert_eq!(c.value, 7814.56);
        assert_eq!(c.unit, "µmol/L");
    }

    #[test]
    fn test_creatinine_inverse() {
        let c = convert(&table(), "Creatinine", 88.4, "µmol/L").unwrap();
        assert_eq!(c.value, 1.0);
        assert_eq!(c.unit, "mg/dL");
    }

    #[test]
    fn test_cholesterol_both_directions() {
        let fwd = convert(&table(), "Cholesterol", 5.2, "mmol/L").unwrap();
        assert_eq!(fwd.value, 201.08);
        let inv = convert(&table(), "Cholesterol", 200.0, "mg/dL").unwrap();
        assert_eq!(inv.value, 5.17);
    }

    #[test]
    fn test_calcium_both_directions() {
        assert_eq!(convert(&table(), "Calcium", 2.5, "mmol/L").unwrap().value, 10.0);
        assert_eq!(convert(&table(), "Calcium", 10.0, "mg/dL").unwrap().value, 2.5);
    }

    #[test]
    fn test_zero_value() {
        let c = convert(&table(), "Glucose", 0.0, "mg/dL").unwrap();
        assert_eq!(c.value, 0.0);
        assert_eq!(c.unit, "mmol/L");
    }

    #[test]
    fn test_rounds_half_up() {
        // 0.00125 * 4 = 0.005 exactly; half-even would give 0.00
        assert_eq!(convert(&table(), "Calcium", 0.00125, "mmol/L").unwrap().value, 0.01);
        // 0.02 / 4 = 0.005
        assert_eq!(convert(&table(), "Calcium", 0.02, "mg/dL").unwrap().value, 0.01);
        // 0.125 * 4 = 0.5, already two places
        assert_eq!(convert(&table(), "Calcium", 0.125, "mmol/L").unwrap().value, 0.5);
    }

    #[test]
    fn test_unknown_lab() {
        let err = convert(&table(), "NotALab", 5.0, "mg/dL").unwrap_err();
        assert_eq!(err, ConversionError::UnknownLab);
        assert_eq!(err.to_string(), "Unknown lab");
    }

    #[test]
    fn test_unknown_lab_reported_before_unit() {
        let err = convert(&table(), "glucose", 5.0, "furlongs").unwrap_err();
        assert_eq!(err, ConversionError::UnknownLab);
    }

    #[test]
    fn test_unit_mismatch() {
        let err = convert(&table(), "Glucose", 5.0, "µmol/L").unwrap_err();
        assert_eq!(err, ConversionError::UnitMismatch);
        assert_eq!(err.to_string(), "Unit mismatch");
    }

    #[test]
    fn test_unit_match_is_exact() {
        let err = convert(&table(), "Glucose", 5.0, "MMOL/L").unwrap_err();
        assert_eq!(err, ConversionError::UnitMismatch);
    }

    #[test]
    fn test_invalid_values() {
        for v in [-1.0, f64::NAN, f64::INFINITY] {
            let err = convert(&table(), "Glucose", v, "mmol/L").unwrap_err();
            assert_eq!(err, ConversionError::InvalidValue);
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        let rel = ((actual - expected) / expected).abs();
        assert!(rel < 1e-12, "{} vs {}", actual, expected);
    }

    #[test]
    fn test_large_values_convert() {
        let t = table();
        for v in [1e27, 5e27, 1e29, 1e300] {
            let fwd = convert(&t, "Glucose", v, "mmol/L").unwrap();
            assert_eq!(fwd.unit, "mg/dL");
            assert_close(fwd.value, v * 18.0182);

            let inv = convert(&t, "Creatinine", v, "µmol/L").unwrap();
            assert_eq!(inv.unit, "mg/dL");
            assert_close(inv.value, v / 88.4);
        }
    }

    #[test]
    fn test_overflow_to_infinity_is_invalid() {
        let err = convert(&table(), "Creatinine", f64::MAX, "mg/dL").unwrap_err();
        assert_eq!(err, ConversionError::InvalidValue);
    }

    #[test]
    fn test_round_half_up_float() {
        assert_eq!(round_half_up(2.125), 2.13);
        assert_eq!(round_half_up(1.004), 1.0);
        assert_eq!(round_half_up(1e20), 1e20);
    }

    #[test]
    fn test_every_lab_forward_and_inverse() {
        let t = table();
        for entry in t.entries() {
            let rule = &entry.rule;
            for v in [0.0, 1.0, 3.7, 42.5] {
                let fwd = convert(&t, &entry.lab, v, &rule.source_unit).unwrap();
                assert_eq!(fwd.unit, rule.target_unit);
                assert!((fwd.value - v * rule.multiplier).abs() <= 0.005 + 1e-9);

                let inv = convert(&t, &entry.lab, v, &rule.target_unit).unwrap();
                assert_eq!(inv.unit, rule.source_unit);
                assert!((inv.value - v / rule.multiplier).abs() <= 0.005 + 1e-9);
            }
        }
    }

    #[test]
    fn test_forward_then_back_within_tolerance() {
        let t = table();
        for entry in t.entries() {
            for v in [0.0, 0.5, 1.0, 5.5, 12.34, 100.0, 250.75] {
                let fwd = convert(&t, &entry.lab, v, &entry.rule.source_unit).unwrap();
                let back = convert(&t, &entry.lab, fwd.value, &fwd.unit).unwrap();
                assert_eq!(back.unit, entry.rule.source_unit);
                assert!(
                    (back.value - v).abs() <= 0.01 + 1e-9,
                    "{} {} -> {} -> {}",
                    entry.lab,
                    v,
                    fwd.value,
                    back.value
                );
            }
        }
    }

    #[test]
    fn test_custom_table() {
        let custom = ConversionTable::from_json_str(
            r#"[{"lab": "Urea", "source_unit": "mmol/L", "target_unit": "mg/dL", "multiplier": 2.8}]"#,
        )
        .unwrap();
        let c = convert(&custom, "Urea", 5.0, "mmol/L").unwrap();
        assert_eq!(c.value, 14.0);
        assert_eq!(convert(&custom, "Glucose", 5.0, "mmol/L"), Err(ConversionError::UnknownLab));
    }

    #[test]
    fn test_request_convert() {
        let req = ConversionRequest::new("Glucose", 5.0, "mmol/L");
        assert_eq!(req.convert(&table()).unwrap().value, 90.09);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(90.09), "90.09");
        assert_eq!(format_value(4.0), "4.0");
        assert_eq!(format_value(0.0), "0.0");
        assert_eq!(format_value(7814.56), "7814.56");
    }

    #[test]
    fn test_display_message() {
        let t = table();
        assert_eq!(
            display_message(&convert(&t, "Glucose", 5.0, "mmol/L")),
            "Converted Value: 90.09 mg/dL"
        );
        assert_eq!(
            display_message(&convert(&t, "Calcium", 2.5, "mmol/L")),
            "Converted Value: 10.0 mg/dL"
        );
        assert_eq!(
            display_message(&convert(&t, "NotALab", 5.0, "mg/dL")),
            "Error: Unknown lab"
        );
    }
}
