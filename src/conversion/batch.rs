//! Batch conversion over CSV tables
//!
//! Every row with `Lab`, `Value` and `Unit` columns is converted
//! independently; rows keep their order and original cells. Two columns are
//! added: `Converted_Value` and `Converted_Unit`. A failed row leaves
//! `Converted_Value` empty and puts the error message in `Converted_Unit`.

use std::io::{Read, Write};

use serde::Serialize;

use super::converter::{convert, format_value, Converted};
use super::error::{BatchError, ConversionError};
use super::table::ConversionTable;

pub const LAB_COLUMN: &str = "Lab";
pub const VALUE_COLUMN: &str = "Value";
pub const UNIT_COLUMN: &str = "Unit";
pub const CONVERTED_VALUE_COLUMN: &str = "Converted_Value";
pub const CONVERTED_UNIT_COLUMN: &str = "Converted_Unit";

/// Columns every input table must contain
pub const REQUIRED_COLUMNS: [&str; 3] = [LAB_COLUMN, VALUE_COLUMN, UNIT_COLUMN];

/// Default file name for converted output
pub const OUTPUT_FILE_NAME: &str = "converted_labs.csv";
/// MIME type of converted output
pub const OUTPUT_MIME_TYPE: &str = "text/csv";

/// Result of converting one row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    Converted { value: f64, unit: String },
    Failed { error_kind: String, message: String },
}

impl RowOutcome {
    fn from_result(result: Result<Converted, ConversionError>) -> Self {
        match result {
            Ok(c) => RowOutcome::Converted {
                value: c.value,
                unit: c.unit,
            },
            Err(e) => RowOutcome::Failed {
                error_kind: e.kind().to_string(),
                message: e.to_string(),
            },
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, RowOutcome::Converted { .. })
    }

    /// Cell text for `Converted_Value`
    pub fn value_cell(&self) -> String {
        match self {
            RowOutcome::Converted { value, .. } => format_value(*value),
            RowOutcome::Failed { .. } => String::new(),
        }
    }

    /// Cell text for `Converted_Unit`; carries the message on failure
    pub fn unit_cell(&self) -> &str {
        match self {
            RowOutcome::Converted { unit, .. } => unit,
            RowOutcome::Failed { message, .. } => message,
        }
    }
}

/// One converted row with the context it came from
#[derive(Debug, Clone, Serialize)]
pub struct BatchRow {
    /// 1-based data row number (header excluded)
    pub row: usize,
    pub lab: String,
    pub value: String,
    pub unit: String,
    #[serde(flatten)]
    pub outcome: RowOutcome,
}

/// The augmented table produced by a batch run
#[derive(Debug, Clone)]
pub struct BatchOutput {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
    rows: Vec<BatchRow>,
}

impl BatchOutput {
    /// Output header: input columns followed by the converted columns
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Output cells, one vector per input row
    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    pub fn rows(&self) -> &[BatchRow] {
        &self.rows
    }

    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn converted(&self) -> usize {
        self.rows.iter().filter(|r| r.outcome.is_converted()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.converted()
    }

    /// Serialize the augmented table as CSV
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), BatchError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for record in &self.records {
            wtr.write_record(record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, BatchError> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|e| BatchError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }
}

/// Column positions resolved from the input header
struct Columns {
    lab: usize,
    value: usize,
    unit: usize,
    converted_value: usize,
    converted_unit: usize,
    width: usize,
}

impl Columns {
    /// Fails with `MissingColumns` listing every required column not found
    fn resolve(headers: &mut Vec<String>) -> Result<Self, BatchError> {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| column_index(headers.as_slice(), name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(BatchError::MissingColumns(missing));
        }

        let lab = column_index(headers, LAB_COLUMN).unwrap_or_default();
        let value = column_index(headers, VALUE_COLUMN).unwrap_or_default();
        let unit = column_index(headers, UNIT_COLUMN).unwrap_or_default();

        // Existing converted columns are overwritten rather than duplicated
        let converted_value = column_index_or_append(headers, CONVERTED_VALUE_COLUMN);
        let converted_unit = column_index_or_append(headers, CONVERTED_UNIT_COLUMN);

        Ok(Self {
            lab,
            value,
            unit,
            converted_value,
            converted_unit,
            width: headers.len(),
        })
    }
}

fn column_index(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn column_index_or_append(headers: &mut Vec<String>, name: &str) -> usize {
    match column_index(headers, name) {
        Some(i) => i,
        None => {
            headers.push(name.to_string());
            headers.len() - 1
        }
    }
}

/// Convert every row of a CSV table read from `reader`
pub fn apply_to_csv<R: Read>(table: &ConversionTable, reader: R) -> Result<BatchOutput, BatchError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut headers: Vec<String> = rdr
        .headers()
        .map_err(read_error)?
        .iter()
        .map(String::from)
        .collect();
    let columns = Columns::resolve(&mut headers)?;

    let mut records = Vec::new();
    let mut rows = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let record = result.map_err(read_error)?;
        let cell = |idx: usize| record.get(idx).unwrap_or("").to_string();

        let lab = cell(columns.lab);
        let value = cell(columns.value);
        let unit = cell(columns.unit);

        let outcome = RowOutcome::from_result(convert(table, &lab, parse_value(&value), &unit));
        if let RowOutcome::Failed { message, .. } = &outcome {
            tracing::warn!(row = i + 1, lab = %lab, unit = %unit, "Row conversion failed: {}", message);
        }

        let mut cells: Vec<String> = record.iter().map(String::from).collect();
        cells.resize(columns.width, String::new());
        cells[columns.converted_value] = outcome.value_cell();
        cells[columns.converted_unit] = outcome.unit_cell().to_string();
        records.push(cells);

        rows.push(BatchRow {
            row: i + 1,
            lab,
            value,
            unit,
            outcome,
        });
    }

    let output = BatchOutput {
        headers,
        records,
        rows,
    };
    tracing::info!(
        total = output.total(),
        converted = output.converted(),
        failed = output.failed(),
        "Batch conversion finished"
    );
    Ok(output)
}

/// I/O failures from the underlying reader stay `Io`; everything else the
/// csv reader reports is a malformed table.
fn read_error(err: csv::Error) -> BatchError {
    if !err.is_io_error() {
        return BatchError::Csv(err);
    }
    match err.into_kind() {
        csv::ErrorKind::Io(e) => BatchError::Io(e),
        kind => BatchError::Io(std::io::Error::other(format!("{:?}", kind))),
    }
}

/// Convert every row of CSV text
pub fn apply_to_csv_str(table: &ConversionTable, csv_text: &str) -> Result<BatchOutput, BatchError> {
    apply_to_csv(table, csv_text.as_bytes())
}

/// Unparsable cells become NaN so the converter still reports lab and unit
/// problems first and rejects the value afterwards.
fn parse_value(text: &str) -> f64 {
    text.trim().parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ConversionTable {
        ConversionTable::builtin()
    }

    #[test]
    fn test_mixed_rows_preserve_order() {
        let input = "Lab,Value,Unit\nGlucose,5.0,mmol/L\nFoo,1,mg/dL\n";
        let out = apply_to_csv_str(&table(), input).unwrap();

        assert_eq!(
            out.headers(),
            &["Lab", "Value", "Unit", "Converted_Value", "Converted_Unit"]
        );
        assert_eq!(out.records()[0], vec!["Glucose", "5.0", "mmol/L", "90.09", "mg/dL"]);
        assert_eq!(out.records()[1], vec!["Foo", "1", "mg/dL", "", "Unknown lab"]);

        assert_eq!(out.total(), 2);
        assert_eq!(out.converted(), 1);
        assert_eq!(out.failed(), 1);

        assert_eq!(
            out.rows()[0].outcome,
            RowOutcome::Converted { value: 90.09, unit: "mg/dL".into() }
        );
        assert_eq!(
            out.rows()[1].outcome,
            RowOutcome::Failed {
                error_kind: "unknown_lab".into(),
                message: "Unknown lab".into()
            }
        );
        assert_eq!(out.rows()[1].row, 2);
        assert_eq!(out.rows()[1].lab, "Foo");
    }

    #[test]
    fn test_csv_output_text() {
        let input = "Lab,Value,Unit\nGlucose,5.0,mmol/L\nFoo,1,mg/dL\n";
        let out = apply_to_csv_str(&table(), input).unwrap();
        assert_eq!(
            out.to_csv_string().unwrap(),
            "Lab,Value,Unit,Converted_Value,Converted_Unit\n\
             Glucose,5.0,mmol/L,90.09,mg/dL\n\
             Foo,1,mg/dL,,Unknown lab\n"
        );
    }

    #[test]
    fn test_missing_unit_column() {
        let input = "Lab,Value\nGlucose,5.0\n";
        let err = apply_to_csv_str(&table(), input).unwrap_err();
        match err {
            BatchError::MissingColumns(missing) => assert_eq!(missing, vec!["Unit".to_string()]),
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_columns_checked_before_rows() {
        // The ragged second row would be a CSV error if rows were read
        let input = "Lab,Result\nGlucose,5.0\nCalcium\n";
        let err = apply_to_csv_str(&table(), input).unwrap_err();
        assert!(matches!(err, BatchError::MissingColumns(ref m) if m.len() == 2));
        assert_eq!(err.to_string(), "CSV must have columns: Lab, Value, Unit");
    }

    #[test]
    fn test_empty_input_is_missing_columns() {
        let err = apply_to_csv_str(&table(), "").unwrap_err();
        assert!(matches!(err, BatchError::MissingColumns(ref m) if m.len() == 3));
    }

    #[test]
    fn test_header_only_yields_empty_table() {
        let out = apply_to_csv_str(&table(), "Lab,Value,Unit\n").unwrap();
        assert_eq!(out.total(), 0);
        assert_eq!(
            out.to_csv_string().unwrap(),
            "Lab,Value,Unit,Converted_Value,Converted_Unit\n"
        );
    }

    #[test]
    fn test_extra_columns_and_order_preserved() {
        let input = "Patient,Unit,Lab,Value,Date\n\
                     P1,mg/dL,Creatinine,1.0,2026-01-02\n\
                     P2,mg/dL,Glucose,90.09,2026-01-03\n\
                     P3,µmol/L,Glucose,5,2026-01-04\n";
        let out = apply_to_csv_str(&table(), input).unwrap();

        assert_eq!(
            out.headers(),
            &["Patient", "Unit", "Lab", "Value", "Date", "Converted_Value", "Converted_Unit"]
        );
        assert_eq!(
            out.records()[0],
            vec!["P1", "mg/dL", "Creatinine", "1.0", "2026-01-02", "88.4", "µmol/L"]
        );
        assert_eq!(
            out.records()[1],
            vec!["P2", "mg/dL", "Glucose", "90.09", "2026-01-03", "5.0", "mmol/L"]
        );
        assert_eq!(
            out.records()[2],
            vec!["P3", "µmol/L", "Glucose", "5", "2026-01-04", "", "Unit mismatch"]
        );
    }

    #[test]
    fn test_existing_converted_columns_overwritten() {
        let input = "Lab,Value,Unit,Converted_Value,Converted_Unit\nCalcium,2.5,mmol/L,old,old\n";
        let out = apply_to_csv_str(&table(), input).unwrap();
        assert_eq!(out.headers().len(), 5);
        assert_eq!(out.records()[0], vec!["Calcium", "2.5", "mmol/L", "10.0", "mg/dL"]);
    }

    #[test]
    fn test_invalid_value_is_row_failure() {
        let input = "Lab,Value,Unit\nGlucose,abc,mmol/L\nGlucose,-2,mmol/L\nGlucose, 5 ,mmol/L\nGlucose,,mmol/L\n";
        let out = apply_to_csv_str(&table(), input).unwrap();
        assert_eq!(out.records()[0][4], "Invalid value");
        assert_eq!(out.records()[1][4], "Invalid value");
        assert_eq!(out.records()[2][3], "90.09");
        assert_eq!(out.records()[3][4], "Invalid value");
        assert_eq!(out.converted(), 1);
    }

    #[test]
    fn test_unknown_lab_wins_over_bad_value() {
        let input = "Lab,Value,Unit\nFoo,abc,mg/dL\n";
        let out = apply_to_csv_str(&table(), input).unwrap();
        assert_eq!(out.records()[0][4], "Unknown lab");
    }

    #[test]
    fn test_quoted_fields_round_trip() {
        let input = "Lab,Value,Unit,Note\nGlucose,5.0,mmol/L,\"fasting, AM\"\n";
        let out = apply_to_csv_str(&table(), input).unwrap();
        assert_eq!(out.records()[0][3], "fasting, AM");
        assert_eq!(
            out.to_csv_string().unwrap(),
            "Lab,Value,Unit,Note,Converted_Value,Converted_Unit\n\
             Glucose,5.0,mmol/L,\"fasting, AM\",90.09,mg/dL\n"
        );
    }

    #[test]
    fn test_ragged_row_fails_batch() {
        let input = "Lab,Value,Unit\nGlucose,5.0\n";
        let err = apply_to_csv_str(&table(), input).unwrap_err();
        assert!(matches!(err, BatchError::Csv(_)));
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("device unplugged"))
        }
    }

    #[test]
    fn test_reader_failure_is_io_error() {
        let err = apply_to_csv(&table(), BrokenReader).unwrap_err();
        assert!(matches!(err, BatchError::Io(_)), "got {:?}", err);

        let partial = "Lab,Value,Unit\nGlucose,5.0,mmol/L\n".as_bytes().chain(BrokenReader);
        let err = apply_to_csv(&table(), partial).unwrap_err();
        assert!(matches!(err, BatchError::Io(_)), "got {:?}", err);
        assert_eq!(err.kind(), "io");
    }

    #[test]
    fn test_invalid_utf8_is_csv_error() {
        let bytes: &[u8] = b"Lab,Value,Unit\nGlu\xffcose,5.0,mmol/L\n";
        let err = apply_to_csv(&table(), bytes).unwrap_err();
        assert!(matches!(err, BatchError::Csv(_)), "got {:?}", err);
    }

    #[test]
    fn test_row_serializes_with_context() {
        let input = "Lab,Value,Unit\nGlucose,5.0,furlongs\n";
        let out = apply_to_csv_str(&table(), input).unwrap();
        let json = serde_json::to_value(&out.rows()[0]).unwrap();
        assert_eq!(json["row"], 1);
        assert_eq!(json["lab"], "Glucose");
        assert_eq!(json["unit"], "furlongs");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error_kind"], "unit_mismatch");
        assert_eq!(json["message"], "Unit mismatch");
    }
}
