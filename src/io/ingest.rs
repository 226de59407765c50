//! CSV ingest of measurements.
//!
//! A measurement file carries any two of the three Little's Law columns. Accepted headers
//! (case-insensitive, trimmed):
//!
//! - concurrency: `concurrency`, `n`, `workers`
//! - throughput: `throughput`, `x`, `tps`
//! - latency: `latency`, `r`, `response_time`
//!
//! When more than two are present, the first available pair in the order
//! (concurrency, throughput), (concurrency, latency), (throughput, latency) is used.
//! Rows with unparsable, non-finite or non-positive values are skipped and reported.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::Measurement;
use crate::error::AppError;

const CONCURRENCY: [&str; 3] = ["concurrency", "n", "workers"];
const THROUGHPUT: [&str; 3] = ["throughput", "x", "tps"];
const LATENCY: [&str; 3] = ["latency", "r", "response_time"];

/// Which two columns were read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnPair {
    ConcurrencyThroughput,
    ConcurrencyLatency,
    ThroughputLatency,
}

impl ColumnPair {
    pub fn display_name(self) -> &'static str {
        match self {
            ColumnPair::ConcurrencyThroughput => "concurrency + throughput",
            ColumnPair::ConcurrencyLatency => "concurrency + latency",
            ColumnPair::ThroughputLatency => "throughput + latency",
        }
    }

    fn measurement(self, a: f64, b: f64) -> Measurement {
        match self {
            ColumnPair::ConcurrencyThroughput => Measurement::of_concurrency_and_throughput(a, b),
            ColumnPair::ConcurrencyLatency => Measurement::of_concurrency_and_latency(a, b),
            ColumnPair::ThroughputLatency => Measurement::of_throughput_and_latency(a, b),
        }
    }
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: measurements plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub measurements: Vec<Measurement>,
    pub columns: ColumnPair,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load measurements from a CSV file.
pub fn load_measurements(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_measurements(file)
}

/// Load measurements from any CSV reader.
pub fn read_measurements<R: Read>(input: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    let (columns, first, second) = resolve_columns(&header_map)?;

    let mut measurements = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let parsed = parse_value(&record, first).and_then(|a| Ok((a, parse_value(&record, second)?)));
        match parsed {
            Ok((a, b)) => measurements.push(columns.measurement(a, b)),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if measurements.is_empty() {
        return Err(AppError::new(3, "No valid measurements found in CSV."));
    }

    Ok(IngestedData {
        measurements,
        columns,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

/// A resolved column: its index and canonical name.
type Column = (usize, &'static str);

fn find_column(header_map: &HashMap<String, usize>, aliases: &[&'static str; 3]) -> Option<Column> {
    aliases
        .iter()
        .find_map(|alias| header_map.get(*alias).map(|&idx| (idx, aliases[0])))
}

fn resolve_columns(header_map: &HashMap<String, usize>) -> Result<(ColumnPair, Column, Column), AppError> {
    let n = find_column(header_map, &CONCURRENCY);
    let x = find_column(header_map, &THROUGHPUT);
    let r = find_column(header_map, &LATENCY);

    match (n, x, r) {
        (Some(n), Some(x), _) => Ok((ColumnPair::ConcurrencyThroughput, n, x)),
        (Some(n), None, Some(r)) => Ok((ColumnPair::ConcurrencyLatency, n, r)),
        (None, Some(x), Some(r)) => Ok((ColumnPair::ThroughputLatency, x, r)),
        _ => Err(AppError::new(
            2,
            "CSV needs two of the columns `concurrency`, `throughput`, `latency`.",
        )),
    }
}

fn parse_value(record: &StringRecord, (idx, name): Column) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing value: `{name}`"))?;
    let v = raw
        .parse::<f64>()
        .map_err(|_| format!("Invalid number for `{name}`: '{raw}'"))?;
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(format!("`{name}` must be a positive, finite number (got {raw})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_concurrency_and_throughput() {
        let csv = "concurrency,throughput\n1,955.16\n2,1878.91\n3,2688.01\n";
        let data = read_measurements(csv.as_bytes()).unwrap();
        assert_eq!(data.columns, ColumnPair::ConcurrencyThroughput);
        assert_eq!(data.rows_read, 3);
        assert!(data.row_errors.is_empty());
        assert_eq!(data.measurements[1], Measurement::of_concurrency_and_throughput(2.0, 1878.91));
    }

    #[test]
    fn aliases_bom_and_case_are_accepted() {
        let csv = "\u{feff}N , Response_Time\n3,0.6\n";
        let data = read_measurements(csv.as_bytes()).unwrap();
        assert_eq!(data.columns, ColumnPair::ConcurrencyLatency);
        assert!((data.measurements[0].throughput() - 5.0).abs() < 1e-12);

        let csv = "tps,latency\n5,0.6\n";
        let data = read_measurements(csv.as_bytes()).unwrap();
        assert_eq!(data.columns, ColumnPair::ThroughputLatency);
        assert!((data.measurements[0].concurrency() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn prefers_concurrency_and_throughput_when_all_present() {
        let csv = "latency,throughput,concurrency\n99,5,3\n";
        let data = read_measurements(csv.as_bytes()).unwrap();
        assert_eq!(data.columns, ColumnPair::ConcurrencyThroughput);
        assert!((data.measurements[0].latency() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn bad_rows_are_skipped_and_reported() {
        let csv = "concurrency,throughput\n1,100\n2,abc\n3,\n-4,10\n5,500\n";
        let data = read_measurements(csv.as_bytes()).unwrap();
        assert_eq!(data.rows_read, 5);
        assert_eq!(data.measurements.len(), 2);
        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
    }

    #[test]
    fn missing_columns_and_empty_files_fail() {
        let err = read_measurements("concurrency,foo\n1,2\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = read_measurements("concurrency,throughput\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
