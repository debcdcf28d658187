//! CSV ingest.
//!
//! Turns a header-driven CSV (`x`, `y`, optional `yerr`) into raw sample
//! columns for the fitter.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation**: unparsable cells become NaN and are reported,
//!   so cleaning drops them through the same path as any other non-finite value
//! - **No fitting logic here**

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::error::AppError;

/// Accepted header spellings for the uncertainty column.
const YERR_COLUMNS: [&str; 3] = ["yerr", "y_err", "sigma"];

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Raw columns as read; non-finite entries are left for cleaning to drop.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub yerr: Option<Vec<f64>>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl IngestedData {
    /// Rows where every present column parsed to a finite number.
    pub fn rows_usable(&self) -> usize {
        (0..self.x.len())
            .filter(|&i| {
                self.x[i].is_finite()
                    && self.y[i].is_finite()
                    && self.yerr.as_ref().is_none_or(|e| e[i].is_finite())
            })
            .count()
    }
}

pub fn load_samples(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_samples(file)
}

pub fn read_samples<R: Read>(source: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let x_idx = required_column(&header_map, "x")?;
    let y_idx = required_column(&header_map, "y")?;
    let yerr_idx = YERR_COLUMNS.iter().find_map(|name| header_map.get(*name).copied());

    let mut data = IngestedData {
        x: Vec::new(),
        y: Vec::new(),
        yerr: yerr_idx.map(|_| Vec::new()),
        row_errors: Vec::new(),
        rows_read: 0,
    };

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line; CSV lines are 1-based.
        let line = idx + 2;
        data.rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                data.row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        data.x.push(parse_cell(&record, x_idx, "x", line, &mut data.row_errors));
        data.y.push(parse_cell(&record, y_idx, "y", line, &mut data.row_errors));
        if let (Some(col), Some(yerr)) = (yerr_idx, data.yerr.as_mut()) {
            yerr.push(parse_cell(&record, col, "yerr", line, &mut data.row_errors));
        }
    }

    if data.rows_read == 0 {
        return Err(AppError::new(3, "CSV contains no data rows."));
    }
    Ok(data)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn required_column(header_map: &HashMap<String, usize>, name: &str) -> Result<usize, AppError> {
    header_map
        .get(name)
        .copied()
        .ok_or_else(|| AppError::new(2, format!("Missing required column: `{name}`")))
}

/// Parse one cell; failures are recorded and yield NaN.
fn parse_cell(
    record: &StringRecord,
    idx: usize,
    name: &str,
    line: usize,
    errors: &mut Vec<RowError>,
) -> f64 {
    let raw = record.get(idx).map(str::trim).unwrap_or("");
    match raw.parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            errors.push(RowError {
                line,
                message: format!("Invalid `{name}` value '{raw}'"),
            });
            f64::NAN
        }
    }
}
