//! Binomial CSV ingest and dataset export.
//!
//! Turns a user-supplied CSV into a [`BinomialDataset`] for the columns named
//! by a [`ModelFormula`], and writes datasets back out for external fitters.
//!
//! Design goals:
//! - **Strict schema** for the formula's columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (row order is preserved)

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::data::{BinomialDataset, BinomialRecord, MAX_TRIALS_PER_RECORD};
use crate::domain::{DataLayout, ModelFormula};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: dataset + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub dataset: BinomialDataset,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a binomial dataset. The layout follows the formula: aggregated when
/// it names a trials column, disaggregated (0/1 response) otherwise.
pub fn read_binomial_csv(path: &Path, formula: &ModelFormula) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for col in formula.required_columns() {
        if !header_map.contains_key(&normalize_header_name(col)) {
            return Err(AppError::new(
                2,
                format!("Missing required column: `{col}` in '{}'", path.display()),
            ));
        }
    }

    let layout = if formula.trials.is_some() {
        DataLayout::Aggregated
    } else {
        DataLayout::Disaggregated
    };

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: 1-based lines, plus the header line.
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

        match parse_row(&record, &header_map, formula) {
            Ok(r) => records.push(r),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if records.is_empty() {
        return Err(AppError::new(3, "No valid rows remain after validation."));
    }

    Ok(IngestedData {
        dataset: BinomialDataset { layout, records },
        row_errors,
        rows_read,
    })
}

/// Write `dataset` with the column names of `formula`.
///
/// Column order: group, predictors, response, then trials (aggregated only).
pub fn write_dataset_csv(path: &Path, dataset: &BinomialDataset, formula: &ModelFormula) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(4, format!("Failed to create dataset CSV '{}': {e}", path.display())))?;

    let trials_col = match dataset.layout {
        DataLayout::Aggregated => Some(formula.trials.as_deref().unwrap_or("trials")),
        DataLayout::Disaggregated => None,
    };

    let mut header: Vec<&str> = vec![formula.group.as_str()];
    header.extend(formula.fixed.iter().map(String::as_str));
    header.push(formula.response.as_str());
    header.extend(trials_col);
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(4, format!("Failed to write dataset CSV header: {e}")))?;

    for r in &dataset.records {
        let mut row: Vec<String> = Vec::with_capacity(header.len());
        row.push(r.group.clone());
        row.extend(r.predictors.iter().cloned());
        row.push(r.successes.to_string());
        if trials_col.is_some() {
            row.push(r.trials.to_string());
        }
        writer
            .write_record(&row)
            .map_err(|e| AppError::new(4, format!("Failed to write dataset CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush dataset CSV: {e}")))?;
    Ok(())
}

pub(crate) fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

pub(crate) fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    formula: &ModelFormula,
) -> Result<BinomialRecord, String> {
    let group = get_required(record, header_map, &formula.group)?.to_string();
    let predictors = formula
        .fixed
        .iter()
        .map(|col| get_required(record, header_map, col).map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;

    let response = get_required(record, header_map, &formula.response)?;

    let (successes, trials) = match &formula.trials {
        Some(trials_col) => {
            let successes = parse_count(response, &formula.response)?;
            let trials = parse_count(get_required(record, header_map, trials_col)?, trials_col)?;
            if trials == 0 {
                return Err(format!("`{trials_col}` must be >= 1."));
            }
            if trials > MAX_TRIALS_PER_RECORD {
                return Err(format!("`{trials_col}` ({trials}) exceeds {MAX_TRIALS_PER_RECORD}."));
            }
            if successes > trials {
                return Err(format!(
                    "`{}` ({successes}) exceeds `{trials_col}` ({trials}).",
                    formula.response
                ));
            }
            (successes, trials)
        }
        None => (parse_binary(response, &formula.response)?, 1),
    };

    Ok(BinomialRecord {
        group,
        predictors,
        successes,
        trials,
    })
}

fn parse_count(s: &str, col: &str) -> Result<u32, String> {
    s.parse::<u32>()
        .map_err(|_| format!("Invalid `{col}` value '{s}' (expected a non-negative integer)."))
}

fn parse_binary(s: &str, col: &str) -> Result<u32, String> {
    match s.to_ascii_lowercase().as_str() {
        "0" | "false" => Ok(0),
        "1" | "true" => Ok(1),
        _ => Err(format!("Invalid `{col}` value '{s}' (expected 0/1).")),
    }
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(&normalize_header_name(name))
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}
