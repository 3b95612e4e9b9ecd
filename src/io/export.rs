//! Export comparison tables to CSV.
//!
//! The unified export uses the store column names, so a file written by
//! `gcmp compare --export` can be read back with `gcmp store`.

use std::path::Path;

use serde::Serialize;

use crate::domain::{DataLayout, LongRow, UnifiedTable};
use crate::error::AppError;

#[derive(Serialize)]
struct ExportRow<'a> {
    package: &'a str,
    term: &'a str,
    estimate: f64,
    std_error: Option<f64>,
    conf_low: Option<f64>,
    conf_high: Option<f64>,
    layout: Option<DataLayout>,
    fit_seconds: Option<f64>,
}

/// Write the unified table, one row per (package, term).
pub fn write_unified_csv(path: &Path, table: &UnifiedTable) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    for row in &table.rows {
        let fit_seconds = table
            .packages
            .iter()
            .find(|p| p.package_id == row.package_id)
            .and_then(|p| p.fit_seconds);
        writer
            .serialize(ExportRow {
                package: &row.package_id,
                term: &row.term,
                estimate: row.estimate,
                std_error: row.std_error,
                conf_low: row.conf_low,
                conf_high: row.conf_high,
                layout: row.layout,
                fit_seconds,
            })
            .map_err(|e| AppError::new(4, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush export CSV: {e}")))
}

/// Write the long (estimate / std_error) table.
pub fn write_long_csv(path: &Path, rows: &[LongRow]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(4, format!("Failed to create long CSV '{}': {e}", path.display())))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::new(4, format!("Failed to write long CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush long CSV: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PackageSummary, TidyRow, ValueColumn};
    use crate::io::store::load_store;

    fn table() -> UnifiedTable {
        let row = |pkg: &str, est: f64, se: Option<f64>| TidyRow {
            package_id: pkg.to_string(),
            term: "(Intercept)".to_string(),
            estimate: est,
            std_error: se,
            conf_low: se.map(|s| est - 1.96 * s),
            conf_high: se.map(|s| est + 1.96 * s),
            layout: Some(DataLayout::Aggregated),
        };
        UnifiedTable {
            rows: vec![row("A", -2.0, Some(0.2)), row("B", -1.98, None)],
            packages: vec![
                PackageSummary {
                    package_id: "A".to_string(),
                    layout: Some(DataLayout::Aggregated),
                    fit_seconds: Some(0.25),
                    n_terms: 1,
                },
                PackageSummary {
                    package_id: "B".to_string(),
                    layout: Some(DataLayout::Aggregated),
                    fit_seconds: None,
                    n_terms: 1,
                },
            ],
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn unified_export_reloads_as_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unified.csv");
        write_unified_csv(&path, &table()).unwrap();

        let fits = load_store(&path).unwrap();
        assert_eq!(fits.len(), 2);
        assert_eq!(fits[0].fit_seconds, Some(0.25));
        assert_eq!(fits[1].terms[0].std_error, None);
        assert_eq!(fits[1].layout, Some(DataLayout::Aggregated));
    }

    #[test]
    fn long_export_has_variable_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.csv");
        let rows = vec![LongRow {
            package_id: "A".to_string(),
            term: "(Intercept)".to_string(),
            layout: None,
            variable: ValueColumn::StdError,
            value: Some(0.2),
        }];
        write_long_csv(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("package_id,term,layout,variable,value"));
        assert_eq!(lines.next(), Some("A,(Intercept),,std_error,0.2"));
    }
}
