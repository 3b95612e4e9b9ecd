//! Merging per-package results into one [`UnifiedTable`].
//!
//! Failures are contained per package: a package whose fit or extraction
//! failed is left out and recorded as a [`PackageDiagnostic`].

use std::collections::HashSet;

use crate::domain::{DataLayout, FitResult, PackageDiagnostic, PackageSummary, TidyRow, UnifiedTable};
use crate::error::FitError;
use crate::harmonize::extract::{ConfidenceSpec, FixedEffects, check_term_estimate, extract_fixed_effects};

/// One entry of the merge input: a package id and the outcome of its fit.
#[derive(Debug)]
pub struct PackageFit {
    pub package_id: String,
    pub layout: Option<DataLayout>,
    pub fit_seconds: Option<f64>,
    pub model: Result<Box<dyn FixedEffects>, FitError>,
}

impl PackageFit {
    pub fn new(package_id: impl Into<String>, model: Box<dyn FixedEffects>) -> Self {
        Self {
            package_id: package_id.into(),
            layout: None,
            fit_seconds: None,
            model: Ok(model),
        }
    }

    pub fn failed(package_id: impl Into<String>, error: FitError) -> Self {
        Self {
            package_id: package_id.into(),
            layout: None,
            fit_seconds: None,
            model: Err(error),
        }
    }

    pub fn with_layout(mut self, layout: Option<DataLayout>) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_fit_seconds(mut self, seconds: Option<f64>) -> Self {
        self.fit_seconds = seconds;
        self
    }
}

/// Extract every package in input order and concatenate the rows.
pub fn merge_results(results: &[PackageFit], confidence: &ConfidenceSpec) -> UnifiedTable {
    let mut table = UnifiedTable::default();

    for entry in results {
        let extracted = entry
            .model
            .as_ref()
            .map_err(|e| e.clone())
            .and_then(|model| extract_fixed_effects(&**model, confidence));

        match extracted {
            Ok(terms) => push_result(
                &mut table,
                FitResult {
                    package_id: entry.package_id.clone(),
                    layout: entry.layout,
                    fit_seconds: entry.fit_seconds,
                    terms,
                },
            ),
            Err(error) => table.diagnostics.push(PackageDiagnostic {
                package_id: entry.package_id.clone(),
                error,
            }),
        }
    }

    table
}

/// Append already-tidy results (e.g. from a persisted store) to `table`.
///
/// Stored terms pass the same checks as extracted ones; a package with an
/// invalid term is left out with a diagnostic.
pub fn append_results(table: &mut UnifiedTable, results: Vec<FitResult>) {
    for result in results {
        push_result(table, result);
    }
}

fn push_result(table: &mut UnifiedTable, result: FitResult) {
    let FitResult {
        package_id,
        layout,
        fit_seconds,
        terms,
    } = result;

    if table.contains_package(&package_id) {
        table.diagnostics.push(PackageDiagnostic {
            error: FitError::DuplicatePackage(package_id.clone()),
            package_id,
        });
        return;
    }

    let duplicate = {
        let mut seen = HashSet::new();
        terms
            .iter()
            .find(|t| !seen.insert(t.term.as_str()))
            .map(|t| t.term.clone())
    };
    if let Some(term) = duplicate {
        table.diagnostics.push(PackageDiagnostic {
            package_id,
            error: FitError::DuplicateTerm(term),
        });
        return;
    }

    let terms = match terms.into_iter().map(check_term_estimate).collect::<Result<Vec<_>, _>>() {
        Ok(terms) => terms,
        Err(error) => {
            table.diagnostics.push(PackageDiagnostic { package_id, error });
            return;
        }
    };

    table.packages.push(PackageSummary {
        package_id: package_id.clone(),
        layout,
        fit_seconds,
        n_terms: terms.len(),
    });

    table.rows.extend(terms.into_iter().map(|t| TidyRow {
        package_id: package_id.clone(),
        term: t.term,
        estimate: t.estimate,
        std_error: t.std_error,
        conf_low: t.conf_low,
        conf_high: t.conf_high,
        layout,
    }));
}
