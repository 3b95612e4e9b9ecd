//! Shared comparison pipeline used by the `compare` and `store` commands.
//!
//! dataset -> staged CSV per layout -> fit each package (timed) -> merge ->
//! append stores -> derived views (long table, consensus, relative std error)
//!
//! Front-ends only deal with presentation.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::{CompareConfig, DatasetSource};
use crate::data::{BinomialDataset, MAX_DISAGGREGATED_ROWS, cbpp};
use crate::domain::{DataLayout, ModelFormula, UnifiedTable};
use crate::error::AppError;
use crate::harmonize::{ConfidenceSpec, PackageFit, append_results, merge_results};
use crate::io::{load_store, read_binomial_csv, write_dataset_csv};
use crate::models::FitRequest;
use crate::report::ComparisonReport;

/// All computed outputs of a single `gcmp compare` run.
#[derive(Debug, Clone)]
pub struct CompareRun {
    pub formula: ModelFormula,
    pub report: ComparisonReport,
}

/// Execute the full comparison described by `config`.
pub fn run_compare(config: &CompareConfig) -> Result<CompareRun, AppError> {
    let formula = config.formula()?;

    let fits = if config.packages.is_empty() {
        Vec::new()
    } else {
        let dataset = load_dataset(config, &formula)?;
        let work_dir = config.resolve(&config.work_dir);
        fs::create_dir_all(&work_dir)
            .map_err(|e| AppError::new(4, format!("Failed to create work dir '{}': {e}", work_dir.display())))?;
        let staged = stage_layouts(config, &dataset, &formula, &work_dir)?;
        fit_packages(config, &formula, &staged)
    };

    let confidence = ConfidenceSpec {
        conf_int: config.conf_int,
        level: config.conf_level,
    };
    let mut table = merge_results(&fits, &confidence);

    let stores: Vec<PathBuf> = config.stores.iter().map(|s| config.resolve(&s.path)).collect();
    load_stores_into(&mut table, &stores)?;

    let exclude: HashSet<String> = config.exclude_from_long.iter().cloned().collect();
    let report = finish(table, config.trim, &exclude)?;
    Ok(CompareRun { formula, report })
}

/// Compare persisted tables only.
pub fn run_store(paths: &[PathBuf], trim: f64, exclude: &HashSet<String>) -> Result<ComparisonReport, AppError> {
    let mut table = UnifiedTable::default();
    load_stores_into(&mut table, paths)?;
    finish(table, trim, exclude)
}

fn load_dataset(config: &CompareConfig, formula: &ModelFormula) -> Result<BinomialDataset, AppError> {
    match &config.dataset.source {
        DatasetSource::Cbpp => {
            info!("using built-in CBPP dataset");
            Ok(cbpp())
        }
        DatasetSource::Csv(path) => {
            let path = config.resolve(path);
            let ingested = read_binomial_csv(&path, formula)?;
            for e in &ingested.row_errors {
                warn!(line = e.line, "skipping row: {}", e.message);
            }
            info!(
                path = %path.display(),
                rows = ingested.dataset.records.len(),
                skipped = ingested.row_errors.len(),
                "loaded dataset"
            );
            Ok(ingested.dataset)
        }
    }
}

/// Write the dataset once per layout some package needs.
fn stage_layouts(
    config: &CompareConfig,
    dataset: &BinomialDataset,
    formula: &ModelFormula,
    work_dir: &Path,
) -> Result<Vec<(DataLayout, PathBuf)>, AppError> {
    let mut staged: Vec<(DataLayout, PathBuf)> = Vec::new();
    for package in &config.packages {
        if staged.iter().any(|(l, _)| *l == package.layout) {
            continue;
        }
        if package.layout == DataLayout::Disaggregated && dataset.total_trials() > MAX_DISAGGREGATED_ROWS {
            return Err(AppError::new(
                2,
                format!(
                    "Dataset has {} trials; the disaggregated layout is limited to {MAX_DISAGGREGATED_ROWS} rows.",
                    dataset.total_trials()
                ),
            ));
        }
        let path = work_dir.join(format!("data_{}.csv", package.layout.label()));
        let data = dataset.to_layout(package.layout);
        write_dataset_csv(&path, &data, &formula.for_layout(package.layout))?;
        debug!(layout = %package.layout, rows = data.records.len(), path = %path.display(), "staged dataset");
        staged.push((package.layout, path));
    }
    Ok(staged)
}

fn fit_packages(config: &CompareConfig, formula: &ModelFormula, staged: &[(DataLayout, PathBuf)]) -> Vec<PackageFit> {
    let mut fits = Vec::with_capacity(config.packages.len());

    for package in &config.packages {
        let data_path = staged
            .iter()
            .find(|(l, _)| *l == package.layout)
            .map(|(_, p)| p.clone())
            .unwrap_or_default();
        let request = FitRequest {
            package_id: package.id.clone(),
            formula: formula.for_layout(package.layout),
            approximation: package.approximation,
            layout: package.layout,
            data_path,
        };
        let fitter = package.backend.build(&config.base_dir);

        let start = Instant::now();
        let outcome = fitter.fit(&request);
        let seconds = start.elapsed().as_secs_f64();

        let fit = match outcome {
            Ok(model) => {
                info!(
                    package = %package.id,
                    backend = fitter.backend_name(),
                    approx = %package.approximation,
                    layout = %package.layout,
                    seconds,
                    "fit finished"
                );
                PackageFit::new(package.id.clone(), model)
            }
            Err(err) => PackageFit::failed(package.id.clone(), err),
        };
        fits.push(fit.with_layout(Some(package.layout)).with_fit_seconds(Some(seconds)));
    }
    fits
}

fn load_stores_into(table: &mut UnifiedTable, paths: &[PathBuf]) -> Result<(), AppError> {
    for path in paths {
        let results = load_store(path)?;
        info!(path = %path.display(), packages = results.len(), "loaded store");
        append_results(table, results);
    }
    Ok(())
}

fn finish(table: UnifiedTable, trim: f64, exclude: &HashSet<String>) -> Result<ComparisonReport, AppError> {
    for d in &table.diagnostics {
        warn!(package = %d.package_id, "omitted from comparison: {}", d.error);
    }
    if table.rows.is_empty() {
        return Err(AppError::new(3, "Nothing to compare: every package failed or no rows were loaded."));
    }
    for id in exclude.iter().filter(|id| !table.contains_package(id)) {
        warn!(package = %id, "excluded package is not in the table");
    }
    Ok(ComparisonReport::build(table, trim, exclude))
}
