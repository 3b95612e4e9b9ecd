//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - runs the comparison pipeline
//! - prints reports/plots and writes optional exports

use std::collections::HashSet;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{Cli, Command, CompareArgs, DataArgs, StoreArgs};
use crate::config::{CompareConfig, PlotConfig};
use crate::data::{cbpp, cbpp_formula};
use crate::error::AppError;
use crate::report::ComparisonReport;

pub mod pipeline;

/// Entry point for the `gcmp` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env file is fine; GCMP_CONFIG may come from the real environment.
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Compare(args) => handle_compare(args),
        Command::Store(args) => handle_store(args),
        Command::Data(args) => handle_data(args),
    }
}

fn init_tracing() {
    // Logs go to stderr so stdout stays clean for reports.
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "glmm_compare=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

fn handle_compare(args: CompareArgs) -> Result<(), AppError> {
    let mut config = CompareConfig::load(&args.config)?;
    if let Some(width) = args.width {
        config.plot.width = width;
    }
    if let Some(height) = args.height {
        config.plot.height = height;
    }
    config.plot.validate()?;

    let run = pipeline::run_compare(&config)?;
    println!(
        "{}",
        crate::report::format_run_summary(&run.report, Some(&run.formula), Some(config.conf_level))
    );
    print_report(&run.report, &config.plot, !args.no_plot);

    if let Some(path) = &args.export {
        crate::io::write_unified_csv(path, &run.report.table)?;
        info!(path = %path.display(), "wrote unified table");
    }
    write_outputs(&run.report, &config.plot, args.export_long.as_deref(), args.svg.as_deref())
}

fn handle_store(args: StoreArgs) -> Result<(), AppError> {
    let plot = PlotConfig {
        width: args.width,
        height: args.height,
        ..PlotConfig::default()
    };
    plot.validate()?;
    if !args.trim.is_finite() || args.trim < 0.0 {
        return Err(AppError::new(2, format!("--trim must be >= 0, got {}.", args.trim)));
    }

    let exclude: HashSet<String> = args.exclude.iter().cloned().collect();
    let report = pipeline::run_store(&args.stores, args.trim, &exclude)?;
    println!("{}", crate::report::format_run_summary(&report, None, None));
    print_report(&report, &plot, !args.no_plot);
    write_outputs(&report, &plot, args.export_long.as_deref(), args.svg.as_deref())
}

fn handle_data(args: DataArgs) -> Result<(), AppError> {
    let data = cbpp().to_layout(args.layout);
    crate::io::write_dataset_csv(&args.out, &data, &cbpp_formula().for_layout(args.layout))?;
    info!(path = %args.out.display(), rows = data.records.len(), layout = %args.layout, "wrote CBPP dataset");
    Ok(())
}

fn print_report(report: &ComparisonReport, plot: &PlotConfig, show_plot: bool) {
    println!("{}", crate::report::format_unified_table(&report.table));
    let diagnostics = crate::report::format_diagnostics(&report.table);
    if !diagnostics.is_empty() {
        println!("{diagnostics}");
    }
    println!(
        "{}",
        crate::report::format_std_error_comparison(&report.consensus, &report.relative)
    );
    println!("{}", crate::report::format_fit_times(&report.table));
    if show_plot {
        println!("{}", crate::plot::render_interval_chart(&report.table, plot));
    }
}

fn write_outputs(
    report: &ComparisonReport,
    plot: &PlotConfig,
    export_long: Option<&std::path::Path>,
    svg: Option<&std::path::Path>,
) -> Result<(), AppError> {
    if let Some(path) = export_long {
        crate::io::write_long_csv(path, &report.long)?;
        info!(path = %path.display(), rows = report.long.len(), "wrote long table");
    }
    if let Some(path) = svg {
        crate::plot::write_svg_chart(path, &report.table, &report.consensus, plot)?;
        info!(path = %path.display(), "wrote SVG chart");
    }
    Ok(())
}
