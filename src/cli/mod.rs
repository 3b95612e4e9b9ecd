//! Command-line parsing for the GLMM package comparison tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the harmonization code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::CONFIG_ENV;
use crate::domain::DataLayout;
use crate::harmonize::DEFAULT_TRIM;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "gcmp", version, about = "Compare GLMM fits across packages")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit every configured package, harmonize the results and report.
    Compare(CompareArgs),
    /// Compare previously persisted tidy tables.
    Store(StoreArgs),
    /// Write the built-in CBPP dataset as CSV.
    Data(DataArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct CompareArgs {
    /// Comparison config (TOML).
    #[arg(short = 'c', long, env = CONFIG_ENV, value_name = "TOML")]
    pub config: PathBuf,

    /// Export the unified table to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the long (estimate / std_error) table to CSV.
    #[arg(long = "export-long", value_name = "CSV")]
    pub export_long: Option<PathBuf>,

    /// Write the faceted comparison chart as SVG.
    #[arg(long, value_name = "SVG")]
    pub svg: Option<PathBuf>,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns); overrides the config.
    #[arg(long)]
    pub width: Option<usize>,

    /// Plot height per term (rows); overrides the config.
    #[arg(long)]
    pub height: Option<usize>,
}

#[derive(Debug, Parser, Clone)]
pub struct StoreArgs {
    /// Tidy CSV tables (package, term, estimate, std_error, conf_low, conf_high).
    #[arg(required = true, value_name = "CSV")]
    pub stores: Vec<PathBuf>,

    /// Leave a package out of the long table.
    #[arg(long, value_name = "ID")]
    pub exclude: Vec<String>,

    /// Trim fraction for the consensus standard error.
    #[arg(long, default_value_t = DEFAULT_TRIM)]
    pub trim: f64,

    /// Export the long (estimate / std_error) table to CSV.
    #[arg(long = "export-long", value_name = "CSV")]
    pub export_long: Option<PathBuf>,

    /// Write the faceted comparison chart as SVG.
    #[arg(long, value_name = "SVG")]
    pub svg: Option<PathBuf>,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height per term (rows).
    #[arg(long, default_value_t = 12)]
    pub height: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct DataArgs {
    /// Layout of the written table.
    #[arg(long, value_enum, default_value_t = DataLayout::Aggregated)]
    pub layout: DataLayout,

    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,
}
