//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - produced by the harmonizer from heterogeneous fit outputs
//! - exported to CSV for plotting elsewhere
//! - reloaded later from a persisted summary store

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Whether a model was fitted on grouped binomial counts or on individual
/// Bernoulli trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DataLayout {
    /// One row per group with `successes` out of `trials`.
    Aggregated,
    /// One row per trial with a 0/1 response.
    Disaggregated,
}

impl DataLayout {
    pub fn label(self) -> &'static str {
        match self {
            DataLayout::Aggregated => "aggregated",
            DataLayout::Disaggregated => "disaggregated",
        }
    }

    /// Map an R-style `aggregated` logical to a layout.
    pub fn from_aggregated_flag(aggregated: bool) -> Self {
        if aggregated {
            DataLayout::Aggregated
        } else {
            DataLayout::Disaggregated
        }
    }
}

impl fmt::Display for DataLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Response family passed to the fitting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Binomial,
}

impl Family {
    pub fn name(self) -> &'static str {
        match self {
            Family::Binomial => "binomial",
        }
    }
}

/// How the marginal likelihood is approximated by the external fitter.
///
/// Text form: `laplace` or `agq:N` (adaptive Gauss-Hermite quadrature with
/// `N` nodes). `agq:1` is the Laplace approximation and parses as such.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Approximation {
    Laplace,
    AdaptiveQuadrature(u32),
}

impl Approximation {
    /// Number of quadrature nodes (Laplace is a single node).
    pub fn nodes(self) -> u32 {
        match self {
            Approximation::Laplace => 1,
            Approximation::AdaptiveQuadrature(n) => n,
        }
    }
}

impl fmt::Display for Approximation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Approximation::Laplace => f.write_str("laplace"),
            Approximation::AdaptiveQuadrature(n) => write!(f, "agq:{n}"),
        }
    }
}

impl FromStr for Approximation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "laplace" {
            return Ok(Approximation::Laplace);
        }
        let Some(nodes) = s.strip_prefix("agq:") else {
            return Err(format!("Invalid approximation '{s}'. Expected `laplace` or `agq:N`."));
        };
        let n: u32 = nodes
            .parse()
            .map_err(|_| format!("Invalid quadrature node count '{nodes}'."))?;
        match n {
            0 => Err("Quadrature node count must be >= 1.".to_string()),
            1 => Ok(Approximation::Laplace),
            n => Ok(Approximation::AdaptiveQuadrature(n)),
        }
    }
}

impl TryFrom<String> for Approximation {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Approximation> for String {
    fn from(value: Approximation) -> Self {
        value.to_string()
    }
}

/// A GLMM with a single random intercept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFormula {
    /// Response column (successes when `trials` is set, 0/1 otherwise).
    pub response: String,
    /// Column holding the number of trials for aggregated data.
    #[serde(default)]
    pub trials: Option<String>,
    /// Fixed-effect predictor columns.
    #[serde(default)]
    pub fixed: Vec<String>,
    /// Random-intercept grouping column.
    pub group: String,
    #[serde(default = "default_family")]
    pub family: Family,
}

fn default_family() -> Family {
    Family::Binomial
}

impl ModelFormula {
    /// Columns a dataset must provide for this formula.
    pub fn required_columns(&self) -> Vec<&str> {
        let mut cols = vec![self.response.as_str()];
        if let Some(trials) = &self.trials {
            cols.push(trials.as_str());
        }
        cols.extend(self.fixed.iter().map(String::as_str));
        cols.push(self.group.as_str());
        cols
    }

    /// The same model written against `layout`. Aggregating a 0/1 response
    /// introduces a `trials` column.
    pub fn for_layout(&self, layout: DataLayout) -> ModelFormula {
        match layout {
            DataLayout::Aggregated => ModelFormula {
                trials: Some(self.trials.clone().unwrap_or_else(|| "trials".to_string())),
                ..self.clone()
            },
            DataLayout::Disaggregated => ModelFormula {
                trials: None,
                ..self.clone()
            },
        }
    }
}

impl fmt::Display for ModelFormula {
    /// lme4-style formula text, e.g.
    /// `cbind(incidence, size - incidence) ~ period + (1 | herd)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.trials {
            Some(trials) => write!(f, "cbind({r}, {trials} - {r})", r = self.response)?,
            None => write!(f, "{}", self.response)?,
        }
        let fixed = if self.fixed.is_empty() {
            "1".to_string()
        } else {
            self.fixed.join(" + ")
        };
        write!(f, " ~ {fixed} + (1 | {})", self.group)
    }
}

/// One fixed-effect coefficient of a single fit.
#[derive(Debug, Clone, PartialEq)]
pub struct TermEstimate {
    /// Normalized term name.
    pub term: String,
    pub estimate: f64,
    /// `None` means "not computed", which is distinct from zero.
    pub std_error: Option<f64>,
    pub conf_low: Option<f64>,
    pub conf_high: Option<f64>,
}

/// Fixed-effect summary of one fitted model.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub package_id: String,
    pub layout: Option<DataLayout>,
    /// Wall-clock fit time in seconds, when known.
    pub fit_seconds: Option<f64>,
    pub terms: Vec<TermEstimate>,
}

/// One harmonized row: a (package, term) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyRow {
    pub package_id: String,
    pub term: String,
    pub estimate: f64,
    pub std_error: Option<f64>,
    pub conf_low: Option<f64>,
    pub conf_high: Option<f64>,
    pub layout: Option<DataLayout>,
}

/// Per-package bookkeeping kept alongside the rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageSummary {
    pub package_id: String,
    pub layout: Option<DataLayout>,
    pub fit_seconds: Option<f64>,
    pub n_terms: usize,
}

/// A package that was left out of the table, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageDiagnostic {
    pub package_id: String,
    pub error: FitError,
}

/// The harmonized comparison table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnifiedTable {
    /// Rows grouped by package, packages in input order.
    pub rows: Vec<TidyRow>,
    pub packages: Vec<PackageSummary>,
    pub diagnostics: Vec<PackageDiagnostic>,
}

impl UnifiedTable {
    pub fn contains_package(&self, package_id: &str) -> bool {
        self.packages.iter().any(|p| p.package_id == package_id)
    }

    /// Distinct term names in first-appearance order.
    pub fn terms(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !out.contains(&row.term.as_str()) {
                out.push(row.term.as_str());
            }
        }
        out
    }

    pub fn rows_for_term<'a>(&'a self, term: &'a str) -> impl Iterator<Item = &'a TidyRow> + 'a {
        self.rows.iter().filter(move |r| r.term == term)
    }
}

/// Value columns that can be pivoted into long format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueColumn {
    Estimate,
    StdError,
}

impl ValueColumn {
    /// The default pivot: point estimate first, then standard error.
    pub const DEFAULT: [ValueColumn; 2] = [ValueColumn::Estimate, ValueColumn::StdError];

    pub fn label(self) -> &'static str {
        match self {
            ValueColumn::Estimate => "estimate",
            ValueColumn::StdError => "std_error",
        }
    }

    pub fn value(self, row: &TidyRow) -> Option<f64> {
        match self {
            ValueColumn::Estimate => Some(row.estimate),
            ValueColumn::StdError => row.std_error,
        }
    }
}

/// One row of the long (pivoted) table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRow {
    pub package_id: String,
    pub term: String,
    pub layout: Option<DataLayout>,
    pub variable: ValueColumn,
    pub value: Option<f64>,
}

/// Robust cross-package standard error for one term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermConsensus {
    pub term: String,
    /// `None` when no package computed a standard error for the term.
    pub std_error: Option<f64>,
    pub n_packages: usize,
}

/// A row's standard error relative to its term's consensus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelativeStdError {
    pub package_id: String,
    pub term: String,
    pub std_error: Option<f64>,
    pub consensus: Option<f64>,
    pub ratio: Option<f64>,
}
