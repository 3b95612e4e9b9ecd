//! Raw fit outputs as produced by external fitting packages.
//!
//! Each package family reports its fixed effects in a different shape. We
//! accept a small set of JSON shapes, tagged by `"format"`:
//!
//! - `coef_table`: estimate / std-error columns, optional interval columns
//!   (lme4, glmmTMB, GLMMadaptive summaries)
//! - `vcov`: estimates plus the full fixed-effect covariance matrix
//!   (MixedModels-style output)
//! - `cholesky`: estimates plus the lower Cholesky factor of that covariance
//! - `posterior`: posterior mean / sd with a quantile interval (INLA-style)
//!
//! Any other tag deserializes to [`RawFit::Unsupported`], which cannot satisfy
//! the accessor contract. JSON `null` marks a value the package did not compute.

use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::harmonize::FixedEffects;
use crate::math::{square_from_rows, std_errors_from_vcov, vcov_from_cholesky};

/// Levels closer than this are treated as the same confidence level.
const LEVEL_EPS: f64 = 1e-9;

fn default_true() -> bool {
    true
}

fn default_level() -> f64 {
    0.95
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum RawFit {
    CoefTable(CoefTableFit),
    Vcov(VcovFit),
    Cholesky(CholeskyFit),
    Posterior(PosteriorFit),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefTableFit {
    pub terms: Vec<String>,
    pub estimate: Vec<f64>,
    pub std_error: Vec<Option<f64>>,
    #[serde(default)]
    pub conf_low: Option<Vec<f64>>,
    #[serde(default)]
    pub conf_high: Option<Vec<f64>>,
    #[serde(default = "default_level")]
    pub conf_level: f64,
    #[serde(default = "default_true")]
    pub converged: bool,
    #[serde(default)]
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VcovFit {
    pub terms: Vec<String>,
    pub estimate: Vec<f64>,
    pub vcov: Vec<Vec<Option<f64>>>,
    #[serde(default = "default_true")]
    pub converged: bool,
    #[serde(default)]
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CholeskyFit {
    pub terms: Vec<String>,
    pub estimate: Vec<f64>,
    pub chol_lower: Vec<Vec<f64>>,
    #[serde(default = "default_true")]
    pub converged: bool,
    #[serde(default)]
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorFit {
    pub terms: Vec<String>,
    pub mean: Vec<f64>,
    pub sd: Vec<Option<f64>>,
    #[serde(default, alias = "0.025quant")]
    pub quantile_low: Option<Vec<f64>>,
    #[serde(default, alias = "0.975quant")]
    pub quantile_high: Option<Vec<f64>>,
    #[serde(default = "default_level")]
    pub quantile_level: f64,
    #[serde(default = "default_true")]
    pub converged: bool,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl RawFit {
    /// Parse a raw fit from JSON text.
    pub fn from_json(text: &str) -> Result<RawFit, FitError> {
        serde_json::from_str(text).map_err(|e| FitError::unsupported("json", format!("invalid raw fit JSON: {e}")))
    }

    /// `(converged, messages)` as reported by the package.
    pub fn status(&self) -> (bool, &[String]) {
        match self {
            RawFit::CoefTable(f) => (f.converged, &f.messages),
            RawFit::Vcov(f) => (f.converged, &f.messages),
            RawFit::Cholesky(f) => (f.converged, &f.messages),
            RawFit::Posterior(f) => (f.converged, &f.messages),
            RawFit::Unsupported => (true, &[]),
        }
    }

    /// Turn a parsed output into a result handle, surfacing non-convergence.
    pub fn into_handle(self) -> Result<Box<dyn FixedEffects>, FitError> {
        let (converged, messages) = self.status();
        if !converged {
            let detail = if messages.is_empty() {
                "package reported non-convergence".to_string()
            } else {
                messages.join("; ")
            };
            return Err(FitError::ConvergenceFailure(detail));
        }
        Ok(Box::new(self))
    }
}

fn zip_terms(terms: &[String], values: &[f64]) -> Option<Vec<(String, f64)>> {
    if terms.len() != values.len() {
        return None;
    }
    Some(terms.iter().cloned().zip(values.iter().copied()).collect())
}

fn zip_intervals(low: Option<&Vec<f64>>, high: Option<&Vec<f64>>, n: usize) -> Option<Vec<(f64, f64)>> {
    let (low, high) = (low?, high?);
    if low.len() != n || high.len() != n {
        return None;
    }
    Some(low.iter().copied().zip(high.iter().copied()).collect())
}

fn covariance_std_errors(rows: &[Vec<f64>], n: usize) -> Option<Vec<Option<f64>>> {
    let vcov = square_from_rows(rows).ok()?;
    if vcov.nrows() != n {
        return None;
    }
    std_errors_from_vcov(&vcov).ok()
}

impl FixedEffects for RawFit {
    fn model_kind(&self) -> &str {
        match self {
            RawFit::CoefTable(_) => "coef_table",
            RawFit::Vcov(_) => "vcov",
            RawFit::Cholesky(_) => "cholesky",
            RawFit::Posterior(_) => "posterior",
            RawFit::Unsupported => "unsupported",
        }
    }

    fn coefficients(&self) -> Option<Vec<(String, f64)>> {
        match self {
            RawFit::CoefTable(f) => zip_terms(&f.terms, &f.estimate),
            RawFit::Vcov(f) => zip_terms(&f.terms, &f.estimate),
            RawFit::Cholesky(f) => zip_terms(&f.terms, &f.estimate),
            RawFit::Posterior(f) => zip_terms(&f.terms, &f.mean),
            RawFit::Unsupported => None,
        }
    }

    fn std_errors(&self) -> Option<Vec<Option<f64>>> {
        match self {
            RawFit::CoefTable(f) => Some(f.std_error.clone()),
            RawFit::Vcov(f) => {
                let rows: Vec<Vec<f64>> = f
                    .vcov
                    .iter()
                    .map(|r| r.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
                    .collect();
                covariance_std_errors(&rows, f.terms.len())
            }
            RawFit::Cholesky(f) => {
                let lower = square_from_rows(&f.chol_lower).ok()?;
                let vcov = vcov_from_cholesky(&lower).ok()?;
                if vcov.nrows() != f.terms.len() {
                    return None;
                }
                std_errors_from_vcov(&vcov).ok()
            }
            RawFit::Posterior(f) => Some(f.sd.clone()),
            RawFit::Unsupported => None,
        }
    }

    fn conf_int(&self, level: f64) -> Option<Vec<(f64, f64)>> {
        match self {
            RawFit::CoefTable(f) if (f.conf_level - level).abs() < LEVEL_EPS => {
                zip_intervals(f.conf_low.as_ref(), f.conf_high.as_ref(), f.terms.len())
            }
            RawFit::Posterior(f) if (f.quantile_level - level).abs() < LEVEL_EPS => {
                zip_intervals(f.quantile_low.as_ref(), f.quantile_high.as_ref(), f.terms.len())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmonize::{ConfidenceSpec, extract_fixed_effects};

    #[test]
    fn coef_table_with_native_intervals() {
        let raw = RawFit::from_json(
            r#"{
                "format": "coef_table",
                "terms": ["(Intercept)", "period2"],
                "estimate": [-1.3983, -0.9919],
                "std_error": [0.2312, 0.3032],
                "conf_low": [-1.85, -1.59],
                "conf_high": [-0.95, -0.40]
            }"#,
        )
        .unwrap();
        let terms = extract_fixed_effects(&raw, &ConfidenceSpec::default()).unwrap();
        assert_eq!(terms[1].term, "period2");
        assert_eq!(terms[1].conf_low, Some(-1.59));

        // A different level falls back to Wald.
        let terms = extract_fixed_effects(&raw, &ConfidenceSpec::at_level(0.9)).unwrap();
        assert!((terms[1].conf_low.unwrap() - (-0.9919 - 1.644854 * 0.3032)).abs() < 1e-4);
    }

    #[test]
    fn vcov_shape_uses_sqrt_diagonal_and_normalizes_names() {
        let raw = RawFit::from_json(
            r#"{
                "format": "vcov",
                "terms": ["(Intercept)", "period: 2"],
                "estimate": [-1.4, -1.0],
                "vcov": [[0.0529, -0.02], [-0.02, 0.0900]]
            }"#,
        )
        .unwrap();
        let terms = extract_fixed_effects(&raw, &ConfidenceSpec::default()).unwrap();
        assert_eq!(terms[1].term, "period2");
        assert!((terms[0].std_error.unwrap() - 0.23).abs() < 1e-12);
        assert!((terms[1].std_error.unwrap() - 0.30).abs() < 1e-12);
    }

    #[test]
    fn vcov_with_null_diagonal_leaves_std_error_undefined() {
        let raw = RawFit::from_json(
            r#"{"format": "vcov", "terms": ["a"], "estimate": [1.0], "vcov": [[null]]}"#,
        )
        .unwrap();
        let terms = extract_fixed_effects(&raw, &ConfidenceSpec::default()).unwrap();
        assert_eq!(terms[0].std_error, None);
        assert_eq!(terms[0].conf_low, None);
    }

    #[test]
    fn cholesky_shape_matches_covariance() {
        let raw = RawFit::from_json(
            r#"{
                "format": "cholesky",
                "terms": ["a", "b"],
                "estimate": [0.5, 0.1],
                "chol_lower": [[0.2, 0.0], [0.1, 0.3]]
            }"#,
        )
        .unwrap();
        let se = raw.std_errors().unwrap();
        assert!((se[0].unwrap() - 0.2).abs() < 1e-12);
        assert!((se[1].unwrap() - 0.10f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn posterior_accepts_inla_quantile_names() {
        let raw = RawFit::from_json(
            r#"{
                "format": "posterior",
                "terms": ["(Intercept)"],
                "mean": [-1.41],
                "sd": [0.24],
                "0.025quant": [-1.90],
                "0.975quant": [-0.95]
            }"#,
        )
        .unwrap();
        let terms = extract_fixed_effects(&raw, &ConfidenceSpec::default()).unwrap();
        assert_eq!(terms[0].conf_low, Some(-1.90));
        assert_eq!(terms[0].conf_high, Some(-0.95));
    }

    #[test]
    fn unknown_format_is_unsupported() {
        let raw = RawFit::from_json(r#"{"format": "anova", "table": []}"#).unwrap();
        assert_eq!(raw, RawFit::Unsupported);
        let err = extract_fixed_effects(&raw, &ConfidenceSpec::default()).unwrap_err();
        assert!(matches!(err, FitError::UnsupportedModelKind { .. }));
    }

    #[test]
    fn non_convergence_is_surfaced() {
        let raw = RawFit::from_json(
            r#"{
                "format": "coef_table",
                "terms": ["a"],
                "estimate": [1.0],
                "std_error": [null],
                "converged": false,
                "messages": ["Model failed to converge with max|grad| = 0.0123"]
            }"#,
        )
        .unwrap();
        let err = raw.into_handle().unwrap_err();
        assert!(matches!(err, FitError::ConvergenceFailure(ref m) if m.contains("max|grad|")));
    }

    #[test]
    fn malformed_json_is_unsupported() {
        let err = RawFit::from_json("not json").unwrap_err();
        assert!(matches!(err, FitError::UnsupportedModelKind { .. }));
    }
}
