//! Tidy extraction of fixed effects.
//!
//! Every fitting backend is reduced to the same small accessor contract
//! ([`FixedEffects`]): a coefficient table, aligned standard errors, and
//! optionally native confidence intervals. Extraction never looks past it.

use std::collections::HashSet;
use std::fmt;

use crate::domain::TermEstimate;
use crate::error::FitError;
use crate::harmonize::normalize::normalize_term_name;
use crate::math::wald_interval;

/// Minimal accessor contract a fitted-model handle must satisfy.
pub trait FixedEffects: fmt::Debug {
    /// Short identifier of the result shape (used in diagnostics).
    fn model_kind(&self) -> &str;

    /// Raw coefficient names and point estimates, in model order.
    fn coefficients(&self) -> Option<Vec<(String, f64)>>;

    /// Standard errors aligned with [`FixedEffects::coefficients`].
    ///
    /// A `None` entry means the package did not compute that standard error.
    fn std_errors(&self) -> Option<Vec<Option<f64>>>;

    /// Native intervals at `level`, when the package reports them.
    fn conf_int(&self, _level: f64) -> Option<Vec<(f64, f64)>> {
        None
    }
}

/// Whether to attach intervals, and at which level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceSpec {
    pub conf_int: bool,
    pub level: f64,
}

impl ConfidenceSpec {
    pub fn at_level(level: f64) -> Self {
        Self { conf_int: true, level }
    }

    pub fn disabled() -> Self {
        Self {
            conf_int: false,
            level: 0.95,
        }
    }
}

impl Default for ConfidenceSpec {
    fn default() -> Self {
        Self::at_level(0.95)
    }
}

/// Produce one [`TermEstimate`] per fixed-effect term of `fit`.
///
/// When intervals are requested and the handle has none at the requested
/// level, Wald intervals are computed from the estimate and standard error.
pub fn extract_fixed_effects(
    fit: &dyn FixedEffects,
    confidence: &ConfidenceSpec,
) -> Result<Vec<TermEstimate>, FitError> {
    let kind = fit.model_kind();
    let coefs = fit
        .coefficients()
        .ok_or_else(|| FitError::unsupported(kind, "no fixed-effect coefficient table"))?;
    let std_errors = fit
        .std_errors()
        .ok_or_else(|| FitError::unsupported(kind, "no standard errors"))?;

    if std_errors.len() != coefs.len() {
        return Err(FitError::unsupported(
            kind,
            format!("{} standard errors for {} coefficients", std_errors.len(), coefs.len()),
        ));
    }

    let native = if confidence.conf_int {
        fit.conf_int(confidence.level)
    } else {
        None
    };
    if let Some(native) = &native {
        if native.len() != coefs.len() {
            return Err(FitError::unsupported(
                kind,
                format!("{} intervals for {} coefficients", native.len(), coefs.len()),
            ));
        }
    }

    let mut seen = HashSet::with_capacity(coefs.len());
    let mut out = Vec::with_capacity(coefs.len());

    for (idx, ((raw_name, estimate), std_error)) in coefs.into_iter().zip(std_errors).enumerate() {
        let term = normalize_term_name(&raw_name);
        if !seen.insert(term.clone()) {
            return Err(FitError::DuplicateTerm(term));
        }
        let mut t = check_term_estimate(TermEstimate {
            term,
            estimate,
            std_error,
            conf_low: None,
            conf_high: None,
        })?;

        if confidence.conf_int {
            let interval = native
                .as_ref()
                .and_then(|v| checked_interval(t.estimate, v[idx].0, v[idx].1))
                .or_else(|| t.std_error.and_then(|se| wald_interval(t.estimate, se, confidence.level)));
            t.conf_low = interval.map(|(lo, _)| lo);
            t.conf_high = interval.map(|(_, hi)| hi);
        }
        out.push(t);
    }

    Ok(out)
}

/// Enforce the coefficient invariants on one term.
///
/// A non-finite estimate or a negative standard error is an error. A
/// non-finite standard error becomes undefined. The interval is kept only
/// when both ends are finite and it contains the estimate.
pub fn check_term_estimate(mut t: TermEstimate) -> Result<TermEstimate, FitError> {
    if !t.estimate.is_finite() {
        return Err(FitError::InvalidEstimate {
            reason: format!("non-finite estimate {}", t.estimate),
            term: t.term,
        });
    }

    t.std_error = match t.std_error {
        Some(se) if !se.is_finite() => None,
        Some(se) if se < 0.0 => {
            return Err(FitError::InvalidEstimate {
                term: t.term,
                reason: format!("negative standard error {se}"),
            });
        }
        other => other,
    };

    let interval = match (t.conf_low, t.conf_high) {
        (Some(lo), Some(hi)) => checked_interval(t.estimate, lo, hi),
        _ => None,
    };
    t.conf_low = interval.map(|(lo, _)| lo);
    t.conf_high = interval.map(|(_, hi)| hi);
    Ok(t)
}

/// `(low, high)` with the ends ordered, or `None` if an end is not finite or
/// the interval misses the estimate.
fn checked_interval(estimate: f64, a: f64, b: f64) -> Option<(f64, f64)> {
    if !(a.is_finite() && b.is_finite()) {
        return None;
    }
    let (lo, hi) = (a.min(b), a.max(b));
    (lo <= estimate && estimate <= hi).then_some((lo, hi))
}
