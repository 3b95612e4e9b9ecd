//! Wald confidence intervals.
//!
//! For a coefficient with point estimate `β̂` and standard error `se`:
//!
//! ```text
//! [β̂ - z·se, β̂ + z·se],   z = Φ⁻¹(1 - (1 - level) / 2)
//! ```
//!
//! This is the interval most GLMM packages report by default, and the one we
//! fall back to when a package only exposes estimates and standard errors.

use statrs::distribution::{ContinuousCDF, Normal};

/// Two-sided standard-normal critical value for a confidence level in `(0, 1)`.
pub fn z_critical(level: f64) -> Option<f64> {
    if !(level.is_finite() && level > 0.0 && level < 1.0) {
        return None;
    }
    let normal = Normal::new(0.0, 1.0).ok()?;
    Some(normal.inverse_cdf(1.0 - (1.0 - level) / 2.0))
}

/// Wald interval `(low, high)`; `None` if the inputs cannot produce one.
pub fn wald_interval(estimate: f64, std_error: f64, level: f64) -> Option<(f64, f64)> {
    if !(estimate.is_finite() && std_error.is_finite() && std_error >= 0.0) {
        return None;
    }
    let z = z_critical(level)?;
    Some((estimate - z * std_error, estimate + z * std_error))
}
