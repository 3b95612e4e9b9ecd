//! Term-name normalization.
//!
//! Fitting packages spell the same coefficient differently:
//!
//! - `period2` (lme4, glmmTMB)
//! - `period: 2` (MixedModels coefficient tables)
//! - `period 2` (some printed summaries)
//! - `sex & period` for interactions (MixedModels) vs `sex:period` (R)
//!
//! All of them must map to one canonical string so rows line up across packages.

/// Canonicalize a raw coefficient name.
///
/// Steps, in order:
/// 1. remove every `": "` sequence
/// 2. remove every remaining space
/// 3. replace `&` with `:`
///
/// The output never contains spaces or `&`, so applying it again is a no-op.
pub fn normalize_term_name(raw: &str) -> String {
    raw.replace(": ", "").replace(' ', "").replace('&', ":")
}
