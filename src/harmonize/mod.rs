//! Result harmonization.
//!
//! Responsibilities:
//!
//! - canonicalize term names across packages
//! - extract a tidy fixed-effect table from any [`FixedEffects`] handle
//! - merge packages into one table, containing per-package failures
//! - pivot to long format and compute consensus standard errors

pub mod consensus;
pub mod extract;
pub mod merge;
pub mod normalize;
pub mod reshape;

pub use consensus::*;
pub use extract::*;
pub use merge::*;
pub use normalize::*;
pub use reshape::*;
