//! Fitting backends and the raw result shapes they return.
//!
//! The harmonizer only sees [`crate::harmonize::FixedEffects`]; everything
//! package-specific lives here.

pub mod raw;
pub mod service;

pub use raw::*;
pub use service::*;
