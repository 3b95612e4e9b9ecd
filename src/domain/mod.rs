//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input configuration enums (`DataLayout`, `Family`, `Approximation`)
//! - the model description handed to fitters (`ModelFormula`)
//! - harmonized outputs (`TermEstimate`, `FitResult`, `UnifiedTable`, `LongRow`, etc.)

pub mod types;

pub use types::*;
