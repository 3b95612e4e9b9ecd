//! `glmm-compare` library crate.
//!
//! The binary (`gcmp`) is a thin wrapper around this library so that:
//!
//! - the harmonizer is testable without spawning processes
//! - fitting backends, stores and plots are reusable from other tools
//!
//! The core is [`harmonize`]: it turns heterogeneous fixed-effect outputs
//! into one table of (package, term) rows.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod harmonize;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
