//! Input/output helpers.
//!
//! - binomial CSV ingest + validation, dataset export (`ingest`)
//! - persisted summary stores (`store`)
//! - comparison table exports (`export`)

pub mod export;
pub mod ingest;
pub mod store;

pub use export::*;
pub use ingest::*;
pub use store::*;
