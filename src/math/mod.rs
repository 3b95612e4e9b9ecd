//! Mathematical utilities: Wald intervals, covariance handling, trimmed means.

pub mod covariance;
pub mod trimmed;
pub mod wald;

pub use covariance::*;
pub use trimmed::*;
pub use wald::*;
