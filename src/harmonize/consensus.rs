//! Consensus standard errors.
//!
//! For each term we take a trimmed mean of the standard errors reported by the
//! packages. With the default trim of 0.5 this is the median, so one or two
//! outlying packages do not move the reference line.

use crate::domain::{RelativeStdError, TermConsensus, UnifiedTable};
use crate::math::trimmed_mean;

/// Default trim fraction for the consensus statistic.
pub const DEFAULT_TRIM: f64 = 0.5;

/// Per-term trimmed mean of the defined standard errors, in term order.
pub fn sderr_consensus(table: &UnifiedTable, trim: f64) -> Vec<TermConsensus> {
    table
        .terms()
        .into_iter()
        .map(|term| {
            let values: Vec<f64> = table.rows_for_term(term).filter_map(|r| r.std_error).collect();
            TermConsensus {
                term: term.to_string(),
                std_error: trimmed_mean(&values, trim),
                n_packages: values.len(),
            }
        })
        .collect()
}

/// Each row's standard error divided by its term's consensus.
///
/// The ratio is `None` when either side is undefined or the consensus is zero.
pub fn relative_std_errors(table: &UnifiedTable, consensus: &[TermConsensus]) -> Vec<RelativeStdError> {
    table
        .rows
        .iter()
        .map(|row| {
            let cons = consensus
                .iter()
                .find(|c| c.term == row.term)
                .and_then(|c| c.std_error);
            let ratio = match (row.std_error, cons) {
                (Some(se), Some(c)) if c > 0.0 => Some(se / c),
                _ => None,
            };
            RelativeStdError {
                package_id: row.package_id.clone(),
                term: row.term.clone(),
                std_error: row.std_error,
                consensus: cons,
                ratio,
            }
        })
        .collect()
}
