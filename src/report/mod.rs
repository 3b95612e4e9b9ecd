//! Reporting: the derived comparison views and their terminal formatting.

pub mod format;

use std::collections::HashSet;

use crate::domain::{LongRow, RelativeStdError, TermConsensus, UnifiedTable, ValueColumn};
use crate::harmonize::{relative_std_errors, sderr_consensus, to_long_format};

pub use format::*;

/// A unified table plus everything derived from it for output.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub table: UnifiedTable,
    pub long: Vec<LongRow>,
    pub consensus: Vec<TermConsensus>,
    pub relative: Vec<RelativeStdError>,
}

impl ComparisonReport {
    pub fn build(table: UnifiedTable, trim: f64, exclude_from_long: &HashSet<String>) -> Self {
        let long = to_long_format(&table, &ValueColumn::DEFAULT, exclude_from_long);
        let consensus = sderr_consensus(&table, trim);
        let relative = relative_std_errors(&table, &consensus);
        Self {
            table,
            long,
            consensus,
            relative,
        }
    }
}
