//! Long-format pivot for faceted estimate / std-error comparison.

use std::collections::HashSet;

use crate::domain::{LongRow, UnifiedTable, ValueColumn};

/// Pivot `table` so every (package, term) row becomes one row per value column.
///
/// Rows of excluded packages are dropped first. Output order is stable:
/// grouped by input row, then by the order of `value_columns`.
pub fn to_long_format(
    table: &UnifiedTable,
    value_columns: &[ValueColumn],
    exclude_packages: &HashSet<String>,
) -> Vec<LongRow> {
    table
        .rows
        .iter()
        .filter(|row| !exclude_packages.contains(&row.package_id))
        .flat_map(|row| {
            value_columns.iter().map(move |&variable| LongRow {
                package_id: row.package_id.clone(),
                term: row.term.clone(),
                layout: row.layout,
                variable,
                value: variable.value(row),
            })
        })
        .collect()
}
