//! Comparison charts.
//!
//! - `ascii`: deterministic terminal interval chart
//! - `svg`: faceted estimate / std. error chart with fit times (plotters)
//!
//! Both charts draw one panel per term. When the table mixes data layouts,
//! each term is further split into one panel per layout.

pub mod ascii;
pub mod svg;

pub use ascii::render_interval_chart;
pub use svg::write_svg_chart;

use crate::domain::{DataLayout, TidyRow, UnifiedTable};

/// Which rows of a term a panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LayoutFacet {
    All,
    Only(Option<DataLayout>),
}

/// One chart panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Facet<'a> {
    pub term: &'a str,
    pub layout: LayoutFacet,
}

impl<'a> Facet<'a> {
    pub fn title(&self) -> String {
        match self.layout {
            LayoutFacet::All => self.term.to_string(),
            LayoutFacet::Only(Some(layout)) => format!("{} [{layout}]", self.term),
            LayoutFacet::Only(None) => format!("{} [unspecified]", self.term),
        }
    }

    pub fn admits(&self, row: &TidyRow) -> bool {
        row.term == self.term
            && match self.layout {
                LayoutFacet::All => true,
                LayoutFacet::Only(layout) => row.layout == layout,
            }
    }

    pub fn rows(&self, table: &'a UnifiedTable) -> Vec<&'a TidyRow> {
        table.rows.iter().filter(|r| self.admits(r)).collect()
    }
}

/// Panels in term order, then layout order of first appearance.
pub(crate) fn facets(table: &UnifiedTable) -> Vec<Facet<'_>> {
    let mut layouts: Vec<Option<DataLayout>> = Vec::new();
    for row in &table.rows {
        if !layouts.contains(&row.layout) {
            layouts.push(row.layout);
        }
    }

    let terms = table.terms();
    if layouts.len() <= 1 {
        return terms
            .into_iter()
            .map(|term| Facet {
                term,
                layout: LayoutFacet::All,
            })
            .collect();
    }

    let mut out = Vec::new();
    for term in terms {
        for &layout in &layouts {
            let facet = Facet {
                term,
                layout: LayoutFacet::Only(layout),
            };
            if table.rows.iter().any(|r| facet.admits(r)) {
                out.push(facet);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pkg: &str, term: &str, layout: Option<DataLayout>) -> TidyRow {
        TidyRow {
            package_id: pkg.to_string(),
            term: term.to_string(),
            estimate: 0.0,
            std_error: None,
            conf_low: None,
            conf_high: None,
            layout,
        }
    }

    #[test]
    fn single_layout_facets_by_term_only() {
        let agg = Some(DataLayout::Aggregated);
        let table = UnifiedTable {
            rows: vec![row("A", "(Intercept)", agg), row("A", "period2", agg), row("B", "(Intercept)", agg)],
            ..UnifiedTable::default()
        };
        let f = facets(&table);
        assert_eq!(f.len(), 2);
        assert_eq!(f[0].title(), "(Intercept)");
        assert_eq!(f[0].rows(&table).len(), 2);
    }

    #[test]
    fn mixed_layouts_split_each_term() {
        let table = UnifiedTable {
            rows: vec![
                row("A", "(Intercept)", Some(DataLayout::Aggregated)),
                row("A", "period2", Some(DataLayout::Aggregated)),
                row("B", "(Intercept)", Some(DataLayout::Disaggregated)),
                row("C", "(Intercept)", None),
            ],
            ..UnifiedTable::default()
        };
        let titles: Vec<String> = facets(&table).iter().map(Facet::title).collect();
        assert_eq!(
            titles,
            vec![
                "(Intercept) [aggregated]",
                "(Intercept) [disaggregated]",
                "(Intercept) [unspecified]",
                "period2 [aggregated]",
            ]
        );
    }
}
