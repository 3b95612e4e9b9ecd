//! Faceted SVG comparison chart.
//!
//! One row of panels per facet (a term, split by layout when the table mixes
//! layouts):
//! - left: point estimate with its confidence interval, per package
//! - right: standard error per package, with the trimmed-mean consensus as a
//!   vertical reference line
//!
//! When any package has a fit time, a last full-width row compares them.
//! All sizes and colours come from the [`PlotConfig`] passed in.

use std::path::Path;

use plotters::coord::Shift;
use plotters::coord::types::{RangedCoordf64, RangedCoordi32};
use plotters::prelude::*;

use crate::config::PlotConfig;
use crate::domain::{TermConsensus, TidyRow, UnifiedTable};
use crate::error::AppError;
use crate::plot::facets;

/// A package on a panel: its index in the table (for colour) and its id.
type Slot<'a> = (usize, &'a str);

pub fn write_svg_chart(
    path: &Path,
    table: &UnifiedTable,
    consensus: &[TermConsensus],
    plot: &PlotConfig,
) -> Result<(), AppError> {
    let facets = facets(table);
    if facets.is_empty() {
        return Err(AppError::new(3, "Nothing to plot: the comparison table is empty."));
    }
    let timings: Vec<(usize, &str, f64)> = table
        .packages
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.fit_seconds.map(|s| (i, p.package_id.as_str(), s)))
        .collect();

    let root = SVGBackend::new(path, (plot.svg_width, plot.svg_height)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| render_err(path, e))?;

    let split = if timings.is_empty() {
        plot.svg_height
    } else {
        let n = facets.len() as u64;
        (u64::from(plot.svg_height) * n / (n + 1)) as u32
    };
    let (grid, times_area) = root.split_vertically(split);

    let panels = grid.split_evenly((facets.len(), 2));
    for (i, facet) in facets.iter().enumerate() {
        let rows = facet.rows(table);
        let slots: Vec<Slot> = table
            .packages
            .iter()
            .enumerate()
            .filter(|(_, p)| rows.iter().any(|r| r.package_id == p.package_id))
            .map(|(idx, p)| (idx, p.package_id.as_str()))
            .collect();
        let term_consensus = consensus
            .iter()
            .find(|c| c.term == facet.term)
            .and_then(|c| c.std_error);
        let title = facet.title();

        draw_estimate_panel(&panels[2 * i], &title, &rows, &slots, plot).map_err(|e| render_err(path, e))?;
        draw_std_error_panel(&panels[2 * i + 1], &title, &rows, &slots, term_consensus, plot)
            .map_err(|e| render_err(path, e))?;
    }

    if !timings.is_empty() {
        draw_fit_time_panel(&times_area, &timings, plot).map_err(|e| render_err(path, e))?;
    }

    root.present().map_err(|e| render_err(path, e))?;
    Ok(())
}

fn render_err(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::new(4, format!("Failed to render SVG '{}': {e}", path.display()))
}

fn row_for<'r>(rows: &[&'r TidyRow], package: &str) -> Option<&'r TidyRow> {
    rows.iter().copied().find(|r| r.package_id == package)
}

fn draw_estimate_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    rows: &[&TidyRow],
    slots: &[Slot],
    plot: &PlotConfig,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let values = rows
        .iter()
        .flat_map(|r| [Some(r.estimate), r.conf_low, r.conf_high])
        .flatten();
    let (x0, x1) = padded_bounds(values);

    let mut chart = ChartBuilder::on(area)
        .caption(format!("{title}: estimate"), ("sans-serif", 16))
        .margin(8)
        .set_label_area_size(LabelAreaPosition::Left, 110)
        .set_label_area_size(LabelAreaPosition::Bottom, 30)
        .build_cartesian_2d(x0..x1, -1i32..slots.len() as i32)?;
    configure_axes(&mut chart, slots)?;

    for (i, &(idx, package)) in slots.iter().enumerate() {
        let Some(row) = row_for(rows, package) else {
            continue;
        };
        let color = rgb(plot.color(idx));
        let y = slot(i, slots.len());
        if let (Some(lo), Some(hi)) = (row.conf_low, row.conf_high) {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(lo, y), (hi, y)],
                color.stroke_width(2),
            )))?;
        }
        chart.draw_series(std::iter::once(Circle::new((row.estimate, y), 4, color.filled())))?;
    }
    Ok(())
}

fn draw_std_error_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    rows: &[&TidyRow],
    slots: &[Slot],
    consensus: Option<f64>,
    plot: &PlotConfig,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let values = rows.iter().filter_map(|r| r.std_error).chain(consensus);
    let (x0, x1) = padded_bounds(values);

    let mut chart = ChartBuilder::on(area)
        .caption(format!("{title}: std. error"), ("sans-serif", 16))
        .margin(8)
        .set_label_area_size(LabelAreaPosition::Left, 110)
        .set_label_area_size(LabelAreaPosition::Bottom, 30)
        .build_cartesian_2d(x0..x1, -1i32..slots.len() as i32)?;
    configure_axes(&mut chart, slots)?;

    if let Some(c) = consensus {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(c, -1), (c, slots.len() as i32)],
            BLACK.mix(0.5).stroke_width(1),
        )))?;
    }

    for (i, &(idx, package)) in slots.iter().enumerate() {
        if let Some(se) = row_for(rows, package).and_then(|r| r.std_error) {
            let color = rgb(plot.color(idx));
            chart.draw_series(std::iter::once(Circle::new((se, slot(i, slots.len())), 4, color.filled())))?;
        }
    }
    Ok(())
}

/// Horizontal bars of wall-clock fit time, one per timed package.
fn draw_fit_time_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    timings: &[(usize, &str, f64)],
    plot: &PlotConfig,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let slots: Vec<Slot> = timings.iter().map(|&(idx, id, _)| (idx, id)).collect();
    let max = timings
        .iter()
        .map(|&(_, _, s)| s)
        .filter(|s| s.is_finite())
        .fold(0.0f64, f64::max);
    let x1 = if max > 0.0 { max * 1.1 } else { 1.0 };

    let mut chart = ChartBuilder::on(area)
        .caption("fit time (s)", ("sans-serif", 16))
        .margin(8)
        .set_label_area_size(LabelAreaPosition::Left, 110)
        .set_label_area_size(LabelAreaPosition::Bottom, 30)
        .build_cartesian_2d(0.0..x1, -1i32..slots.len() as i32)?;
    configure_axes(&mut chart, &slots)?;

    for (i, &(idx, _, seconds)) in timings.iter().enumerate() {
        if !seconds.is_finite() {
            continue;
        }
        let y = slot(i, slots.len());
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(0.0, y), (seconds, y)],
            rgb(plot.color(idx)).stroke_width(8),
        )))?;
    }
    Ok(())
}

fn configure_axes<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordi32>>,
    slots: &[Slot],
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let names: Vec<&str> = slots.iter().map(|&(_, id)| id).collect();
    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_labels(5)
        .y_labels(names.len() + 2)
        .y_label_formatter(&|v| package_label(*v, &names))
        .x_label_formatter(&|v| format!("{v:.3}"))
        .label_style(("sans-serif", 11))
        .draw()
}

/// First package at the top.
fn slot(idx: usize, n: usize) -> i32 {
    (n - 1 - idx) as i32
}

fn package_label(v: i32, packages: &[&str]) -> String {
    let n = packages.len() as i32;
    if (0..n).contains(&v) {
        packages[(n - 1 - v) as usize].to_string()
    } else {
        String::new()
    }
}

fn padded_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values.filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !(lo.is_finite() && hi.is_finite()) {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * 0.1).max(1e-3 * hi.abs().max(1.0));
    (lo - pad, hi + pad)
}

fn rgb([r, g, b]: [u8; 3]) -> RGBColor {
    RGBColor(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PackageSummary;

    #[test]
    fn labels_map_slots_back_to_packages() {
        let packages = ["A", "B", "C"];
        assert_eq!(package_label(slot(0, 3), &packages), "A");
        assert_eq!(package_label(slot(2, 3), &packages), "C");
        assert_eq!(package_label(-1, &packages), "");
        assert_eq!(package_label(3, &packages), "");
    }

    #[test]
    fn bounds_are_padded_and_never_empty() {
        let (lo, hi) = padded_bounds([1.0, 2.0].into_iter());
        assert!(lo < 1.0 && hi > 2.0);
        let (lo, hi) = padded_bounds([0.5].into_iter());
        assert!(lo < 0.5 && hi > 0.5);
        assert_eq!(padded_bounds(std::iter::empty()), (0.0, 1.0));
    }

    #[test]
    fn writes_svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        let table = UnifiedTable {
            rows: vec![TidyRow {
                package_id: "A".to_string(),
                term: "(Intercept)".to_string(),
                estimate: -2.0,
                std_error: Some(0.2),
                conf_low: Some(-2.4),
                conf_high: Some(-1.6),
                layout: None,
            }],
            packages: vec![PackageSummary {
                package_id: "A".to_string(),
                layout: None,
                fit_seconds: None,
                n_terms: 1,
            }],
            diagnostics: Vec::new(),
        };
        let consensus = vec![TermConsensus {
            term: "(Intercept)".to_string(),
            std_error: Some(0.2),
            n_packages: 1,
        }];

        write_svg_chart(&path, &table, &consensus, &PlotConfig::default()).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("<circle"));
    }

    #[test]
    fn mixed_layouts_and_fit_times_get_their_own_panels() {
        use crate::domain::DataLayout;

        let row = |pkg: &str, layout: DataLayout| TidyRow {
            package_id: pkg.to_string(),
            term: "(Intercept)".to_string(),
            estimate: -2.0,
            std_error: Some(0.2),
            conf_low: Some(-2.4),
            conf_high: Some(-1.6),
            layout: Some(layout),
        };
        let summary = |pkg: &str, layout: DataLayout, secs: f64| PackageSummary {
            package_id: pkg.to_string(),
            layout: Some(layout),
            fit_seconds: Some(secs),
            n_terms: 1,
        };
        let table = UnifiedTable {
            rows: vec![row("lme4", DataLayout::Aggregated), row("inla", DataLayout::Disaggregated)],
            packages: vec![
                summary("lme4", DataLayout::Aggregated, 0.05),
                summary("inla", DataLayout::Disaggregated, 12.5),
            ],
            diagnostics: Vec::new(),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        write_svg_chart(&path, &table, &[], &PlotConfig::default()).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("(Intercept) [aggregated]: estimate"));
        assert!(svg.contains("(Intercept) [disaggregated]: std. error"));
        assert!(svg.contains("fit time (s)"));
    }

    #[test]
    fn empty_table_is_nothing_to_plot() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_svg_chart(
            &dir.path().join("x.svg"),
            &UnifiedTable::default(),
            &[],
            &PlotConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
