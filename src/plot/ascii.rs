//! ASCII interval charts for terminal output.
//!
//! One panel per term (and layout, when mixed), one column per package (packages keep table order so
//! columns line up across panels). Deterministic output, which keeps golden
//! tests simple.
//!
//! Plot elements:
//! - point estimate: `o`
//! - confidence interval: `|`
//! - package key under each column: `1`..`9`, then `a`..`z`

use crate::config::PlotConfig;
use crate::domain::{TidyRow, UnifiedTable};
use crate::plot::facets;

const KEYS: &[u8] = b"123456789abcdefghijklmnopqrstuvwxyz";

/// Render every term of `table`, followed by the package key.
pub fn render_interval_chart(table: &UnifiedTable, plot: &PlotConfig) -> String {
    let packages: Vec<&str> = table.packages.iter().map(|p| p.package_id.as_str()).collect();
    let mut out = String::new();

    for facet in facets(table) {
        let rows = facet.rows(table);
        out.push_str(&render_panel(&facet.title(), &rows, &packages, plot.width, plot.height));
        out.push('\n');
    }

    let legend: Vec<String> = packages
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}={p}", key(i)))
        .collect();
    out.push_str(&format!("Key: {}\n", legend.join("  ")));
    out
}

fn render_panel(title: &str, rows: &[&TidyRow], packages: &[&str], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(rows).unwrap_or((-1.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let mut key_row = vec![' '; width];

    for (i, package) in packages.iter().enumerate() {
        let x = column_x(i, packages.len(), width);
        key_row[x] = key(i);

        let Some(row) = rows.iter().find(|r| r.package_id == *package) else {
            continue;
        };
        if let (Some(lo), Some(hi)) = (row.conf_low, row.conf_high) {
            let top = map_y(hi, y_min, y_max, height);
            let bottom = map_y(lo, y_min, y_max, height);
            for line in grid.iter_mut().take(bottom + 1).skip(top) {
                line[x] = '|';
            }
        }
        grid[map_y(row.estimate, y_min, y_max, height)][x] = 'o';
    }

    let mut out = format!("Term: {title} | y=[{y_min:.3}, {y_max:.3}]\n");
    for line in grid {
        out.push_str(&line.into_iter().collect::<String>());
        out.push('\n');
    }
    out.push_str(&key_row.into_iter().collect::<String>());
    out.push('\n');
    out
}

fn key(idx: usize) -> char {
    KEYS.get(idx).map(|&b| char::from(b)).unwrap_or('+')
}

/// Centre of the `idx`-th of `n` equal slots.
fn column_x(idx: usize, n: usize, width: usize) -> usize {
    ((2 * idx + 1) * width / (2 * n.max(1))).min(width - 1)
}

fn y_range(rows: &[&TidyRow]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for r in rows {
        for v in [Some(r.estimate), r.conf_low, r.conf_high].into_iter().flatten() {
            min_y = min_y.min(v);
            max_y = max_y.max(v);
        }
    }

    if !(min_y.is_finite() && max_y.is_finite()) {
        None
    } else if max_y > min_y {
        Some((min_y, max_y))
    } else {
        // A single value: centre it.
        Some((min_y - 1.0, max_y + 1.0))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataLayout, PackageSummary};

    fn row(pkg: &str, est: f64, lo: f64, hi: f64) -> TidyRow {
        TidyRow {
            package_id: pkg.to_string(),
            term: "(Intercept)".to_string(),
            estimate: est,
            std_error: None,
            conf_low: Some(lo),
            conf_high: Some(hi),
            layout: None,
        }
    }

    fn summary(pkg: &str) -> PackageSummary {
        PackageSummary {
            package_id: pkg.to_string(),
            layout: None,
            fit_seconds: None,
            n_terms: 1,
        }
    }

    #[test]
    fn interval_chart_golden_snapshot_small() {
        let table = UnifiedTable {
            rows: vec![row("A", -2.0, -2.4, -1.6), row("B", -1.98, -2.41, -1.55)],
            packages: vec![summary("A"), summary("B")],
            diagnostics: Vec::new(),
        };
        let plot = PlotConfig {
            width: 10,
            height: 5,
            ..PlotConfig::default()
        };

        let txt = render_interval_chart(&table, &plot);
        let expected = concat!(
            "Term: (Intercept) | y=[-2.453, -1.507]\n",
            "  |    |  \n",
            "  |    |  \n",
            "  o    o  \n",
            "  |    |  \n",
            "  |    |  \n",
            "  1    2  \n",
            "\n",
            "Key: 1=A  2=B\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn package_without_term_leaves_column_empty() {
        let mut other = row("B", 0.5, 0.0, 1.0);
        other.term = "period2".to_string();
        let table = UnifiedTable {
            rows: vec![row("A", -2.0, -2.4, -1.6), other],
            packages: vec![summary("A"), summary("B")],
            diagnostics: Vec::new(),
        };
        let plot = PlotConfig {
            width: 10,
            height: 5,
            ..PlotConfig::default()
        };

        let txt = render_interval_chart(&table, &plot);
        let first_panel: Vec<&str> = txt.lines().skip(1).take(5).collect();
        assert!(first_panel.iter().all(|l| l.chars().nth(7) == Some(' ')));
        assert_eq!(txt.matches("Term: ").count(), 2);
    }

    #[test]
    fn mixed_layouts_get_separate_panels() {
        let mut agg = row("A", -2.0, -2.4, -1.6);
        agg.layout = Some(DataLayout::Aggregated);
        let mut dis = row("B", -1.9, -2.3, -1.5);
        dis.layout = Some(DataLayout::Disaggregated);
        let table = UnifiedTable {
            rows: vec![agg, dis],
            packages: vec![summary("A"), summary("B")],
            diagnostics: Vec::new(),
        };
        let plot = PlotConfig {
            width: 10,
            height: 5,
            ..PlotConfig::default()
        };

        let txt = render_interval_chart(&table, &plot);
        assert!(txt.contains("Term: (Intercept) [aggregated] |"));
        assert!(txt.contains("Term: (Intercept) [disaggregated] |"));
        let first_panel: Vec<&str> = txt.lines().skip(1).take(5).collect();
        assert!(first_panel.iter().all(|l| l.chars().nth(7) == Some(' ')));
    }

    #[test]
    fn column_positions_are_spread_and_in_bounds() {
        assert_eq!(column_x(0, 2, 10), 2);
        assert_eq!(column_x(1, 2, 10), 7);
        assert_eq!(column_x(0, 1, 10), 5);
        assert!(column_x(39, 40, 40) < 40);
    }
}
