//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the harmonizer stays pure and testable
//! - output changes are localized (important for snapshot tests)

use crate::domain::{DataLayout, ModelFormula, RelativeStdError, TermConsensus, UnifiedTable};
use crate::report::ComparisonReport;

/// Run header: model, confidence level and package counts.
pub fn format_run_summary(
    report: &ComparisonReport,
    formula: Option<&ModelFormula>,
    conf_level: Option<f64>,
) -> String {
    let table = &report.table;
    let mut out = String::new();

    out.push_str("=== gcmp - GLMM package comparison ===\n");
    if let Some(formula) = formula {
        out.push_str(&format!("Model: {formula} ({})\n", formula.family.name()));
    }
    if let Some(level) = conf_level {
        out.push_str(&format!("Confidence level: {:.0}%\n", level * 100.0));
    }
    out.push_str(&format!(
        "Packages: {} compared | {} omitted | terms: {}\n",
        table.packages.len(),
        table.diagnostics.len(),
        table.terms().len(),
    ));
    out.push('\n');
    out
}

/// One line per (package, term), packages in table order.
pub fn format_unified_table(table: &UnifiedTable) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:<22} {:<16} {:<13} {:>10} {:>10} {:>10} {:>10}",
            "package", "term", "layout", "estimate", "std_error", "conf_low", "conf_high"
        ),
    );
    push_line(
        &mut out,
        format!(
            "{:-<22} {:-<16} {:-<13} {:-<10} {:-<10} {:-<10} {:-<10}",
            "", "", "", "", "", "", ""
        ),
    );

    for r in &table.rows {
        push_line(
            &mut out,
            format!(
                "{:<22} {:<16} {:<13} {:>10} {:>10} {:>10} {:>10}",
                truncate(&r.package_id, 22),
                truncate(&r.term, 16),
                fmt_layout(r.layout),
                fmt_num(Some(r.estimate)),
                fmt_num(r.std_error),
                fmt_num(r.conf_low),
                fmt_num(r.conf_high),
            ),
        );
    }
    out
}

/// Packages left out of the table. Empty string when there are none.
pub fn format_diagnostics(table: &UnifiedTable) -> String {
    if table.diagnostics.is_empty() {
        return String::new();
    }
    let mut out = String::from("Omitted packages:\n");
    for d in &table.diagnostics {
        out.push_str(&format!("- {}: {}\n", d.package_id, d.error));
    }
    out
}

/// Consensus standard error per term, then every row relative to it.
pub fn format_std_error_comparison(consensus: &[TermConsensus], relative: &[RelativeStdError]) -> String {
    let mut out = String::from("Std. error consensus (trimmed mean):\n");
    push_line(&mut out, format!("{:<16} {:>10} {:>4}", "term", "consensus", "n"));
    push_line(&mut out, format!("{:-<16} {:-<10} {:-<4}", "", "", ""));
    for c in consensus {
        push_line(
            &mut out,
            format!("{:<16} {:>10} {:>4}", truncate(&c.term, 16), fmt_num(c.std_error), c.n_packages),
        );
    }

    out.push_str("\nStd. error relative to consensus:\n");
    push_line(&mut out, format!("{:<22} {:<16} {:>10} {:>8}", "package", "term", "std_error", "ratio"));
    push_line(&mut out, format!("{:-<22} {:-<16} {:-<10} {:-<8}", "", "", "", ""));
    for r in relative {
        push_line(
            &mut out,
            format!(
                "{:<22} {:<16} {:>10} {:>8}",
                truncate(&r.package_id, 22),
                truncate(&r.term, 16),
                fmt_num(r.std_error),
                r.ratio.map(|v| format!("{v:.3}")).unwrap_or_else(|| "NA".to_string()),
            ),
        );
    }
    out
}

/// Wall-clock fit time per package, where known.
pub fn format_fit_times(table: &UnifiedTable) -> String {
    let mut out = String::from("Fit times:\n");
    for p in &table.packages {
        let secs = p
            .fit_seconds
            .map(|s| format!("{s:.3}s"))
            .unwrap_or_else(|| "n/a".to_string());
        push_line(
            &mut out,
            format!("{:<22} {:<13} {:>10}", truncate(&p.package_id, 22), fmt_layout(p.layout), secs),
        );
    }
    out
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn fmt_num(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.4}"),
        None => "NA".to_string(),
    }
}

fn fmt_layout(layout: Option<DataLayout>) -> &'static str {
    layout.map(DataLayout::label).unwrap_or("-")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
