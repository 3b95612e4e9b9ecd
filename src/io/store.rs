//! Persisted summary store.
//!
//! A store is a tidy CSV written by an earlier run (ours, or `broom.mixed::tidy`
//! output saved from R). Rows are grouped back into [`FitResult`]s.
//!
//! Schema problems are fatal: a store that does not look like a tidy table is
//! reported as [`FitError::SchemaMismatch`] and nothing from it is used.
//! Values are checked when the results are appended to a table, with the same
//! rules as freshly extracted fits.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{DataLayout, FitResult, TermEstimate};
use crate::error::FitError;
use crate::harmonize::normalize_term_name;
use crate::io::ingest::normalize_header_name;

pub const REQUIRED_COLUMNS: [&str; 6] = ["package", "term", "estimate", "std_error", "conf_low", "conf_high"];

/// Load a store, grouping rows by `(package, layout)` in first-appearance order.
///
/// A package stored under more than one layout gets one result per layout,
/// with the layout appended to its id (`pkg (aggregated)`).
pub fn load_store(path: &Path) -> Result<Vec<FitResult>, FitError> {
    let source = path.display().to_string();
    let file = File::open(path).map_err(|e| FitError::schema(&source, format!("cannot open: {e}")))?;
    read_store(file, &source)
}

pub fn read_store<R: std::io::Read>(reader: R, source: &str) -> Result<Vec<FitResult>, FitError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| FitError::schema(source, format!("cannot read header: {e}")))?
        .clone();
    let cols = StoreColumns::resolve(&headers, source)?;

    let mut groups: Vec<((String, Option<DataLayout>), FitResult)> = Vec::new();
    let mut index: HashMap<(String, Option<DataLayout>), usize> = HashMap::new();

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| FitError::schema(source, format!("line {line}: {e}")))?;
        let row = cols
            .parse(&record)
            .map_err(|detail| FitError::schema(source, format!("line {line}: {detail}")))?;

        let key = (row.package.clone(), row.layout);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((
                key,
                FitResult {
                    package_id: row.package.clone(),
                    layout: row.layout,
                    fit_seconds: None,
                    terms: Vec::new(),
                },
            ));
            groups.len() - 1
        });
        let fit = &mut groups[slot].1;
        if fit.fit_seconds.is_none() {
            fit.fit_seconds = row.fit_seconds;
        }
        fit.terms.push(row.term);
    }

    if groups.is_empty() {
        return Err(FitError::schema(source, "no data rows"));
    }

    let mut layouts_per_package: HashMap<&str, usize> = HashMap::new();
    for ((package, _), _) in &groups {
        *layouts_per_package.entry(package.as_str()).or_default() += 1;
    }
    let ambiguous: Vec<String> = layouts_per_package
        .into_iter()
        .filter(|&(_, n)| n > 1)
        .map(|(p, _)| p.to_string())
        .collect();

    Ok(groups
        .into_iter()
        .map(|((package, layout), mut fit)| {
            if let Some(layout) = layout.filter(|_| ambiguous.contains(&package)) {
                fit.package_id = format!("{package} ({layout})");
            }
            fit
        })
        .collect())
}

struct StoreRow {
    package: String,
    layout: Option<DataLayout>,
    fit_seconds: Option<f64>,
    term: TermEstimate,
}

struct StoreColumns {
    package: usize,
    term: usize,
    estimate: usize,
    std_error: usize,
    conf_low: usize,
    conf_high: usize,
    layout: Option<usize>,
    aggregated: Option<usize>,
    fit_seconds: Option<usize>,
}

impl StoreColumns {
    fn resolve(headers: &StringRecord, source: &str) -> Result<Self, FitError> {
        let map: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (normalize_header_name(h).replace('.', "_"), i))
            .collect();

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !map.contains_key(*c))
            .collect();
        if !missing.is_empty() {
            return Err(FitError::schema(
                source,
                format!("missing required column(s): {}", missing.join(", ")),
            ));
        }

        let col = |name: &str| map.get(name).copied();
        Ok(Self {
            package: map["package"],
            term: map["term"],
            estimate: map["estimate"],
            std_error: map["std_error"],
            conf_low: map["conf_low"],
            conf_high: map["conf_high"],
            layout: col("layout"),
            aggregated: col("aggregated"),
            fit_seconds: col("fit_seconds"),
        })
    }

    fn parse(&self, record: &StringRecord) -> Result<StoreRow, String> {
        let cell = |i: usize| record.get(i).unwrap_or("").trim();

        let package = cell(self.package);
        if package.is_empty() {
            return Err("empty `package`".to_string());
        }
        let raw_term = cell(self.term);
        if raw_term.is_empty() {
            return Err("empty `term`".to_string());
        }
        let estimate = parse_optional(cell(self.estimate), "estimate")?
            .ok_or_else(|| "`estimate` is undefined".to_string())?;

        let layout = match (self.layout, self.aggregated) {
            (Some(i), _) if !cell(i).is_empty() => Some(parse_layout(cell(i))?),
            (_, Some(i)) if !cell(i).is_empty() => Some(DataLayout::from_aggregated_flag(parse_flag(cell(i))?)),
            _ => None,
        };

        Ok(StoreRow {
            package: package.to_string(),
            layout,
            fit_seconds: match self.fit_seconds {
                Some(i) => parse_optional(cell(i), "fit_seconds")?,
                None => None,
            },
            term: TermEstimate {
                term: normalize_term_name(raw_term),
                estimate,
                std_error: parse_optional(cell(self.std_error), "std_error")?,
                conf_low: parse_optional(cell(self.conf_low), "conf_low")?,
                conf_high: parse_optional(cell(self.conf_high), "conf_high")?,
            },
        })
    }
}

/// Empty, `NA` and `NaN` cells are undefined.
fn parse_optional(s: &str, col: &str) -> Result<Option<f64>, String> {
    if s.is_empty() || s.eq_ignore_ascii_case("na") || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    s.parse::<f64>()
        .map(Some)
        .map_err(|_| format!("invalid `{col}` value '{s}'"))
}

fn parse_layout(s: &str) -> Result<DataLayout, String> {
    match s.to_ascii_lowercase().as_str() {
        "aggregated" => Ok(DataLayout::Aggregated),
        "disaggregated" => Ok(DataLayout::Disaggregated),
        _ => Err(format!("invalid `layout` value '{s}'")),
    }
}

fn parse_flag(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Ok(true),
        "false" | "f" | "0" => Ok(false),
        _ => Err(format!("invalid `aggregated` value '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(text: &str) -> Result<Vec<FitResult>, FitError> {
        read_store(text.as_bytes(), "mem.csv")
    }

    #[test]
    fn accepts_broom_style_headers() {
        let fits = load(
            "package,term,estimate,std.error,conf.low,conf.high\n\
             lme4,(Intercept),-1.4,0.23,-1.85,-0.95\n\
             lme4,period2,-0.99,0.30,NA,NA\n\
             glmmTMB,(Intercept),-1.39,0.23,-1.84,-0.94\n",
        )
        .unwrap();
        assert_eq!(fits.len(), 2);
        assert_eq!(fits[0].package_id, "lme4");
        assert_eq!(fits[0].terms.len(), 2);
        assert_eq!(fits[0].terms[1].conf_low, None);
        assert_eq!(fits[1].package_id, "glmmTMB");
    }

    #[test]
    fn missing_std_error_is_schema_mismatch() {
        let err = load("package,term,estimate,conf_low,conf_high\nA,x,1,0,2\n").unwrap_err();
        match err {
            FitError::SchemaMismatch { detail, .. } => assert!(detail.contains("std_error")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unparseable_estimate_is_schema_mismatch() {
        let err = load("package,term,estimate,std_error,conf_low,conf_high\nA,x,abc,1,0,2\n").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn aggregated_flag_splits_packages_by_layout() {
        let fits = load(
            "package,term,estimate,std_error,conf_low,conf_high,aggregated,fit_seconds\n\
             inla,(Intercept),-2.1,0.3,,,TRUE,1.5\n\
             inla,(Intercept),-2.0,0.3,,,FALSE,40.2\n\
             lme4,(Intercept),-2.05,0.31,,,TRUE,0.2\n",
        )
        .unwrap();
        let ids: Vec<&str> = fits.iter().map(|f| f.package_id.as_str()).collect();
        assert_eq!(ids, vec!["inla (aggregated)", "inla (disaggregated)", "lme4"]);
        assert_eq!(fits[1].fit_seconds, Some(40.2));
        assert_eq!(fits[2].layout, Some(DataLayout::Aggregated));
    }

    #[test]
    fn term_names_are_normalized() {
        let fits = load("package,term,estimate,std_error,conf_low,conf_high\nA,sex&period: 2,1,0.1,,\n").unwrap();
        assert_eq!(fits[0].terms[0].term, "sex:period2");
    }

    #[test]
    fn invalid_stored_values_do_not_reach_the_consensus() {
        use crate::domain::UnifiedTable;
        use crate::harmonize::{append_results, sderr_consensus};

        let fits = load(
            "package,term,estimate,std_error,conf_low,conf_high\n\
             A,x,1.0,-0.3,5.0,6.0\n\
             B,x,inf,0.2,,\n\
             C,x,1.0,inf,,\n\
             D,x,1.0,0.2,0.6,1.4\n\
             E,x,1.1,0.25,5.0,6.0\n",
        )
        .unwrap();
        let mut table = UnifiedTable::default();
        append_results(&mut table, fits);

        let omitted: Vec<&str> = table.diagnostics.iter().map(|d| d.package_id.as_str()).collect();
        assert_eq!(omitted, vec!["A", "B"]);
        let ids: Vec<&str> = table.rows.iter().map(|r| r.package_id.as_str()).collect();
        assert_eq!(ids, vec!["C", "D", "E"]);
        assert_eq!(table.rows[0].std_error, None);
        assert_eq!(table.rows[2].conf_low, None);

        let consensus = sderr_consensus(&table, 0.5);
        assert_eq!(consensus[0].n_packages, 2);
        assert!((consensus[0].std_error.unwrap() - 0.225).abs() < 1e-12);
    }

    #[test]
    fn empty_store_is_schema_mismatch() {
        assert!(load("package,term,estimate,std_error,conf_low,conf_high\n").is_err());
    }
}
