//! Property-based tests for the harmonizer.
//!
//! These check invariants over generated inputs:
//!   - term-name normalization is idempotent
//!   - merging never yields duplicate (package, term) pairs and contains failures
//!   - the long pivot has exactly one row per (row, value column)
//!   - the trimmed-mean consensus ignores a single outlying package

use std::collections::HashSet;

use proptest::prelude::*;

use glmm_compare::domain::{UnifiedTable, ValueColumn};
use glmm_compare::error::FitError;
use glmm_compare::harmonize::{
    ConfidenceSpec, FixedEffects, PackageFit, merge_results, normalize_term_name, sderr_consensus, to_long_format,
};
use glmm_compare::models::{CoefTableFit, RawFit};

fn coef_table(terms: &[String], estimate: &[f64], std_error: &[f64]) -> Box<dyn FixedEffects> {
    Box::new(RawFit::CoefTable(CoefTableFit {
        terms: terms.to_vec(),
        estimate: estimate.to_vec(),
        std_error: std_error.iter().copied().map(Some).collect(),
        conf_low: None,
        conf_high: None,
        conf_level: 0.95,
        converged: true,
        messages: Vec::new(),
    }))
}

/// `n_packages` fits over the same `n_terms` terms; `failing[i]` marks a failed fit.
fn package_fits(n_terms: usize, failing: &[bool], seed: f64) -> Vec<PackageFit> {
    let terms: Vec<String> = (0..n_terms).map(|j| format!("x{j}")).collect();
    failing
        .iter()
        .enumerate()
        .map(|(i, &fails)| {
            let id = format!("pkg{i}");
            if fails {
                PackageFit::failed(id, FitError::ConvergenceFailure("generated".to_string()))
            } else {
                let est: Vec<f64> = (0..n_terms).map(|j| seed + i as f64 * 0.01 - j as f64).collect();
                let se: Vec<f64> = (0..n_terms).map(|j| 0.1 + 0.01 * (i + j) as f64).collect();
                PackageFit::new(id, coef_table(&terms, &est, &se))
            }
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_normalize_is_idempotent(raw in "[a-zA-Z0-9:& ().]{0,24}") {
        let once = normalize_term_name(&raw);
        prop_assert_eq!(normalize_term_name(&once), once.clone());
        prop_assert!(!once.contains(' '));
        prop_assert!(!once.contains('&'));
    }

    #[test]
    fn prop_normalize_is_idempotent_on_any_text(raw in ".{0,32}") {
        let once = normalize_term_name(&raw);
        prop_assert_eq!(normalize_term_name(&once), once);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_merge_has_no_duplicate_pairs(
        n_terms in 1usize..6,
        failing in proptest::collection::vec(any::<bool>(), 1..7),
        seed in -3.0f64..3.0,
    ) {
        let fits = package_fits(n_terms, &failing, seed);
        let table = merge_results(&fits, &ConfidenceSpec::default());

        let n_failed = failing.iter().filter(|&&f| f).count();
        let n_ok = failing.len() - n_failed;

        prop_assert!(table.rows.len() <= failing.len() * n_terms);
        prop_assert_eq!(table.rows.len(), n_ok * n_terms);
        prop_assert_eq!(table.packages.len(), n_ok);
        prop_assert_eq!(table.diagnostics.len(), n_failed);

        let mut seen = HashSet::new();
        for row in &table.rows {
            prop_assert!(seen.insert((row.package_id.clone(), row.term.clone())));
            let (lo, hi) = (row.conf_low.unwrap(), row.conf_high.unwrap());
            prop_assert!(lo <= row.estimate && row.estimate <= hi);
        }
    }

    #[test]
    fn prop_long_format_doubles_rows_in_order(
        n_terms in 1usize..6,
        n_packages in 1usize..6,
    ) {
        let fits = package_fits(n_terms, &vec![false; n_packages], 0.0);
        let table: UnifiedTable = merge_results(&fits, &ConfidenceSpec::disabled());
        let long = to_long_format(&table, &ValueColumn::DEFAULT, &HashSet::new());

        prop_assert_eq!(long.len(), 2 * table.rows.len());
        for (pair, row) in long.chunks(2).zip(&table.rows) {
            prop_assert_eq!(&pair[0].package_id, &row.package_id);
            prop_assert_eq!(&pair[0].term, &row.term);
            prop_assert_eq!(pair[0].variable, ValueColumn::Estimate);
            prop_assert_eq!(pair[1].variable, ValueColumn::StdError);
        }
    }

    #[test]
    fn prop_consensus_ignores_single_outlier(
        cluster in proptest::collection::vec(0.9f64..1.1, 3..9),
        outlier in 2.0f64..20.0,
    ) {
        let mut ses = cluster.clone();
        ses.push(outlier);
        let terms = vec!["(Intercept)".to_string()];
        let fits: Vec<PackageFit> = ses
            .iter()
            .enumerate()
            .map(|(i, &se)| PackageFit::new(format!("pkg{i}"), coef_table(&terms, &[-2.0], &[se])))
            .collect();
        let table = merge_results(&fits, &ConfidenceSpec::disabled());

        let consensus = sderr_consensus(&table, 0.5);
        let value = consensus[0].std_error.unwrap();
        let lo = cluster.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = cluster.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(value >= lo && value <= hi, "consensus {} outside [{}, {}]", value, lo, hi);
    }
}
