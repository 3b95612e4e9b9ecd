//! Tabular binomial data.
//!
//! A dataset is a list of [`BinomialRecord`]s in one of two layouts:
//!
//! - aggregated: one record per (group, predictors) cell with `successes / trials`
//! - disaggregated: one record per Bernoulli trial (`trials == 1`)
//!
//! The same model fitted on both layouts has the same fixed effects in
//! theory, which is what the aggregated-vs-disaggregated comparison checks.

use std::collections::HashMap;

use crate::domain::DataLayout;

pub mod cbpp;

pub use cbpp::{cbpp, cbpp_formula};

/// Upper bound on `trials` for a single record.
pub const MAX_TRIALS_PER_RECORD: u32 = 1_000_000;

/// Upper bound on the number of rows a disaggregated dataset may expand to.
pub const MAX_DISAGGREGATED_ROWS: u64 = 10_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinomialRecord {
    /// Random-effect grouping level.
    pub group: String,
    /// Fixed-effect predictor values, aligned with `ModelFormula::fixed`.
    pub predictors: Vec<String>,
    pub successes: u32,
    pub trials: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinomialDataset {
    pub layout: DataLayout,
    pub records: Vec<BinomialRecord>,
}

impl BinomialDataset {
    pub fn total_trials(&self) -> u64 {
        self.records.iter().map(|r| u64::from(r.trials)).sum()
    }

    pub fn total_successes(&self) -> u64 {
        self.records.iter().map(|r| u64::from(r.successes)).sum()
    }

    /// Convert to `layout` (a no-op when already there).
    pub fn to_layout(&self, layout: DataLayout) -> BinomialDataset {
        match (self.layout, layout) {
            (DataLayout::Aggregated, DataLayout::Disaggregated) => self.disaggregate(),
            (DataLayout::Disaggregated, DataLayout::Aggregated) => self.aggregate(),
            _ => self.clone(),
        }
    }

    /// One record per trial: `successes` ones followed by `trials - successes` zeros.
    pub fn disaggregate(&self) -> BinomialDataset {
        let mut records = Vec::with_capacity(self.total_trials().min(MAX_DISAGGREGATED_ROWS) as usize);
        for r in &self.records {
            for i in 0..r.trials {
                records.push(BinomialRecord {
                    group: r.group.clone(),
                    predictors: r.predictors.clone(),
                    successes: u32::from(i < r.successes),
                    trials: 1,
                });
            }
        }
        BinomialDataset {
            layout: DataLayout::Disaggregated,
            records,
        }
    }

    /// Sum records sharing (group, predictors); cells keep first-appearance order.
    pub fn aggregate(&self) -> BinomialDataset {
        let mut index: HashMap<(&str, &[String]), usize> = HashMap::new();
        let mut records: Vec<BinomialRecord> = Vec::new();
        for r in &self.records {
            let key = (r.group.as_str(), r.predictors.as_slice());
            match index.get(&key) {
                Some(&i) => {
                    records[i].successes += r.successes;
                    records[i].trials += r.trials;
                }
                None => {
                    index.insert(key, records.len());
                    records.push(r.clone());
                }
            }
        }
        BinomialDataset {
            layout: DataLayout::Aggregated,
            records,
        }
    }
}
