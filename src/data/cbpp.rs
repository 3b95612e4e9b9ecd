//! Contagious bovine pleuropneumonia (CBPP) incidence data.
//!
//! Serological incidence of CBPP in 15 commercial zebu herds in Ethiopia,
//! observed over four periods (as distributed with the lme4 R package as
//! `cbpp`). Columns: `herd`, `incidence` (new cases), `size` (herd size at
//! the start of the period), `period`.

use crate::data::{BinomialDataset, BinomialRecord};
use crate::domain::{DataLayout, Family, ModelFormula};

/// `(herd, incidence, size, period)`
const CBPP: [(u8, u32, u32, u8); 56] = [
    (1, 2, 14, 1),
    (1, 3, 12, 2),
    (1, 4, 9, 3),
    (1, 0, 5, 4),
    (2, 3, 22, 1),
    (2, 1, 18, 2),
    (2, 1, 21, 3),
    (3, 8, 22, 1),
    (3, 2, 16, 2),
    (3, 0, 16, 3),
    (3, 2, 20, 4),
    (4, 2, 10, 1),
    (4, 0, 10, 2),
    (4, 0, 9, 3),
    (4, 0, 6, 4),
    (5, 5, 18, 1),
    (5, 0, 25, 2),
    (5, 0, 24, 3),
    (5, 1, 4, 4),
    (6, 3, 17, 1),
    (6, 0, 17, 2),
    (6, 0, 18, 3),
    (6, 0, 20, 4),
    (7, 8, 16, 1),
    (7, 12, 16, 2),
    (7, 2, 16, 3),
    (7, 1, 15, 4),
    (8, 1, 20, 1),
    (8, 1, 20, 2),
    (8, 0, 19, 3),
    (8, 0, 19, 4),
    (9, 2, 10, 1),
    (9, 0, 9, 2),
    (9, 0, 4, 3),
    (9, 0, 4, 4),
    (10, 0, 5, 1),
    (10, 2, 7, 2),
    (10, 0, 6, 3),
    (11, 1, 7, 1),
    (11, 1, 7, 2),
    (11, 0, 15, 3),
    (11, 0, 3, 4),
    (12, 2, 8, 1),
    (12, 1, 15, 2),
    (12, 0, 11, 3),
    (12, 0, 12, 4),
    (13, 1, 14, 1),
    (13, 0, 12, 2),
    (13, 0, 6, 3),
    (13, 0, 4, 4),
    (14, 11, 24, 1),
    (14, 0, 12, 2),
    (14, 0, 6, 3),
    (14, 0, 9, 4),
    (15, 1, 3, 1),
    (15, 1, 4, 2),
];

/// The standard CBPP model: `cbind(incidence, size - incidence) ~ period + (1 | herd)`.
pub fn cbpp_formula() -> ModelFormula {
    ModelFormula {
        response: "incidence".to_string(),
        trials: Some("size".to_string()),
        fixed: vec!["period".to_string()],
        group: "herd".to_string(),
        family: Family::Binomial,
    }
}

/// CBPP in the aggregated layout.
pub fn cbpp() -> BinomialDataset {
    let records = CBPP
        .iter()
        .map(|&(herd, incidence, size, period)| BinomialRecord {
            group: herd.to_string(),
            predictors: vec![period.to_string()],
            successes: incidence,
            trials: size,
        })
        .collect();
    BinomialDataset {
        layout: DataLayout::Aggregated,
        records,
    }
}
