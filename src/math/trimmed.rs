//! Trimmed mean.
//!
//! Semantics follow the usual statistical convention:
//! - `trim` is the fraction dropped from *each* end of the sorted sample
//! - `trim >= 0.5` yields the median
//! - `k = floor(n · trim)` values are dropped from each end otherwise

/// Trimmed mean of the finite values in `values`.
///
/// Returns `None` when no finite values remain. `trim` is clamped to `[0, 0.5]`.
pub fn trimmed_mean(values: &[f64], trim: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let trim = if trim.is_nan() { 0.0 } else { trim.clamp(0.0, 0.5) };
    if trim >= 0.5 {
        return Some(median_sorted(&sorted));
    }

    let n = sorted.len();
    let k = (n as f64 * trim).floor() as usize;
    let kept = &sorted[k..n - k];
    Some(kept.iter().sum::<f64>() / kept.len() as f64)
}

fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_trim_is_median_and_ignores_outlier() {
        let se = [1.0, 1.05, 0.95, 1.1, 9.0];
        let c = trimmed_mean(&se, 0.5).unwrap();
        assert!((c - 1.05).abs() < 1e-12);
    }

    #[test]
    fn zero_trim_is_plain_mean() {
        let c = trimmed_mean(&[1.0, 2.0, 3.0, 10.0], 0.0).unwrap();
        assert!((c - 4.0).abs() < 1e-12);
    }

    #[test]
    fn partial_trim_drops_floor_from_each_end() {
        // n=5, trim=0.2 -> drop one from each end -> mean(2, 3, 5)
        let c = trimmed_mean(&[5.0, 1.0, 3.0, 100.0, 2.0], 0.2).unwrap();
        assert!((c - (2.0 + 3.0 + 5.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn even_count_median_and_empty_input() {
        assert_eq!(trimmed_mean(&[4.0, 1.0, 3.0, 2.0], 0.5), Some(2.5));
        assert_eq!(trimmed_mean(&[], 0.5), None);
        assert_eq!(trimmed_mean(&[f64::NAN], 0.5), None);
    }
}
