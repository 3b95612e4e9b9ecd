//! Fixed-effect covariance helpers.
//!
//! Some packages report only the covariance matrix of the fixed effects, or
//! its lower Cholesky factor `L` (so that `V = L·Lᵀ`). Standard errors are the
//! square roots of the diagonal of `V`.

use nalgebra::DMatrix;

/// Relative tolerance for symmetry checks and tiny negative variances.
const TOL: f64 = 1e-8;

/// Build a square matrix from row vectors.
pub fn square_from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>, String> {
    let n = rows.len();
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n) {
        return Err(format!("row {i} has {} entries, expected {n}", row.len()));
    }
    Ok(DMatrix::from_fn(n, n, |i, j| rows[i][j]))
}

/// `sqrt(diag(V))` for a covariance matrix.
///
/// Non-finite variances become `None` (not computed). Variances that are
/// negative beyond rounding noise are an error.
pub fn std_errors_from_vcov(vcov: &DMatrix<f64>) -> Result<Vec<Option<f64>>, String> {
    if !vcov.is_square() {
        return Err(format!("covariance is {}x{}, not square", vcov.nrows(), vcov.ncols()));
    }

    let n = vcov.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (vcov[(i, j)], vcov[(j, i)]);
            if a.is_finite() && b.is_finite() && (a - b).abs() > TOL * a.abs().max(b.abs()).max(1.0) {
                return Err(format!("covariance is not symmetric at ({i}, {j})"));
            }
        }
    }

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let v = vcov[(i, i)];
        if !v.is_finite() {
            out.push(None);
        } else if v < -TOL {
            return Err(format!("negative variance {v} on diagonal {i}"));
        } else {
            out.push(Some(v.max(0.0).sqrt()));
        }
    }
    Ok(out)
}

/// Reconstruct `V = L·Lᵀ` from a lower-triangular factor.
pub fn vcov_from_cholesky(lower: &DMatrix<f64>) -> Result<DMatrix<f64>, String> {
    if !lower.is_square() {
        return Err("Cholesky factor is not square".to_string());
    }
    let n = lower.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            if lower[(i, j)].abs() > TOL {
                return Err(format!("Cholesky factor is not lower-triangular at ({i}, {j})"));
            }
        }
    }
    Ok(lower * lower.transpose())
}
