//! Small dense linear algebra for normal equations.

use crate::error::{RegressionError, Result};
use ndarray::{Array1, Array2};

/// Relative pivot tolerance below which a matrix is treated as singular.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Invert a square matrix by Gauss-Jordan elimination with partial pivoting.
///
/// # Errors
/// Returns [`RegressionError::Singular`] when a pivot is negligible relative
/// to the largest entry of `a`.
pub fn invert(a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    if n == 0 || a.ncols() != n {
        return Err(RegressionError::Singular(format!(
            "expected a non-empty square matrix, got {}x{}",
            a.nrows(),
            a.ncols()
        )));
    }

    let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return Err(RegressionError::Singular("matrix is zero or non-finite".to_string()));
    }

    // Augmented matrix [A | I]
    let mut aug = Array2::<f64>::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = aug[[col, col]].abs();
        for row in (col + 1)..n {
            if aug[[row, col]].abs() > max_val {
                max_val = aug[[row, col]].abs();
                max_row = row;
            }
        }

        if max_val <= PIVOT_TOLERANCE * scale {
            return Err(RegressionError::Singular(
                "matrix is singular or nearly singular".to_string(),
            ));
        }

        if max_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[[row, col]];
            if factor != 0.0 {
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    let mut inv = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            inv[[i, j]] = aug[[i, n + j]];
        }
    }
    Ok(inv)
}

/// Solve `A x = b` through [`invert`].
pub fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    if b.len() != a.nrows() {
        return Err(RegressionError::DimensionMismatch {
            name: "rhs".to_string(),
            expected: a.nrows(),
            actual: b.len(),
        });
    }
    Ok(invert(a)?.dot(b))
}
