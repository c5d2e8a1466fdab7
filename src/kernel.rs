//! Per-row bodies of the two benchmark kernels.
//!
//! Each function touches exactly one output row, so any assignment of rows to execution units
//! gives the same result.

/// Number of rows sharing one divisor in the skewed bound table.
pub const BOUND_BAND: usize = 30;

/// Inner iteration bound of row `row` for the skewed kernel of size `n`.
///
/// A row is expensive (`n`) when `row % (3 * (row / 30) + 1) == 0` and cheap (`1`) otherwise.
/// The division truncates, so rows 0 to 29 divide by one and are all expensive.
pub fn row_bound(row: usize, n: usize) -> usize {
    if row % (3 * (row / BOUND_BAND) + 1) == 0 {
        n
    } else {
        1
    }
}

/// Triangular sweep of row `row`: `a[j] += cos(b[j])` for `j` from the last column down to
/// `row + 1`. Cells at or left of the diagonal are never touched.
pub fn triangular_row(row: usize, b: &[f64], a: &mut [f64]) {
    for j in (row + 1..a.len()).rev() {
        a[j] += b[j].cos();
    }
}

/// Skewed sweep of one row: for `j` in `0..bound` and `k` in `0..j`,
/// `acc += (k + 1) * ln(b[j]) * inv_n2`.
///
/// `b[..bound]` has to be strictly positive.
pub fn skewed_row(b: &[f64], bound: usize, inv_n2: f64, acc: &mut f64) {
    for (j, value) in b[..bound].iter().enumerate() {
        let ln = value.ln();
        for k in 0..j {
            *acc += (k + 1) as f64 * ln * inv_n2;
        }
    }
}
