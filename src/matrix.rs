//! Dense matrix helpers for the batch forward/backward passes.

/// Matrix type
pub type Matrix = Vec<Vec<f64>>;

/// Allocate a rows x cols matrix of zeros.
pub fn zeros(rows: usize, cols: usize) -> Matrix {
    vec![vec![0.0; cols]; rows]
}

/// `a · b` for a: (n x k), b: (k x m).
pub fn matmul(a: &Matrix, b: &Matrix) -> Matrix {
    let n = a.len();
    let k = b.len();
    let m = b.first().map_or(0, |row| row.len());
    let mut out = zeros(n, m);
    for i in 0..n {
        for p in 0..k {
            let a_ip = a[i][p];
            for j in 0..m {
                out[i][j] += a_ip * b[p][j];
            }
        }
    }
    out
}

/// `aᵀ · b` for a: (n x k), b: (n x m), yielding (k x m) without
/// materializing aᵀ.
pub fn matmul_at_b(a: &Matrix, b: &Matrix) -> Matrix {
    let n = a.len();
    let k = a.first().map_or(0, |row| row.len());
    let m = b.first().map_or(0, |row| row.len());
    let mut out = zeros(k, m);
    for i in 0..n {
        for p in 0..k {
            let a_ip = a[i][p];
            for j in 0..m {
                out[p][j] += a_ip * b[i][j];
            }
        }
    }
    out
}

/// `a · bᵀ` for a: (n x m), b: (k x m), yielding (n x k).
pub fn matmul_a_bt(a: &Matrix, b: &Matrix) -> Matrix {
    let n = a.len();
    let k = b.len();
    let mut out = zeros(n, k);
    for (i, row) in a.iter().enumerate() {
        for (j, b_row) in b.iter().enumerate() {
            out[i][j] = row.iter().zip(b_row).map(|(&x, &y)| x * y).sum();
        }
    }
    out
}

/// `x · w + b` with the bias broadcast over rows.
pub fn affine(x: &Matrix, w: &Matrix, b: &[f64]) -> Matrix {
    let mut out = matmul(x, w);
    for row in &mut out {
        for (v, &bias) in row.iter_mut().zip(b) {
            *v += bias;
        }
    }
    out
}

/// Column-wise sum of a matrix, as a vector of length cols. Empty input
/// yields an empty vector.
pub fn col_sum(a: &Matrix) -> Vec<f64> {
    let mut out = vec![0.0; a.first().map_or(0, |row| row.len())];
    for row in a {
        for (s, &v) in out.iter_mut().zip(row) {
            *s += v;
        }
    }
    out
}
