//! Softmax and cross-entropy helpers for the classification loss.
use crate::matrix::Matrix;

/// Numerically-stable softmax applied to each row of a score matrix.
///
/// The row maximum is subtracted before exponentiation so large logits do
/// not overflow.
pub fn softmax_rows(scores: &Matrix) -> Matrix {
    scores
        .iter()
        .map(|row| {
            let max = row.iter().fold(f64::MIN, |a, &b| a.max(b));
            let exps: Vec<f64> = row.iter().map(|&v| (v - max).exp()).collect();
            let sum: f64 = exps.iter().sum();
            exps.into_iter().map(|e| e / sum).collect()
        })
        .collect()
}

/// Mean negative log-likelihood of the true class per row.
///
/// `probs` is a row-stochastic matrix (softmax output); `y[i]` indexes the
/// true class of row `i`. Callers validate label range before this point.
pub fn cross_entropy(probs: &Matrix, y: &[usize]) -> f64 {
    let total: f64 = probs
        .iter()
        .zip(y)
        .map(|(row, &label)| -row[label].ln())
        .sum();
    total / probs.len() as f64
}

/// L2 penalty `0.5 * reg * Σ w²` over one weight matrix.
pub fn l2_penalty(w: &Matrix, reg: f64) -> f64 {
    0.5 * reg * w.iter().flatten().map(|&v| v * v).sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_rows_are_distributions() {
        let scores = vec![vec![1.0, 2.0, 3.0], vec![-1.0, 0.0, 1.0]];
        let probs = softmax_rows(&scores);
        for row in &probs {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);
            assert!(row.iter().all(|&p| p > 0.0));
        }
        // Larger logit, larger probability
        assert!(probs[0][2] > probs[0][1] && probs[0][1] > probs[0][0]);
    }

    #[test]
    fn softmax_stable_under_large_logits() {
        let scores = vec![vec![1000.0, 1001.0, 999.0]];
        let probs = softmax_rows(&scores);
        assert!(probs[0].iter().all(|p| p.is_finite()));
        let sum: f64 = probs[0].iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cross_entropy_of_certain_prediction_is_zero() {
        let probs = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let loss = cross_entropy(&probs, &[0, 1]);
        assert!(loss.abs() < 1e-12);
    }

    #[test]
    fn cross_entropy_uniform_is_log_c() {
        let probs = vec![vec![0.25; 4]];
        let loss = cross_entropy(&probs, &[2]);
        assert!((loss - 4.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn l2_penalty_halved_and_scaled() {
        let w = vec![vec![1.0, 2.0], vec![3.0, 0.0]];
        assert!((l2_penalty(&w, 0.1) - 0.5 * 0.1 * 14.0).abs() < 1e-12);
        assert_eq!(l2_penalty(&w, 0.0), 0.0);
    }
}
