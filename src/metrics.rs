//! Metrics for evaluating classifier predictions.

/// Fraction of predictions matching the true labels. Empty input counts
/// as zero accuracy rather than dividing by zero.
pub fn accuracy(predicted: &[usize], labels: &[usize]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = predicted
        .iter()
        .zip(labels)
        .filter(|(p, t)| p == t)
        .count();
    correct as f64 / labels.len() as f64
}

/// Simple confusion matrix (for small num_classes), indexed `[true][predicted]`.
pub fn confusion_matrix(predicted: &[usize], labels: &[usize], num_classes: usize) -> Vec<Vec<usize>> {
    let mut cm = vec![vec![0; num_classes]; num_classes];
    for (&p, &t) in predicted.iter().zip(labels) {
        cm[t][p] += 1;
    }
    cm
}
