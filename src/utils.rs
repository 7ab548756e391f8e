//! Utility helpers: synthetic data and console summaries.
use crate::matrix::Matrix;
use crate::network::TwoLayerNet;
use rand::Rng;
use rand_distr::StandardNormal;

/// Generate a separable synthetic classification set: one Gaussian cluster
/// per class, centered along a distinct axis direction.
pub fn generate_synthetic_data(
    n_samples: usize,
    input_size: usize,
    num_classes: usize,
    rng: &mut impl Rng,
) -> (Matrix, Vec<usize>) {
    let mut x = Vec::with_capacity(n_samples);
    let mut y = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let class = i % num_classes;
        let row: Vec<f64> = (0..input_size)
            .map(|d| {
                let center = if d % num_classes == class { 2.0 } else { 0.0 };
                center + 0.5 * rng.sample::<f64, _>(StandardNormal)
            })
            .collect();
        x.push(row);
        y.push(class);
    }
    (x, y)
}

/// Print model summary
pub fn print_model_summary(net: &TwoLayerNet) {
    println!("Model Summary:\n{}", net);
}

/// Print simple table for losses
pub fn print_summary_table(values: &[f64], title: &str) {
    println!("\n{} Summary Table:", title);
    println!("+----------------+----------+");
    println!("| Range          | Avg Value|");
    println!("+----------------+----------+");
    if !values.is_empty() {
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        println!("| All            | {:>8.6} |", avg);
    }
    println!("+----------------+----------+");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn synthetic_data_has_requested_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let (x, y) = generate_synthetic_data(30, 8, 3, &mut rng);
        assert_eq!(x.len(), 30);
        assert_eq!(y.len(), 30);
        assert!(x.iter().all(|row| row.len() == 8));
        assert!(y.iter().all(|&label| label < 3));
        // All classes represented
        for class in 0..3 {
            assert!(y.contains(&class));
        }
    }
}
