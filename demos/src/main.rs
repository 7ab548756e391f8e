// demos/src/main.rs
use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use scratch_ml::{
    accuracy, print_model_summary, print_summary_table, SgdConfig, TwoLayerNet,
};

fn main() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);

    #[cfg(feature = "synthetic")]
    {
        use scratch_ml::{generate_synthetic_data, split_train_val_test};

        println!("=== Synthetic Clusters ===");
        let (x, y) = generate_synthetic_data(600, 20, 3, &mut rng);
        let ((x_train, y_train), (x_val, y_val), (x_test, y_test)) =
            split_train_val_test(&x, &y, 400, 100, 100)?;

        let mut net = TwoLayerNet::with_init_scale(20, 32, 3, 0.01, &mut rng)?;
        print_model_summary(&net);

        let cfg = SgdConfig {
            learning_rate: 0.5,
            learning_rate_decay: 0.95,
            reg: 1e-4,
            num_iters: 1000,
            batch_size: 50,
            momentum: 0.9,
            dropout: 1.0,
        };
        let stats = net.train(&x_train, &y_train, &x_val, &y_val, &cfg, true, &mut rng)?;
        print_summary_table(&stats.loss_history, "Training Loss");

        let test_pred = net.predict(&x_test)?;
        println!("Test Accuracy: {:.2}%", accuracy(&test_pred, &y_test) * 100.0);

        // Demo: save and load model
        net.save("models/synthetic_model.gz")?;
        let reloaded = TwoLayerNet::load("models/synthetic_model.gz")?;
        let reloaded_pred = reloaded.predict(&x_test)?;
        println!(
            "Test Accuracy (reloaded): {:.2}%",
            accuracy(&reloaded_pred, &y_test) * 100.0
        );
    }

    #[cfg(feature = "mnist")]
    {
        use scratch_ml::{load_mnist, split_train_val_test};

        println!("\n=== MNIST Subset (first 1000) ===");
        let (mut x, mut y) = load_mnist(true)?;
        x.truncate(1000);
        y.truncate(1000);
        let ((x_train, y_train), (x_val, y_val), _) = split_train_val_test(&x, &y, 800, 200, 0)?;

        let mut net = TwoLayerNet::with_init_scale(784, 64, 10, 0.01, &mut rng)?;
        print_model_summary(&net);

        let cfg = SgdConfig {
            learning_rate: 0.2,
            learning_rate_decay: 0.95,
            reg: 1e-4,
            num_iters: 2000,
            batch_size: 100,
            momentum: 0.9,
            dropout: 0.8,
        };
        let stats = net.train(&x_train, &y_train, &x_val, &y_val, &cfg, true, &mut rng)?;
        print_summary_table(&stats.loss_history, "Training Loss");

        let train_pred = net.predict(&x_train)?;
        println!(
            "MNIST Train Accuracy: {:.2}%",
            accuracy(&train_pred, &y_train) * 100.0
        );
    }

    Ok(())
}
