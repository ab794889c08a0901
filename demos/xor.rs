use ferrite_mlp::{loss, Activation, Dense, Metric, Mlp, Optimizer, Sgd, Tensor, TrainConfig};

fn main() -> ferrite_mlp::Result<()> {
    let mut network = Mlp::new(Vec::new(), loss::mse(), Optimizer::Sgd(Sgd::new(0.5)));
    network
        .add(Dense::new(2, 4, Activation::Tanh)?)
        .add(Dense::new(4, 1, Activation::Sigmoid)?);

    let inputs = Tensor::array(&[[1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]])?;
    let expected_outputs = Tensor::array(&[[1.0], [0.0], [1.0], [0.0]])?;

    let (tx, rx) = std::sync::mpsc::channel();
    let config = TrainConfig::new(5000, 4)
        .with_seed(42)
        .with_metrics([Metric::Accuracy])
        .with_progress(tx);
    network.train(&inputs, &expected_outputs, None, &config)?;

    for stats in rx.try_iter().filter(|s| s.epoch % 1000 == 0) {
        let acc = stats.train_metric(Metric::Accuracy).unwrap_or(0.0);
        println!("Epoch {}: loss = {:.6}, accuracy = {:.2}", stats.epoch, stats.train_loss, acc);
    }

    let outputs = network.run(&inputs)?;
    for (input, output) in inputs.data().chunks(2).zip(outputs.iter()) {
        println!("Input: {:?} -> Output: {:.4}", input, output);
    }
    println!("{network}");
    Ok(())
}
