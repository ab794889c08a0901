use ferrite_mlp::{loss, Activation, Dense, Mlp, Optimizer, Sgd, Tensor, TrainConfig};

/// Fits y = 2x − 1 with a single linear neuron and Huber loss.
fn main() -> ferrite_mlp::Result<()> {
    let xs: Vec<f64> = (-10..=10).map(|i| i as f64 * 0.5).collect();
    let x = Tensor::from_vec(&[xs.len(), 1], xs.clone())?;
    let y = Tensor::from_vec(&[xs.len(), 1], xs.iter().map(|x| 2.0 * x - 1.0).collect())?;

    let mut network = Mlp::new(Vec::new(), loss::huber(), Optimizer::Sgd(Sgd::new(0.05)));
    network.add(Dense::new(1, 1, Activation::Linear)?);

    let history = network.train(&x, &y, None, &TrainConfig::new(300, 4).with_seed(7))?;
    for stats in history.iter().step_by(50) {
        println!("{stats}");
    }

    let probe = Tensor::array(&[6.9])?;
    println!("f(6.9) = {:.4} (expected 12.8)", network.run(&probe)?.data()[0]);
    Ok(())
}
