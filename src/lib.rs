//! A from-scratch tensor engine and multilayer perceptron trainer.
//!
//! ```no_run
//! use ferrite_mlp::{loss, Activation, Dense, Mlp, Optimizer, Tensor, TrainConfig};
//!
//! # fn main() -> ferrite_mlp::Result<()> {
//! let mut mlp = Mlp::new(Vec::new(), loss::mse(), Optimizer::default());
//! mlp.add(Dense::new(2, 8, Activation::Tanh)?)
//!    .add(Dense::new(8, 1, Activation::Sigmoid)?);
//!
//! let x = Tensor::array(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]])?;
//! let y = Tensor::array(&[[0.0], [1.0], [1.0], [0.0]])?;
//! mlp.train(&x, &y, None, &TrainConfig::new(1000, 4))?;
//! println!("{}", mlp.run(&x)?);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod data;
pub mod error;
pub mod layers;
pub mod loss;
pub mod math;
pub mod network;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use activation::Activation;
pub use error::{Error, Result};
pub use layers::{Dense, Layer, Softmax};
pub use loss::Loss;
pub use math::{Device, ParallelContext, Tensor};
pub use network::Mlp;
pub use optim::{Adam, Optimizer, Sgd};
pub use train::{EpochStats, Metric, TrainConfig};
