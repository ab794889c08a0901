pub mod epoch_stats;
pub mod loop_fn;
pub mod metrics;
pub mod train_config;

pub use epoch_stats::EpochStats;
pub use loop_fn::train_loop;
pub use metrics::{accuracy, mean_squared_error, Metric};
pub use train_config::TrainConfig;
