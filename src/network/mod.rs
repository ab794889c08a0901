pub mod format;
pub mod network;

pub use network::Mlp;
