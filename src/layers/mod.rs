pub mod dense;
pub mod layer;
pub mod softmax;

pub use dense::Dense;
pub use layer::Layer;
pub use softmax::Softmax;
