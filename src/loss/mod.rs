pub mod bce;
pub mod cross_entropy;
pub mod huber;
pub mod loss;
pub mod mse;

pub use loss::{Loss, CLIP};

pub fn mse() -> Loss {
    Loss::Mse
}

pub fn huber() -> Loss {
    Loss::Huber
}

pub fn binary_crossentropy(from_logits: bool) -> Loss {
    Loss::BinaryCrossentropy { from_logits }
}

/// Categorical cross-entropy against one-hot rows.
pub fn crossentropy(from_logits: bool) -> Loss {
    Loss::Crossentropy { from_logits }
}

/// Categorical cross-entropy against one integer class index per row.
pub fn sparse_categorical_crossentropy(from_logits: bool) -> Loss {
    Loss::SparseCategoricalCrossentropy { from_logits }
}
