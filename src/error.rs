use crate::math::tensor::fmt_shape;

/// Every failure the crate can report.
///
/// Shape and index errors are raised at the offending operation and never
/// retried. Deserialization errors name the token that could not be understood.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A shape with no dimensions or with a zero-sized dimension.
    #[error("invalid shape {}: every dimension must be at least 1", fmt_shape(.shape))]
    InvalidShape { shape: Vec<usize> },

    /// Nested input whose rows do not all have the same length.
    #[error("nested values are not rectangular at depth {depth}")]
    NotRectangular { depth: usize },

    /// Element counts differ where they must agree (reshape, dot product, raw buffers).
    #[error("size mismatch: expected {expected} elements, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    /// Elementwise operands with different shapes.
    #[error("shape mismatch: {} and {}", fmt_shape(.lhs), fmt_shape(.rhs))]
    ShapeMismatch { lhs: Vec<usize>, rhs: Vec<usize> },

    /// Operands of a matrix product that cannot be multiplied.
    #[error("invalid matrix dimensions: {} and {}", fmt_shape(.lhs), fmt_shape(.rhs))]
    InvalidMatrixDimensions { lhs: Vec<usize>, rhs: Vec<usize> },

    /// Wrong number of dimensions.
    #[error("rank mismatch: expected rank {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },

    /// An index past the end of its dimension.
    #[error("index {index} is out of range for dimension {dim} with size {size}")]
    IndexOutOfRange { index: usize, dim: usize, size: usize },

    #[error("unknown activation function `{0}`")]
    UnknownActivation(String),

    #[error("unknown layer type `{0}`")]
    UnknownLayerType(String),

    #[error("unknown loss function `{0}`")]
    UnknownLoss(String),

    /// A sparse class label that is not a valid class index.
    #[error("invalid class label {label} for {classes} classes")]
    InvalidLabel { label: f64, classes: usize },

    /// A model file that ended early or holds a token of the wrong kind.
    #[error("malformed model file: {0}")]
    MalformedModel(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
