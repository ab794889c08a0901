pub mod backend;
pub mod linalg;
pub mod tensor;

pub use backend::{Backend, CpuBackend, Device, ParallelContext};
pub use tensor::{Cursor, NestedValues, Tensor};
