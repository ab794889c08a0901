//! Execution backends for the heavy tensor kernels.
//!
//! Every [`Tensor`](crate::math::tensor::Tensor) carries a [`Device`] tag.
//! Elementwise work always runs on the host buffer; matrix products are
//! routed through the [`Backend`] of the device. All backends read and write
//! the tensor's own buffer, so host and backend views of a tensor alias the
//! same memory and no transfers are needed.

use std::fmt;
use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use crate::error::{Error, Result};

/// A strategy for executing row-major matrix products.
pub trait Backend: Send + Sync {
    /// Short human-readable name, used in logs and summaries.
    fn name(&self) -> &'static str;

    /// Multiplies `lhs` (`m x k`) by `rhs` (`k x n`), returning `m x n`.
    ///
    /// Both operands are row-major and already validated by the caller.
    fn matmul(&self, lhs: &[f64], rhs: &[f64], m: usize, k: usize, n: usize) -> Result<Vec<f64>>;
}

/// Computes one output row of a product. The i-k-j order keeps the inner
/// loop walking both `rhs` and `out` contiguously.
fn matmul_row(lhs_row: &[f64], rhs: &[f64], n: usize, out: &mut [f64]) {
    for (kk, &a) in lhs_row.iter().enumerate() {
        let rhs_row = &rhs[kk * n..(kk + 1) * n];
        for (o, &b) in out.iter_mut().zip(rhs_row) {
            *o += a * b;
        }
    }
}

/// Sequential single-threaded backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl Backend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn matmul(&self, lhs: &[f64], rhs: &[f64], m: usize, k: usize, n: usize) -> Result<Vec<f64>> {
        let mut out = vec![0.0; m * n];
        for (i, row) in out.chunks_mut(n).enumerate() {
            matmul_row(&lhs[i * k..(i + 1) * k], rhs, n, row);
        }
        Ok(out)
    }
}

/// Data-parallel backend backed by a rayon thread pool.
///
/// The pool is owned by this context and built on first use. `init` is
/// idempotent: repeated calls hand back the same pool.
pub struct ParallelContext {
    threads: usize,
    pool: Mutex<Option<Arc<rayon::ThreadPool>>>,
}

impl ParallelContext {
    /// Creates a context that will run on `threads` workers (`0` lets rayon
    /// pick the number of logical CPUs). No threads are spawned yet.
    pub fn new(threads: usize) -> Arc<ParallelContext> {
        Arc::new(ParallelContext {
            threads,
            pool: Mutex::new(None),
        })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Builds the thread pool if it does not exist yet and returns it.
    pub fn init(&self) -> Result<Arc<rayon::ThreadPool>> {
        let mut slot = self
            .pool
            .lock()
            .map_err(|_| Error::Backend("parallel context lock poisoned".to_string()))?;
        if let Some(pool) = slot.as_ref() {
            return Ok(Arc::clone(pool));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(|e| Error::Backend(e.to_string()))?;
        let pool = Arc::new(pool);
        log::debug!(
            "parallel backend initialised with {} threads",
            pool.current_num_threads()
        );
        *slot = Some(Arc::clone(&pool));
        Ok(pool)
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

impl fmt::Debug for ParallelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelContext")
            .field("threads", &self.threads)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Backend for ParallelContext {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn matmul(&self, lhs: &[f64], rhs: &[f64], m: usize, k: usize, n: usize) -> Result<Vec<f64>> {
        let pool = self.init()?;
        let mut out = vec![0.0; m * n];
        // Each task owns exactly one output row.
        pool.install(|| {
            out.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
                matmul_row(&lhs[i * k..(i + 1) * k], rhs, n, row);
            });
        });
        Ok(out)
    }
}

/// Where a tensor's matrix products execute.
#[derive(Clone, Default)]
pub enum Device {
    #[default]
    Cpu,
    Parallel(Arc<ParallelContext>),
}

static CPU: CpuBackend = CpuBackend;

impl Device {
    pub fn backend(&self) -> &dyn Backend {
        match self {
            Device::Cpu => &CPU,
            Device::Parallel(ctx) => ctx.as_ref(),
        }
    }

    pub fn is_cpu(&self) -> bool {
        matches!(self, Device::Cpu)
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Device::Cpu, Device::Cpu) => true,
            (Device::Parallel(a), Device::Parallel(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "Cpu"),
            Device::Parallel(ctx) => write!(f, "Parallel({} threads)", ctx.threads),
        }
    }
}
