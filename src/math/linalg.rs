//! Matrix algebra and reductions over [`Tensor`].
//!
//! Matrix-matrix products go through the [`Backend`](crate::math::backend::Backend)
//! of the operands' device; everything else runs directly on the host buffer.

use rand::Rng;

use crate::error::{Error, Result};
use crate::math::backend::Device;
use crate::math::tensor::Tensor;

/// The device a binary result lives on: the first non-CPU operand wins.
fn result_device(a: &Tensor, b: &Tensor) -> Device {
    if a.device().is_cpu() {
        b.device().clone()
    } else {
        a.device().clone()
    }
}

fn invalid_dims(a: &Tensor, b: &Tensor) -> Error {
    Error::InvalidMatrixDimensions { lhs: a.shape().to_vec(), rhs: b.shape().to_vec() }
}

/// `Σ aᵢ·bᵢ` over two tensors with the same number of elements.
pub fn dot_product(a: &Tensor, b: &Tensor) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::SizeMismatch { expected: a.len(), got: b.len() });
    }
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

/// Rank-aware matrix product.
///
/// | lhs      | rhs      | result                        |
/// |----------|----------|-------------------------------|
/// | `[n]`    | `[m]`    | outer product `[n, m]`        |
/// | `[n]`    | `[n, m]` | row vector times matrix `[m]` |
/// | `[n, k]` | `[k]`    | matrix times column `[n]`     |
/// | `[n, k]` | `[k, m]` | `[n, m]`                      |
pub fn matrix_multiply(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let device = result_device(a, b);
    let (sa, sb) = (a.shape(), b.shape());
    let out = match (sa.len(), sb.len()) {
        (1, 1) => {
            let mut data = Vec::with_capacity(a.len() * b.len());
            for &x in a.iter() {
                data.extend(b.iter().map(|&y| x * y));
            }
            Tensor::from_vec(&[sa[0], sb[0]], data)?
        }
        (1, 2) => {
            if sa[0] != sb[0] {
                return Err(invalid_dims(a, b));
            }
            let data = device.backend().matmul(a.data(), b.data(), 1, sb[0], sb[1])?;
            Tensor::from_vec(&[sb[1]], data)?
        }
        (2, 1) => {
            if sa[1] != sb[0] {
                return Err(invalid_dims(a, b));
            }
            let data = a
                .data()
                .chunks(sa[1])
                .map(|row| row.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
                .collect();
            Tensor::from_vec(&[sa[0]], data)?
        }
        (2, 2) => {
            if sa[1] != sb[0] {
                return Err(invalid_dims(a, b));
            }
            let data = device.backend().matmul(a.data(), b.data(), sa[0], sa[1], sb[1])?;
            Tensor::from_vec(&[sa[0], sb[1]], data)?
        }
        _ => return Err(invalid_dims(a, b)),
    };
    Ok(out.to_device(device))
}

/// Multiplies stacks of matrices: the trailing two axes are multiplied and
/// every leading axis is treated as an independent batch index.
pub fn batched_matrix_multiply(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let (sa, sb) = (a.shape(), b.shape());
    let rank = sa.len();
    if rank < 2 || sb.len() != rank || sa[..rank - 2] != sb[..rank - 2] || sa[rank - 1] != sb[rank - 2] {
        return Err(invalid_dims(a, b));
    }
    let (m, k, n) = (sa[rank - 2], sa[rank - 1], sb[rank - 1]);
    let batches: usize = sa[..rank - 2].iter().product();
    let device = result_device(a, b);
    let backend = device.backend();

    let mut data = Vec::with_capacity(batches * m * n);
    for i in 0..batches {
        let lhs = &a.data()[i * m * k..(i + 1) * m * k];
        let rhs = &b.data()[i * k * n..(i + 1) * k * n];
        data.extend(backend.matmul(lhs, rhs, m, k, n)?);
    }
    let mut shape = sa[..rank - 2].to_vec();
    shape.extend([m, n]);
    Ok(Tensor::from_vec(&shape, data)?.to_device(device))
}

pub fn transpose(a: &Tensor) -> Result<Tensor> {
    if a.rank() != 2 {
        return Err(Error::RankMismatch { expected: 2, got: a.rank() });
    }
    let (rows, cols) = (a.shape()[0], a.shape()[1]);
    let src = a.data();
    let mut data = vec![0.0; a.len()];
    for i in 0..rows {
        for j in 0..cols {
            data[j * rows + i] = src[i * cols + j];
        }
    }
    Ok(Tensor::from_vec(&[cols, rows], data)?.to_device(a.device().clone()))
}

pub fn sum(a: &Tensor) -> f64 {
    a.iter().sum()
}

pub fn mean(a: &Tensor) -> f64 {
    sum(a) / a.len() as f64
}

pub fn max(a: &Tensor) -> f64 {
    a.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Elementwise power.
pub fn pow(a: &Tensor, p: f64) -> Tensor {
    a.calc(|x| x.powf(p))
}

/// 1.0 where the elements are equal, 0.0 elsewhere.
pub fn equal(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    a.calc_with(b, |x, y| if x == y { 1.0 } else { 0.0 })
}

/// Collapses `axis` (default: the last one) into the index of its maximum.
/// Ties resolve to the first index. Collapsing the only axis of a vector
/// yields shape `[1]`.
pub fn argmax(a: &Tensor, axis: Option<usize>) -> Result<Tensor> {
    let shape = a.shape();
    let axis = axis.unwrap_or(shape.len().saturating_sub(1));
    if axis >= shape.len() {
        return Err(Error::InvalidArgument(format!(
            "axis {axis} is out of range for a tensor of rank {}",
            shape.len()
        )));
    }
    let outer: usize = shape[..axis].iter().product();
    let n = shape[axis];
    let inner: usize = shape[axis + 1..].iter().product();
    let src = a.data();

    let mut data = Vec::with_capacity(outer * inner);
    for o in 0..outer {
        for i in 0..inner {
            let base = o * n * inner + i;
            let mut best = 0;
            for j in 1..n {
                if src[base + j * inner] > src[base + best * inner] {
                    best = j;
                }
            }
            data.push(best as f64);
        }
    }

    let mut out_shape: Vec<usize> = shape.iter().enumerate().filter(|&(d, _)| d != axis).map(|(_, &s)| s).collect();
    if out_shape.is_empty() {
        out_shape.push(1);
    }
    Tensor::from_vec(&out_shape, data)
}

/// Sums a `[rows, cols]` tensor down its rows into `[cols]`. A vector is
/// returned unchanged.
pub fn column_sum(a: &Tensor) -> Result<Tensor> {
    match a.rank() {
        1 => Ok(a.clone()),
        2 => {
            let cols = a.shape()[1];
            let mut data = vec![0.0; cols];
            for row in a.data().chunks(cols) {
                data.iter_mut().zip(row).for_each(|(s, &x)| *s += x);
            }
            Ok(Tensor::from_vec(&[cols], data)?.to_device(a.device().clone()))
        }
        r => Err(Error::RankMismatch { expected: 2, got: r }),
    }
}

/// `input · weights + bias`, with `bias` broadcast along the last axis.
///
/// `input` is `[in]` or `[N, in]`, `weights` is `[in, out]`, `bias` is `[out]`.
pub fn dense_forward(input: &Tensor, weights: &Tensor, bias: &Tensor) -> Result<Tensor> {
    let mut out = matrix_multiply(input, weights)?;
    let width = *out.shape().last().unwrap_or(&0);
    if bias.rank() != 1 || bias.len() != width {
        return Err(Error::ShapeMismatch { lhs: out.shape().to_vec(), rhs: bias.shape().to_vec() });
    }
    for row in out.data_mut().chunks_mut(width) {
        row.iter_mut().zip(bias.iter()).for_each(|(x, &b)| *x += b);
    }
    Ok(out)
}

/// `ln Σ exp(xᵢ)`, computed with the maximum factored out so that large
/// inputs cannot overflow.
pub fn log_sum_exp(row: &[f64]) -> f64 {
    let m = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if m.is_infinite() {
        return m;
    }
    m + row.iter().map(|&x| (x - m).exp()).sum::<f64>().ln()
}

/// Writes `softmax(row)` into `out`, subtracting the row maximum first.
pub(crate) fn softmax_row(row: &[f64], out: &mut [f64]) {
    let m = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for (o, &x) in out.iter_mut().zip(row) {
        *o = (x - m).exp();
        total += *o;
    }
    out.iter_mut().for_each(|o| *o /= total);
}

/// Row-wise softmax of a vector or a `[rows, cols]` batch.
pub fn softmax(a: &Tensor) -> Result<Tensor> {
    if a.rank() == 0 || a.rank() > 2 {
        return Err(Error::RankMismatch { expected: 2, got: a.rank() });
    }
    let (_, cols) = a.row_view();
    let mut out = a.clone();
    for (src, dst) in a.data().chunks(cols).zip(out.data_mut().chunks_mut(cols)) {
        softmax_row(src, dst);
    }
    Ok(out)
}

/// Samples an index from a probability vector with one uniform draw.
///
/// When rounding leaves the cumulative sum short of the draw, the last index
/// is returned.
pub fn random_choice<R: Rng + ?Sized>(p: &Tensor, rng: &mut R) -> usize {
    let mut draw: f64 = rng.gen();
    for (i, &prob) in p.iter().enumerate() {
        if draw < prob {
            return i;
        }
        draw -= prob;
    }
    p.len().saturating_sub(1)
}
