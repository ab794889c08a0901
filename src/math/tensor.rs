use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::backend::Device;

/// An N-dimensional array of `f64` stored contiguously in row-major order.
///
/// `strides[i]` is the number of elements skipped when `index[i]` grows by
/// one, i.e. the product of `shape[i + 1..]`. The buffer always holds exactly
/// `product(shape)` elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TensorRepr", into = "TensorRepr")]
pub struct Tensor {
    shape: Vec<usize>,
    strides: Vec<usize>,
    data: Vec<f64>,
    device: Device,
}

/// On-disk form of a tensor: strides and device are derived on load.
#[derive(Serialize, Deserialize)]
struct TensorRepr {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl From<Tensor> for TensorRepr {
    fn from(t: Tensor) -> Self {
        TensorRepr { shape: t.shape, data: t.data }
    }
}

impl TryFrom<TensorRepr> for Tensor {
    type Error = Error;

    fn try_from(repr: TensorRepr) -> Result<Self> {
        Tensor::from_vec(&repr.shape, repr.data)
    }
}

/// Formats a shape the way error messages and summaries print it: `(3, 2)`.
pub fn fmt_shape(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    format!("({})", dims.join(", "))
}

fn strides_for(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

fn validate_shape(shape: &[usize]) -> Result<usize> {
    if shape.is_empty() || shape.contains(&0) {
        return Err(Error::InvalidShape { shape: shape.to_vec() });
    }
    Ok(shape.iter().product())
}

impl Tensor {
    /// Creates a tensor of the given shape with every element set to `fill`.
    pub fn new(shape: &[usize], fill: f64) -> Result<Tensor> {
        let len = validate_shape(shape)?;
        Ok(Tensor {
            shape: shape.to_vec(),
            strides: strides_for(shape),
            data: vec![fill; len],
            device: Device::Cpu,
        })
    }

    pub fn zeros(shape: &[usize]) -> Result<Tensor> {
        Tensor::new(shape, 0.0)
    }

    pub fn ones(shape: &[usize]) -> Result<Tensor> {
        Tensor::new(shape, 1.0)
    }

    /// Uniform samples in `[0, 1)` from the thread-local RNG.
    pub fn rand(shape: &[usize]) -> Result<Tensor> {
        Tensor::rand_with(shape, &mut rand::thread_rng())
    }

    pub fn rand_with<R: Rng + ?Sized>(shape: &[usize], rng: &mut R) -> Result<Tensor> {
        let mut t = Tensor::zeros(shape)?;
        t.data.iter_mut().for_each(|x| *x = rng.gen::<f64>());
        Ok(t)
    }

    /// Samples from `N(mean, std_dev)` using the thread-local RNG.
    pub fn randn(shape: &[usize], mean: f64, std_dev: f64) -> Result<Tensor> {
        Tensor::randn_with(shape, mean, std_dev, &mut rand::thread_rng())
    }

    pub fn randn_with<R: Rng + ?Sized>(
        shape: &[usize],
        mean: f64,
        std_dev: f64,
        rng: &mut R,
    ) -> Result<Tensor> {
        let normal = Normal::new(mean, std_dev)
            .map_err(|e| Error::InvalidArgument(format!("normal distribution: {e}")))?;
        let mut t = Tensor::zeros(shape)?;
        t.data.iter_mut().for_each(|x| *x = normal.sample(rng));
        Ok(t)
    }

    /// Wraps an existing row-major buffer.
    pub fn from_vec(shape: &[usize], data: Vec<f64>) -> Result<Tensor> {
        let len = validate_shape(shape)?;
        if data.len() != len {
            return Err(Error::SizeMismatch { expected: len, got: data.len() });
        }
        Ok(Tensor {
            shape: shape.to_vec(),
            strides: strides_for(shape),
            data,
            device: Device::Cpu,
        })
    }

    /// Builds a tensor from nested values, inferring the shape from the
    /// nesting depth and the length of each level.
    ///
    /// ```
    /// use ferrite_mlp::Tensor;
    /// let t = Tensor::array(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();
    /// assert_eq!(t.shape(), &[3, 2]);
    /// ```
    pub fn array<A: NestedValues + ?Sized>(values: &A) -> Result<Tensor> {
        let mut shape = Vec::new();
        let mut data = Vec::new();
        values.flatten_into(0, &mut shape, &mut data)?;
        if shape.is_empty() {
            // a bare scalar
            shape.push(1);
        }
        Tensor::from_vec(&shape, data)
    }

    /// Stacks equal-shaped tensors along a new leading axis.
    pub fn stack(items: &[Tensor]) -> Result<Tensor> {
        let first = items.first().ok_or(Error::InvalidShape { shape: vec![0] })?;
        let mut shape = Vec::with_capacity(first.rank() + 1);
        shape.push(items.len());
        shape.extend_from_slice(&first.shape);
        let mut data = Vec::with_capacity(first.len() * items.len());
        for item in items {
            first.check_same_shape(item)?;
            data.extend_from_slice(&item.data);
        }
        Ok(Tensor::from_vec(&shape, data)?.to_device(first.device.clone()))
    }

    /// Moves the buffer out, leaving `self` empty (no shape, no data).
    pub fn take(&mut self) -> Tensor {
        Tensor {
            shape: std::mem::take(&mut self.shape),
            strides: std::mem::take(&mut self.strides),
            data: std::mem::take(&mut self.data),
            device: self.device.clone(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Retags the tensor. The buffer itself never moves.
    pub fn to_device(mut self, device: Device) -> Tensor {
        self.device = device;
        self
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the leading axis.
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Views the tensor as `rows x cols`: a rank-1 tensor is a single row,
    /// higher ranks keep axis 0 and flatten the rest.
    pub(crate) fn row_view(&self) -> (usize, usize) {
        match self.shape.len() {
            0 => (0, 0),
            1 => (1, self.shape[0]),
            _ => (self.shape[0], self.len() / self.shape[0]),
        }
    }

    fn offset(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.shape.len() {
            return Err(Error::RankMismatch { expected: self.shape.len(), got: index.len() });
        }
        let mut offset = 0;
        for (dim, ((&i, &size), &stride)) in index.iter().zip(&self.shape).zip(&self.strides).enumerate() {
            if i >= size {
                return Err(Error::IndexOutOfRange { index: i, dim, size });
            }
            offset += i * stride;
        }
        Ok(offset)
    }

    pub fn at(&self, index: &[usize]) -> Result<f64> {
        Ok(self.data[self.offset(index)?])
    }

    pub fn at_mut(&mut self, index: &[usize]) -> Result<&mut f64> {
        let offset = self.offset(index)?;
        Ok(&mut self.data[offset])
    }

    pub fn set(&mut self, index: &[usize], value: f64) -> Result<()> {
        *self.at_mut(index)? = value;
        Ok(())
    }

    /// Changes the shape without touching the data.
    pub fn reshape(&mut self, shape: &[usize]) -> Result<()> {
        let len = validate_shape(shape)?;
        if len != self.len() {
            return Err(Error::SizeMismatch { expected: self.len(), got: len });
        }
        self.shape = shape.to_vec();
        self.strides = strides_for(shape);
        Ok(())
    }

    pub fn reshaped(mut self, shape: &[usize]) -> Result<Tensor> {
        self.reshape(shape)?;
        Ok(self)
    }

    /// Gathers the given indices along axis 0 into a new tensor.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Tensor> {
        if self.rank() == 0 {
            return Err(Error::RankMismatch { expected: 1, got: 0 });
        }
        let rows = self.rows();
        let row_len = self.len() / rows.max(1);
        let mut shape = self.shape.clone();
        shape[0] = indices.len();
        let mut data = Vec::with_capacity(indices.len() * row_len);
        for &i in indices {
            if i >= rows {
                return Err(Error::IndexOutOfRange { index: i, dim: 0, size: rows });
            }
            data.extend_from_slice(&self.data[i * row_len..(i + 1) * row_len]);
        }
        Ok(Tensor::from_vec(&shape, data)?.to_device(self.device.clone()))
    }

    fn check_same_shape(&self, other: &Tensor) -> Result<()> {
        if self.shape != other.shape {
            return Err(Error::ShapeMismatch { lhs: self.shape.clone(), rhs: other.shape.clone() });
        }
        Ok(())
    }

    /// Returns a copy with `f` applied to every element.
    pub fn calc<F: Fn(f64) -> f64>(&self, f: F) -> Tensor {
        Tensor {
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            data: self.data.iter().map(|&x| f(x)).collect(),
            device: self.device.clone(),
        }
    }

    /// Applies `f` to every element in place.
    pub fn apply<F: Fn(f64) -> f64>(&mut self, f: F) -> &mut Tensor {
        self.data.iter_mut().for_each(|x| *x = f(*x));
        self
    }

    /// Combines two equal-shaped tensors elementwise into a new tensor.
    pub fn calc_with<F: Fn(f64, f64) -> f64>(&self, other: &Tensor, f: F) -> Result<Tensor> {
        self.check_same_shape(other)?;
        Ok(Tensor {
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            data: self.data.iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect(),
            device: self.device.clone(),
        })
    }

    /// In-place counterpart of [`Tensor::calc_with`].
    pub fn apply_with<F: Fn(f64, f64) -> f64>(&mut self, other: &Tensor, f: F) -> Result<()> {
        self.check_same_shape(other)?;
        self.data.iter_mut().zip(&other.data).for_each(|(a, &b)| *a = f(*a, b));
        Ok(())
    }

    pub fn add(&self, other: &Tensor) -> Result<Tensor> {
        self.calc_with(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Tensor) -> Result<Tensor> {
        self.calc_with(other, |a, b| a - b)
    }

    pub fn mul(&self, other: &Tensor) -> Result<Tensor> {
        self.calc_with(other, |a, b| a * b)
    }

    pub fn div(&self, other: &Tensor) -> Result<Tensor> {
        self.calc_with(other, |a, b| a / b)
    }

    pub fn add_in_place(&mut self, other: &Tensor) -> Result<()> {
        self.apply_with(other, |a, b| a + b)
    }

    pub fn sub_in_place(&mut self, other: &Tensor) -> Result<()> {
        self.apply_with(other, |a, b| a - b)
    }

    pub fn mul_in_place(&mut self, other: &Tensor) -> Result<()> {
        self.apply_with(other, |a, b| a * b)
    }

    pub fn div_in_place(&mut self, other: &Tensor) -> Result<()> {
        self.apply_with(other, |a, b| a / b)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, f64> {
        self.data.iter_mut()
    }

    /// A random-access cursor positioned at the first element.
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor { data: &self.data, pos: 0 }
    }

    /// A cursor positioned one past the last element.
    pub fn cursor_end(&self) -> Cursor<'_> {
        Cursor { data: &self.data, pos: self.data.len() }
    }

    fn fmt_level(&self, f: &mut fmt::Formatter<'_>, dim: usize, offset: usize) -> fmt::Result {
        write!(f, "[")?;
        for i in 0..self.shape[dim] {
            if i > 0 {
                write!(f, ", ")?;
            }
            let at = offset + i * self.strides[dim];
            if dim + 1 == self.shape.len() {
                write!(f, "{}", self.data[at])?;
            } else {
                self.fmt_level(f, dim + 1, at)?;
            }
        }
        write!(f, "]")
    }
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.data == other.data
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.shape.is_empty() {
            return write!(f, "[]");
        }
        self.fmt_level(f, 0, 0)
    }
}

impl<'a> IntoIterator for &'a Tensor {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

macro_rules! scalar_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:tt) => {
        impl $trait<f64> for &Tensor {
            type Output = Tensor;

            fn $method(self, rhs: f64) -> Tensor {
                self.calc(|x| x $op rhs)
            }
        }

        impl $assign_trait<f64> for Tensor {
            fn $assign_method(&mut self, rhs: f64) {
                self.apply(|x| x $op rhs);
            }
        }
    };
}

scalar_op!(Add, add, AddAssign, add_assign, +);
scalar_op!(Sub, sub, SubAssign, sub_assign, -);
scalar_op!(Mul, mul, MulAssign, mul_assign, *);
scalar_op!(Div, div, DivAssign, div_assign, /);

impl Mul<&Tensor> for f64 {
    type Output = Tensor;

    fn mul(self, rhs: &Tensor) -> Tensor {
        rhs.calc(|x| self * x)
    }
}

impl Neg for &Tensor {
    type Output = Tensor;

    fn neg(self) -> Tensor {
        self.calc(|x| -x)
    }
}

impl Neg for Tensor {
    type Output = Tensor;

    fn neg(mut self) -> Tensor {
        self.apply(|x| -x);
        self
    }
}

/// A position in a tensor's flat buffer that can move freely in both
/// directions, independent of the tensor's rank.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    data: &'a [f64],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The element under the cursor, or `None` when it is past the end.
    pub fn get(&self) -> Option<f64> {
        self.data.get(self.pos).copied()
    }

    pub fn inc(&mut self) -> &mut Self {
        self.pos += 1;
        self
    }

    pub fn dec(&mut self) -> &mut Self {
        self.pos = self.pos.saturating_sub(1);
        self
    }

    /// Moves by `k` elements; negative values move backwards.
    pub fn advance(&mut self, k: isize) -> &mut Self {
        self.pos = self.pos.saturating_add_signed(k);
        self
    }

    pub fn is_end(&self) -> bool {
        self.pos >= self.data.len()
    }
}

impl PartialEq for Cursor<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.data, other.data) && self.pos == other.pos
    }
}

impl PartialOrd for Cursor<'_> {
    /// Cursors over different buffers are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if std::ptr::eq(self.data, other.data) {
            Some(self.pos.cmp(&other.pos))
        } else {
            None
        }
    }
}

/// Values that can be flattened into a rectangular tensor.
///
/// Implemented for `f64` and for slices, arrays and vectors of anything
/// that is itself `NestedValues`.
pub trait NestedValues {
    fn flatten_into(&self, depth: usize, shape: &mut Vec<usize>, data: &mut Vec<f64>) -> Result<()>;
}

impl NestedValues for f64 {
    fn flatten_into(&self, depth: usize, shape: &mut Vec<usize>, data: &mut Vec<f64>) -> Result<()> {
        if shape.len() != depth {
            return Err(Error::NotRectangular { depth });
        }
        data.push(*self);
        Ok(())
    }
}

impl<T: NestedValues> NestedValues for [T] {
    fn flatten_into(&self, depth: usize, shape: &mut Vec<usize>, data: &mut Vec<f64>) -> Result<()> {
        if self.is_empty() {
            let mut bad = shape.clone();
            bad.truncate(depth);
            bad.push(0);
            return Err(Error::InvalidShape { shape: bad });
        }
        match shape.get(depth) {
            Some(&len) if len != self.len() => return Err(Error::NotRectangular { depth }),
            Some(_) => {}
            None => {
                // an earlier sibling already bottomed out at this depth
                if shape.len() != depth || !data.is_empty() {
                    return Err(Error::NotRectangular { depth });
                }
                shape.push(self.len());
            }
        }
        for item in self {
            item.flatten_into(depth + 1, shape, data)?;
        }
        Ok(())
    }
}

impl<T: NestedValues, const N: usize> NestedValues for [T; N] {
    fn flatten_into(&self, depth: usize, shape: &mut Vec<usize>, data: &mut Vec<f64>) -> Result<()> {
        self.as_slice().flatten_into(depth, shape, data)
    }
}

impl<T: NestedValues> NestedValues for Vec<T> {
    fn flatten_into(&self, depth: usize, shape: &mut Vec<usize>, data: &mut Vec<f64>) -> Result<()> {
        self.as_slice().flatten_into(depth, shape, data)
    }
}

impl<T: NestedValues + ?Sized> NestedValues for &T {
    fn flatten_into(&self, depth: usize, shape: &mut Vec<usize>, data: &mut Vec<f64>) -> Result<()> {
        (**self).flatten_into(depth, shape, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_zero_and_empty_shapes() {
        assert!(matches!(Tensor::new(&[2, 0], 1.0), Err(Error::InvalidShape { .. })));
        assert!(matches!(Tensor::zeros(&[]), Err(Error::InvalidShape { .. })));
        let t = Tensor::new(&[2, 3], 1.5).unwrap();
        assert_eq!(t.len(), 6);
        assert_eq!(t.strides(), &[3, 1]);
        assert!(t.iter().all(|&x| x == 1.5));
    }

    #[test]
    fn strides_are_products_of_trailing_dims() {
        let t = Tensor::zeros(&[2, 3, 4]).unwrap();
        assert_eq!(t.strides(), &[12, 4, 1]);
    }

    #[test]
    fn array_infers_shape_and_rejects_ragged_input() {
        let t = Tensor::array(&vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.at(&[1, 0]).unwrap(), 4.0);

        let cube = Tensor::array(&[[[1.0], [2.0]], [[3.0], [4.0]]]).unwrap();
        assert_eq!(cube.shape(), &[2, 2, 1]);

        let ragged = Tensor::array(&vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(ragged, Err(Error::NotRectangular { depth: 1 })));

        let empty: Vec<f64> = vec![];
        assert!(matches!(Tensor::array(&empty), Err(Error::InvalidShape { .. })));
    }

    #[test]
    fn at_checks_rank_and_bounds() {
        let t = Tensor::array(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();
        assert_eq!(t.at(&[2, 1]).unwrap(), 6.0);
        assert!(matches!(t.at(&[0]), Err(Error::RankMismatch { expected: 2, got: 1 })));
        assert!(matches!(
            t.at(&[3, 0]),
            Err(Error::IndexOutOfRange { index: 3, dim: 0, size: 3 })
        ));
    }

    #[test]
    fn reshape_preserves_order_and_count() {
        let mut t = Tensor::array(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        let before = t.data().to_vec();
        t.reshape(&[3, 2]).unwrap();
        assert_eq!(t.data(), before.as_slice());
        assert_eq!(t.at(&[1, 0]).unwrap(), 3.0);
        t.reshape(&[6]).unwrap();
        assert_eq!(t.strides(), &[1]);
        assert!(matches!(t.reshape(&[4, 2]), Err(Error::SizeMismatch { expected: 6, got: 8 })));
        assert_eq!(t.shape(), &[6]);
    }

    #[test]
    fn elementwise_ops_require_identical_shapes() {
        let a = Tensor::array(&[1.0, 2.0, 3.0]).unwrap();
        let b = Tensor::array(&[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(a.add(&b).unwrap(), b.add(&a).unwrap());
        assert_eq!(a.mul(&b).unwrap(), b.mul(&a).unwrap());
        assert_eq!(b.sub(&a).unwrap().data(), &[3.0, 3.0, 3.0]);
        assert_eq!(b.div(&a).unwrap().data(), &[4.0, 2.5, 2.0]);

        let c = Tensor::zeros(&[3, 1]).unwrap();
        assert!(matches!(a.add(&c), Err(Error::ShapeMismatch { .. })));
        let mut d = a.clone();
        assert!(d.mul_in_place(&c).is_err());
        assert_eq!(d, a);
    }

    #[test]
    fn scalar_and_compound_ops() {
        let a = Tensor::array(&[1.0, -2.0]).unwrap();
        assert_eq!((&a * 2.0).data(), &[2.0, -4.0]);
        assert_eq!((2.0 * &a).data(), &[2.0, -4.0]);
        assert_eq!((&a + 1.0).data(), &[2.0, -1.0]);
        assert_eq!((-&a).data(), &[-1.0, 2.0]);
        let mut b = a.clone();
        b -= 1.0;
        b /= 2.0;
        assert_eq!(b.data(), &[0.0, -1.5]);
        b.add_in_place(&a).unwrap();
        assert_eq!(b.data(), &[1.0, -3.5]);
    }

    #[test]
    fn calc_copies_and_apply_mutates() {
        let mut a = Tensor::array(&[1.0, 4.0, 9.0]).unwrap();
        let roots = a.calc(f64::sqrt);
        assert_eq!(roots.data(), &[1.0, 2.0, 3.0]);
        assert_eq!(a.data(), &[1.0, 4.0, 9.0]);
        a.apply(|x| x + 1.0);
        assert_eq!(a.data(), &[2.0, 5.0, 10.0]);

        let mask = Tensor::array(&[1.0, 0.0, 1.0]).unwrap();
        let masked = a.calc_with(&mask, |x, m| if m > 0.0 { x } else { 0.0 }).unwrap();
        assert_eq!(masked.data(), &[2.0, 0.0, 10.0]);
    }

    #[test]
    fn take_leaves_source_empty() {
        let mut a = Tensor::ones(&[2, 2]).unwrap();
        let b = a.take();
        assert_eq!(b.shape(), &[2, 2]);
        assert!(a.is_empty());
        assert!(a.shape().is_empty());
    }

    #[test]
    fn display_follows_nesting() {
        let t = Tensor::array(&[[1.0, 2.0], [3.0, 4.5]]).unwrap();
        assert_eq!(t.to_string(), "[[1, 2], [3, 4.5]]");
    }

    #[test]
    fn cursor_moves_and_compares() {
        let t = Tensor::array(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let mut c = t.cursor();
        let end = t.cursor_end();
        assert_eq!(c.get(), Some(1.0));
        c.inc().inc();
        assert_eq!(c.get(), Some(3.0));
        c.dec();
        assert_eq!(c.get(), Some(2.0));
        c.advance(2);
        assert_eq!(c.get(), Some(4.0));
        assert!(c < end);
        c.inc();
        assert!(c == end);
        assert!(c.is_end());

        let other = Tensor::zeros(&[4]).unwrap();
        assert_eq!(c.partial_cmp(&other.cursor_end()), None);
    }

    #[test]
    fn select_rows_gathers_along_axis_zero() {
        let t = Tensor::array(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();
        let picked = t.select_rows(&[2, 0]).unwrap();
        assert_eq!(picked, Tensor::array(&[[5.0, 6.0], [1.0, 2.0]]).unwrap());
        assert!(t.select_rows(&[3]).is_err());
    }

    #[test]
    fn select_rows_on_a_taken_tensor_is_an_error() {
        let mut t = Tensor::array(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let _moved = t.take();
        assert!(matches!(t.select_rows(&[0]), Err(Error::RankMismatch { expected: 1, got: 0 })));
        assert!(matches!(t.select_rows(&[]), Err(Error::RankMismatch { .. })));
    }

    #[test]
    fn stack_requires_equal_shapes() {
        let a = Tensor::array(&[1.0, 2.0]).unwrap();
        let b = Tensor::array(&[3.0, 4.0]).unwrap();
        let s = Tensor::stack(&[a.clone(), b]).unwrap();
        assert_eq!(s.shape(), &[2, 2]);
        let c = Tensor::array(&[1.0]).unwrap();
        assert!(Tensor::stack(&[a, c]).is_err());
    }

    #[test]
    fn json_round_trip_rebuilds_strides() {
        let t = Tensor::array(&[[0.5, 0.25, 0.125], [1024.0, -7.0, 3.25]]).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        let back: Tensor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
        assert_eq!(back.strides(), &[3, 1]);
        assert!(serde_json::from_str::<Tensor>(r#"{"shape":[2,2],"data":[1.0]}"#).is_err());
    }
}
