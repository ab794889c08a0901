//! Dataset preparation helpers.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Error, Result};
use crate::math::tensor::Tensor;

/// One-hot encodes integer class labels. A label tensor of shape `S`
/// becomes `S + [classes]`.
pub fn one_hot(labels: &Tensor, classes: usize) -> Result<Tensor> {
    let mut shape = labels.shape().to_vec();
    shape.push(classes);
    let mut out = Tensor::zeros(&shape)?;
    for (row, &label) in out.data_mut().chunks_mut(classes).zip(labels.iter()) {
        if !(label.is_finite() && label >= 0.0 && label.fract() == 0.0 && (label as usize) < classes) {
            return Err(Error::InvalidLabel { label, classes });
        }
        row[label as usize] = 1.0;
    }
    Ok(out.to_device(labels.device().clone()))
}

/// The four halves produced by [`train_test_split`].
#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: Tensor,
    pub y_train: Tensor,
    pub x_test: Tensor,
    pub y_test: Tensor,
}

/// Shuffles the rows of `x` and `y` together and splits them, putting
/// `floor(rows · train_frac)` rows in the training half.
///
/// Both halves must end up non-empty.
pub fn train_test_split<R: Rng + ?Sized>(
    x: &Tensor,
    y: &Tensor,
    train_frac: f64,
    rng: &mut R,
) -> Result<Split> {
    let n = x.rows();
    if n != y.rows() {
        return Err(Error::ShapeMismatch { lhs: x.shape().to_vec(), rhs: y.shape().to_vec() });
    }
    let train_n = (n as f64 * train_frac).floor() as usize;
    if !(0.0..=1.0).contains(&train_frac) || train_n == 0 || train_n >= n {
        return Err(Error::InvalidArgument(format!(
            "train fraction {train_frac} leaves an empty split of {n} rows"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    let (train, test) = indices.split_at(train_n);
    Ok(Split {
        x_train: x.select_rows(train)?,
        y_train: y.select_rows(train)?,
        x_test: x.select_rows(test)?,
        y_test: y.select_rows(test)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn one_hot_vector_and_matrix_labels() {
        let labels = Tensor::array(&[2.0, 0.0]).unwrap();
        let encoded = one_hot(&labels, 3).unwrap();
        assert_eq!(encoded.shape(), &[2, 3]);
        assert_eq!(encoded.data(), &[0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);

        let grid = Tensor::array(&[[1.0, 0.0], [0.0, 1.0]]).unwrap();
        assert_eq!(one_hot(&grid, 4).unwrap().shape(), &[2, 2, 4]);

        let bad = Tensor::array(&[3.0]).unwrap();
        assert!(matches!(one_hot(&bad, 3), Err(Error::InvalidLabel { .. })));
    }

    #[test]
    fn split_keeps_rows_paired() {
        let x = Tensor::array(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0], [10.0, 11.0, 12.0]]).unwrap();
        let y = Tensor::array(&[[1.0, 2.0], [4.0, 5.0], [7.0, 8.0], [10.0, 11.0]]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let split = train_test_split(&x, &y, 0.5, &mut rng).unwrap();

        assert_eq!(split.x_train.shape(), &[2, 3]);
        assert_eq!(split.y_train.shape(), &[2, 2]);
        assert_eq!(split.x_test.shape(), &[2, 3]);
        assert_eq!(split.y_test.shape(), &[2, 2]);
        for (xs, ys) in [(&split.x_train, &split.y_train), (&split.x_test, &split.y_test)] {
            for i in 0..2 {
                assert_eq!(xs.at(&[i, 0]).unwrap(), ys.at(&[i, 0]).unwrap());
                assert_eq!(xs.at(&[i, 2]).unwrap(), ys.at(&[i, 1]).unwrap() + 1.0);
            }
        }
    }

    #[test]
    fn split_rejects_degenerate_fractions() {
        let x = Tensor::zeros(&[3, 1]).unwrap();
        let y = Tensor::zeros(&[3, 1]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(train_test_split(&x, &y, 0.2, &mut rng).is_err());
        assert!(train_test_split(&x, &y, 1.0, &mut rng).is_err());
        let y_short = Tensor::zeros(&[2, 1]).unwrap();
        assert!(matches!(train_test_split(&x, &y_short, 0.5, &mut rng), Err(Error::ShapeMismatch { .. })));
    }
}
