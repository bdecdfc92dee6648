//! Dense single-precision matrices and the operations the floating point payloads measure.

#![allow(
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing,
    reason = "index arithmetic is bounded by shapes validated at the top of each operation"
)]

use derive_more::Display;
use thiserror::Error;

use crate::xorshift_next;

/// Dimensions of a matrix.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[display("{rows}x{cols}")]
pub struct Shape {
    rows: usize,
    cols: usize,
}

impl Shape {
    /// Creates a shape with the given number of rows and columns.
    #[must_use]
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(self) -> usize {
        self.cols
    }

    /// Number of elements.
    #[must_use]
    pub const fn len(self) -> usize {
        self.rows * self.cols
    }

    /// Whether the shape has no elements.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// A binary matrix operation.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[non_exhaustive]
pub enum MatrixOp {
    /// Matrix product.
    #[display("x")]
    Mul,

    /// Element-wise sum.
    #[display("+")]
    Add,

    /// Zero-padded 2D convolution of the left operand with the (odd-sized) right operand as
    /// kernel. The output has the shape of the left operand.
    #[display("conv")]
    Conv,
}

impl MatrixOp {
    /// Writes `left <op> right` into `output`, reshaping it as needed.
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] if the operand shapes are not compatible with the operation.
    pub fn apply(
        self,
        left: &Matrix,
        right: &Matrix,
        output: &mut Matrix,
    ) -> Result<(), ShapeError> {
        match self {
            Self::Mul => mul(left, right, output),
            Self::Add => add(left, right, output),
            Self::Conv => conv(left, right, output),
        }
    }
}

/// The operands of a matrix operation have incompatible shapes.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum ShapeError {
    /// The operand shapes do not fit together.
    #[error("matrix size mismatch: ({left}) {op} ({right})")]
    Mismatch {
        /// The operation that was attempted.
        op: MatrixOp,

        /// Shape of the left operand.
        left: Shape,

        /// Shape of the right operand.
        right: Shape,
    },

    /// A convolution kernel must not be larger than its source in either dimension.
    #[error("convolution kernel {kernel} is larger than source {input}")]
    KernelTooLarge {
        /// Shape of the source matrix.
        input: Shape,

        /// Shape of the kernel.
        kernel: Shape,
    },

    /// A convolution kernel needs a center element, so both dimensions must be odd.
    #[error("convolution kernel {kernel} must have odd dimensions")]
    EvenKernel {
        /// Shape of the kernel.
        kernel: Shape,
    },
}

/// A dense row-major matrix of `f32`.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    shape: Shape,
    data: Vec<f32>,
}

impl Matrix {
    /// Creates a matrix with every element set to zero.
    #[must_use]
    pub fn zeroed(shape: Shape) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.len()],
        }
    }

    /// Creates a matrix filled from a xorshift sequence, normalized to `[0, 1]`.
    ///
    /// `state` is advanced once per element, so filling two matrices from the same state
    /// yields different contents.
    #[must_use]
    pub fn from_xorshift(shape: Shape, state: &mut u64) -> Self {
        let data = (0..shape.len())
            .map(|_| {
                *state = xorshift_next(*state);
                normalize(*state)
            })
            .collect();

        Self { shape, data }
    }

    /// Creates a matrix from row-major elements.
    ///
    /// # Panics
    ///
    /// Panics if the number of elements does not match the shape.
    #[must_use]
    pub fn from_rows(shape: Shape, data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            shape.len(),
            "matrix of shape {shape} needs exactly {} elements",
            shape.len()
        );

        Self { shape, data }
    }

    /// The dimensions of the matrix.
    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// The elements in row-major order.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// The element at the given position.
    ///
    /// # Panics
    ///
    /// Panics if the position is outside the matrix.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        assert!(
            row < self.shape.rows && col < self.shape.cols,
            "({row}, {col}) is outside of a {} matrix",
            self.shape
        );

        self.data[row * self.shape.cols + col]
    }

    /// Changes the shape, keeping the allocation if it is large enough. Element values are
    /// unspecified afterwards.
    fn reshape(&mut self, shape: Shape) {
        self.shape = shape;
        self.data.resize(shape.len(), 0.0);
    }
}

#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    reason = "only a well-spread value in [0, 1] is needed, not the exact ratio"
)]
fn normalize(value: u64) -> f32 {
    (value as f64 / u64::MAX as f64) as f32
}

fn mul(a: &Matrix, b: &Matrix, c: &mut Matrix) -> Result<(), ShapeError> {
    if a.shape.cols != b.shape.rows {
        return Err(ShapeError::Mismatch {
            op: MatrixOp::Mul,
            left: a.shape,
            right: b.shape,
        });
    }

    c.reshape(Shape::new(a.shape.rows, b.shape.cols));

    for i in 0..a.shape.rows {
        for j in 0..b.shape.cols {
            let mut sum = 0.0;

            for k in 0..a.shape.cols {
                sum += a.data[i * a.shape.cols + k] * b.data[k * b.shape.cols + j];
            }

            c.data[i * c.shape.cols + j] = sum;
        }
    }

    Ok(())
}

fn add(a: &Matrix, b: &Matrix, c: &mut Matrix) -> Result<(), ShapeError> {
    if a.shape != b.shape {
        return Err(ShapeError::Mismatch {
            op: MatrixOp::Add,
            left: a.shape,
            right: b.shape,
        });
    }

    c.reshape(a.shape);

    for ((out, left), right) in c.data.iter_mut().zip(&a.data).zip(&b.data) {
        *out = left + right;
    }

    Ok(())
}

fn conv(src: &Matrix, kernel: &Matrix, output: &mut Matrix) -> Result<(), ShapeError> {
    if src.shape.rows < kernel.shape.rows || src.shape.cols < kernel.shape.cols {
        return Err(ShapeError::KernelTooLarge {
            input: src.shape,
            kernel: kernel.shape,
        });
    }

    if kernel.shape.rows % 2 == 0 || kernel.shape.cols % 2 == 0 {
        return Err(ShapeError::EvenKernel {
            kernel: kernel.shape,
        });
    }

    output.reshape(src.shape);

    let half_rows = kernel.shape.rows / 2;
    let half_cols = kernel.shape.cols / 2;

    for i in 0..src.shape.rows {
        for j in 0..src.shape.cols {
            let mut sum = 0.0;

            for ki in 0..kernel.shape.rows {
                // Source row i + ki - half_rows, skipping rows outside the source.
                let Some(si) = (i + ki).checked_sub(half_rows) else {
                    continue;
                };

                if si >= src.shape.rows {
                    continue;
                }

                for kj in 0..kernel.shape.cols {
                    let Some(sj) = (j + kj).checked_sub(half_cols) else {
                        continue;
                    };

                    if sj >= src.shape.cols {
                        continue;
                    }

                    sum += src.data[si * src.shape.cols + sj]
                        * kernel.data[ki * kernel.shape.cols + kj];
                }
            }

            output.data[i * output.shape.cols + j] = sum;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp, reason = "small integers are exact in f32")]

    use super::*;
    use crate::XORSHIFT_SEED;

    fn matrix(rows: usize, cols: usize, data: &[f32]) -> Matrix {
        Matrix::from_rows(Shape::new(rows, cols), data.to_vec())
    }

    #[test]
    fn shape_display() {
        assert_eq!(Shape::new(125, 80).to_string(), "125x80");
    }

    #[test]
    fn mul_small() {
        let a = matrix(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = matrix(3, 2, &[7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
        let mut c = Matrix::zeroed(Shape::new(1, 1));

        MatrixOp::Mul.apply(&a, &b, &mut c).unwrap();

        assert_eq!(c, matrix(2, 2, &[58.0, 64.0, 139.0, 154.0]));
    }

    #[test]
    fn mul_rejects_mismatched_inner_dimension() {
        let a = Matrix::zeroed(Shape::new(2, 3));
        let b = Matrix::zeroed(Shape::new(2, 3));
        let mut c = Matrix::zeroed(Shape::new(2, 3));

        let error = MatrixOp::Mul.apply(&a, &b, &mut c).unwrap_err();

        assert_eq!(error.to_string(), "matrix size mismatch: (2x3) x (2x3)");
    }

    #[test]
    fn add_elementwise() {
        let a = matrix(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let b = matrix(2, 2, &[10.0, 20.0, 30.0, 40.0]);
        let mut c = Matrix::zeroed(Shape::new(0, 0));

        MatrixOp::Add.apply(&a, &b, &mut c).unwrap();

        assert_eq!(c, matrix(2, 2, &[11.0, 22.0, 33.0, 44.0]));
    }

    #[test]
    fn add_rejects_different_shapes() {
        let a = Matrix::zeroed(Shape::new(2, 2));
        let b = Matrix::zeroed(Shape::new(2, 3));
        let mut c = Matrix::zeroed(Shape::new(2, 2));

        assert!(matches!(
            MatrixOp::Add.apply(&a, &b, &mut c),
            Err(ShapeError::Mismatch {
                op: MatrixOp::Add,
                ..
            })
        ));
    }

    #[test]
    fn conv_identity_kernel_copies_source() {
        let src = matrix(3, 4, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
        let kernel = matrix(3, 3, &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        let mut output = Matrix::zeroed(Shape::new(1, 1));

        MatrixOp::Conv.apply(&src, &kernel, &mut output).unwrap();

        assert_eq!(output, src);
    }

    #[test]
    fn conv_pads_edges_with_zero() {
        let src = matrix(3, 3, &[1.0; 9]);
        let kernel = matrix(3, 3, &[1.0; 9]);
        let mut output = Matrix::zeroed(Shape::new(3, 3));

        MatrixOp::Conv.apply(&src, &kernel, &mut output).unwrap();

        // Corners see 4 source elements, edges 6 and the center all 9.
        assert_eq!(
            output,
            matrix(3, 3, &[4.0, 6.0, 4.0, 6.0, 9.0, 6.0, 4.0, 6.0, 4.0])
        );
    }

    #[test]
    fn conv_rejects_even_kernel() {
        let src = Matrix::zeroed(Shape::new(5, 5));
        let kernel = Matrix::zeroed(Shape::new(3, 2));
        let mut output = Matrix::zeroed(Shape::new(5, 5));

        assert_eq!(
            MatrixOp::Conv.apply(&src, &kernel, &mut output),
            Err(ShapeError::EvenKernel {
                kernel: Shape::new(3, 2)
            })
        );
    }

    #[test]
    fn conv_rejects_kernel_larger_than_source() {
        let src = Matrix::zeroed(Shape::new(5, 5));
        let kernel = Matrix::zeroed(Shape::new(7, 3));
        let mut output = Matrix::zeroed(Shape::new(5, 5));

        assert!(matches!(
            MatrixOp::Conv.apply(&src, &kernel, &mut output),
            Err(ShapeError::KernelTooLarge { .. })
        ));
    }

    #[test]
    fn xorshift_fill_is_normalized_and_varied() {
        let mut state = XORSHIFT_SEED;
        let a = Matrix::from_xorshift(Shape::new(10, 10), &mut state);
        let b = Matrix::from_xorshift(Shape::new(10, 10), &mut state);

        assert!(a.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
        assert_ne!(a, b);
        assert_ne!(a.get(0, 0), a.get(0, 1));
    }

    #[test]
    fn reshape_keeps_requested_shape() {
        let a = Matrix::zeroed(Shape::new(4, 1));
        let b = Matrix::zeroed(Shape::new(1, 4));
        let mut c = Matrix::zeroed(Shape::new(100, 100));

        MatrixOp::Mul.apply(&a, &b, &mut c).unwrap();

        assert_eq!(c.shape(), Shape::new(4, 4));
        assert_eq!(c.as_slice().len(), 16);
    }
}
