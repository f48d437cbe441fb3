//! Fixed-size matrix kernel for the attitude filter
//!
//! Every dimension the filter uses is known at compile time, so all types are
//! stack-allocated nalgebra `SMatrix` aliases. The named operations mirror the
//! handful of products the Kalman equations need.

use nalgebra::{Matrix3, Matrix6, SMatrix, SVector, Vector3};

/// 3-element column vector
pub type Vector3f = Vector3<f32>;

/// 6-element error state (attitude error, gyro bias)
pub type Vector6f = SVector<f32, 6>;

/// 3x3 matrix
pub type Matrix3f = Matrix3<f32>;

/// 6x6 matrix (error covariance, state transition)
pub type Matrix6f = Matrix6<f32>;

/// 3x6 matrix (observation Jacobian)
pub type Matrix3x6f = SMatrix<f32, 3, 6>;

/// 6x3 matrix (Kalman gain)
pub type Matrix6x3f = SMatrix<f32, 6, 3>;

/// Smallest determinant magnitude accepted by [`mat_inv33`]
pub const MIN_INVERTIBLE_DET: f32 = 1e-9;

/// `A * B`
#[inline]
pub fn mat_mul<const R: usize, const K: usize, const C: usize>(
    a: &SMatrix<f32, R, K>,
    b: &SMatrix<f32, K, C>,
) -> SMatrix<f32, R, C> {
    a * b
}

/// `A * Bᵀ`
#[inline]
pub fn mat_mul_transpose<const R: usize, const K: usize, const C: usize>(
    a: &SMatrix<f32, R, K>,
    b: &SMatrix<f32, C, K>,
) -> SMatrix<f32, R, C> {
    a * b.transpose()
}

/// `A - B`
#[inline]
pub fn mat_sub<const R: usize, const C: usize>(
    a: &SMatrix<f32, R, C>,
    b: &SMatrix<f32, R, C>,
) -> SMatrix<f32, R, C> {
    a - b
}

/// Cross-product (skew-symmetric) matrix, `skew(v) * w == v × w`
///
/// ```text
/// |  0  -z   y |
/// |  z   0  -x |
/// | -y   x   0 |
/// ```
#[inline]
pub fn skew(v: &Vector3f) -> Matrix3f {
    Matrix3f::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

/// Closed-form 3x3 inverse (adjugate over determinant)
///
/// Returns `None` when the determinant is not finite or its magnitude is
/// below [`MIN_INVERTIBLE_DET`].
pub fn mat_inv33(m: &Matrix3f) -> Option<Matrix3f> {
    let c00 = m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)];
    let c01 = m[(1, 2)] * m[(2, 0)] - m[(1, 0)] * m[(2, 2)];
    let c02 = m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)];

    let det = m[(0, 0)] * c00 + m[(0, 1)] * c01 + m[(0, 2)] * c02;
    if !det.is_finite() || libm::fabsf(det) < MIN_INVERTIBLE_DET {
        return None;
    }
    let inv_det = 1.0 / det;

    let c10 = m[(0, 2)] * m[(2, 1)] - m[(0, 1)] * m[(2, 2)];
    let c11 = m[(0, 0)] * m[(2, 2)] - m[(0, 2)] * m[(2, 0)];
    let c12 = m[(0, 1)] * m[(2, 0)] - m[(0, 0)] * m[(2, 1)];
    let c20 = m[(0, 1)] * m[(1, 2)] - m[(0, 2)] * m[(1, 1)];
    let c21 = m[(0, 2)] * m[(1, 0)] - m[(0, 0)] * m[(1, 2)];
    let c22 = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];

    // Transposed cofactors
    Some(
        Matrix3f::new(c00, c10, c20, c01, c11, c21, c02, c12, c22) * inv_det,
    )
}

/// Check that every element is finite
pub fn is_finite<const R: usize, const C: usize>(m: &SMatrix<f32, R, C>) -> bool {
    m.iter().all(|v| v.is_finite())
}

/// Check `|m[i][j] - m[j][i]| <= tolerance` for all pairs
pub fn is_symmetric<const N: usize>(m: &SMatrix<f32, N, N>, tolerance: f32) -> bool {
    for i in 0..N {
        for j in (i + 1)..N {
            if libm::fabsf(m[(i, j)] - m[(j, i)]) > tolerance {
                return false;
            }
        }
    }
    true
}

/// Diagonal 6x6 matrix from two 3-element blocks
pub fn block_diagonal6(upper: f32, lower: f32) -> Matrix6f {
    let mut m = Matrix6f::zeros();
    for i in 0..3 {
        m[(i, i)] = upper;
        m[(i + 3, i + 3)] = lower;
    }
    m
}
