//! Linear algebra primitives
//!
//! Statically-sized vector and matrix types used by the attitude filter.

pub mod matrix;

pub use matrix::{
    block_diagonal6, is_finite, is_symmetric, mat_inv33, mat_mul, mat_mul_transpose, mat_sub,
    skew, Matrix3f, Matrix3x6f, Matrix6f, Matrix6x3f, Vector3f, Vector6f, MIN_INVERTIBLE_DET,
};
