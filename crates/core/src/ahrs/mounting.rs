//! Sensor mounting transform and body-frame projection
//!
//! The filter estimates the orientation of the IMU (sensor carrier). The
//! mounting transform describes how the IMU sits relative to the vehicle body
//! and maps the estimate into the body frame.

use super::traits::BodyState;
use crate::math::{Matrix3f, Vector3f};
use nalgebra::UnitQuaternion;

/// Fixed rotation from the vehicle body frame to the IMU frame
///
/// Both representations are kept: the quaternion for composing attitudes and
/// the direction cosine matrix for mapping rates. `rmat` satisfies
/// `v_imu = rmat * v_body`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MountingTransform {
    quat: UnitQuaternion<f32>,
    rmat: Matrix3f,
}

impl Default for MountingTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl MountingTransform {
    /// IMU axes aligned with body axes
    pub fn identity() -> Self {
        Self {
            quat: UnitQuaternion::identity(),
            rmat: Matrix3f::identity(),
        }
    }

    /// Build from the body-to-IMU quaternion
    pub fn from_quaternion(body_to_imu: UnitQuaternion<f32>) -> Self {
        Self {
            quat: body_to_imu,
            rmat: body_to_imu.inverse().to_rotation_matrix().into_inner(),
        }
    }

    /// Build from body-to-IMU Euler angles (radians, ZYX)
    pub fn from_euler(phi: f32, theta: f32, psi: f32) -> Self {
        Self::from_quaternion(UnitQuaternion::from_euler_angles(phi, theta, psi))
    }

    /// Body-to-IMU orientation
    pub fn quat(&self) -> &UnitQuaternion<f32> {
        &self.quat
    }

    /// Body-to-IMU direction cosine matrix
    pub fn rmat(&self) -> &Matrix3f {
        &self.rmat
    }

    /// Project the IMU attitude and rates into the vehicle body frame
    ///
    /// `ltp_to_body = ltp_to_imu ⊗ body_to_imu⁻¹` and
    /// `body_rates = rmatᵀ · imu_rates`.
    pub fn project(&self, ltp_to_imu: &UnitQuaternion<f32>, imu_rate: &Vector3f) -> BodyState {
        BodyState {
            ned_to_body: ltp_to_imu * self.quat.inverse(),
            rates: self.rmat.transpose() * imu_rate,
        }
    }
}
