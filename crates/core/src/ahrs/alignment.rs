//! Initial attitude from averaged accelerometer and magnetometer readings
//!
//! Uses the TRIAD construction: gravity is the primary direction, the magnetic
//! field only fixes heading. Both measured directions are matched against
//! their known NED reference directions in closed form.

use crate::math::{Matrix3f, Vector3f};
use nalgebra::{Rotation3, UnitQuaternion};

/// Standard gravity used for the accelerometer reference (m/s²)
pub const GRAVITY: f32 = 9.81;

/// Minimum norm accepted for a direction before normalization
const MIN_DIRECTION_NORM: f32 = 1e-6;

/// Measured specific force of a vehicle at rest, expressed in NED
pub fn gravity_reference() -> Vector3f {
    Vector3f::new(0.0, 0.0, -GRAVITY)
}

/// Averaged sensor readings used to initialize the filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentSample {
    /// Averaged gyro (rad/s), becomes the initial bias
    pub gyro: Vector3f,
    /// Averaged accelerometer (m/s²)
    pub accel: Vector3f,
    /// Averaged magnetometer (same units as the reference field)
    pub mag: Vector3f,
}

impl AlignmentSample {
    pub fn new(gyro: Vector3f, accel: Vector3f, mag: Vector3f) -> Self {
        Self { gyro, accel, mag }
    }
}

fn finite(v: &Vector3f) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Orthonormal frame built from a primary and a secondary direction
///
/// Columns are `[v1, v1 × v2, v1 × (v1 × v2)]`, all normalized.
fn triad(primary: &Vector3f, secondary: &Vector3f) -> Option<Matrix3f> {
    let t1 = primary.try_normalize(MIN_DIRECTION_NORM)?;
    let t2 = t1.cross(secondary).try_normalize(MIN_DIRECTION_NORM)?;
    let t3 = t1.cross(&t2);
    Some(Matrix3f::from_columns(&[t1, t2, t3]))
}

/// Compute the LTP-to-IMU quaternion from accelerometer and magnetometer
///
/// Returns `None` when either vector is zero or non-finite, or when the
/// accelerometer and magnetometer are parallel (heading unobservable).
pub fn quat_from_accel_mag(
    accel: &Vector3f,
    mag: &Vector3f,
    mag_reference: &Vector3f,
) -> Option<UnitQuaternion<f32>> {
    if !finite(accel) || !finite(mag) || !finite(mag_reference) {
        return None;
    }

    let reference = triad(&gravity_reference(), mag_reference)?;
    let measured = triad(accel, mag)?;

    // Maps measured (IMU) directions onto their reference (LTP) counterparts
    let rotation = reference * measured.transpose();
    Some(UnitQuaternion::from_rotation_matrix(
        &Rotation3::from_matrix_unchecked(rotation),
    ))
}
