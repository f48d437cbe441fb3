//! AHRS output types and the vehicle-state seam
//!
//! The filter produces a [`BodyState`] (NED-to-body quaternion plus body rates).
//! Consumers receive it through the [`VehicleStateSink`] trait; the firmware
//! crate implements the sink with a critical-section protected shared state.

use core::fmt;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// Errors for operations the filter explicitly refuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AhrsError {
    /// Filter has not been aligned yet
    NotInitialized,
    /// Alignment requested while the filter is already running
    AlreadyRunning,
    /// Input vectors are zero, non-finite, or geometrically degenerate
    InvalidData,
}

impl AhrsError {
    /// Return variant name as a static string (usable with defmt on embedded)
    pub fn as_str(&self) -> &'static str {
        match self {
            AhrsError::NotInitialized => "NotInitialized",
            AhrsError::AlreadyRunning => "AlreadyRunning",
            AhrsError::InvalidData => "InvalidData",
        }
    }
}

impl fmt::Display for AhrsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AhrsError::NotInitialized => write!(f, "AHRS not aligned"),
            AhrsError::AlreadyRunning => write!(f, "AHRS already running"),
            AhrsError::InvalidData => write!(f, "invalid AHRS input data"),
        }
    }
}

/// Vehicle-body attitude and rates produced by the body-frame projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    /// Rotation from the local NED frame to the vehicle body
    pub ned_to_body: UnitQuaternion<f32>,

    /// Angular rates in the body frame (rad/s)
    pub rates: Vector3<f32>,
}

impl Default for BodyState {
    fn default() -> Self {
        Self {
            ned_to_body: UnitQuaternion::identity(),
            rates: Vector3::zeros(),
        }
    }
}

/// Destination for the filter's body-frame output
///
/// Implementations are shared between the estimator and its consumers, so
/// publishing takes `&self` and relies on interior mutability.
pub trait VehicleStateSink {
    /// Store a new body attitude and body rates
    fn publish(&self, body: &BodyState, timestamp_us: u64);
}

/// AHRS state output - attitude with derived Euler angles
///
/// # Coordinate System
///
/// - Frame: NED (North-East-Down)
/// - Quaternion: scalar-first (w, x, y, z)
/// - Euler sequence: ZYX (yaw-pitch-roll)
#[derive(Debug, Clone, Copy)]
pub struct AhrsState {
    /// Attitude quaternion (NED to body, scalar-first)
    pub quaternion: Quaternion<f32>,

    /// Roll angle in radians
    pub roll: f32,

    /// Pitch angle in radians
    pub pitch: f32,

    /// Yaw angle in radians (heading, 0 = north)
    pub yaw: f32,

    /// Angular rates in body frame (rad/s)
    pub angular_rate: Vector3<f32>,

    /// Timestamp of the sample that produced this state (microseconds)
    pub timestamp_us: u64,

    /// True once the estimator has been aligned and is publishing
    pub healthy: bool,
}

impl Default for AhrsState {
    fn default() -> Self {
        Self {
            quaternion: Quaternion::identity(),
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            angular_rate: Vector3::zeros(),
            timestamp_us: 0,
            healthy: false,
        }
    }
}

impl AhrsState {
    /// Build a state from a projected body attitude
    pub fn from_body_state(body: &BodyState, timestamp_us: u64) -> Self {
        let (roll, pitch, yaw) = body.ned_to_body.euler_angles();
        Self {
            quaternion: *body.ned_to_body.quaternion(),
            roll,
            pitch,
            yaw,
            angular_rate: body.rates,
            timestamp_us,
            healthy: true,
        }
    }

    /// Check if the quaternion is valid (unit quaternion within tolerance)
    pub fn is_valid(&self) -> bool {
        let norm = self.quaternion.norm();
        libm::fabsf(norm - 1.0) < 0.01
    }
}
