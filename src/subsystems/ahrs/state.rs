//! Shared AHRS state for inter-task communication
//!
//! The estimator publishes body attitude and rates here; navigation and
//! control read it without blocking the filter.

use mlkf_ahrs_core::ahrs::{AhrsState, BodyState, VehicleStateSink};
use nalgebra::{Quaternion, Vector3};

/// Thread-safe wrapper for AHRS state
///
/// Uses critical sections for atomic read/write operations.
/// Reads and writes only copy a small struct, so this is cheaper than a mutex.
pub struct SharedAhrsState {
    state: core::cell::UnsafeCell<AhrsState>,
}

// Safety: AhrsState is a plain Copy struct and every access goes through
// critical_section::with.
unsafe impl Sync for SharedAhrsState {}
unsafe impl Send for SharedAhrsState {}

impl SharedAhrsState {
    /// Create new shared AHRS state
    pub const fn new() -> Self {
        Self {
            state: core::cell::UnsafeCell::new(AhrsState {
                quaternion: Quaternion::new(1.0, 0.0, 0.0, 0.0),
                roll: 0.0,
                pitch: 0.0,
                yaw: 0.0,
                angular_rate: Vector3::new(0.0, 0.0, 0.0),
                timestamp_us: 0,
                healthy: false,
            }),
        }
    }

    /// Read current AHRS state (thread-safe)
    pub fn read(&self) -> AhrsState {
        critical_section::with(|_cs| unsafe { *self.state.get() })
    }

    /// Write new AHRS state (thread-safe)
    pub fn write(&self, state: AhrsState) {
        critical_section::with(|_cs| unsafe {
            *self.state.get() = state;
        });
    }

    pub fn get_quaternion(&self) -> Quaternion<f32> {
        critical_section::with(|_cs| unsafe { (*self.state.get()).quaternion })
    }

    pub fn get_angular_rate(&self) -> Vector3<f32> {
        critical_section::with(|_cs| unsafe { (*self.state.get()).angular_rate })
    }

    /// Check if the estimator has published since alignment
    pub fn is_healthy(&self) -> bool {
        critical_section::with(|_cs| unsafe { (*self.state.get()).healthy })
    }
}

impl Default for SharedAhrsState {
    fn default() -> Self {
        Self::new()
    }
}

impl VehicleStateSink for SharedAhrsState {
    fn publish(&self, body: &BodyState, timestamp_us: u64) {
        // Euler conversion stays outside the critical section
        let state = AhrsState::from_body_state(body, timestamp_us);
        self.write(state);
    }
}
