//! AHRS Parameter Definitions
//!
//! Runtime configuration of the MLKF attitude estimator.
//!
//! # Parameters
//!
//! - `AHRS_H_X`, `AHRS_H_Y`, `AHRS_H_Z` - Reference magnetic field, NED (normalized)
//! - `AHRS_MAG_NOISE_X/Y/Z` - Magnetometer noise variance per axis
//! - `AHRS_RATE_LPF` - Low-pass the debiased gyro rate before integration (0/1)
//! - `AHRS_RATE_ALPHA` - Rate low-pass blend factor, (0, 1]
//! - `AHRS_PROP_FREQ` - Fixed propagation frequency in Hz, 0 uses measured dt
//! - `AHRS_IMU_ID` - Accepted IMU sender id, -1 accepts every sender
//! - `AHRS_BODY_PHI/THETA/PSI` - Body-to-IMU mounting angles (radians)
//! - `AHRS_GEO_MAG_HZ` - GEO_MAG diagnostic rate, 0 disables it

use super::error::ParameterError;
use super::storage::{ParamValue, ParameterStore};
use crate::ahrs::mlkf::{
    MlkfConfig, RateFilter, DEFAULT_MAG_H, DEFAULT_MAG_NOISE, DEFAULT_RATE_LPF_ALPHA,
};
use crate::ahrs::mounting::MountingTransform;
use crate::math::Vector3f;

const MAG_H_NAMES: [&str; 3] = ["AHRS_H_X", "AHRS_H_Y", "AHRS_H_Z"];
const MAG_NOISE_NAMES: [&str; 3] = ["AHRS_MAG_NOISE_X", "AHRS_MAG_NOISE_Y", "AHRS_MAG_NOISE_Z"];
const BODY_NAMES: [&str; 3] = ["AHRS_BODY_PHI", "AHRS_BODY_THETA", "AHRS_BODY_PSI"];

/// AHRS parameters loaded from parameter store
#[derive(Debug, Clone, PartialEq)]
pub struct AhrsParams {
    /// Reference magnetic field (NED)
    pub mag_h: [f32; 3],
    /// Magnetometer noise variance per axis
    pub mag_noise: [f32; 3],
    /// Low-pass the debiased gyro rate
    pub rate_lpf: bool,
    /// Low-pass blend factor
    pub rate_alpha: f32,
    /// Fixed propagation frequency (Hz), 0 means measured dt
    pub prop_freq_hz: f32,
    /// Accepted IMU sender id, `None` accepts every sender
    pub imu_id: Option<u8>,
    /// Body-to-IMU mounting angles (roll, pitch, yaw in radians)
    pub body_to_imu: [f32; 3],
    /// GEO_MAG diagnostic rate (Hz), 0 disables the stream
    pub geo_mag_hz: f32,
}

impl Default for AhrsParams {
    fn default() -> Self {
        Self {
            mag_h: DEFAULT_MAG_H,
            mag_noise: [DEFAULT_MAG_NOISE; 3],
            rate_lpf: false,
            rate_alpha: DEFAULT_RATE_LPF_ALPHA,
            prop_freq_hz: 0.0,
            imu_id: None,
            body_to_imu: [0.0; 3],
            geo_mag_hz: 0.0,
        }
    }
}

impl AhrsParams {
    /// Register AHRS parameters with default values
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        let defaults = Self::default();

        for (name, value) in MAG_H_NAMES.iter().zip(defaults.mag_h) {
            store.register(name, ParamValue::Float(value))?;
        }
        for (name, value) in MAG_NOISE_NAMES.iter().zip(defaults.mag_noise) {
            store.register(name, ParamValue::Float(value))?;
        }

        store.register("AHRS_RATE_LPF", ParamValue::Int(0))?;
        store.register("AHRS_RATE_ALPHA", ParamValue::Float(defaults.rate_alpha))?;
        store.register("AHRS_PROP_FREQ", ParamValue::Float(0.0))?;
        store.register("AHRS_IMU_ID", ParamValue::Int(-1))?;

        for name in BODY_NAMES {
            store.register(name, ParamValue::Float(0.0))?;
        }

        store.register("AHRS_GEO_MAG_HZ", ParamValue::Float(0.0))?;

        Ok(())
    }

    /// Load AHRS parameters from parameter store
    ///
    /// Missing entries fall back to defaults. Call [`AhrsParams::validate`]
    /// before building a filter from user-supplied values.
    pub fn from_store(store: &ParameterStore) -> Self {
        let defaults = Self::default();

        let read3 = |names: [&str; 3], fallback: [f32; 3]| {
            [
                store.get_f32(names[0], fallback[0]),
                store.get_f32(names[1], fallback[1]),
                store.get_f32(names[2], fallback[2]),
            ]
        };

        // Anything outside 0..=255 means "accept every sender"
        let imu_id = u8::try_from(store.get_i32("AHRS_IMU_ID", -1)).ok();

        Self {
            mag_h: read3(MAG_H_NAMES, defaults.mag_h),
            mag_noise: read3(MAG_NOISE_NAMES, defaults.mag_noise),
            rate_lpf: store.get_bool("AHRS_RATE_LPF", defaults.rate_lpf),
            rate_alpha: store.get_f32("AHRS_RATE_ALPHA", defaults.rate_alpha),
            prop_freq_hz: store.get_f32("AHRS_PROP_FREQ", defaults.prop_freq_hz),
            imu_id,
            body_to_imu: read3(BODY_NAMES, defaults.body_to_imu),
            geo_mag_hz: store.get_f32("AHRS_GEO_MAG_HZ", defaults.geo_mag_hz),
        }
    }

    /// Check that every value is usable by the estimator
    pub fn validate(&self) -> Result<(), ParameterError> {
        let finite = |v: &[f32; 3]| v.iter().all(|c| c.is_finite());

        if !finite(&self.mag_h) || Vector3f::from(self.mag_h).norm() <= 0.0 {
            return Err(ParameterError::OutOfRange);
        }
        if !finite(&self.mag_noise) || self.mag_noise.iter().any(|n| *n <= 0.0) {
            return Err(ParameterError::OutOfRange);
        }
        if self.rate_lpf && !(self.rate_alpha > 0.0 && self.rate_alpha <= 1.0) {
            return Err(ParameterError::OutOfRange);
        }
        if !self.prop_freq_hz.is_finite() || self.prop_freq_hz < 0.0 {
            return Err(ParameterError::OutOfRange);
        }
        if !finite(&self.body_to_imu) {
            return Err(ParameterError::OutOfRange);
        }
        if !self.geo_mag_hz.is_finite() || self.geo_mag_hz < 0.0 {
            return Err(ParameterError::OutOfRange);
        }
        Ok(())
    }

    /// Filter configuration described by these parameters
    pub fn mlkf_config(&self) -> MlkfConfig {
        let rate_filter = if self.rate_lpf {
            RateFilter::LowPass {
                alpha: self.rate_alpha,
            }
        } else {
            RateFilter::Direct
        };

        MlkfConfig {
            mag_h: Vector3f::from(self.mag_h),
            mag_noise: Vector3f::from(self.mag_noise),
            rate_filter,
            ..MlkfConfig::default()
        }
    }

    /// Mounting transform described by the body angles
    pub fn mounting(&self) -> MountingTransform {
        let [phi, theta, psi] = self.body_to_imu;
        MountingTransform::from_euler(phi, theta, psi)
    }

    /// Fixed propagation frequency, `None` when measured dt is used
    pub fn fixed_frequency_hz(&self) -> Option<f32> {
        (self.prop_freq_hz > 0.0).then_some(self.prop_freq_hz)
    }
}
