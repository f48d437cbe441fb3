//! Multiplicative Linearized Kalman Filter (MLKF) in quaternion formulation
//!
//! Estimates attitude, heading and gyro bias. The filter keeps a nonlinear
//! reference quaternion and a 6-element linear error state (small-angle
//! attitude error as a Gibbs vector, plus gyro bias). The attitude part of the
//! error state is folded back into the reference after every measurement, so
//! between updates the expected attitude error is exactly zero.
//!
//! ## Processing
//!
//! ```text
//!  gyro  ──► propagate_ref ──► propagate_state ──► body projection
//!  accel ──► update_state(gravity) ──► reset_state
//!  mag   ──► update_state(field)   ──► reset_state
//! ```
//!
//! ## Frames
//!
//! - `ltp_to_imu`: rotation from the local NED tangent frame to the IMU frame
//! - Body output is derived through the [`MountingTransform`]

use super::alignment::{gravity_reference, quat_from_accel_mag, AlignmentSample, GRAVITY};
use super::mounting::MountingTransform;
use super::traits::{AhrsError, AhrsState, BodyState};
use crate::math::{
    block_diagonal6, is_finite, mat_inv33, mat_mul, mat_mul_transpose, mat_sub, skew, Matrix3f,
    Matrix3x6f, Matrix6f, Vector3f, Vector6f,
};
use nalgebra::{Quaternion, UnitQuaternion};

/// Default magnetometer noise variance per axis
pub const DEFAULT_MAG_NOISE: f32 = 0.2;

/// Default normalized reference magnetic field (NED)
pub const DEFAULT_MAG_H: [f32; 3] = [0.5138, 0.00019, 0.8578];

/// Attitude process noise, scaled by dt²
pub const ATTITUDE_PROCESS_NOISE: f32 = 1e-2;

/// Gyro bias random walk, scaled by dt²
pub const BIAS_PROCESS_NOISE: f32 = 9e-6;

/// Initial attitude error variance
pub const INITIAL_ATTITUDE_VARIANCE: f32 = 1.0;

/// Initial gyro bias variance
pub const INITIAL_BIAS_VARIANCE: f32 = 1e-4;

/// Default smoothing factor for [`RateFilter::LowPass`]
pub const DEFAULT_RATE_LPF_ALPHA: f32 = 0.1;

/// Smoothing factor of the specific-force deviation `|a| - g`
pub const ACCEL_DEVIATION_ALPHA: f32 = 0.92;

/// Accelerometer noise inflation per m/s² of filtered deviation
pub const ACCEL_NOISE_GAIN: f32 = 250.0;

/// Scalar part of the Gibbs error vector
const GIBBS_SCALAR: f32 = 2.0;

/// How debiased gyro rates are stored before integration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateFilter {
    /// Use the debiased rate as is
    Direct,
    /// Exponential blend: `rate = (1 - alpha) * rate + alpha * debiased`
    LowPass { alpha: f32 },
}

/// Filter configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MlkfConfig {
    /// Reference magnetic field in NED (same units as the magnetometer)
    pub mag_h: Vector3f,

    /// Magnetometer noise variance per axis
    pub mag_noise: Vector3f,

    /// Rate filtering mode
    pub rate_filter: RateFilter,

    /// Attitude process noise (multiplied by dt²)
    pub attitude_process_noise: f32,

    /// Gyro bias process noise (multiplied by dt²)
    pub bias_process_noise: f32,
}

impl Default for MlkfConfig {
    fn default() -> Self {
        Self {
            mag_h: Vector3f::from(DEFAULT_MAG_H),
            mag_noise: Vector3f::repeat(DEFAULT_MAG_NOISE),
            rate_filter: RateFilter::Direct,
            attitude_process_noise: ATTITUDE_PROCESS_NOISE,
            bias_process_noise: BIAS_PROCESS_NOISE,
        }
    }
}

/// Filter lifecycle
///
/// The only transition is `Uninitialized -> Running`, performed by alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MlkfStatus {
    Uninitialized,
    Running,
}

fn gibbs_identity() -> Quaternion<f32> {
    Quaternion::new(GIBBS_SCALAR, 0.0, 0.0, 0.0)
}

/// Quaternion-based indirect Kalman filter
///
/// One instance is owned per flight session. All operations work on
/// fixed-size stack data and never allocate.
#[derive(Debug, Clone)]
pub struct Mlkf {
    config: MlkfConfig,
    mounting: MountingTransform,
    status: MlkfStatus,

    /// Reference quaternion, LTP to IMU
    ltp_to_imu: UnitQuaternion<f32>,
    /// Debiased (optionally filtered) rate, IMU frame
    imu_rate: Vector3f,
    gyro_bias: Vector3f,
    /// Error covariance: attitude (0..3), bias (3..6)
    p: Matrix6f,
    /// Pending attitude correction, scalar part fixed at 2
    gibbs_cor: Quaternion<f32>,
    /// Low-passed `|accel| - g`
    lp_accel: f32,

    body: BodyState,
    rejected_updates: u32,
}

impl Mlkf {
    /// Create a filter for one session
    ///
    /// The reference starts at the mounting orientation so the body attitude
    /// reads level until alignment.
    pub fn new(config: MlkfConfig, mounting: MountingTransform) -> Self {
        let ltp_to_imu = *mounting.quat();
        let mut filter = Self {
            config,
            mounting,
            status: MlkfStatus::Uninitialized,
            ltp_to_imu,
            imu_rate: Vector3f::zeros(),
            gyro_bias: Vector3f::zeros(),
            p: block_diagonal6(INITIAL_ATTITUDE_VARIANCE, INITIAL_BIAS_VARIANCE),
            gibbs_cor: gibbs_identity(),
            lp_accel: 0.0,
            body: BodyState::default(),
            rejected_updates: 0,
        };
        filter.set_body_state_from_quat();
        filter
    }

    pub fn status(&self) -> MlkfStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == MlkfStatus::Running
    }

    pub fn config(&self) -> &MlkfConfig {
        &self.config
    }

    pub fn mounting(&self) -> &MountingTransform {
        &self.mounting
    }

    /// Reference quaternion (LTP to IMU)
    pub fn ltp_to_imu(&self) -> &UnitQuaternion<f32> {
        &self.ltp_to_imu
    }

    /// Current rate estimate in the IMU frame (rad/s)
    pub fn imu_rate(&self) -> &Vector3f {
        &self.imu_rate
    }

    pub fn gyro_bias(&self) -> &Vector3f {
        &self.gyro_bias
    }

    pub fn covariance(&self) -> &Matrix6f {
        &self.p
    }

    /// Last projected body state
    ///
    /// Refreshed by [`Mlkf::propagate`] and [`Mlkf::align`] only; measurement
    /// updates do not touch it.
    pub fn body_state(&self) -> &BodyState {
        &self.body
    }

    /// Filtered specific-force deviation `|a| - g` (m/s²)
    pub fn accel_deviation(&self) -> f32 {
        self.lp_accel
    }

    /// Reference magnetic field (NED)
    pub fn mag_h(&self) -> &Vector3f {
        &self.config.mag_h
    }

    /// Measurement updates refused because the innovation covariance was singular
    pub fn rejected_updates(&self) -> u32 {
        self.rejected_updates
    }

    /// Body attitude with Euler angles, once aligned
    ///
    /// # Errors
    ///
    /// [`AhrsError::NotInitialized`] before alignment.
    pub fn ahrs_state(&self, timestamp_us: u64) -> Result<AhrsState, AhrsError> {
        if !self.is_running() {
            return Err(AhrsError::NotInitialized);
        }
        Ok(AhrsState::from_body_state(&self.body, timestamp_us))
    }

    /// Diagnostic: every covariance element is finite
    pub fn covariance_is_finite(&self) -> bool {
        is_finite(&self.p)
    }

    /// Initialize attitude and bias from averaged readings
    ///
    /// # Errors
    ///
    /// - [`AhrsError::AlreadyRunning`] if the filter has been aligned before
    /// - [`AhrsError::InvalidData`] if the averages cannot define an attitude;
    ///   the filter stays uninitialized
    pub fn align(&mut self, sample: &AlignmentSample) -> Result<(), AhrsError> {
        if self.is_running() {
            return Err(AhrsError::AlreadyRunning);
        }
        if !sample.gyro.iter().all(|v| v.is_finite()) {
            return Err(AhrsError::InvalidData);
        }

        self.ltp_to_imu = quat_from_accel_mag(&sample.accel, &sample.mag, &self.config.mag_h)
            .ok_or(AhrsError::InvalidData)?;

        self.set_body_state_from_quat();

        // Averaged gyro of a vehicle at rest is the bias
        self.gyro_bias = sample.gyro;

        self.status = MlkfStatus::Running;
        Ok(())
    }

    /// Propagate reference and covariance with one gyro sample
    ///
    /// # Arguments
    ///
    /// * `gyro` - Raw angular rate, IMU frame (rad/s)
    /// * `dt` - Time since the previous gyro sample (s)
    ///
    /// Returns `false` without touching the state when `dt` is not a positive
    /// finite duration.
    pub fn propagate(&mut self, gyro: &Vector3f, dt: f32) -> bool {
        if !dt.is_finite() || dt <= 0.0 {
            return false;
        }
        self.propagate_ref(gyro, dt);
        self.propagate_state(dt);
        self.set_body_state_from_quat();
        true
    }

    /// Correct with one accelerometer sample (m/s², IMU frame)
    ///
    /// Measurement noise grows with the filtered deviation of the specific
    /// force from gravity, so the filter trusts the accelerometer less while
    /// the vehicle accelerates. Returns `false` if the update was rejected.
    ///
    /// The deviation filter advances on every sample, rejected or not.
    pub fn update_accel(&mut self, accel: &Vector3f) -> bool {
        self.lp_accel = ACCEL_DEVIATION_ALPHA * self.lp_accel
            + (1.0 - ACCEL_DEVIATION_ALPHA) * (accel.norm() - GRAVITY);

        let dn = ACCEL_NOISE_GAIN * libm::fabsf(self.lp_accel);
        let g_noise = Vector3f::repeat(1.0 + dn);

        let applied = self.update_state(&gravity_reference(), accel, &g_noise);
        self.reset_state();
        applied
    }

    /// Correct with one magnetometer sample (IMU frame)
    ///
    /// Returns `false` if the update was rejected.
    pub fn update_mag(&mut self, mag: &Vector3f) -> bool {
        let mag_h = self.config.mag_h;
        let mag_noise = self.config.mag_noise;

        let applied = self.update_state(&mag_h, mag, &mag_noise);
        self.reset_state();
        applied
    }

    fn propagate_ref(&mut self, gyro: &Vector3f, dt: f32) {
        let debiased = gyro - self.gyro_bias;

        self.imu_rate = match self.config.rate_filter {
            RateFilter::Direct => debiased,
            RateFilter::LowPass { alpha } => self.imu_rate * (1.0 - alpha) + debiased * alpha,
        };

        // Exact exponential of the rotation vector rate * dt
        let delta = UnitQuaternion::from_scaled_axis(self.imu_rate * dt);
        self.ltp_to_imu = self.ltp_to_imu * delta;
        self.ltp_to_imu.renormalize();
    }

    /// P = F P Fᵀ + Q
    ///
    /// The error state itself is zero after every reset, so only the
    /// covariance is propagated.
    fn propagate_state(&mut self, dt: f32) {
        let d_angle = self.imu_rate * dt;

        let mut f = Matrix6f::identity();
        f.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(Matrix3f::identity() - skew(&d_angle)));
        f.fixed_view_mut::<3, 3>(0, 3)
            .copy_from(&(Matrix3f::identity() * -dt));

        let fp = mat_mul(&f, &self.p);
        self.p = mat_mul_transpose(&fp, &f);

        let dt2 = dt * dt;
        for i in 0..3 {
            self.p[(i, i)] += dt2 * self.config.attitude_process_noise;
            self.p[(i + 3, i + 3)] += dt2 * self.config.bias_process_noise;
        }
    }

    /// Incorporate one 3D vector measurement
    ///
    /// `i_expected` is the vector in the LTP frame, `b_measured` the same
    /// vector measured in the IMU frame. Returns `false` and leaves the state
    /// untouched when the innovation covariance cannot be inverted.
    fn update_state(&mut self, i_expected: &Vector3f, b_measured: &Vector3f, noise: &Vector3f) -> bool {
        let b_expected = self.ltp_to_imu.inverse_transform_vector(i_expected);

        // Only the attitude error is observable
        let mut h = Matrix3x6f::zeros();
        h.fixed_view_mut::<3, 3>(0, 0).copy_from(&skew(&b_expected));

        // S = H P Hᵀ + R
        let hp = mat_mul(&h, &self.p);
        let mut s = mat_mul_transpose(&hp, &h);
        for i in 0..3 {
            s[(i, i)] += noise[i];
        }

        let Some(inv_s) = mat_inv33(&s) else {
            self.rejected_updates = self.rejected_updates.saturating_add(1);
            return false;
        };

        // K = P Hᵀ S⁻¹
        let pht = mat_mul_transpose(&self.p, &h);
        let k = mat_mul(&pht, &inv_s);

        // P = (I - K H) P
        let i_kh = mat_sub(&Matrix6f::identity(), &mat_mul(&k, &h));
        self.p = mat_mul(&i_kh, &self.p);

        // X = X + K e, quaternion coords are stored (i, j, k, w)
        let e = b_measured - b_expected;
        let dx: Vector6f = k * e;
        for i in 0..3 {
            self.gibbs_cor.coords[i] += dx[i];
            self.gyro_bias[i] += dx[i + 3];
        }
        true
    }

    /// Fold the pending correction into the reference and zero the error state
    fn reset_state(&mut self) {
        self.gibbs_cor.coords[3] = GIBBS_SCALAR;
        let corrected = self.ltp_to_imu.quaternion() * self.gibbs_cor;
        self.ltp_to_imu = UnitQuaternion::new_normalize(corrected);
        self.gibbs_cor = gibbs_identity();
    }

    fn set_body_state_from_quat(&mut self) {
        self.body = self.mounting.project(&self.ltp_to_imu, &self.imu_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::is_symmetric;

    const EPSILON: f32 = 1e-5;

    fn filter() -> Mlkf {
        Mlkf::new(MlkfConfig::default(), MountingTransform::identity())
    }

    fn aligned_filter() -> Mlkf {
        let mut f = filter();
        let mag_h = *f.mag_h();
        f.align(&AlignmentSample::new(
            Vector3f::zeros(),
            gravity_reference(),
            mag_h,
        ))
        .unwrap();
        f
    }

    fn norm_error(q: &UnitQuaternion<f32>) -> f32 {
        (q.quaternion().norm() - 1.0).abs()
    }

    #[test]
    fn test_initial_state() {
        let f = filter();

        assert_eq!(f.status(), MlkfStatus::Uninitialized);
        assert_eq!(*f.gyro_bias(), Vector3f::zeros());
        assert_eq!(*f.imu_rate(), Vector3f::zeros());
        assert_eq!(f.covariance()[(0, 0)], INITIAL_ATTITUDE_VARIANCE);
        assert_eq!(f.covariance()[(5, 5)], INITIAL_BIAS_VARIANCE);
        assert_eq!(f.gibbs_cor, Quaternion::new(2.0, 0.0, 0.0, 0.0));
        assert!(f.body_state().ned_to_body.angle() < EPSILON);
    }

    #[test]
    fn test_initial_reference_follows_mounting() {
        let mount = MountingTransform::from_euler(0.0, 0.1, 0.5);
        let f = Mlkf::new(MlkfConfig::default(), mount);

        assert!(f.ltp_to_imu().angle_to(mount.quat()) < EPSILON);
        assert!(f.body_state().ned_to_body.angle() < EPSILON);
    }

    #[test]
    fn test_ahrs_state_requires_alignment() {
        let mut f = filter();
        assert_eq!(f.ahrs_state(0).unwrap_err(), AhrsError::NotInitialized);

        let mag_h = *f.mag_h();
        f.align(&AlignmentSample::new(Vector3f::zeros(), gravity_reference(), mag_h))
            .unwrap();

        let state = f.ahrs_state(500).unwrap();
        assert!(state.healthy);
        assert!(state.is_valid());
        assert_eq!(state.timestamp_us, 500);
        assert!(state.roll.abs() < 1e-4);
    }

    #[test]
    fn test_align_from_level_inputs() {
        let f = aligned_filter();

        assert!(f.is_running());
        assert!(f.ltp_to_imu().angle() < 1e-4);
        assert_eq!(*f.gyro_bias(), Vector3f::zeros());
        assert!(f.body_state().ned_to_body.angle() < 1e-4);
    }

    #[test]
    fn test_align_sets_bias_from_averaged_gyro() {
        let mut f = filter();
        let bias = Vector3f::new(0.01, -0.02, 0.003);
        let mag_h = *f.mag_h();
        f.align(&AlignmentSample::new(bias, gravity_reference(), mag_h))
            .unwrap();

        assert_eq!(*f.gyro_bias(), bias);

        // Gyro reading equal to the bias is no rotation
        let q0 = *f.ltp_to_imu();
        assert!(f.propagate(&bias, 0.01));
        assert!(f.ltp_to_imu().angle_to(&q0) < EPSILON);
    }

    #[test]
    fn test_align_rejected_when_running() {
        let mut f = aligned_filter();
        let q0 = *f.ltp_to_imu();

        let tilted = UnitQuaternion::from_euler_angles(0.3, 0.0, 0.0);
        let sample = AlignmentSample::new(
            Vector3f::new(0.1, 0.1, 0.1),
            tilted.inverse_transform_vector(&gravity_reference()),
            tilted.inverse_transform_vector(f.mag_h()),
        );

        assert_eq!(f.align(&sample), Err(AhrsError::AlreadyRunning));
        assert_eq!(*f.ltp_to_imu(), q0);
        assert_eq!(*f.gyro_bias(), Vector3f::zeros());
    }

    #[test]
    fn test_align_rejects_degenerate_sample() {
        let mut f = filter();
        let sample = AlignmentSample::new(Vector3f::zeros(), Vector3f::zeros(), *f.mag_h());

        assert_eq!(f.align(&sample), Err(AhrsError::InvalidData));
        assert_eq!(f.status(), MlkfStatus::Uninitialized);
    }

    #[test]
    fn test_zero_rate_leaves_quaternion_unchanged() {
        let mut f = aligned_filter();
        let q0 = *f.ltp_to_imu();

        for dt in [0.001, 0.01, 0.1, 1.0] {
            assert!(f.propagate(&Vector3f::zeros(), dt));
        }

        assert!(f.ltp_to_imu().angle_to(&q0) < EPSILON);
    }

    #[test]
    fn test_yaw_rate_step() {
        let mut f = aligned_filter();
        let rate = Vector3f::new(0.0, 0.0, 10.0_f32.to_radians());

        assert!(f.propagate(&rate, 0.01));

        let (roll, pitch, yaw) = f.ltp_to_imu().euler_angles();
        assert!(roll.abs() < EPSILON);
        assert!(pitch.abs() < EPSILON);
        assert!((yaw - 0.1_f32.to_radians()).abs() < EPSILON);
        assert!(norm_error(f.ltp_to_imu()) < EPSILON);
    }

    #[test]
    fn test_propagate_rejects_invalid_dt() {
        let mut f = aligned_filter();
        let p0 = *f.covariance();
        let q0 = *f.ltp_to_imu();
        let rate = Vector3f::new(0.1, 0.2, 0.3);

        assert!(!f.propagate(&rate, 0.0));
        assert!(!f.propagate(&rate, -0.01));
        assert!(!f.propagate(&rate, f32::NAN));

        assert_eq!(*f.covariance(), p0);
        assert_eq!(*f.ltp_to_imu(), q0);
        assert_eq!(*f.imu_rate(), Vector3f::zeros());
    }

    #[test]
    fn test_low_pass_rate_filter() {
        let config = MlkfConfig {
            rate_filter: RateFilter::LowPass { alpha: 0.1 },
            ..Default::default()
        };
        let mut f = Mlkf::new(config, MountingTransform::identity());
        let gyro = Vector3f::new(1.0, 0.0, 0.0);

        f.propagate(&gyro, 0.01);
        assert!((f.imu_rate().x - 0.1).abs() < EPSILON);

        f.propagate(&gyro, 0.01);
        assert!((f.imu_rate().x - 0.19).abs() < EPSILON);
    }

    #[test]
    fn test_direct_rate_filter_stores_debiased_rate() {
        let mut f = filter();
        f.gyro_bias = Vector3f::new(0.1, 0.0, -0.1);

        f.propagate(&Vector3f::new(0.5, 0.5, 0.5), 0.01);

        assert!((f.imu_rate() - Vector3f::new(0.4, 0.5, 0.6)).norm() < EPSILON);
    }

    #[test]
    fn test_covariance_propagation_matches_formula() {
        let mut f = aligned_filter();
        let rate = Vector3f::new(0.3, -0.2, 0.1);
        let dt = 0.02;
        let p0 = *f.covariance();

        f.propagate(&rate, dt);

        let (dp, dq, dr) = (rate.x * dt, rate.y * dt, rate.z * dt);
        #[rustfmt::skip]
        let f_mat = Matrix6f::from_row_slice(&[
             1.0,  dr, -dq, -dt, 0.0, 0.0,
             -dr, 1.0,  dp, 0.0, -dt, 0.0,
              dq, -dp, 1.0, 0.0, 0.0, -dt,
             0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
             0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
             0.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        ]);
        let mut expected = f_mat * p0 * f_mat.transpose();
        for i in 0..3 {
            expected[(i, i)] += dt * dt * ATTITUDE_PROCESS_NOISE;
            expected[(i + 3, i + 3)] += dt * dt * BIAS_PROCESS_NOISE;
        }

        assert!((f.covariance() - expected).norm() < 1e-6);
    }

    #[test]
    fn test_perfect_gravity_update_is_no_correction() {
        let mut f = aligned_filter();
        let q0 = *f.ltp_to_imu();

        assert!(f.update_accel(&gravity_reference()));

        assert!(f.ltp_to_imu().angle_to(&q0) < 1e-6);
        assert!(f.gyro_bias().norm() < 1e-9);
        assert_eq!(f.gibbs_cor, Quaternion::new(2.0, 0.0, 0.0, 0.0));
        assert!(norm_error(f.ltp_to_imu()) < EPSILON);
    }

    #[test]
    fn test_accel_update_shrinks_attitude_variance() {
        let mut f = aligned_filter();
        let before = f.covariance()[(0, 0)];

        f.update_accel(&gravity_reference());

        assert!(f.covariance()[(0, 0)] < before);
        // Rotation about gravity is unobservable from the accelerometer
        assert!((f.covariance()[(2, 2)] - before).abs() < 1e-4);
    }

    #[test]
    fn test_accel_deviation_low_pass() {
        let mut f = aligned_filter();
        let accel = Vector3f::new(0.0, 0.0, -(GRAVITY + 1.0));

        f.update_accel(&accel);
        assert!((f.accel_deviation() - 0.08).abs() < 1e-4);

        f.update_accel(&accel);
        assert!((f.accel_deviation() - (0.92 * 0.08 + 0.08)).abs() < 1e-4);
    }

    #[test]
    fn test_accel_deviation_advances_on_rejected_update() {
        let mut f = aligned_filter();
        f.p = Matrix6f::from_element(f32::NAN);

        assert!(!f.update_accel(&Vector3f::new(0.0, 0.0, -(GRAVITY + 1.0))));

        assert_eq!(f.rejected_updates(), 1);
        assert!((f.accel_deviation() - 0.08).abs() < 1e-4);
    }

    #[test]
    fn test_adaptive_noise_reduces_correction() {
        let tilt = UnitQuaternion::from_euler_angles(0.05, 0.0, 0.0);
        // Same norm as gravity, so only the stored deviation differs
        let accel = tilt.inverse_transform_vector(&gravity_reference());

        let mut calm = aligned_filter();
        let mut dynamic = aligned_filter();
        dynamic.lp_accel = 2.0;

        let q0 = *calm.ltp_to_imu();
        calm.update_accel(&accel);
        dynamic.update_accel(&accel);

        let calm_correction = calm.ltp_to_imu().angle_to(&q0);
        let dynamic_correction = dynamic.ltp_to_imu().angle_to(&q0);

        assert!(calm_correction > 1e-3);
        assert!(
            dynamic_correction < 0.25 * calm_correction,
            "dynamic {} vs calm {}",
            dynamic_correction,
            calm_correction
        );
    }

    #[test]
    fn test_mag_update_corrects_heading() {
        let mut f = aligned_filter();
        let yawed = UnitQuaternion::from_euler_angles(0.0, 0.0, 0.2);
        let mag = yawed.inverse_transform_vector(f.mag_h());

        assert!(f.update_mag(&mag));

        let (_, _, yaw) = f.ltp_to_imu().euler_angles();
        assert!(yaw > 0.01, "yaw should move towards 0.2, got {}", yaw);
        assert!(norm_error(f.ltp_to_imu()) < EPSILON);
    }

    #[test]
    fn test_body_state_not_refreshed_by_updates() {
        let mut f = aligned_filter();
        let body_before = *f.body_state();

        let tilt = UnitQuaternion::from_euler_angles(0.2, 0.0, 0.0);
        f.update_accel(&tilt.inverse_transform_vector(&gravity_reference()));

        assert!(f.ltp_to_imu().angle() > 1e-3);
        assert_eq!(*f.body_state(), body_before);

        f.propagate(&Vector3f::zeros(), 0.01);
        assert!(f.body_state().ned_to_body.angle_to(f.ltp_to_imu()) < EPSILON);
    }

    #[test]
    fn test_singular_innovation_rejected() {
        let config = MlkfConfig {
            mag_noise: Vector3f::zeros(),
            ..Default::default()
        };
        let mut f = Mlkf::new(config, MountingTransform::identity());
        f.p = Matrix6f::zeros();
        let q0 = *f.ltp_to_imu();

        let mag = Vector3f::new(0.3, 0.4, 0.8);
        assert!(!f.update_mag(&mag));

        assert_eq!(f.rejected_updates(), 1);
        assert_eq!(*f.covariance(), Matrix6f::zeros());
        assert_eq!(*f.gyro_bias(), Vector3f::zeros());
        assert!(f.ltp_to_imu().angle_to(&q0) < EPSILON);
        assert_eq!(f.gibbs_cor, Quaternion::new(2.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_gibbs_fold_in_matches_hamilton_product() {
        let mut f = filter();
        f.ltp_to_imu = UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3);
        let a = *f.ltp_to_imu.quaternion();
        let (gx, gy, gz) = (0.01, -0.02, 0.005);
        f.gibbs_cor = Quaternion::new(2.0, gx, gy, gz);

        f.reset_state();

        // a ⊗ (2, g), written out component by component
        let w = a.w * 2.0 - a.i * gx - a.j * gy - a.k * gz;
        let x = a.w * gx + a.i * 2.0 + a.j * gz - a.k * gy;
        let y = a.w * gy - a.i * gz + a.j * 2.0 + a.k * gx;
        let z = a.w * gz + a.i * gy - a.j * gx + a.k * 2.0;
        let n = libm::sqrtf(w * w + x * x + y * y + z * z);

        let q = f.ltp_to_imu.quaternion();
        assert!((q.w - w / n).abs() < EPSILON);
        assert!((q.i - x / n).abs() < EPSILON);
        assert!((q.j - y / n).abs() < EPSILON);
        assert!((q.k - z / n).abs() < EPSILON);
        assert_eq!(f.gibbs_cor, Quaternion::new(2.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_randomized_cycles_keep_invariants() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        let mut f = aligned_filter();
        let mut truth = *f.ltp_to_imu();

        for _ in 0..500 {
            let dt = 0.001 + 0.02 * rng.f32();
            let rate = Vector3f::new(
                4.0 * rng.f32() - 2.0,
                4.0 * rng.f32() - 2.0,
                4.0 * rng.f32() - 2.0,
            );

            assert!(f.propagate(&rate, dt));
            truth *= UnitQuaternion::from_scaled_axis(rate * dt);
            assert!(norm_error(f.ltp_to_imu()) < EPSILON);
            assert!(is_symmetric(f.covariance(), 1e-4));

            let accel = truth.inverse_transform_vector(&gravity_reference());
            f.update_accel(&accel);
            assert!(norm_error(f.ltp_to_imu()) < EPSILON);
            assert!(is_symmetric(f.covariance(), 1e-4));

            let mag = truth.inverse_transform_vector(f.mag_h());
            f.update_mag(&mag);
            assert!(norm_error(f.ltp_to_imu()) < EPSILON);
            assert!(is_symmetric(f.covariance(), 1e-4));
        }

        assert!(f.covariance_is_finite());
        assert_eq!(f.rejected_updates(), 0);
    }

    #[test]
    fn test_converges_to_static_attitude() {
        let mut f = aligned_filter();
        let truth = UnitQuaternion::from_euler_angles(0.3, -0.2, 0.4);
        let accel = truth.inverse_transform_vector(&gravity_reference());
        let mag = truth.inverse_transform_vector(f.mag_h());

        for _ in 0..1000 {
            f.propagate(&Vector3f::zeros(), 0.01);
            f.update_accel(&accel);
            f.update_mag(&mag);
        }

        assert!(
            f.ltp_to_imu().angle_to(&truth) < 0.02,
            "residual error {} rad",
            f.ltp_to_imu().angle_to(&truth)
        );
    }
}
