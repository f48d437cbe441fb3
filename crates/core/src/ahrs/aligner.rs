//! Sample aligner producing the averaged readings for filter alignment
//!
//! Raw IMU samples are averaged over fixed windows while the vehicle is
//! expected to sit still. A window counts as quiet when the variance of the
//! accelerometer norm stays below a threshold; after enough consecutive quiet
//! windows the aligner locks and hands out the last window's averages.

use super::alignment::AlignmentSample;
use crate::math::Vector3f;

/// Aligner configuration
#[derive(Debug, Clone, Copy)]
pub struct AlignerConfig {
    /// Accelerometer samples per averaging window
    pub window_samples: u32,

    /// Maximum standard deviation of the accelerometer norm in a quiet window (m/s²)
    pub low_noise_threshold: f32,

    /// Consecutive quiet windows required before locking
    pub low_noise_windows: u8,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            window_samples: 512,
            low_noise_threshold: 0.15,
            low_noise_windows: 5,
        }
    }
}

/// Aligner lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignerStatus {
    /// Still collecting windows
    Collecting,
    /// Averages delivered, no further samples are accepted
    Locked,
}

/// Window accumulators
#[derive(Debug, Clone, Copy)]
struct Window {
    gyro_sum: Vector3f,
    gyro_count: u32,
    accel_sum: Vector3f,
    accel_norm_sum: f32,
    accel_norm_sq_sum: f32,
    accel_count: u32,
    mag_sum: Vector3f,
    mag_count: u32,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            gyro_sum: Vector3f::zeros(),
            gyro_count: 0,
            accel_sum: Vector3f::zeros(),
            accel_norm_sum: 0.0,
            accel_norm_sq_sum: 0.0,
            accel_count: 0,
            mag_sum: Vector3f::zeros(),
            mag_count: 0,
        }
    }
}

impl Window {
    fn accel_norm_variance(&self) -> f32 {
        let n = self.accel_count as f32;
        let mean = self.accel_norm_sum / n;
        (self.accel_norm_sq_sum / n - mean * mean).max(0.0)
    }

    fn average(&self) -> Option<AlignmentSample> {
        if self.gyro_count == 0 || self.accel_count == 0 || self.mag_count == 0 {
            return None;
        }
        Some(AlignmentSample {
            gyro: self.gyro_sum / self.gyro_count as f32,
            accel: self.accel_sum / self.accel_count as f32,
            mag: self.mag_sum / self.mag_count as f32,
        })
    }
}

/// Averages raw samples until the vehicle has been still long enough
#[derive(Debug, Clone)]
pub struct SampleAligner {
    config: AlignerConfig,
    window: Window,
    quiet_windows: u8,
    status: AlignerStatus,
}

impl SampleAligner {
    pub fn new(config: AlignerConfig) -> Self {
        Self {
            config,
            window: Window::default(),
            quiet_windows: 0,
            status: AlignerStatus::Collecting,
        }
    }

    pub fn status(&self) -> AlignerStatus {
        self.status
    }

    /// Number of consecutive quiet windows seen so far
    pub fn quiet_windows(&self) -> u8 {
        self.quiet_windows
    }

    pub fn add_gyro(&mut self, gyro: &Vector3f) {
        if self.status == AlignerStatus::Collecting {
            self.window.gyro_sum += gyro;
            self.window.gyro_count += 1;
        }
    }

    pub fn add_mag(&mut self, mag: &Vector3f) {
        if self.status == AlignerStatus::Collecting {
            self.window.mag_sum += mag;
            self.window.mag_count += 1;
        }
    }

    /// Add an accelerometer sample
    ///
    /// Accelerometer samples pace the windows. Returns the averaged readings
    /// once, at the moment the aligner locks.
    pub fn add_accel(&mut self, accel: &Vector3f) -> Option<AlignmentSample> {
        if self.status == AlignerStatus::Locked {
            return None;
        }

        let norm = accel.norm();
        self.window.accel_sum += accel;
        self.window.accel_norm_sum += norm;
        self.window.accel_norm_sq_sum += norm * norm;
        self.window.accel_count += 1;

        if self.window.accel_count < self.config.window_samples.max(1) {
            return None;
        }

        let window = core::mem::take(&mut self.window);
        let threshold = self.config.low_noise_threshold;
        let averaged = match window.average() {
            Some(sample) if window.accel_norm_variance() < threshold * threshold => sample,
            _ => {
                self.quiet_windows = 0;
                return None;
            }
        };

        self.quiet_windows = self.quiet_windows.saturating_add(1);
        if self.quiet_windows >= self.config.low_noise_windows {
            self.status = AlignerStatus::Locked;
            return Some(averaged);
        }
        None
    }

    /// Drop accumulated data and start over
    pub fn reset(&mut self) {
        self.window = Window::default();
        self.quiet_windows = 0;
        self.status = AlignerStatus::Collecting;
    }
}

impl Default for SampleAligner {
    fn default() -> Self {
        Self::new(AlignerConfig::default())
    }
}
