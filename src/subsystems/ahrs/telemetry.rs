//! GEO_MAG diagnostic stream
//!
//! Periodically reports the reference magnetic field the filter is using.
//! The report is read-only; transport encoding is left to the caller.

use mlkf_ahrs_core::math::Vector3f;

/// Reference magnetic field snapshot (NED)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoMagReport {
    pub h_x: f32,
    pub h_y: f32,
    pub h_z: f32,
}

impl From<&Vector3f> for GeoMagReport {
    fn from(h: &Vector3f) -> Self {
        Self {
            h_x: h.x,
            h_y: h.y,
            h_z: h.z,
        }
    }
}

/// Rate limiter for the GEO_MAG report
#[derive(Debug, Clone, Copy)]
pub struct GeoMagStream {
    /// Send interval in microseconds (0 = disabled)
    interval_us: u64,
    /// Last send timestamp in microseconds
    last_send_us: u64,
}

impl GeoMagStream {
    /// Create a stream at `rate_hz`; zero, negative or non-finite disables it
    pub fn new(rate_hz: f32) -> Self {
        let interval_us = if rate_hz.is_finite() && rate_hz > 0.0 {
            ((1_000_000.0 / rate_hz) as u64).max(1)
        } else {
            0
        };
        Self {
            interval_us,
            last_send_us: u64::MAX, // Sentinel value for "never sent"
        }
    }

    pub fn disabled() -> Self {
        Self::new(0.0)
    }

    pub fn is_enabled(&self) -> bool {
        self.interval_us != 0
    }

    /// Check if enough time has elapsed since the last report
    pub fn should_send(&self, current_time_us: u64) -> bool {
        if !self.is_enabled() {
            return false;
        }
        if self.last_send_us == u64::MAX {
            return true;
        }
        current_time_us.saturating_sub(self.last_send_us) >= self.interval_us
    }

    pub fn mark_sent(&mut self, timestamp_us: u64) {
        self.last_send_us = timestamp_us;
    }

    /// Produce a report for `mag_h` if one is due
    pub fn poll(&mut self, current_time_us: u64, mag_h: &Vector3f) -> Option<GeoMagReport> {
        if !self.should_send(current_time_us) {
            return None;
        }
        self.mark_sent(current_time_us);
        Some(GeoMagReport::from(mag_h))
    }
}
