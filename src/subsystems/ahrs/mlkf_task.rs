//! MLKF AHRS task
//!
//! Routes timestamped IMU events to the estimator:
//!
//! - gyro: propagate, then publish the body state
//! - accel / mag: measurement update (no publish)
//! - low-passed alignment sample: one-shot initialization, then publish
//!
//! Events from other IMUs are ignored when a source id is configured.

use super::telemetry::{GeoMagReport, GeoMagStream};
use crate::{log_debug, log_info, log_warn};
use mlkf_ahrs_core::ahrs::{
    AhrsError, AlignerConfig, AlignmentSample, Mlkf, MlkfConfig, MountingTransform,
    SampleAligner, VehicleStateSink,
};
use mlkf_ahrs_core::math::Vector3f;
use mlkf_ahrs_core::parameters::{AhrsParams, ParameterError};

/// Longest gap between gyro samples that is still integrated (seconds)
pub const DEFAULT_MAX_PROPAGATE_DT: f32 = 0.5;

/// Sensor event delivered to the AHRS
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorEvent {
    /// Angular rate, IMU frame (rad/s)
    Gyro {
        sender_id: u8,
        stamp_us: u64,
        rate: Vector3f,
    },
    /// Specific force, IMU frame (m/s²)
    Accel {
        sender_id: u8,
        stamp_us: u64,
        accel: Vector3f,
    },
    /// Magnetic field, IMU frame
    Mag {
        sender_id: u8,
        stamp_us: u64,
        mag: Vector3f,
    },
    /// Averaged readings from the sample aligner
    LowPassed {
        stamp_us: u64,
        sample: AlignmentSample,
    },
}

impl SensorEvent {
    pub fn stamp_us(&self) -> u64 {
        match self {
            SensorEvent::Gyro { stamp_us, .. }
            | SensorEvent::Accel { stamp_us, .. }
            | SensorEvent::Mag { stamp_us, .. }
            | SensorEvent::LowPassed { stamp_us, .. } => *stamp_us,
        }
    }
}

/// How the propagation interval is obtained
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropagationTiming {
    /// Difference between consecutive gyro timestamps
    Measured,
    /// Constant `1 / frequency_hz`, timestamps are ignored
    Fixed { frequency_hz: f32 },
}

/// AHRS task configuration
#[derive(Debug, Clone, Copy)]
pub struct AhrsMlkfTaskConfig {
    /// Filter configuration
    pub filter: MlkfConfig,

    /// Body-to-IMU mounting
    pub mounting: MountingTransform,

    /// Propagation interval source
    pub timing: PropagationTiming,

    /// Accepted sender id (`None` = any)
    pub imu_id: Option<u8>,

    /// Measured gyro gaps above this are treated as discontinuities (seconds)
    pub max_propagate_dt: f32,

    /// GEO_MAG report rate in Hz (0 = disabled)
    pub geo_mag_rate_hz: f32,

    /// Sample aligner settings used by the run loop
    pub aligner: AlignerConfig,
}

impl Default for AhrsMlkfTaskConfig {
    fn default() -> Self {
        Self {
            filter: MlkfConfig::default(),
            mounting: MountingTransform::identity(),
            timing: PropagationTiming::Measured,
            imu_id: None,
            max_propagate_dt: DEFAULT_MAX_PROPAGATE_DT,
            geo_mag_rate_hz: 0.0,
            aligner: AlignerConfig::default(),
        }
    }
}

impl AhrsMlkfTaskConfig {
    /// Build the task configuration from loaded parameters
    ///
    /// Fails with [`ParameterError::OutOfRange`] when the parameters do not
    /// pass [`AhrsParams::validate`].
    pub fn from_params(params: &AhrsParams) -> Result<Self, ParameterError> {
        params.validate()?;

        let timing = match params.fixed_frequency_hz() {
            Some(frequency_hz) => PropagationTiming::Fixed { frequency_hz },
            None => PropagationTiming::Measured,
        };

        Ok(Self {
            filter: params.mlkf_config(),
            mounting: params.mounting(),
            timing,
            imu_id: params.imu_id,
            geo_mag_rate_hz: params.geo_mag_hz,
            ..Default::default()
        })
    }
}

/// Event handler owning one estimator instance
pub struct AhrsMlkfTask<'a, S: VehicleStateSink> {
    filter: Mlkf,
    sink: &'a S,
    timing: PropagationTiming,
    imu_id: Option<u8>,
    max_propagate_dt: f32,
    /// Stamp of the previous accepted gyro sample
    last_gyro_stamp_us: Option<u64>,
    geo_mag: GeoMagStream,
}

impl<'a, S: VehicleStateSink> AhrsMlkfTask<'a, S> {
    pub fn new(config: AhrsMlkfTaskConfig, sink: &'a S) -> Self {
        Self {
            filter: Mlkf::new(config.filter, config.mounting),
            sink,
            timing: config.timing,
            imu_id: config.imu_id,
            max_propagate_dt: config.max_propagate_dt,
            last_gyro_stamp_us: None,
            geo_mag: GeoMagStream::new(config.geo_mag_rate_hz),
        }
    }

    pub fn filter(&self) -> &Mlkf {
        &self.filter
    }

    pub fn into_filter(self) -> Mlkf {
        self.filter
    }

    /// Check whether an event from `sender_id` is for this estimator
    pub fn accepts(&self, sender_id: u8) -> bool {
        self.imu_id.map_or(true, |id| id == sender_id)
    }

    /// Process one sensor event
    pub fn handle_event(&mut self, event: &SensorEvent) {
        match *event {
            SensorEvent::Gyro {
                sender_id,
                stamp_us,
                ref rate,
            } if self.accepts(sender_id) => self.on_gyro(stamp_us, rate),
            SensorEvent::Accel {
                sender_id,
                ref accel,
                ..
            } if self.accepts(sender_id) => self.on_accel(accel),
            SensorEvent::Mag {
                sender_id, ref mag, ..
            } if self.accepts(sender_id) => self.on_mag(mag),
            SensorEvent::LowPassed {
                stamp_us,
                ref sample,
            } => {
                let _ = self.align(stamp_us, sample);
            }
            _ => {}
        }
    }

    /// Initialize the filter from averaged readings, then publish
    ///
    /// On error the filter stays uninitialized and nothing is published.
    pub fn align(&mut self, stamp_us: u64, sample: &AlignmentSample) -> Result<(), AhrsError> {
        match self.filter.align(sample) {
            Ok(()) => {
                let bias = self.filter.gyro_bias();
                log_info!(
                    "AHRS: aligned, gyro bias [{}, {}, {}] rad/s",
                    bias.x,
                    bias.y,
                    bias.z
                );
                self.sink.publish(self.filter.body_state(), stamp_us);
                Ok(())
            }
            Err(e) => {
                log_warn!("AHRS: alignment rejected: {}", e.as_str());
                Err(e)
            }
        }
    }

    /// GEO_MAG report if one is due at `now_us`
    pub fn poll_geo_mag(&mut self, now_us: u64) -> Option<GeoMagReport> {
        self.geo_mag.poll(now_us, self.filter.mag_h())
    }

    fn on_gyro(&mut self, stamp_us: u64, rate: &Vector3f) {
        let last = self.last_gyro_stamp_us.replace(stamp_us);

        if !self.filter.is_running() {
            return;
        }

        let dt = match self.timing {
            PropagationTiming::Fixed { frequency_hz } => 1.0 / frequency_hz,
            PropagationTiming::Measured => match last {
                Some(last) if stamp_us > last => {
                    let dt = (stamp_us - last) as f32 * 1e-6;
                    if dt > self.max_propagate_dt {
                        log_debug!("AHRS: gyro gap {} s skipped", dt);
                        return;
                    }
                    dt
                }
                Some(last) => {
                    log_debug!("AHRS: gyro stamp {} not after {}, skipped", stamp_us, last);
                    return;
                }
                None => {
                    log_debug!("AHRS: first gyro sample, no interval yet");
                    return;
                }
            },
        };

        if !dt.is_finite() || dt <= 0.0 {
            log_debug!("AHRS: propagation interval {} s skipped", dt);
            return;
        }

        if self.filter.propagate(rate, dt) {
            self.sink.publish(self.filter.body_state(), stamp_us);
        }
    }

    fn on_accel(&mut self, accel: &Vector3f) {
        if !self.filter.is_running() {
            return;
        }
        if !self.filter.update_accel(accel) {
            log_warn!(
                "AHRS: accel update rejected ({} total)",
                self.filter.rejected_updates()
            );
        }
    }

    fn on_mag(&mut self, mag: &Vector3f) {
        if !self.filter.is_running() {
            return;
        }
        if !self.filter.update_mag(mag) {
            log_warn!(
                "AHRS: mag update rejected ({} total)",
                self.filter.rejected_updates()
            );
        }
    }
}

/// AHRS task entry point
///
/// Awaits events from `next_event` until it returns `None`. While the filter
/// is uninitialized, accepted raw samples also feed a [`SampleAligner`]; its
/// averages initialize the filter. A rejected alignment restarts the aligner.
///
/// # Arguments
///
/// * `sink` - Shared vehicle state receiving body attitude and rates
/// * `config` - Task configuration
/// * `next_event` - Async source of sensor events
///
/// # Example (conceptual)
///
/// ```ignore
/// static AHRS_STATE: SharedAhrsState = SharedAhrsState::new();
///
/// #[embassy_executor::task]
/// async fn ahrs_task(events: &'static ImuChannel) {
///     let config = AhrsMlkfTaskConfig::from_params(&params).unwrap_or_default();
///     run_ahrs_mlkf_task(&AHRS_STATE, config, || async {
///         Some(events.receive().await)
///     })
///     .await;
/// }
/// ```
pub async fn run_ahrs_mlkf_task<S, F, Fut>(
    sink: &S,
    config: AhrsMlkfTaskConfig,
    mut next_event: F,
) -> Mlkf
where
    S: VehicleStateSink,
    F: FnMut() -> Fut,
    Fut: core::future::Future<Output = Option<SensorEvent>>,
{
    let mut task = AhrsMlkfTask::new(config, sink);
    let mut aligner = SampleAligner::new(config.aligner);

    while let Some(event) = next_event().await {
        let aligned = if task.filter().is_running() {
            None
        } else {
            feed_aligner(&task, &mut aligner, &event)
        };

        task.handle_event(&event);

        if let Some(sample) = aligned {
            if task.align(event.stamp_us(), &sample).is_err() {
                aligner.reset();
            }
        }

        if let Some(report) = task.poll_geo_mag(event.stamp_us()) {
            log_debug!(
                "GEO_MAG: h = [{}, {}, {}]",
                report.h_x,
                report.h_y,
                report.h_z
            );
        }
    }

    task.into_filter()
}

fn feed_aligner<S: VehicleStateSink>(
    task: &AhrsMlkfTask<'_, S>,
    aligner: &mut SampleAligner,
    event: &SensorEvent,
) -> Option<AlignmentSample> {
    match event {
        SensorEvent::Gyro {
            sender_id, rate, ..
        } if task.accepts(*sender_id) => {
            aligner.add_gyro(rate);
            None
        }
        SensorEvent::Mag { sender_id, mag, .. } if task.accepts(*sender_id) => {
            aligner.add_mag(mag);
            None
        }
        SensorEvent::Accel {
            sender_id, accel, ..
        } if task.accepts(*sender_id) => aligner.add_accel(accel),
        _ => None,
    }
}
