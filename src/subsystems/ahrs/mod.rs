//! AHRS (Attitude and Heading Reference System)
//!
//! Runs the MLKF estimator from `mlkf_ahrs_core` on IMU events and publishes
//! the body attitude for the rest of the autopilot.
//!
//! ## Data flow
//!
//! ```text
//!  IMU events ──► AhrsMlkfTask ──► Mlkf ──► VehicleStateSink (SharedAhrsState)
//!                      │
//!                      └──► GeoMagStream (diagnostic)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use mlkf_ahrs::subsystems::ahrs::{run_ahrs_mlkf_task, AhrsMlkfTaskConfig, SharedAhrsState};
//!
//! static AHRS_STATE: SharedAhrsState = SharedAhrsState::new();
//!
//! async fn attitude_loop(events: &ImuChannel) {
//!     let config = AhrsMlkfTaskConfig::default();
//!     run_ahrs_mlkf_task(&AHRS_STATE, config, || async { Some(events.receive().await) }).await;
//! }
//! ```

pub mod mlkf_task;
pub mod state;
pub mod telemetry;

pub use mlkf_task::{
    run_ahrs_mlkf_task, AhrsMlkfTask, AhrsMlkfTaskConfig, PropagationTiming, SensorEvent,
    DEFAULT_MAX_PROPAGATE_DT,
};
pub use state::SharedAhrsState;
pub use telemetry::{GeoMagReport, GeoMagStream};
