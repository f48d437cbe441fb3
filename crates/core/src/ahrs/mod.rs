//! AHRS (Attitude and Heading Reference System) filter and types
//!
//! This module provides the platform-agnostic MLKF attitude estimator:
//!
//! - [`mlkf`]: the filter (propagation, vector updates, error-state reset)
//! - [`alignment`]: initial attitude from averaged accelerometer/magnetometer
//! - [`aligner`]: still-vehicle detection and sample averaging
//! - [`mounting`]: IMU-to-body projection
//! - [`traits`]: output types and the vehicle-state sink
//!
//! Event routing, shared state and logging are in the firmware crate.

pub mod aligner;
pub mod alignment;
pub mod mlkf;
pub mod mounting;
pub mod traits;

pub use aligner::{AlignerConfig, AlignerStatus, SampleAligner};
pub use alignment::{gravity_reference, quat_from_accel_mag, AlignmentSample, GRAVITY};
pub use mlkf::{Mlkf, MlkfConfig, MlkfStatus, RateFilter};
pub use mounting::MountingTransform;
pub use traits::{AhrsError, AhrsState, BodyState, VehicleStateSink};
