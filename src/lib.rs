#![cfg_attr(not(test), no_std)]

//! mlkf_ahrs - MLKF attitude estimator for embedded autopilots
//!
//! This library wires the pure estimator from `mlkf_ahrs_core` to sensor
//! events, shared vehicle state and diagnostic telemetry.

// Logging macros and shared infrastructure
pub mod core;

// Subsystems (AHRS)
pub mod subsystems;

pub use mlkf_ahrs_core as estimator;
