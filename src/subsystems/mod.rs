//! Autopilot subsystems

pub mod ahrs;
