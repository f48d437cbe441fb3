//! Core infrastructure shared by the subsystems

pub mod logging;
