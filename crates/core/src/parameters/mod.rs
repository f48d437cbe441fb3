//! Parameter management types and utilities
//!
//! This module provides the parameter store and the AHRS parameter block
//! that builds the estimator configuration from it.

pub mod ahrs;
pub mod error;
pub mod storage;

pub use ahrs::AhrsParams;
pub use error::ParameterError;
pub use storage::{ParamValue, ParameterStore};
pub use storage::{MAX_PARAMS, PARAM_NAME_LEN};
