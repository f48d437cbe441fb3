//! mlkf_ahrs_core - Pure no_std attitude estimation logic
//!
//! This crate contains the platform-agnostic MLKF estimator and its types.
//! Everything here can be tested on host without any feature flags or
//! embassy dependencies.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives allowed
//! - **Pure no_std**: No std library dependencies, no heap allocation
//! - **Trait abstractions**: Output consumers injected via traits
//!
//! # Modules
//!
//! - [`math`]: Fixed-size matrix kernel
//! - [`ahrs`]: MLKF filter, alignment, mounting and state types
//! - [`parameters`]: Parameter store and AHRS parameter definitions

#![no_std]

pub mod ahrs;
pub mod math;
pub mod parameters;
