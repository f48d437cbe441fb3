//! Parameter error types

/// Errors from parameter store operations and parameter validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterError {
    /// Unknown parameter or name longer than the store accepts
    InvalidConfig,
    /// Store is full
    StoreFull,
    /// Value outside the range the estimator can use
    OutOfRange,
}

impl ParameterError {
    /// Return variant name as a static string (usable with defmt on embedded)
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterError::InvalidConfig => "InvalidConfig",
            ParameterError::StoreFull => "StoreFull",
            ParameterError::OutOfRange => "OutOfRange",
        }
    }
}

impl core::fmt::Display for ParameterError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParameterError::InvalidConfig => write!(f, "invalid parameter configuration"),
            ParameterError::StoreFull => write!(f, "parameter store full"),
            ParameterError::OutOfRange => write!(f, "parameter value out of range"),
        }
    }
}
