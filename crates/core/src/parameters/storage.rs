//! Parameter Storage Types
//!
//! Provides the parameter value type and the fixed-capacity `ParameterStore`
//! holding the estimator configuration.

use super::error::ParameterError;
use heapless::index_map::FnvIndexMap;
use heapless::String;

/// Maximum parameter name length
pub const PARAM_NAME_LEN: usize = 16;

/// Maximum number of parameters
pub const MAX_PARAMS: usize = 32;

/// Parameter value types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    /// Boolean parameter
    Bool(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 32-bit floating point
    Float(f32),
}

impl ParamValue {
    /// Numeric view of the value, booleans map to 0.0 / 1.0
    pub fn as_f32(&self) -> f32 {
        match self {
            ParamValue::Bool(v) => *v as u8 as f32,
            ParamValue::Int(v) => *v as f32,
            ParamValue::Float(v) => *v,
        }
    }

    /// Integer view of the value, floats are truncated
    pub fn as_i32(&self) -> i32 {
        match self {
            ParamValue::Bool(v) => *v as i32,
            ParamValue::Int(v) => *v,
            ParamValue::Float(v) => *v as i32,
        }
    }

    /// Truth view of the value, any non-zero number is true
    pub fn as_bool(&self) -> bool {
        match self {
            ParamValue::Bool(v) => *v,
            ParamValue::Int(v) => *v != 0,
            ParamValue::Float(v) => *v != 0.0,
        }
    }
}

fn key(name: &str) -> Result<String<PARAM_NAME_LEN>, ParameterError> {
    let mut key = String::<PARAM_NAME_LEN>::new();
    key.push_str(name)
        .map_err(|_| ParameterError::InvalidConfig)?;
    Ok(key)
}

/// Parameter store for configuration management
///
/// Stores parameters as key-value pairs. Only registered names can be set.
pub struct ParameterStore {
    parameters: FnvIndexMap<String<PARAM_NAME_LEN>, ParamValue, MAX_PARAMS>,
}

impl ParameterStore {
    /// Create a new empty parameter store
    pub fn new() -> Self {
        Self {
            parameters: FnvIndexMap::new(),
        }
    }

    /// Get parameter value
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(&key(name).ok()?)
    }

    /// Get a parameter as `f32`, falling back to `default` when missing
    pub fn get_f32(&self, name: &str, default: f32) -> f32 {
        self.get(name).map_or(default, ParamValue::as_f32)
    }

    /// Get a parameter as `i32`, falling back to `default` when missing
    pub fn get_i32(&self, name: &str, default: i32) -> i32 {
        self.get(name).map_or(default, ParamValue::as_i32)
    }

    /// Get a parameter as `bool`, falling back to `default` when missing
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.get(name).map_or(default, ParamValue::as_bool)
    }

    /// Set parameter value
    ///
    /// The parameter must have been registered.
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        let key = key(name)?;

        if !self.parameters.contains_key(&key) {
            return Err(ParameterError::InvalidConfig);
        }

        self.parameters
            .insert(key, value)
            .map_err(|_| ParameterError::StoreFull)?;
        Ok(())
    }

    /// Register a new parameter with its default value
    ///
    /// If the parameter already exists, this is a no-op (idempotent).
    pub fn register(
        &mut self,
        name: &str,
        default_value: ParamValue,
    ) -> Result<(), ParameterError> {
        let key = key(name)?;

        if self.parameters.contains_key(&key) {
            return Ok(());
        }

        self.parameters
            .insert(key, default_value)
            .map_err(|_| ParameterError::StoreFull)?;
        Ok(())
    }

    /// Number of registered parameters
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_store_new() {
        let store = ParameterStore::new();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_parameter_store_register_and_get() {
        let mut store = ParameterStore::new();
        store.register("AHRS_H_X", ParamValue::Float(0.5)).unwrap();
        assert_eq!(store.get("AHRS_H_X"), Some(&ParamValue::Float(0.5)));
    }

    #[test]
    fn test_parameter_store_set() {
        let mut store = ParameterStore::new();
        store.register("TEST", ParamValue::Int(42)).unwrap();
        store.set("TEST", ParamValue::Int(100)).unwrap();
        assert_eq!(store.get("TEST"), Some(&ParamValue::Int(100)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_parameter_store_set_unknown() {
        let mut store = ParameterStore::new();
        assert_eq!(
            store.set("UNKNOWN", ParamValue::Int(1)),
            Err(ParameterError::InvalidConfig)
        );
    }

    #[test]
    fn test_name_too_long_rejected() {
        let mut store = ParameterStore::new();
        let result = store.register("AHRS_NAME_TOO_LONG_FOR_STORE", ParamValue::Int(1));
        assert_eq!(result, Err(ParameterError::InvalidConfig));
        assert!(store.get("AHRS_NAME_TOO_LONG_FOR_STORE").is_none());
    }

    #[test]
    fn test_parameter_store_register_idempotent() {
        let mut store = ParameterStore::new();
        store.register("TEST", ParamValue::Int(42)).unwrap();
        store.set("TEST", ParamValue::Int(100)).unwrap();
        // Re-register should not overwrite
        store.register("TEST", ParamValue::Int(42)).unwrap();
        assert_eq!(store.get("TEST"), Some(&ParamValue::Int(100)));
    }

    #[test]
    fn test_store_full() {
        let mut store = ParameterStore::new();
        let mut name = String::<PARAM_NAME_LEN>::new();
        for i in 0..MAX_PARAMS {
            name.clear();
            core::fmt::Write::write_fmt(&mut name, format_args!("P{}", i)).unwrap();
            store.register(&name, ParamValue::Int(i as i32)).unwrap();
        }
        assert_eq!(
            store.register("ONE_MORE", ParamValue::Int(0)),
            Err(ParameterError::StoreFull)
        );
    }

    #[test]
    fn test_typed_getters() {
        let mut store = ParameterStore::new();
        store.register("F", ParamValue::Float(2.5)).unwrap();
        store.register("I", ParamValue::Int(-1)).unwrap();
        store.register("B", ParamValue::Bool(true)).unwrap();

        assert_eq!(store.get_f32("F", 0.0), 2.5);
        assert_eq!(store.get_i32("F", 0), 2);
        assert_eq!(store.get_f32("I", 0.0), -1.0);
        assert!(store.get_bool("I", false));
        assert_eq!(store.get_f32("B", 0.0), 1.0);
        assert_eq!(store.get_i32("MISSING", 9), 9);
        assert!(!store.get_bool("MISSING", false));
    }
}
