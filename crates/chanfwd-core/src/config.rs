//! Inspector configuration blobs.
//!
//! The analyzer describes each inspector with a flat key/value config
//! (demodulator selection, audio cutoff, mute flags, ...). The forwarder
//! stores the last config it saw for every open master and pushes edited
//! copies back with `set_inspector_config`.

use std::collections::HashMap;
use std::fmt;

/// A single typed configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// Boolean flag.
    Bool(bool),
    /// Unsigned integer (demodulator codes, sample rates).
    Uint(u64),
    /// Floating-point value (cutoffs, volumes).
    Float(f64),
    /// Free-form string.
    Str(String),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(v) => write!(f, "{v}"),
            ConfigValue::Uint(v) => write!(f, "{v}"),
            ConfigValue::Float(v) => write!(f, "{v}"),
            ConfigValue::Str(v) => write!(f, "{v}"),
        }
    }
}

/// A flat key/value inspector configuration.
///
/// Typed setters overwrite any previous value under the same key; typed
/// getters return `None` on a missing key or a type mismatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InspectorConfig {
    entries: HashMap<String, ConfigValue>,
}

impl InspectorConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the config holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set a raw value.
    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.entries.insert(key.to_string(), value);
    }

    /// Set a boolean entry.
    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.set(key, ConfigValue::Bool(value));
    }

    /// Set an unsigned integer entry.
    pub fn set_uint(&mut self, key: &str, value: u64) {
        self.set(key, ConfigValue::Uint(value));
    }

    /// Set a floating-point entry.
    pub fn set_float(&mut self, key: &str, value: f64) {
        self.set(key, ConfigValue::Float(value));
    }

    /// Set a string entry.
    pub fn set_str(&mut self, key: &str, value: &str) {
        self.set(key, ConfigValue::Str(value.to_string()));
    }

    /// Raw lookup.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    /// Boolean lookup; `None` on missing key or type mismatch.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.entries.get(key) {
            Some(ConfigValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    /// Unsigned integer lookup; `None` on missing key or type mismatch.
    pub fn get_uint(&self, key: &str) -> Option<u64> {
        match self.entries.get(key) {
            Some(ConfigValue::Uint(v)) => Some(*v),
            _ => None,
        }
    }

    /// Floating-point lookup; `None` on missing key or type mismatch.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.entries.get(key) {
            Some(ConfigValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    /// String lookup; `None` on missing key or type mismatch.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(ConfigValue::Str(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Iterate over all entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
