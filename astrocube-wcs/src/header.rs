use std::collections::HashMap;

use crate::error::{WcsError, WcsResult};

/// Read-only keyword source the WCS builder draws from.
///
/// Implementors decide how raw header text is coerced; `contains` must report
/// keys that exist even when their value does not coerce, so the builder can
/// tell a missing keyword from a malformed one.
pub trait KeywordProvider {
    fn get_string(&self, key: &str) -> Option<String>;
    fn get_float(&self, key: &str) -> Option<f64>;
    fn get_int(&self, key: &str) -> Option<i64>;
    fn contains(&self, key: &str) -> bool;

    /// `Ok(None)` when absent, an error when present but not numeric.
    fn lookup_float(&self, key: &str) -> WcsResult<Option<f64>> {
        match self.get_float(key) {
            Some(value) => Ok(Some(value)),
            None if self.contains(key) => Err(not_a_number(self, key)),
            None => Ok(None),
        }
    }

    /// `Ok(None)` when absent, an error when present but not an integer.
    fn lookup_int(&self, key: &str) -> WcsResult<Option<i64>> {
        match self.get_int(key) {
            Some(value) => Ok(Some(value)),
            None if self.contains(key) => Err(not_a_number(self, key)),
            None => Ok(None),
        }
    }
}

fn not_a_number<P: KeywordProvider + ?Sized>(provider: &P, key: &str) -> WcsError {
    let raw = provider.get_string(key).unwrap_or_default();
    WcsError::invalid_keyword(key, format!("not a number: '{}'", raw))
}

#[derive(Debug, Clone, Default)]
pub struct KeywordMap {
    strings: HashMap<String, String>,
    floats: HashMap<String, f64>,
    ints: HashMap<String, i64>,
}

impl KeywordMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.strings.insert(key.into(), value.into());
        self
    }

    pub fn set_float(&mut self, key: impl Into<String>, value: f64) -> &mut Self {
        self.floats.insert(key.into(), value);
        self
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.ints.insert(key.into(), value);
        self
    }
}

impl KeywordProvider for KeywordMap {
    fn get_string(&self, key: &str) -> Option<String> {
        self.strings.get(key).cloned()
    }

    fn get_float(&self, key: &str) -> Option<f64> {
        self.floats
            .get(key)
            .copied()
            .or_else(|| self.ints.get(key).map(|&v| v as f64))
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.ints.get(key).copied()
    }

    fn contains(&self, key: &str) -> bool {
        self.strings.contains_key(key) || self.floats.contains_key(key) || self.ints.contains_key(key)
    }
}
