//! Hierarchical parameter store.
//!
//! Parameters are addressed by dotted paths (`precond.coarsening.type`) and
//! stored as strings; typed access goes through [`FromStr`]. A store can be
//! filled programmatically with [`ParamStore::put`] or loaded from a JSON
//! document, in which case nested objects become dotted paths:
//!
//! ```
//! use krylov_amg::config::ParamStore;
//! let prm = ParamStore::from_json_str(r#"{"solver": {"type": "cg", "tol": 1e-6}}"#).unwrap();
//! assert_eq!(prm.get_str("solver.type"), Some("cg"));
//! assert_eq!(prm.get_or("solver.tol", 1e-8).unwrap(), 1e-6);
//! ```
//!
//! Keys nobody asks for are simply ignored.

use crate::error::KError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamStore {
    entries: BTreeMap<String, String>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document whose top level is an object.
    pub fn from_json_str(text: &str) -> Result<Self, KError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json_value(&value)
    }

    /// Read a JSON parameter file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, KError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_value(value: &Value) -> Result<Self, KError> {
        let Value::Object(_) = value else {
            return Err(KError::Configuration(
                "parameter document must be a JSON object".to_string(),
            ));
        };
        let mut store = Self::new();
        store.flatten("", value);
        Ok(store)
    }

    fn flatten(&mut self, prefix: &str, value: &Value) {
        match value {
            Value::Object(map) => {
                for (k, v) in map {
                    let key = if prefix.is_empty() { k.clone() } else { format!("{prefix}.{k}") };
                    self.flatten(&key, v);
                }
            }
            Value::Null => {}
            Value::String(s) => {
                self.entries.insert(prefix.to_string(), s.clone());
            }
            other => {
                self.entries.insert(prefix.to_string(), other.to_string());
            }
        }
    }

    /// Set `key` to `value`, replacing any previous value.
    pub fn put(&mut self, key: &str, value: impl fmt::Display) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    /// Builder-style [`put`](Self::put).
    pub fn with(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.put(key, value);
        self
    }

    /// Copy every entry of `other` into `self`, `other` winning on conflicts.
    pub fn merge(&mut self, other: &ParamStore) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Typed lookup; `Ok(None)` when the key is absent.
    pub fn get<V>(&self, key: &str) -> Result<Option<V>, KError>
    where
        V: FromStr,
        V::Err: fmt::Display,
    {
        match self.entries.get(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<V>().map(Some).map_err(|e| {
                KError::Configuration(format!("invalid value '{raw}' for parameter '{key}': {e}"))
            }),
        }
    }

    /// Typed lookup with a default for absent keys.
    pub fn get_or<V>(&self, key: &str, default: V) -> Result<V, KError>
    where
        V: FromStr,
        V::Err: fmt::Display,
    {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Entries below `prefix`, with the prefix stripped.
    pub fn subtree(&self, prefix: &str) -> ParamStore {
        let lead = format!("{prefix}.");
        let entries = self
            .entries
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&lead).map(|rest| (rest.to_string(), v.clone())))
            .collect();
        ParamStore { entries }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for ParamStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.entries {
            writeln!(f, "{k} = {v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_objects_flatten_to_dotted_keys() {
        let prm = ParamStore::from_json_str(
            r#"{"precond": {"coarsening": {"type": "aggregation", "eps_strong": 0.1}, "npre": 2},
                "solver": {"maxiter": 50, "verbose": true, "note": null}}"#,
        )
        .unwrap();
        assert_eq!(prm.get_str("precond.coarsening.type"), Some("aggregation"));
        assert_eq!(prm.get::<f64>("precond.coarsening.eps_strong").unwrap(), Some(0.1));
        assert_eq!(prm.get::<usize>("precond.npre").unwrap(), Some(2));
        assert_eq!(prm.get::<usize>("solver.maxiter").unwrap(), Some(50));
        assert_eq!(prm.get::<bool>("solver.verbose").unwrap(), Some(true));
        assert!(!prm.contains("solver.note"));
    }

    #[test]
    fn subtree_strips_prefix() {
        let prm = ParamStore::new()
            .with("precond.relax.type", "chebyshev")
            .with("precond.relax.degree", 3)
            .with("precond.relaxation", "x");
        let relax = prm.subtree("precond.relax");
        assert_eq!(relax.get_str("type"), Some("chebyshev"));
        assert_eq!(relax.get_or("degree", 5usize).unwrap(), 3);
        assert_eq!(relax.keys().count(), 2);
    }

    #[test]
    fn bad_values_are_configuration_errors() {
        let prm = ParamStore::new().with("solver.maxiter", "lots");
        let err = prm.get::<usize>("solver.maxiter").unwrap_err();
        assert!(matches!(err, KError::Configuration(_)));
    }

    #[test]
    fn top_level_must_be_object() {
        assert!(matches!(ParamStore::from_json_str("[1, 2]"), Err(KError::Configuration(_))));
        assert!(matches!(ParamStore::from_json_str("{oops"), Err(KError::ParamFile(_))));
    }

    #[test]
    fn defaults_apply_to_missing_keys() {
        let prm = ParamStore::new();
        assert_eq!(prm.get_or("solver.tol", 1e-8).unwrap(), 1e-8);
        assert!(prm.is_empty());
    }
}
