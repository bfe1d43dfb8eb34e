//! Case-insensitive instance variables.
//!
//! Keys compare case-insensitively (`Name`, `name` and `NAME` are one
//! variable). The spelling of the most recent write is kept for display.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Variable writes returned by an action handler, applied as one batch.
pub type VariableUpdates = BTreeMap<String, String>;

/// String variables of one workflow instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Variables {
    /// Folded key -> (display key, value).
    entries: HashMap<String, (String, String)>,
}

fn fold(key: &str) -> String {
    key.trim().to_lowercase()
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a variable, ignoring key case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&fold(key)).map(|(_, v)| v.as_str())
    }

    /// Insert or overwrite a variable. Returns the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        self.entries
            .insert(fold(&key), (key.trim().to_string(), value.into()))
            .map(|(_, old)| old)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(&fold(key)).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&fold(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate `(display key, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.values().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy every entry of `other` into `self`.
    pub fn extend<K, V>(&mut self, other: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in other {
            self.set(k, v);
        }
    }

    /// Sorted `display key -> value` map, for output.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries
            .values()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl From<BTreeMap<String, String>> for Variables {
    fn from(map: BTreeMap<String, String>) -> Self {
        let mut vars = Variables::new();
        vars.extend(map);
        vars
    }
}

impl From<Variables> for BTreeMap<String, String> {
    fn from(vars: Variables) -> Self {
        vars.to_map()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Variables::new();
        vars.extend(iter);
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut vars = Variables::new();
        vars.set("UserName", "ada");
        assert_eq!(vars.get("username"), Some("ada"));
        assert_eq!(vars.get("USERNAME"), Some("ada"));
        assert!(vars.contains("userName"));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn test_overwrite_keeps_latest_spelling() {
        let mut vars = Variables::new();
        vars.set("city", "Oslo");
        let old = vars.set("City", "Bergen");
        assert_eq!(old.as_deref(), Some("Oslo"));
        assert_eq!(vars.len(), 1);
        let map = vars.to_map();
        assert_eq!(map.get("City").map(String::as_str), Some("Bergen"));
    }

    #[test]
    fn test_serde_as_plain_map() {
        let vars: Variables = [("a", "1"), ("B", "2")].into_iter().collect();
        let json = serde_json::to_value(&vars).unwrap();
        assert_eq!(json, serde_json::json!({"B": "2", "a": "1"}));

        let back: Variables = serde_json::from_value(json).unwrap();
        assert_eq!(back.get("b"), Some("2"));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut vars: Variables = [("x", "1"), ("y", "2")].into_iter().collect();
        assert_eq!(vars.remove("X").as_deref(), Some("1"));
        assert!(!vars.contains("x"));
        vars.clear();
        assert!(vars.is_empty());
    }
}
