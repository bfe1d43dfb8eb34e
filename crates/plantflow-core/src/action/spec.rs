//! Action descriptors embedded in node notes.

use serde_json::{Map, Value};

/// A note of the form `{"action": "name", "params": {...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpec {
    pub name: String,
    /// Raw parameter values, before placeholder resolution.
    pub params: Map<String, Value>,
}

impl ActionSpec {
    /// Read an action from note text.
    ///
    /// Returns `None` for anything that is not a JSON object with a non-empty
    /// string `action` key. A missing or non-object `params` reads as empty.
    pub fn from_note(note: &str) -> Option<Self> {
        let Value::Object(mut object) = serde_json::from_str::<Value>(note.trim()).ok()? else {
            return None;
        };
        let name = match object.remove("action")? {
            Value::String(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => return None,
        };
        let params = match object.remove("params") {
            Some(Value::Object(params)) => params,
            _ => Map::new(),
        };
        Some(Self { name, params })
    }

    /// Whether a note carries an action rather than display text.
    pub fn is_action_note(note: &str) -> bool {
        Self::from_note(note).is_some()
    }
}
