//! `{{key}}` placeholder resolution against instance variables.

use serde_json::{Map, Value};

use plantflow_types::variables::Variables;

use super::handler::ActionParams;

/// Replace every closed `{{ key }}` with the variable's value, or nothing.
///
/// Keys are trimmed and looked up case-insensitively. An unclosed `{{` is
/// kept as literal text.
pub fn resolve_placeholders(template: &str, variables: &Variables) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..open]);
        let key = rest[open + 2..open + 2 + close].trim();
        out.push_str(variables.get(key).unwrap_or_default());
        rest = &rest[open + 2 + close + 2..];
    }
    out.push_str(rest);
    out
}

/// Render raw JSON parameters to text and resolve their placeholders.
///
/// Strings are used as-is; other values become compact JSON first.
pub fn resolve_params(params: &Map<String, Value>, variables: &Variables) -> ActionParams {
    params
        .iter()
        .map(|(key, value)| {
            let raw = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), resolve_placeholders(&raw, variables))
        })
        .collect()
}
