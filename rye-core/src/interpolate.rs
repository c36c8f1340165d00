//! The two substitution systems directives and graphs use (§4.8).
//!
//! `{input:name}` and friends are resolved by directive authors building
//! prompts and structured action parameters. `${namespace.path}` is
//! resolved by graph walkers and hooks against a namespaced view of
//! inputs, state, the last action's result, and the current event.

use serde_json::Value;

/// Resolve `{input:name}` placeholders against directive inputs.
///
/// Forms: `{input:name}` (errors render as empty if the key is absent
/// and no default is given), `{input:name?}` (empty if absent),
/// `{input:name:default}` or `{input:name|default}` (falls back to
/// `default` if absent). Always returns a string — this substitution
/// system has no type-preservation rule.
pub fn resolve_input_placeholders(template: &str, inputs: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{input:") {
        out.push_str(&rest[..start]);
        let after = &rest[start + "{input:".len()..];
        let Some(end) = after.find('}') else {
            // Unterminated placeholder: emit the rest verbatim and stop.
            out.push_str(&rest[start..]);
            return out;
        };
        let body = &after[..end];
        out.push_str(&resolve_input_body(body, inputs));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

fn resolve_input_body(body: &str, inputs: &Value) -> String {
    let optional = body.ends_with('?');
    let body = body.strip_suffix('?').unwrap_or(body);

    let (name, default) = match body.split_once(':').or_else(|| body.split_once('|')) {
        Some((name, default)) => (name, Some(default)),
        None => (body, None),
    };

    match inputs.get(name) {
        Some(Value::Null) | None => {
            if let Some(default) = default {
                default.to_string()
            } else if optional {
                String::new()
            } else {
                String::new()
            }
        }
        Some(value) => value_to_display_string(value),
    }
}

fn value_to_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The namespaced context `${...}` placeholders resolve against.
#[derive(Debug, Clone, Default)]
pub struct Namespaces {
    /// `${inputs.*}` — the directive's resolved inputs.
    pub inputs: Value,
    /// `${state.*}` — current graph-walker state.
    pub state: Value,
    /// `${result.*}` — the last action's result.
    pub result: Value,
    /// `${event.*}` — the current hook-event context.
    pub event: Value,
}

impl Namespaces {
    fn root(&self, namespace: &str) -> Option<&Value> {
        match namespace {
            "inputs" => Some(&self.inputs),
            "state" => Some(&self.state),
            "result" => Some(&self.result),
            "event" => Some(&self.event),
            _ => None,
        }
    }

    /// Resolve a dotted path like `state.user.name` against the matching
    /// namespace. Returns `None` if the namespace is unknown or any
    /// segment along the path is missing.
    pub fn resolve_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let namespace = segments.next()?;
        let mut current = self.root(namespace)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

/// Resolve `${namespace.path}` placeholders in `template`.
///
/// Type preservation (§4.8): when `template` is *exactly* one
/// placeholder with nothing else around it, the resolved value's JSON
/// type is preserved and returned directly. Otherwise every placeholder
/// found is coerced to a string and substituted into the surrounding
/// text, and the whole result is returned as a JSON string.
pub fn resolve_path_placeholders(template: &str, namespaces: &Namespaces) -> Value {
    if let Some(path) = whole_string_placeholder(template) {
        return namespaces.resolve_path(path).cloned().unwrap_or(Value::Null);
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return Value::String(out);
        };
        let path = &after[..end];
        let resolved = namespaces.resolve_path(path).cloned().unwrap_or(Value::Null);
        out.push_str(&value_to_display_string(&resolved));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Value::String(out)
}

fn whole_string_placeholder(template: &str) -> Option<&str> {
    let inner = template.strip_prefix("${")?.strip_suffix('}')?;
    if inner.contains("${") {
        None
    } else {
        Some(inner)
    }
}
