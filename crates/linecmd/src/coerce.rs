//! Ready-made option coercions.
//!
//! Each function returns a [`Coerce`] to pass to `Command::option_with`:
//!
//! ```rust,ignore
//! cmd.option_with("-i, --integer <n>", "An integer argument", coerce::int())
//!    .option_with_default("-c, --collect [value]", "A repeatable value", coerce::collect(), json!([]))
//!    .option_with_default("-v, --verbose", "Verbosity", coerce::count(), 0);
//! ```

use std::sync::Arc;

use regex::Regex;
use serde_json::{Number, Value};

use crate::option::Coerce;

/// Wrap a closure as a [`Coerce`].
pub fn from_fn<F>(f: F) -> Coerce
where
    F: Fn(Option<&str>, &Value) -> Value + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Parse an integer; an unparsable value yields no value.
pub fn int() -> Coerce {
    from_fn(|raw, _| {
        raw.and_then(|s| s.trim().parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or(Value::Null)
    })
}

/// Parse a float; an unparsable value yields no value.
pub fn float() -> Coerce {
    from_fn(|raw, _| {
        raw.and_then(|s| s.trim().parse::<f64>().ok())
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    })
}

/// Split a comma separated value into a list of strings.
pub fn list() -> Coerce {
    from_fn(|raw, _| match raw {
        Some(s) => Value::Array(s.split(',').map(Value::from).collect()),
        None => Value::Null,
    })
}

/// Parse `a..b` into a two element list of numbers.
pub fn range() -> Coerce {
    from_fn(|raw, _| {
        let Some((start, end)) = raw.and_then(|s| s.split_once("..")) else {
            return Value::Null;
        };
        let bounds: Vec<Value> = [start, end]
            .iter()
            .map(|b| number(b.trim()))
            .collect();
        Value::Array(bounds)
    })
}

/// Append each occurrence to a list, so `-c a -c b` gives `["a", "b"]`.
pub fn collect() -> Coerce {
    from_fn(|raw, previous| {
        let mut items = match previous {
            Value::Array(items) => items.clone(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        };
        if let Some(raw) = raw {
            items.push(Value::from(raw));
        }
        Value::Array(items)
    })
}

/// Count occurrences, so `-vvv` gives `3`.
pub fn count() -> Coerce {
    from_fn(|_, previous| Value::from(previous.as_i64().unwrap_or(0) + 1))
}

/// Keep the part of the value matched by `pattern`, else the previous value.
pub fn pattern(pattern: Regex) -> Coerce {
    from_fn(move |raw, previous| {
        raw.and_then(|s| pattern.find(s))
            .map(|m| Value::from(m.as_str()))
            .unwrap_or_else(|| previous.clone())
    })
}

/// Look up a builtin coercion by name.
pub fn by_name(name: &str) -> Option<Coerce> {
    match name {
        "int" | "integer" => Some(int()),
        "float" | "number" => Some(float()),
        "list" => Some(list()),
        "range" => Some(range()),
        "collect" => Some(collect()),
        "count" => Some(count()),
        _ => None,
    }
}

fn number(s: &str) -> Value {
    if let Ok(i) = s.parse::<i64>() {
        return Value::from(i);
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
