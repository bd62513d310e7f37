//! Literal and pattern rendering shared by the translators.

use federa_core::Value;
use serde_json::{Value as Json, json};

use crate::translation::NativeValue;

/// JSON form of a plan-time value; dynamic parameters become
/// `{"$param": index}` placeholders.
pub(crate) fn json_value(value: &NativeValue) -> Json {
    match value {
        NativeValue::Param(i) => json!({ "$param": i }),
        NativeValue::Literal(v) => json_literal(v),
    }
}

pub(crate) fn json_literal(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int64(i) => json!(i),
        Value::Float64(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::String(s) => Json::String(s.clone()),
        Value::Binary(_) => Json::String(value.canonical_text()),
        Value::Date(d) => json!(d),
        Value::Timestamp(t) => json!(t),
    }
}

/// Query-language literal for text backends; parameters become `:p<index>`.
pub(crate) fn text_value(value: &NativeValue) -> String {
    match value {
        NativeValue::Param(i) => format!(":p{i}"),
        NativeValue::Literal(v) => match v {
            Value::String(s) => format!("'{}'", s.replace('\'', "''")),
            Value::Binary(_) => format!("0x{}", v.canonical_text()),
            _ => v.canonical_text(),
        },
    }
}

/// Quote an identifier the way CQL does.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Anchored regular expression equivalent to a SQL LIKE pattern.
pub(crate) fn like_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    out.push('^');
    for c in pattern.chars() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('$');
    out
}

/// Search-index wildcard equivalent to a SQL LIKE pattern.
pub(crate) fn like_to_wildcard(pattern: &str) -> String {
    pattern
        .chars()
        .flat_map(|c| match c {
            '%' => vec!['*'],
            '_' => vec!['?'],
            '*' | '?' | '\\' => vec!['\\', c],
            _ => vec![c],
        })
        .collect()
}
