//! Options bag enumeration.
//!
//! Options messages (`FileOptions`, `MessageOptions`, ...) are walked through
//! their dynamic `prost-reflect` view, so every set field is rendered without
//! a hand-maintained list of option names.

use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, ReflectMessage, Value};
use tracing::trace;

/// A rendered option: `(name, literal)`
pub(crate) type OptionPair = (String, String);

/// Returns the set scalar options of `options` in field-number order.
///
/// Fields named in `skip`, repeated fields and message-typed fields (which
/// covers `uninterpreted_option` and editions `features`) are left out.
pub(crate) fn option_pairs<M: ReflectMessage>(options: &M, skip: &[&str]) -> Vec<OptionPair> {
    let dynamic: DynamicMessage = options.transcode_to_dynamic();

    dynamic
        .fields()
        .filter(|(field, _)| !skip.contains(&field.name()))
        .filter_map(|(field, value)| match option_literal(&field, value) {
            Some(literal) => Some((field.name().to_string(), literal)),
            None => {
                trace!("Skipping non-scalar option '{}'", field.name());
                None
            }
        })
        .collect()
}

/// Formats a scalar option value as a `.proto` literal
fn option_literal(field: &FieldDescriptor, value: &Value) -> Option<String> {
    let literal = match value {
        Value::Bool(v) => v.to_string(),
        Value::I32(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::U32(v) => v.to_string(),
        Value::U64(v) => v.to_string(),
        Value::F32(v) => v.to_string(),
        Value::F64(v) => v.to_string(),
        Value::String(v) => format!("\"{}\"", escape_string(v)),
        Value::Bytes(v) => format!("\"{}\"", escape_bytes(v)),
        Value::EnumNumber(number) => match field.kind() {
            Kind::Enum(descriptor) => descriptor
                .get_value(*number)
                .map(|value| value.name().to_string())
                .unwrap_or_else(|| number.to_string()),
            _ => number.to_string(),
        },
        Value::Message(_) | Value::List(_) | Value::Map(_) => return None,
    };
    Some(literal)
}

/// Escape a string for proto syntax
pub(crate) fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            _ if c.is_ascii_control() => {
                result.push_str(&format!("\\x{:02x}", c as u8));
            }
            _ => result.push(c),
        }
    }
    result
}

fn escape_bytes(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\\' => result.push_str("\\\\"),
            b'"' => result.push_str("\\\""),
            0x20..=0x7E => result.push(b as char),
            _ => result.push_str(&format!("\\{:03o}", b)),
        }
    }
    result
}
