//! Serialization from Rust types to JSON.

use crate::value::JsonValue;
use std::collections::HashMap;

/// Trait for types that can be serialized to JSON.
pub trait Serialize {
    /// Serializes a value to a JSON value.
    fn serialize(&self) -> JsonValue;

    /// Serializes to a JSON string.
    fn to_string(&self) -> String {
        self.serialize().to_string()
    }

    /// Serializes to a pretty JSON string with indentation.
    fn to_string_pretty(&self) -> String {
        pretty_print(&self.serialize(), 0)
    }
}

// Implement Serialize for primitive types
impl Serialize for String {
    fn serialize(&self) -> JsonValue {
        JsonValue::String(self.clone())
    }
}

impl Serialize for &str {
    fn serialize(&self) -> JsonValue {
        JsonValue::String((*self).to_string())
    }
}

impl Serialize for bool {
    fn serialize(&self) -> JsonValue {
        JsonValue::Bool(*self)
    }
}

impl Serialize for f64 {
    fn serialize(&self) -> JsonValue {
        JsonValue::Number(*self)
    }
}

impl Serialize for f32 {
    fn serialize(&self) -> JsonValue {
        JsonValue::Number(*self as f64)
    }
}

impl Serialize for i32 {
    fn serialize(&self) -> JsonValue {
        JsonValue::Number(*self as f64)
    }
}

impl Serialize for i64 {
    fn serialize(&self) -> JsonValue {
        JsonValue::Number(*self as f64)
    }
}

impl Serialize for u32 {
    fn serialize(&self) -> JsonValue {
        JsonValue::Number(*self as f64)
    }
}

impl Serialize for u64 {
    fn serialize(&self) -> JsonValue {
        JsonValue::Number(*self as f64)
    }
}

impl Serialize for usize {
    fn serialize(&self) -> JsonValue {
        JsonValue::Number(*self as f64)
    }
}

impl<T: Serialize> Serialize for Vec<T> {
    fn serialize(&self) -> JsonValue {
        JsonValue::Array(self.iter().map(|v| v.serialize()).collect())
    }
}

impl<T: Serialize> Serialize for Option<T> {
    fn serialize(&self) -> JsonValue {
        match self {
            Some(v) => v.serialize(),
            None => JsonValue::Null,
        }
    }
}

impl<V: Serialize> Serialize for HashMap<String, V> {
    fn serialize(&self) -> JsonValue {
        JsonValue::Object(
            self.iter()
                .map(|(k, v)| (k.clone(), v.serialize()))
                .collect(),
        )
    }
}

impl<T: Serialize> Serialize for &T {
    fn serialize(&self) -> JsonValue {
        (*self).serialize()
    }
}

/// Helper function to serialize to a JSON string
pub fn to_string<T: Serialize>(value: &T) -> String {
    value.to_string()
}

/// Helper function to serialize to a pretty JSON string
pub fn to_string_pretty<T: Serialize>(value: &T) -> String {
    value.to_string_pretty()
}

/// Internal helper for pretty printing with indentation
fn pretty_print(value: &JsonValue, indent: usize) -> String {
    match value {
        JsonValue::Object(map) => {
            if map.is_empty() {
                return "{}".to_string();
            }
            let mut result = "{\n".to_string();
            let items: Vec<_> = map.iter().collect();
            for (i, (k, v)) in items.iter().enumerate() {
                result.push_str(&"  ".repeat(indent + 1));
                result.push_str(&format!(
                    "\"{}\": {}",
                    crate::serializer::escape_json_string(k),
                    pretty_print(v, indent + 1)
                ));
                if i < items.len() - 1 {
                    result.push(',');
                }
                result.push('\n');
            }
            result.push_str(&"  ".repeat(indent));
            result.push('}');
            result
        }
        JsonValue::Array(arr) => {
            if arr.is_empty() {
                return "[]".to_string();
            }
            let mut result = "[\n".to_string();
            for (i, v) in arr.iter().enumerate() {
                result.push_str(&"  ".repeat(indent + 1));
                result.push_str(&pretty_print(v, indent + 1));
                if i < arr.len() - 1 {
                    result.push(',');
                }
                result.push('\n');
            }
            result.push_str(&"  ".repeat(indent));
            result.push(']');
            result
        }
        _ => value.to_string(),
    }
}
