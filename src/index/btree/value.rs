//! Payload carried by leaf entries.

use std::fmt;

/// Which field of a [`Value`] is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// No field is populated.
    Empty,
    String,
    Bool,
    Float,
    Int,
}

/// A fixed-shape record holding a string, a bool, an f32 and an i64.
///
/// All four fields are stored (and encoded) regardless of which one the
/// caller cares about, so a value read back from disk is bit-for-bit the
/// value that was written. The constructors populate one field and leave
/// the rest at zero.
///
/// Absence of a key is reported by `Option<Value>` from
/// [`BPlusTree::search`](super::BPlusTree::search), never by
/// [`Value::is_empty`].
///
/// # Example
/// ```
/// use pagetree::{Value, ValueKind};
///
/// let v = Value::int(42);
/// assert_eq!(v.int_value(), 42);
/// assert_eq!(v.kind(), ValueKind::Int);
/// assert_eq!(v.to_string(), "42");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Value {
    string_value: String,
    bool_value: bool,
    float_value: f32,
    int_value: i64,
}

impl Value {
    /// Build a value with every field set explicitly.
    pub fn new(
        string_value: impl Into<String>,
        bool_value: bool,
        float_value: f32,
        int_value: i64,
    ) -> Self {
        Self {
            string_value: string_value.into(),
            bool_value,
            float_value,
            int_value,
        }
    }

    /// A value with only the string field set.
    pub fn string(value: impl Into<String>) -> Self {
        Self::new(value, false, 0.0, 0)
    }

    /// A value with only the bool field set.
    pub fn boolean(value: bool) -> Self {
        Self::new("", value, 0.0, 0)
    }

    /// A value with only the float field set.
    pub fn float(value: f32) -> Self {
        Self::new("", false, value, 0)
    }

    /// A value with only the integer field set.
    pub fn int(value: i64) -> Self {
        Self::new("", false, 0.0, value)
    }

    pub fn string_value(&self) -> &str {
        &self.string_value
    }

    pub fn bool_value(&self) -> bool {
        self.bool_value
    }

    pub fn float_value(&self) -> f32 {
        self.float_value
    }

    pub fn int_value(&self) -> i64 {
        self.int_value
    }

    /// The first populated field, in string/bool/float/int order.
    pub fn kind(&self) -> ValueKind {
        if !self.string_value.is_empty() {
            ValueKind::String
        } else if self.bool_value {
            ValueKind::Bool
        } else if self.float_value != 0.0 {
            ValueKind::Float
        } else if self.int_value != 0 {
            ValueKind::Int
        } else {
            ValueKind::Empty
        }
    }

    /// True when all four fields are at their zero value.
    pub fn is_empty(&self) -> bool {
        self.kind() == ValueKind::Empty
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ValueKind::String => write!(f, "{:?}", self.string_value),
            ValueKind::Bool => write!(f, "{}", self.bool_value),
            ValueKind::Float => write!(f, "{}", self.float_value),
            ValueKind::Int | ValueKind::Empty => write!(f, "{}", self.int_value),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::boolean(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::string(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_one_field() {
        assert_eq!(Value::string("x").kind(), ValueKind::String);
        assert_eq!(Value::boolean(true).kind(), ValueKind::Bool);
        assert_eq!(Value::float(1.5).kind(), ValueKind::Float);
        assert_eq!(Value::int(-3).kind(), ValueKind::Int);

        let v = Value::float(2.5);
        assert_eq!(v.string_value(), "");
        assert!(!v.bool_value());
        assert_eq!(v.int_value(), 0);
    }

    #[test]
    fn test_zero_values_are_empty() {
        assert!(Value::default().is_empty());
        assert!(Value::int(0).is_empty());
        assert!(Value::boolean(false).is_empty());
        assert!(!Value::int(1).is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::int(7).to_string(), "7");
        assert_eq!(Value::string("hi").to_string(), "\"hi\"");
        assert_eq!(Value::boolean(true).to_string(), "true");
        assert_eq!(Value::float(0.5).to_string(), "0.5");
        assert_eq!(Value::default().to_string(), "0");
    }

    #[test]
    fn test_from_impls() {
        assert_eq!(Value::from(5i64), Value::int(5));
        assert_eq!(Value::from("s"), Value::string("s"));
        assert_eq!(Value::from(true), Value::boolean(true));
    }
}
