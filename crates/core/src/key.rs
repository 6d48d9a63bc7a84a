//! Item identity for keyed collections.

use crate::value::Value;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

/// Scalar identity of one item in a keyed snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Key {
    /// Converts a scalar value into a key.
    ///
    /// `Dynamic` values are projected first. Integral floats become `Int`, so
    /// `1.0` and `1` name the same item. Arrays, objects and non-integral
    /// floats have no scalar identity and map to `Key::Null`.
    pub fn from_value(value: &Value) -> Key {
        match value {
            Value::Null => Key::Null,
            Value::Bool(b) => Key::Bool(*b),
            Value::Int(i) => Key::Int(*i),
            Value::Float(f) => {
                let truncated = *f as i64;
                if truncated as f64 == *f {
                    Key::Int(truncated)
                } else {
                    Key::Null
                }
            }
            Value::String(s) => Key::Str(s.clone()),
            Value::Dynamic(item) => Key::from_value(&item.plain_value()),
            Value::Array(_) | Value::Object(_) => Key::Null,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Key::Null)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Null => f.write_str("null"),
            Key::Bool(b) => write!(f, "{}", b),
            Key::Int(i) => write!(f, "{}", i),
            Key::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for Key {
    fn from(v: bool) -> Self {
        Key::Bool(v)
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Key::Int(v as i64)
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Str(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Str(v)
    }
}

impl From<&Value> for Key {
    fn from(v: &Value) -> Self {
        Key::from_value(v)
    }
}

/// How a keyed collection derives the key of each item.
#[derive(Clone)]
pub enum KeySelector {
    /// Read a named field of the item.
    Field(String),
    /// Compute the key with a function.
    Func(Rc<dyn Fn(&Value) -> Key>),
}

impl KeySelector {
    /// Selects keys by field name.
    pub fn field(name: impl Into<String>) -> Self {
        KeySelector::Field(name.into())
    }

    /// Selects keys with a function.
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Key + 'static,
    {
        KeySelector::Func(Rc::new(f))
    }

    /// Returns the key of one item.
    pub fn key_of(&self, item: &Value) -> Key {
        match self {
            KeySelector::Field(name) => Key::from_value(&item.field(name)),
            KeySelector::Func(f) => f(item),
        }
    }

    /// Returns the keys of a sequence of items, in order.
    pub fn keys_of(&self, items: &[Value]) -> Vec<Key> {
        items.iter().map(|item| self.key_of(item)).collect()
    }
}

impl From<&str> for KeySelector {
    fn from(name: &str) -> Self {
        KeySelector::field(name)
    }
}

impl From<String> for KeySelector {
    fn from(name: String) -> Self {
        KeySelector::Field(name)
    }
}

impl fmt::Debug for KeySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySelector::Field(name) => f.debug_tuple("Field").field(name).finish(),
            KeySelector::Func(_) => f.write_str("Func(..)"),
        }
    }
}
