//! Value type definitions for Ripple collections.
//!
//! This module defines the `Value` enum, the dynamic item type carried through
//! collection pipelines, and the `PlainValue` trait through which an item can
//! supply its own plain-value projection.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

/// Field map of an object value, ordered by field name.
pub type Record = BTreeMap<String, Value>;

/// An item that knows how to project itself to a plain value.
///
/// Deep equality, key extraction and formatting of a [`Value::Dynamic`] all go
/// through this projection. A reactive cell implements it by reading its
/// current value, so reading it inside a capture registers a dependency.
pub trait PlainValue {
    /// Returns the plain value this item currently stands for.
    fn plain_value(&self) -> Value;
}

/// A value that can be stored in a collection.
///
/// `Array` and `Object` are reference counted: cloning a value shares the
/// allocation, and [`Value::ptr_eq`] tells whether two values are the same
/// instance rather than merely equal.
#[derive(Clone)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered list of values
    Array(Rc<Vec<Value>>),
    /// Named fields
    Object(Rc<Record>),
    /// Item with its own plain-value projection
    Dynamic(Rc<dyn PlainValue>),
}

impl Value {
    /// Creates an object value from `(name, value)` pairs.
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Object(Rc::new(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Creates an array value.
    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::Array(Rc::new(items.into_iter().collect()))
    }

    /// Wraps an item that supplies its own projection.
    pub fn dynamic<P: PlainValue + 'static>(item: P) -> Self {
        Value::Dynamic(Rc::new(item))
    }

    /// Returns true if this value is Null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean value if this is a Bool, None otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the i64 value if this is an Int, None otherwise.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the numeric value as f64 for Int and Float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is a String, None otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Returns the items if this is an Array, None otherwise.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Returns the fields if this is an Object, None otherwise.
    pub fn as_object(&self) -> Option<&Record> {
        match self {
            Value::Object(record) => Some(record),
            _ => None,
        }
    }

    /// Returns a field of an Object without unwrapping anything.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_object().and_then(|record| record.get(name))
    }

    /// Returns the named field, or Null when absent.
    ///
    /// A `Dynamic` item is projected first; the field value itself is
    /// returned as stored.
    pub fn field(&self, name: &str) -> Value {
        match self {
            Value::Object(record) => record.get(name).cloned().unwrap_or(Value::Null),
            Value::Dynamic(item) => item.plain_value().field(name),
            _ => Value::Null,
        }
    }

    /// Unwraps `Dynamic` layers until a plain value is reached.
    pub fn unwrap_plain(&self) -> Value {
        match self {
            Value::Dynamic(item) => item.plain_value().unwrap_plain(),
            other => other.clone(),
        }
    }

    /// Returns true if both values are the same instance.
    ///
    /// Shared variants compare allocations; scalars compare by value.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Dynamic(a), Value::Dynamic(b)) => {
                core::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            (Value::Array(_), _)
            | (Value::Object(_), _)
            | (Value::Dynamic(_), _)
            | (_, Value::Array(_))
            | (_, Value::Object(_))
            | (_, Value::Dynamic(_)) => false,
            (a, b) => a == b,
        }
    }

    /// Deep equality that also requires numbers to share a representation.
    ///
    /// Unlike `==`, `Int(1)` and `Float(1.0)` are not strictly equal, at any
    /// depth.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Dynamic(a), Value::Dynamic(b)) if core::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)) => true,
            (Value::Dynamic(a), b) => a.plain_value().strict_eq(b),
            (a, Value::Dynamic(b)) => a.strict_eq(&b.plain_value()),
            (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => false,
            (Value::Array(a), Value::Array(b)) => {
                Rc::ptr_eq(a, b) || (a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.strict_eq(y)))
            }
            (Value::Object(a), Value::Object(b)) => {
                Rc::ptr_eq(a, b)
                    || (a.len() == b.len()
                        && a.iter()
                            .zip(b.iter())
                            .all(|((ka, va), (kb, vb))| ka == kb && va.strict_eq(vb)))
            }
            (a, b) => a == b,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Dynamic(a), Value::Dynamic(b)) => {
                core::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
                    || a.plain_value() == b.plain_value()
            }
            (Value::Dynamic(a), b) => a.plain_value() == *b,
            (a, Value::Dynamic(b)) => *a == b.plain_value(),
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                // Handle NaN comparison
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            // Cross-type numeric comparisons
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(v) => write!(f, "Bool({:?})", v),
            Value::Int(v) => write!(f, "Int({:?})", v),
            Value::Float(v) => write!(f, "Float({:?})", v),
            Value::String(v) => write!(f, "String({:?})", v),
            Value::Array(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Object(record) => f.debug_map().entries(record.iter()).finish(),
            Value::Dynamic(item) => write!(f, "Dynamic({:?})", item.plain_value()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Object(record) => {
                f.write_str("{")?;
                for (i, (name, value)) in record.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                f.write_str("}")
            }
            Value::Dynamic(item) => write!(f, "{}", item.plain_value()),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(Rc::new(v))
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Object(Rc::new(v))
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::vec;
    use core::cell::Cell;

    struct Counter {
        value: i64,
        reads: Cell<usize>,
    }

    impl PlainValue for Counter {
        fn plain_value(&self) -> Value {
            self.reads.set(self.reads.get() + 1);
            Value::Int(self.value)
        }
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int(100).as_i64(), Some(100));
        assert_eq!(Value::Int(2).as_f64(), Some(2.0));
        assert_eq!(Value::Float(3.5).as_f64(), Some(3.5));
        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
        assert_eq!(Value::array(vec![Value::Int(1)]).as_array().map(|a| a.len()), Some(1));
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Int(42), Value::Int(42));
        assert_eq!(Value::Int(42), Value::Float(42.0));
        assert_ne!(Value::Int(42), Value::String("42".into()));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_eq!(Value::Null, Value::Null);
    }

    #[test]
    fn test_value_strict_equality() {
        assert!(Value::Int(1).strict_eq(&Value::Int(1)));
        assert!(Value::Float(f64::NAN).strict_eq(&Value::Float(f64::NAN)));
        assert!(!Value::Int(1).strict_eq(&Value::Float(1.0)));

        let a = Value::object([("n", Value::Int(1))]);
        let b = Value::object([("n", Value::Float(1.0))]);
        assert_eq!(a, b);
        assert!(!a.strict_eq(&b));
        assert!(a.strict_eq(&Value::object([("n", Value::Int(1))])));
    }

    #[test]
    fn test_object_deep_equality() {
        let a = Value::object([("id", Value::Int(1)), ("v", Value::from("A"))]);
        let b = Value::object([("v", Value::from("A")), ("id", Value::Int(1))]);
        let c = Value::object([("id", Value::Int(1)), ("v", Value::from("B"))]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.ptr_eq(&b));
        assert!(a.ptr_eq(&a.clone()));
    }

    #[test]
    fn test_field_access() {
        let item = Value::object([("message", Value::from("Howdy"))]);
        assert_eq!(item.field("message"), Value::from("Howdy"));
        assert_eq!(item.field("missing"), Value::Null);
        assert_eq!(Value::Int(1).field("message"), Value::Null);
        assert!(item.get("missing").is_none());
    }

    #[test]
    fn test_dynamic_projection() {
        let dynamic = Value::dynamic(Counter {
            value: 7,
            reads: Cell::new(0),
        });

        assert_eq!(dynamic, Value::Int(7));
        assert_eq!(Value::Int(7), dynamic);
        assert_eq!(dynamic.unwrap_plain().as_i64(), Some(7));
        assert_eq!(format!("{}", dynamic), "7");
    }

    #[test]
    fn test_dynamic_nested_in_object() {
        let a = Value::object([(
            "count",
            Value::dynamic(Counter {
                value: 3,
                reads: Cell::new(0),
            }),
        )]);
        let b = Value::object([("count", Value::Int(3))]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_display() {
        let item = Value::object([("id", Value::Int(1)), ("tags", Value::array(vec!["a".into()]))]);
        assert_eq!(format!("{}", item), "{id: 1, tags: [a]}");
        assert_eq!(format!("A{}", Value::Int(1)), "A1");
    }

    #[test]
    fn test_value_from_impls() {
        let v: Value = 42i32.into();
        assert_eq!(v.as_i64(), Some(42));

        let v: Value = "hello".into();
        assert_eq!(v.as_str(), Some("hello"));

        let v: Value = Some(100i64).into();
        assert_eq!(v.as_i64(), Some(100));

        let v: Value = None::<i32>.into();
        assert!(v.is_null());
    }
}
