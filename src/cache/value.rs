//! Cache Value Module
//!
//! Defines the tagged value sum stored under each key, plus the record type
//! used for list elements.

use std::any::Any;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::sync::Arc;

use crate::error::{CacheError, Result};

// == Value ==
/// A dynamically-typed cache payload.
///
/// Commands are strictly typed: each one checks the stored variant before
/// operating and rejects a mismatch without mutating the entry or its
/// recency position.
#[derive(Clone)]
pub enum Value {
    /// UTF-8 string payload
    Str(String),
    /// Signed 64-bit integer counter
    Int(i64),
    /// Double-precision float counter
    Float(f64),
    /// Ordered sequence of records, head at the front
    List(VecDeque<ValueRecord>),
    /// Unordered collection with unique membership under value equality
    Set(HashSet<Value>),
    /// Arbitrary payload placed through the raw insertion path.
    /// Never produced by the command surface.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Value {
    // == Constructors ==
    /// Wraps an arbitrary payload as an opaque value.
    pub fn opaque<T: Any + Send + Sync>(payload: T) -> Self {
        Value::Opaque(Arc::new(payload))
    }

    // == Type Name ==
    /// Human-readable category of this value, as used in type-mismatch
    /// error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "int64",
            Value::Float(_) => "float64",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Opaque(_) => "opaque",
        }
    }

    // == Typed Accessors ==
    /// Borrows the string payload, or reports the mismatch.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(s) => Ok(s),
            _ => Err(CacheError::TypeMismatch("a string")),
        }
    }

    /// Returns the integer payload, or reports the mismatch.
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(v) => Ok(*v),
            _ => Err(CacheError::TypeMismatch("int64")),
        }
    }

    /// Returns the float payload, or reports the mismatch.
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Float(v) => Ok(*v),
            _ => Err(CacheError::TypeMismatch("float64")),
        }
    }

    /// Downcasts an opaque payload to a concrete type.
    ///
    /// Returns None for typed variants and for opaque payloads of a
    /// different type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Opaque(payload) => payload.downcast_ref::<T>(),
            _ => None,
        }
    }
}

// == Equality & Hashing ==
// Floats compare by bit pattern so equality stays reflexive and Value can
// serve as a set member; opaque payloads compare by allocation identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            Value::Str(s) => s.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            // Container variants hash by length only; equality still does
            // the full comparison, so a collision costs one extra probe.
            Value::List(l) => l.len().hash(state),
            Value::Set(s) => s.len().hash(state),
            Value::Opaque(p) => (Arc::as_ptr(p) as *const () as usize).hash(state),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Value::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Value::List(l) => f.debug_tuple("List").field(l).finish(),
            Value::Set(s) => f.debug_tuple("Set").field(s).finish(),
            Value::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

// == Conversions ==
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
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

// == Value Record ==
/// A list element: the payload plus an error slot.
///
/// List commands never produce the error; it is carried so list elements
/// and command results share one framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueRecord {
    /// The wrapped payload
    pub value: Value,
    /// Error attached to this element, if any
    pub err: Option<CacheError>,
}

impl ValueRecord {
    /// Wraps a payload with no error attached.
    pub fn new(value: Value) -> Self {
        Self { value, err: None }
    }
}

impl From<Value> for ValueRecord {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
