//! Value types for keystone
//!
//! This module defines:
//! - Value: one variant per value `DataType`
//!
//! ## Type Rules
//!
//! - A value's type is determined by its variant, never by its content
//! - No implicit coercions: `Uint(1)` and `Int(1)` are different values
//! - Address values keep their raw text, which is either a hex address or a
//!   reference to another key; resolution happens at read time

use crate::address::Address;
use crate::data_type::DataType;

/// Stored value of a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Raw address text (hex literal or key reference)
    Address(String),
    /// UTF-8 string
    String(String),
    /// Unsigned integer
    Uint(u64),
    /// Signed integer
    Int(i64),
    /// Boolean
    Bool(bool),
    /// Array of addresses
    AddressArray(Vec<Address>),
    /// Array of strings
    StringArray(Vec<String>),
    /// Array of unsigned integers
    UintArray(Vec<u64>),
    /// Array of signed integers
    IntArray(Vec<i64>),
    /// Array of booleans
    BoolArray(Vec<bool>),
}

impl Value {
    /// Declared type this value satisfies
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Address(_) => DataType::Address,
            Value::String(_) => DataType::String,
            Value::Uint(_) => DataType::Uint,
            Value::Int(_) => DataType::Int,
            Value::Bool(_) => DataType::Bool,
            Value::AddressArray(_) => DataType::AddressArray,
            Value::StringArray(_) => DataType::StringArray,
            Value::UintArray(_) => DataType::UintArray,
            Value::IntArray(_) => DataType::IntArray,
            Value::BoolArray(_) => DataType::BoolArray,
        }
    }

    /// Get the raw address text if this is an Address value
    pub fn as_address_raw(&self) -> Option<&str> {
        match self {
            Value::Address(s) => Some(s),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as u64 if this is a Uint value
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Render as display text, the way operators read single fields
    pub fn to_display_string(&self) -> String {
        fn join<T: ToString>(items: &[T]) -> String {
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        }

        match self {
            Value::Address(s) | Value::String(s) => s.clone(),
            Value::Uint(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::AddressArray(a) => join(a),
            Value::StringArray(a) => a.join(","),
            Value::UintArray(a) => join(a),
            Value::IntArray(a) => join(a),
            Value::BoolArray(a) => join(a),
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<Address> for Value {
    fn from(a: Address) -> Self {
        Value::Address(a.to_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
