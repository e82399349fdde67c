//! Typed in-memory store
//!
//! `TypedStore` maps dot-path keys to type-tagged values, validating every
//! write against its `KeySchema` and every typed read against the declared
//! type.
//!
//! ## Address values
//!
//! Address entries keep their raw text. A raw value is either a hex address or
//! a reference to another key. Resolution follows exactly one hop: a reference
//! to a key whose own raw value is again a reference does not resolve.
//!
//! ## Text
//!
//! String, string-array and raw address text may not contain control
//! characters (U+0000 to U+001F). Documents write text without escaping
//! anything beyond `\` and `"`, so such text could not be read back.
//!
//! ## Arrays
//!
//! Array setters replace the whole stored array. Nothing from a previous array
//! survives a shorter replacement.

use crate::address::Address;
use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::key;
use crate::schema::{fields, KeySchema};
use crate::value::Value;
use std::collections::HashMap;

/// Schema-validated key/value store
#[derive(Debug, Clone, Default)]
pub struct TypedStore {
    schema: KeySchema,
    entries: HashMap<String, Value>,
    /// Keys in first-write order
    order: Vec<String>,
}

impl TypedStore {
    /// Create an empty store over a schema
    pub fn new(schema: KeySchema) -> Self {
        TypedStore {
            schema,
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// The schema writes are validated against
    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    /// Mutable schema, for registering keys after construction
    pub fn schema_mut(&mut self) -> &mut KeySchema {
        &mut self.schema
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Write a value, checking its type against the declared type
    ///
    /// Keys matching a pattern are registered on first write.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let declared = self.schema.lookup(key)?;
        if declared != value.data_type() {
            return Err(Error::ParameterTypeMismatch {
                key: key.to_string(),
                expected: declared,
                actual: value.data_type(),
            });
        }
        check_value_text(key, &value)?;
        self.schema.lookup_or_discover(key)?;

        if self.entries.insert(key.to_string(), value).is_none() {
            self.order.push(key.to_string());
        }
        Ok(())
    }

    /// Check a batch of writes without applying any of them
    pub fn check_writes(&self, writes: &[(String, Value)]) -> Result<()> {
        for (key, value) in writes {
            let declared = self.schema.lookup(key)?;
            if declared != value.data_type() {
                return Err(Error::ParameterTypeMismatch {
                    key: key.clone(),
                    expected: declared,
                    actual: value.data_type(),
                });
            }
            check_value_text(key, value)?;
        }
        Ok(())
    }

    /// Apply a batch of writes, all or nothing
    pub fn set_all(&mut self, writes: Vec<(String, Value)>) -> Result<()> {
        self.check_writes(&writes)?;
        for (key, value) in writes {
            self.set(&key, value)?;
        }
        Ok(())
    }

    /// Store a hex address
    pub fn set_address(&mut self, key: &str, value: Address) -> Result<()> {
        self.set(key, Value::from(value))
    }

    /// Store raw address text verbatim (hex literal or key reference)
    pub fn set_address_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.set(key, Value::Address(value.to_string()))
    }

    /// Store a string
    pub fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.set(key, Value::String(value.to_string()))
    }

    /// Store an unsigned integer
    pub fn set_uint(&mut self, key: &str, value: u64) -> Result<()> {
        self.set(key, Value::Uint(value))
    }

    /// Store a signed integer
    pub fn set_int(&mut self, key: &str, value: i64) -> Result<()> {
        self.set(key, Value::Int(value))
    }

    /// Store a boolean
    pub fn set_bool(&mut self, key: &str, value: bool) -> Result<()> {
        self.set(key, Value::Bool(value))
    }

    /// Replace an address array
    pub fn set_address_array(&mut self, key: &str, values: &[Address]) -> Result<()> {
        self.set(key, Value::AddressArray(values.to_vec()))
    }

    /// Replace a string array
    pub fn set_string_array<S: AsRef<str>>(&mut self, key: &str, values: &[S]) -> Result<()> {
        let values = values.iter().map(|s| s.as_ref().to_string()).collect();
        self.set(key, Value::StringArray(values))
    }

    /// Replace an unsigned integer array
    pub fn set_uint_array(&mut self, key: &str, values: &[u64]) -> Result<()> {
        self.set(key, Value::UintArray(values.to_vec()))
    }

    /// Replace a signed integer array
    pub fn set_int_array(&mut self, key: &str, values: &[i64]) -> Result<()> {
        self.set(key, Value::IntArray(values.to_vec()))
    }

    /// Replace a boolean array
    pub fn set_bool_array(&mut self, key: &str, values: &[bool]) -> Result<()> {
        self.set(key, Value::BoolArray(values.to_vec()))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Raw stored value
    pub fn get(&self, key: &str) -> Result<&Value> {
        self.schema.lookup(key)?;
        self.entries
            .get(key)
            .ok_or_else(|| Error::ValueNotSet(key.to_string()))
    }

    fn get_typed(&self, key: &str, expected: DataType) -> Result<&Value> {
        let declared = self.schema.lookup(key)?;
        if declared != expected {
            return Err(Error::ReadTypeMismatch {
                key: key.to_string(),
                expected,
                actual: declared,
            });
        }
        self.entries
            .get(key)
            .ok_or_else(|| Error::ValueNotSet(key.to_string()))
    }

    /// Raw address text as stored
    pub fn raw_address(&self, key: &str) -> Result<&str> {
        match self.get_typed(key, DataType::Address)? {
            Value::Address(raw) => Ok(raw),
            other => Err(mismatch(key, DataType::Address, other)),
        }
    }

    /// Address, resolving a key reference by one hop
    pub fn get_address(&self, key: &str) -> Result<Address> {
        let raw = self.raw_address(key)?;
        self.resolve_address_value(raw)
    }

    /// String value
    pub fn get_string(&self, key: &str) -> Result<&str> {
        match self.get_typed(key, DataType::String)? {
            Value::String(s) => Ok(s),
            other => Err(mismatch(key, DataType::String, other)),
        }
    }

    /// Unsigned integer value
    pub fn get_uint(&self, key: &str) -> Result<u64> {
        match self.get_typed(key, DataType::Uint)? {
            Value::Uint(v) => Ok(*v),
            other => Err(mismatch(key, DataType::Uint, other)),
        }
    }

    /// Signed integer value
    pub fn get_int(&self, key: &str) -> Result<i64> {
        match self.get_typed(key, DataType::Int)? {
            Value::Int(v) => Ok(*v),
            other => Err(mismatch(key, DataType::Int, other)),
        }
    }

    /// Boolean value
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        match self.get_typed(key, DataType::Bool)? {
            Value::Bool(v) => Ok(*v),
            other => Err(mismatch(key, DataType::Bool, other)),
        }
    }

    /// Address array
    pub fn get_address_array(&self, key: &str) -> Result<&[Address]> {
        match self.get_typed(key, DataType::AddressArray)? {
            Value::AddressArray(v) => Ok(v),
            other => Err(mismatch(key, DataType::AddressArray, other)),
        }
    }

    /// String array
    pub fn get_string_array(&self, key: &str) -> Result<&[String]> {
        match self.get_typed(key, DataType::StringArray)? {
            Value::StringArray(v) => Ok(v),
            other => Err(mismatch(key, DataType::StringArray, other)),
        }
    }

    /// Unsigned integer array
    pub fn get_uint_array(&self, key: &str) -> Result<&[u64]> {
        match self.get_typed(key, DataType::UintArray)? {
            Value::UintArray(v) => Ok(v),
            other => Err(mismatch(key, DataType::UintArray, other)),
        }
    }

    /// Signed integer array
    pub fn get_int_array(&self, key: &str) -> Result<&[i64]> {
        match self.get_typed(key, DataType::IntArray)? {
            Value::IntArray(v) => Ok(v),
            other => Err(mismatch(key, DataType::IntArray, other)),
        }
    }

    /// Boolean array
    pub fn get_bool_array(&self, key: &str) -> Result<&[bool]> {
        match self.get_typed(key, DataType::BoolArray)? {
            Value::BoolArray(v) => Ok(v),
            other => Err(mismatch(key, DataType::BoolArray, other)),
        }
    }

    // =========================================================================
    // Address resolution
    // =========================================================================

    /// Resolve an address literal or a one-hop key reference
    ///
    /// A hex literal is returned as is. Otherwise `value` names a key: an
    /// address key whose raw value must itself be a hex literal, or a
    /// contract/proxy/library key whose `address` sub-key is read.
    pub fn resolve_address_value(&self, value: &str) -> Result<Address> {
        if let Ok(address) = Address::parse(value) {
            return Ok(address);
        }

        let target = match self.schema.lookup(value)? {
            t if t.is_deployable() => key::join(value, fields::ADDRESS),
            DataType::Address => value.to_string(),
            other => {
                return Err(Error::ReadTypeMismatch {
                    key: value.to_string(),
                    expected: DataType::Address,
                    actual: other,
                })
            }
        };

        let raw = match self.entries.get(&target) {
            Some(Value::Address(raw)) => raw,
            Some(other) => return Err(mismatch(&target, DataType::Address, other)),
            None => return Err(Error::ValueNotSet(target)),
        };
        Address::parse(raw).map_err(|_| Error::InvalidAddress(raw.clone()))
    }

    /// Non-failing variant of `resolve_address_value`
    pub fn try_resolve_address_value(&self, value: &str) -> Option<Address> {
        self.resolve_address_value(value).ok()
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// True once the key or any descendant has a value
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key) || self.order.iter().any(|k| key::is_descendant(k, key))
    }

    /// True if the key itself has a value
    pub fn has_value(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Written keys in first-write order
    pub fn keys(&self) -> &[String] {
        &self.order
    }

    /// Written keys with their values, in first-write order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.order
            .iter()
            .filter_map(|k| self.entries.get(k).map(|v| (k.as_str(), v)))
    }

    /// Number of written keys
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn mismatch(key: &str, expected: DataType, found: &Value) -> Error {
    Error::ReadTypeMismatch {
        key: key.to_string(),
        expected,
        actual: found.data_type(),
    }
}

/// Reject text containing control characters
///
/// `key` names the offending entry in the error.
pub fn validate_text(key: &str, text: &str) -> Result<()> {
    if text.chars().any(|c| c < '\u{20}') {
        return Err(Error::InvalidJsonValue {
            key: key.to_string(),
            expected: "text without control characters".to_string(),
        });
    }
    Ok(())
}

fn check_value_text(key: &str, value: &Value) -> Result<()> {
    match value {
        Value::Address(raw) | Value::String(raw) => validate_text(key, raw),
        Value::StringArray(items) => items.iter().try_for_each(|s| validate_text(key, s)),
        _ => Ok(()),
    }
}
