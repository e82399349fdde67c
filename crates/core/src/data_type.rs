//! Declared key types
//!
//! Every registered key carries exactly one `DataType`, fixed at registration.
//! Value types (scalars and arrays) hold data in the store; structural types
//! mark subtrees managed by the registry and never hold a value themselves.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    /// Hex address or a reference to another address key
    Address,
    /// UTF-8 string
    String,
    /// Unsigned 64-bit integer
    Uint,
    /// Signed 64-bit integer
    Int,
    /// Boolean
    Bool,
    /// Array of addresses
    AddressArray,
    /// Array of strings
    StringArray,
    /// Array of unsigned integers
    UintArray,
    /// Array of signed integers
    IntArray,
    /// Array of booleans
    BoolArray,
    /// Deployed contract record
    Contract,
    /// Upgradeable proxy record
    Proxy,
    /// Deployed library record
    Library,
    /// Group of configuration parameters
    Parameter,
    /// Permission role record
    Role,
}

impl DataType {
    /// Upper-case name used in errors and documents
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Address => "ADDRESS",
            DataType::String => "STRING",
            DataType::Uint => "UINT",
            DataType::Int => "INT",
            DataType::Bool => "BOOL",
            DataType::AddressArray => "ADDRESS_ARRAY",
            DataType::StringArray => "STRING_ARRAY",
            DataType::UintArray => "UINT_ARRAY",
            DataType::IntArray => "INT_ARRAY",
            DataType::BoolArray => "BOOL_ARRAY",
            DataType::Contract => "CONTRACT",
            DataType::Proxy => "PROXY",
            DataType::Library => "LIBRARY",
            DataType::Parameter => "PARAMETER",
            DataType::Role => "ROLE",
        }
    }

    /// Scalar value type
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            DataType::Address | DataType::String | DataType::Uint | DataType::Int | DataType::Bool
        )
    }

    /// Array value type
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            DataType::AddressArray
                | DataType::StringArray
                | DataType::UintArray
                | DataType::IntArray
                | DataType::BoolArray
        )
    }

    /// Holds a value in the store (scalar or array)
    pub fn is_value(&self) -> bool {
        self.is_scalar() || self.is_array()
    }

    /// Registry-managed subtree marker
    pub fn is_structural(&self) -> bool {
        !self.is_value()
    }

    /// Deployed unit with an `address` sub-key
    pub fn is_deployable(&self) -> bool {
        matches!(self, DataType::Contract | DataType::Proxy | DataType::Library)
    }

    /// Element type of an array type
    pub fn element_type(&self) -> Option<DataType> {
        match self {
            DataType::AddressArray => Some(DataType::Address),
            DataType::StringArray => Some(DataType::String),
            DataType::UintArray => Some(DataType::Uint),
            DataType::IntArray => Some(DataType::Int),
            DataType::BoolArray => Some(DataType::Bool),
            _ => None,
        }
    }

    /// Name persisted under a registry record's `kind` sub-key
    pub fn record_kind(&self) -> Option<&'static str> {
        match self {
            DataType::Contract => Some("contract"),
            DataType::Proxy => Some("proxy"),
            DataType::Library => Some("library"),
            _ => None,
        }
    }

    /// Inverse of `record_kind`
    pub fn from_record_kind(name: &str) -> Option<DataType> {
        match name {
            "contract" => Some(DataType::Contract),
            "proxy" => Some(DataType::Proxy),
            "library" => Some(DataType::Library),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
