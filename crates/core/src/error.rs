//! Error types for keystone
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Every variant carries the offending key, address or value so a caller can
//! pinpoint the configuration defect without re-deriving context.

use crate::address::Address;
use crate::data_type::DataType;
use std::io;
use thiserror::Error;

/// Result type alias for keystone operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the deployment registry
#[derive(Debug, Error)]
pub enum Error {
    // ========================================================================
    // Schema errors
    // ========================================================================
    /// Key is neither explicitly registered nor matched by a pattern
    #[error("Key not registered: {0}")]
    KeyNotRegistered(String),

    /// Read with a getter for a different type than the key was declared with
    #[error("Read type mismatch for {key}: expected {expected}, actual {actual}")]
    ReadTypeMismatch {
        /// Key being read
        key: String,
        /// Type requested by the caller
        expected: DataType,
        /// Type the key was declared with
        actual: DataType,
    },

    /// Write of a value whose type differs from the declared type
    #[error("Parameter type mismatch for {key}: expected {expected}, actual {actual}")]
    ParameterTypeMismatch {
        /// Key being written
        key: String,
        /// Type the key was declared with
        expected: DataType,
        /// Type of the supplied value
        actual: DataType,
    },

    /// Key registered again with a different type
    #[error("Key {key} already registered as {existing}, cannot register as {requested}")]
    KeyTypeConflict {
        /// Key being registered
        key: String,
        /// Type already registered
        existing: DataType,
        /// Type requested now
        requested: DataType,
    },

    /// A value key would nest under (or above) another value key
    #[error("Key {key} conflicts with value key {existing}")]
    KeyConflict {
        /// Key being registered
        key: String,
        /// Already registered value key on the same path
        existing: String,
    },

    /// Malformed dot-path key
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey {
        /// Offending key
        key: String,
        /// Why it was rejected
        reason: &'static str,
    },

    // ========================================================================
    // Value errors
    // ========================================================================
    /// Key is registered but has never been written
    #[error("Value not set: {0}")]
    ValueNotSet(String),

    /// Address is not acceptable for the operation (zero, or unresolvable)
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Hex address string has the wrong total length
    #[error("Invalid address length for '{value}': {length} characters, expected 42")]
    InvalidAddressLength {
        /// Offending string
        value: String,
        /// Its length in characters
        length: usize,
    },

    /// Hex address string of the right length without `0x`/`0X`
    #[error("Missing 0x prefix: {0}")]
    MissingPrefix(String),

    /// Hex address string with a digit outside `[0-9a-fA-F]`
    #[error("Invalid hex character '{character}' in {value}")]
    InvalidHexCharacter {
        /// Offending string
        value: String,
        /// First invalid character
        character: char,
    },

    // ========================================================================
    // Registry errors
    // ========================================================================
    /// `start()` called on a session that is already started
    #[error("Session already initialized")]
    AlreadyInitialized,

    /// Empty key supplied
    #[error("Key required")]
    KeyRequired,

    /// Contract key already has a registry record
    #[error("Contract already exists: {0}")]
    ContractAlreadyExists(String),

    /// Library key already has a registry record
    #[error("Library already exists: {0}")]
    LibraryAlreadyExists(String),

    /// Write-once parameter already set
    #[error("Parameter already exists: {0}")]
    ParameterAlreadyExists(String),

    /// Address lookup for a key with no registry record
    #[error("Contract not found: {0}")]
    ContractNotFound(String),

    /// Parameter read before it was set
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// Implementation address already recorded for another proxy
    #[error("Duplicate implementation {address}: already used by proxy {proxy}")]
    DuplicateImplementation {
        /// Implementation address
        address: Address,
        /// Proxy id that already owns it
        proxy: String,
    },

    /// Proxy id already recorded with a different record
    #[error("Duplicate proxy: {0}")]
    DuplicateProxy(String),

    /// Proxy address already recorded under another proxy id
    #[error("Duplicate proxy address: {0}")]
    DuplicateProxyAddress(Address),

    /// Proxy registration without a key
    #[error("Proxy key required")]
    ProxyKeyRequired,

    /// Proxy registration with the zero implementation address
    #[error("Implementation address required for proxy {0}")]
    ImplementationAddressRequired(String),

    // ========================================================================
    // Role errors
    // ========================================================================
    /// Role value set again with a different value
    #[error("Role value mismatch at {path}: {old} != {new}")]
    RoleValueMismatch {
        /// Role value key
        path: String,
        /// Value already recorded
        old: u64,
        /// Value supplied now
        new: u64,
    },

    /// Grantee already recorded for the role
    #[error("Duplicate grantee {grantee} for {path}")]
    DuplicateGrantee {
        /// Grantee key or address
        grantee: String,
        /// Role grantees key
        path: String,
    },

    // ========================================================================
    // Codec errors
    // ========================================================================
    /// Document schema version differs from the codec's
    #[error("Schema mismatch: expected version {expected}, found {actual}")]
    SchemaMismatch {
        /// Version the codec understands
        expected: u64,
        /// Version found in the document (0 when absent)
        actual: u64,
    },

    /// Required top-level field missing or empty
    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),

    /// Timestamp string not in `YYYY-MM-DDTHH:MM:SSZ` form
    #[error("Invalid timestamp: '{0}'")]
    InvalidTimestamp(String),

    /// JSON value of the wrong shape for the declared key type
    #[error("Invalid JSON value for {key}: expected {expected}")]
    InvalidJsonValue {
        /// Key whose value was malformed
        key: String,
        /// Shape the key requires
        expected: String,
    },

    /// Document is not well-formed JSON
    #[error("JSON error: {0}")]
    Json(String),

    // ========================================================================
    // Session and collaborator errors
    // ========================================================================
    /// Mutation attempted outside the `Active` state
    #[error("Session not active: {0}")]
    SessionNotActive(&'static str),

    /// A deterministic deployment returned an unexpected address earlier
    #[error("Session poisoned by a deployment protocol violation")]
    SessionPoisoned,

    /// Resumed document belongs to another network or salt
    #[error("Resume mismatch on {field}: session has '{expected}', document has '{actual}'")]
    ResumeMismatch {
        /// Field that differs
        field: &'static str,
        /// Value given to `start()`
        expected: String,
        /// Value found in the document
        actual: String,
    },

    /// Finish stamp earlier than start stamp
    #[error("Invalid run timing: {field} finish {finish} before start {start}")]
    InvalidRunTiming {
        /// `timestamp` or `block`
        field: &'static str,
        /// Start value
        start: u64,
        /// Finish value
        finish: u64,
    },

    /// Deployer service called by an identity other than its operator
    #[error("Deployer call from unauthorized identity {0}")]
    DeployerUnauthorized(Address),

    /// Reveal without a matching commitment
    #[error("Unknown commitment: {0}")]
    UnknownCommitment(String),

    /// Salt already consumed by an earlier reveal
    #[error("Salt already used: {0}")]
    SaltAlreadyUsed(String),

    /// Reveal returned a different address than predicted
    #[error("Deployment of {key} landed at {actual}, predicted {predicted}")]
    DeploymentAddressMismatch {
        /// Key being deployed
        key: String,
        /// Address from `predict`
        predicted: Address,
        /// Address from `reveal`
        actual: Address,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}
