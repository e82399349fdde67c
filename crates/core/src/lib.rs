//! Core types for keystone
//!
//! This crate defines the foundational types of the deployment registry:
//! - Address: 20-byte account address with strict hex parsing
//! - key: dot-path key validation and helpers
//! - DataType / Value: declared key types and the values they hold
//! - KeySchema: explicit keys, wildcard patterns and restricted roles
//! - TypedStore: schema-validated in-memory key/value store
//! - Timestamp: second-precision timestamps
//! - records: runs, implementation/proxy records and their uniqueness rules
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod data_type;
pub mod error;
pub mod key;
pub mod records;
pub mod schema;
pub mod store;
pub mod timestamp;
pub mod value;

pub use address::Address;
pub use data_type::DataType;
pub use error::{Error, Result};
pub use records::{
    DeploymentState, ImplementationRecord, ProxyRecord, Registration, Run,
    OWNERSHIP_DEPLOYER_OWNED, OWNERSHIP_TRANSFERRED,
};
pub use schema::{KeyPattern, KeySchema};
pub use store::TypedStore;
pub use timestamp::Timestamp;
pub use value::Value;
