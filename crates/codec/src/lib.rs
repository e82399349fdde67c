//! JSON documents for keystone
//!
//! Two document shapes are produced:
//! - the full document (header, runs, key tree, implementations, proxies)
//! - the compact state document (implementations and proxies only)
//!
//! Output is deterministic: the same state always renders to the same bytes,
//! and rendering a parsed document reproduces the input it was parsed from.
//!
//! # Example
//!
//! ```
//! use keystone_codec::{DeploymentDocument, JsonCodec};
//! use keystone_core::{DataType, KeySchema};
//!
//! let mut schema = KeySchema::new();
//! schema.register_key("fee", DataType::Uint).unwrap();
//!
//! let mut doc = DeploymentDocument::new(schema.clone());
//! doc.header.network = "mainnet".to_string();
//! doc.header.salt_prefix = "bao".to_string();
//! doc.store.set_uint("fee", 30).unwrap();
//!
//! let codec = JsonCodec::new();
//! let raw = codec.render(&doc).unwrap();
//! let back = codec.parse(&raw, schema).unwrap();
//! assert_eq!(back.store.get_uint("fee").unwrap(), 30);
//! assert_eq!(codec.render(&back).unwrap(), raw);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod escape;
pub mod sort;
pub mod state;
pub mod timestamp;
pub mod writer;

pub use document::{DeploymentDocument, DocumentHeader};
pub use sort::{compare_ids, sort_ids};
pub use timestamp::{format_timestamp, parse_timestamp};

use keystone_core::{DeploymentState, Error, KeySchema, Result};
use serde_json::Value as Json;
use tracing::debug;
use writer::{write_document, Node};

/// Schema version written by this crate
pub const SCHEMA_VERSION: u64 = 1;

/// Renders and parses deployment documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonCodec {
    expected_version: u64,
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonCodec {
    /// Codec for the current schema version
    pub fn new() -> Self {
        JsonCodec {
            expected_version: SCHEMA_VERSION,
        }
    }

    /// Codec writing and accepting a specific schema version
    pub fn with_version(expected_version: u64) -> Self {
        JsonCodec { expected_version }
    }

    /// Schema version this codec writes and accepts
    pub fn expected_version(&self) -> u64 {
        self.expected_version
    }

    /// Render the full document
    pub fn render(&self, doc: &DeploymentDocument) -> Result<String> {
        let node = document::document_node(self.expected_version, doc)?;
        let raw = write_document(&node);
        debug!(
            target: "keystone::codec",
            keys = doc.store.len(),
            runs = doc.runs.len(),
            bytes = raw.len(),
            "Rendered document"
        );
        Ok(raw)
    }

    /// Parse a full document, typing the key tree through `schema`
    ///
    /// Fails with `SchemaMismatch` unless `schemaVersion` equals the expected
    /// version; a missing version counts as 0.
    pub fn parse(&self, raw: &str, schema: KeySchema) -> Result<DeploymentDocument> {
        let doc = document::parse_document(self.expected_version, raw, schema)?;
        debug!(
            target: "keystone::codec",
            network = %doc.header.network,
            keys = doc.store.len(),
            runs = doc.runs.len(),
            "Parsed document"
        );
        Ok(doc)
    }

    /// Render the compact implementations/proxies document
    pub fn render_state(&self, state: &DeploymentState) -> Result<String> {
        let node = Node::Object(vec![
            (state::IMPLEMENTATIONS.to_string(), state::implementations_node(state)?),
            (state::PROXIES.to_string(), state::proxies_node(state)?),
        ]);
        Ok(write_document(&node))
    }

    /// Parse a compact state document
    pub fn parse_state(&self, raw: &str) -> Result<DeploymentState> {
        let root: Json = serde_json::from_str(raw)?;
        let root = root.as_object().ok_or_else(|| Error::InvalidJsonValue {
            key: "$".to_string(),
            expected: "object".to_string(),
        })?;
        state::parse_collections(root)
    }
}
