//! Keystone - typed, resumable deployment registry
//!
//! Keystone records what a multi-step deployment has deployed and configured,
//! under hierarchical dot-path keys, and persists that record as a
//! deterministic JSON document so a later process can resume the deployment.
//!
//! # Quick Start
//!
//! ```ignore
//! use keystone::{Session, SessionConfig, StartParams};
//!
//! let mut session = Session::new(config, schema, clock, deployer, storage)?;
//! session.start(params, None)?;
//! session.set_uint("pegged.fee", 30)?;
//! session.register_proxy("BTC.pegged", implementation, &[], "Pegged", "src/Pegged.sol", None)?;
//! session.finish()?;
//! ```
//!
//! # Architecture
//!
//! - `keystone-core`: addresses, key schema, typed store, records, errors
//! - `keystone-codec`: deterministic JSON documents
//! - `keystone-registry`: sessions and their collaborators

pub use keystone_codec::{DeploymentDocument, DocumentHeader, JsonCodec, SCHEMA_VERSION};
pub use keystone_core::*;
pub use keystone_registry::*;

/// Document codec internals
pub mod codec {
    pub use keystone_codec::*;
}
