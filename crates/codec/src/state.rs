//! Compact state document
//!
//! Lists implementations keyed by deployed address and proxies keyed by
//! compound id, both in compound-id order so re-deployments produce minimal
//! file diffs:
//!
//! ```json
//! {
//!   "implementations": {
//!     "0x…": { "contractPath": "…", "contractType": "…", "deploymentTime": "…", "proxy": "BTC::pegged" }
//!   },
//!   "proxies": {
//!     "BTC::pegged": { "address": "0x…", "deploymentTime": "…", "implementation": "0x…", "salt": "0x…" }
//!   }
//! }
//! ```

use crate::sort::compare_ids;
use crate::timestamp::{format_timestamp, parse_timestamp};
use crate::writer::Node;
use keystone_core::{
    Address, DeploymentState, Error, ImplementationRecord, ProxyRecord, Result,
};
use serde_json::{Map, Value as Json};

/// Top-level field holding implementations
pub const IMPLEMENTATIONS: &str = "implementations";

/// Top-level field holding proxies
pub const PROXIES: &str = "proxies";

/// Render the implementation collection
pub fn implementations_node(state: &DeploymentState) -> Result<Node> {
    let mut keyed: Vec<(String, &ImplementationRecord)> = state
        .implementations()
        .map(|r| (r.address.to_string(), r))
        .collect();
    keyed.sort_by(|a, b| compare_ids(&a.0, &b.0));

    let mut members = Vec::with_capacity(keyed.len());
    for (address, record) in keyed {
        members.push((
            address,
            Node::Object(vec![
                ("contractPath".to_string(), Node::string(&record.contract_path)),
                ("contractType".to_string(), Node::string(&record.contract_type)),
                (
                    "deploymentTime".to_string(),
                    Node::String(format_timestamp(record.deployed_at)?),
                ),
                ("proxy".to_string(), Node::string(&record.proxy)),
            ]),
        ));
    }
    Ok(Node::Object(members))
}

/// Render the proxy collection
pub fn proxies_node(state: &DeploymentState) -> Result<Node> {
    let mut records: Vec<&ProxyRecord> = state.proxies().collect();
    records.sort_by(|a, b| compare_ids(&a.id, &b.id));

    let mut members = Vec::with_capacity(records.len());
    for record in records {
        members.push((
            record.id.clone(),
            Node::Object(vec![
                ("address".to_string(), Node::String(record.address.to_string())),
                (
                    "deploymentTime".to_string(),
                    Node::String(format_timestamp(record.deployed_at)?),
                ),
                (
                    "implementation".to_string(),
                    Node::String(record.implementation.to_string()),
                ),
                ("salt".to_string(), Node::string(&record.salt)),
            ]),
        ));
    }
    Ok(Node::Object(members))
}

/// Rebuild both collections from a parsed top-level object
///
/// Missing collections are empty. Records go through the same uniqueness
/// checks as live registrations.
pub fn parse_collections(root: &Map<String, Json>) -> Result<DeploymentState> {
    let mut state = DeploymentState::new();

    for (address, record) in object_field(root, IMPLEMENTATIONS)?.into_iter().flatten() {
        let fields = as_object(record, address)?;
        state.record_implementation(ImplementationRecord {
            address: Address::parse(address)?,
            proxy: string_field(fields, "proxy", address)?,
            contract_path: string_field(fields, "contractPath", address)?,
            contract_type: string_field(fields, "contractType", address)?,
            deployed_at: parse_timestamp(&string_field(fields, "deploymentTime", address)?)?,
        })?;
    }

    for (id, record) in object_field(root, PROXIES)?.into_iter().flatten() {
        let fields = as_object(record, id)?;
        state.record_proxy(ProxyRecord {
            id: id.clone(),
            address: Address::parse(&string_field(fields, "address", id)?)?,
            implementation: Address::parse(&string_field(fields, "implementation", id)?)?,
            salt: string_field(fields, "salt", id)?,
            deployed_at: parse_timestamp(&string_field(fields, "deploymentTime", id)?)?,
        })?;
    }

    Ok(state)
}

fn object_field<'a>(root: &'a Map<String, Json>, name: &str) -> Result<Option<&'a Map<String, Json>>> {
    match root.get(name) {
        None => Ok(None),
        Some(Json::Object(map)) => Ok(Some(map)),
        Some(_) => Err(Error::InvalidJsonValue {
            key: name.to_string(),
            expected: "object".to_string(),
        }),
    }
}

fn as_object<'a>(value: &'a Json, context: &str) -> Result<&'a Map<String, Json>> {
    value.as_object().ok_or_else(|| Error::InvalidJsonValue {
        key: context.to_string(),
        expected: "object".to_string(),
    })
}

fn string_field(fields: &Map<String, Json>, name: &str, context: &str) -> Result<String> {
    match fields.get(name) {
        None => Ok(String::new()),
        Some(Json::String(s)) => Ok(s.clone()),
        Some(_) => Err(Error::InvalidJsonValue {
            key: format!("{}.{}", context, name),
            expected: "string".to_string(),
        }),
    }
}
