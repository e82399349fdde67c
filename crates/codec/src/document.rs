//! Full deployment document
//!
//! The document carries the header, the append-only run history, the whole
//! key/value tree (dot-paths become nested objects under `deployment`) and the
//! implementation/proxy collections.
//!
//! ## Layout
//!
//! Top-level fields are written in a fixed order: `schemaVersion`, `network`,
//! `systemSaltString`, `chainId`, `deployerService`, `lastUpdated`, `runs`,
//! `deployment`, `implementations`, `proxies`. Objects inside `deployment` are
//! sorted by segment name. Rendering a parsed rendering reproduces it byte for
//! byte.
//!
//! ## Loading
//!
//! Leaf paths are typed through the `KeySchema`; a path that is neither
//! registered nor matched by a pattern is rejected, and a pattern match is
//! registered before its value is stored.
//!
//! Registry records carry their kind under `<key>.kind`. A subtree with a
//! recognised `kind` and an `address` is registered as that record before its
//! leaves load, so a document reloads under the schema it started from.

use crate::state::{implementations_node, parse_collections, proxies_node, IMPLEMENTATIONS, PROXIES};
use crate::timestamp::{format_timestamp, parse_timestamp};
use crate::writer::Node;
use keystone_core::key;
use keystone_core::schema::fields;
use keystone_core::{
    Address, DataType, DeploymentState, Error, KeySchema, Result, Run, Timestamp, TypedStore,
    Value,
};
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;

/// Document header fields
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentHeader {
    /// Network name (required)
    pub network: String,
    /// Salt prefix for address derivation (required)
    pub salt_prefix: String,
    /// Chain id
    pub chain_id: u64,
    /// Address of the deterministic deployer service
    pub deployer_service: Address,
    /// Time of the last mutation
    pub last_updated: Timestamp,
}

/// Everything a persisted document holds
#[derive(Debug, Clone, Default)]
pub struct DeploymentDocument {
    /// Header fields
    pub header: DocumentHeader,
    /// Run history, oldest first
    pub runs: Vec<Run>,
    /// Key/value tree
    pub store: TypedStore,
    /// Implementation and proxy collections
    pub state: DeploymentState,
}

impl DeploymentDocument {
    /// Empty document over a schema
    pub fn new(schema: KeySchema) -> Self {
        DeploymentDocument {
            header: DocumentHeader::default(),
            runs: Vec::new(),
            store: TypedStore::new(schema),
            state: DeploymentState::new(),
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

pub(crate) fn document_node(version: u64, doc: &DeploymentDocument) -> Result<Node> {
    let header = &doc.header;
    let runs = doc
        .runs
        .iter()
        .map(run_node)
        .collect::<Result<Vec<_>>>()?;

    Ok(Node::Object(vec![
        ("schemaVersion".to_string(), Node::uint(version)),
        ("network".to_string(), Node::string(&header.network)),
        ("systemSaltString".to_string(), Node::string(&header.salt_prefix)),
        ("chainId".to_string(), Node::uint(header.chain_id)),
        (
            "deployerService".to_string(),
            Node::String(header.deployer_service.to_string()),
        ),
        (
            "lastUpdated".to_string(),
            Node::String(format_timestamp(header.last_updated)?),
        ),
        ("runs".to_string(), Node::Array(runs)),
        ("deployment".to_string(), tree_node(&doc.store)),
        (IMPLEMENTATIONS.to_string(), implementations_node(&doc.state)?),
        (PROXIES.to_string(), proxies_node(&doc.state)?),
    ]))
}

fn run_node(run: &Run) -> Result<Node> {
    let finish = if run.finish_timestamp.is_epoch() {
        String::new()
    } else {
        format_timestamp(run.finish_timestamp)?
    };
    Ok(Node::Object(vec![
        ("network".to_string(), Node::string(&run.network)),
        ("version".to_string(), Node::string(&run.version)),
        ("deployer".to_string(), Node::String(run.deployer.to_string())),
        ("owner".to_string(), Node::String(run.owner.to_string())),
        ("systemSaltString".to_string(), Node::string(&run.salt_prefix)),
        (
            "startTimestamp".to_string(),
            Node::String(format_timestamp(run.start_timestamp)?),
        ),
        ("startBlock".to_string(), Node::uint(run.start_block)),
        ("finishTimestamp".to_string(), Node::String(finish)),
        ("finishBlock".to_string(), Node::uint(run.finish_block)),
    ]))
}

enum Tree {
    Leaf(Node),
    Branch(BTreeMap<String, Tree>),
}

fn tree_node(store: &TypedStore) -> Node {
    let mut root = BTreeMap::new();
    for (path, value) in store.iter() {
        insert(&mut root, path, value_node(value));
    }
    branch_node(root)
}

fn insert(branch: &mut BTreeMap<String, Tree>, path: &str, leaf: Node) {
    match path.split_once(key::SEPARATOR) {
        None => {
            branch.insert(path.to_string(), Tree::Leaf(leaf));
        }
        Some((head, rest)) => {
            let child = branch
                .entry(head.to_string())
                .or_insert_with(|| Tree::Branch(BTreeMap::new()));
            // The schema keeps value keys from nesting, so a leaf is never a parent
            if let Tree::Branch(children) = child {
                insert(children, rest, leaf);
            }
        }
    }
}

fn branch_node(branch: BTreeMap<String, Tree>) -> Node {
    Node::Object(
        branch
            .into_iter()
            .map(|(name, tree)| {
                let node = match tree {
                    Tree::Leaf(node) => node,
                    Tree::Branch(children) => branch_node(children),
                };
                (name, node)
            })
            .collect(),
    )
}

fn value_node(value: &Value) -> Node {
    match value {
        Value::Address(raw) => Node::string(raw),
        Value::String(s) => Node::string(s),
        Value::Uint(v) => Node::uint(*v),
        Value::Int(v) => Node::int(*v),
        Value::Bool(b) => Node::Bool(*b),
        Value::AddressArray(items) => {
            Node::Array(items.iter().map(|a| Node::String(a.to_string())).collect())
        }
        Value::StringArray(items) => Node::Array(items.iter().map(Node::string).collect()),
        Value::UintArray(items) => Node::Array(items.iter().map(|v| Node::uint(*v)).collect()),
        Value::IntArray(items) => Node::Array(items.iter().map(|v| Node::int(*v)).collect()),
        Value::BoolArray(items) => Node::Array(items.iter().map(|b| Node::Bool(*b)).collect()),
    }
}

// ============================================================================
// Parsing
// ============================================================================

pub(crate) fn parse_document(
    expected_version: u64,
    raw: &str,
    schema: KeySchema,
) -> Result<DeploymentDocument> {
    let root: Json = serde_json::from_str(raw)?;
    let root = root.as_object().ok_or_else(|| Error::InvalidJsonValue {
        key: "$".to_string(),
        expected: "object".to_string(),
    })?;

    let actual = root.get("schemaVersion").and_then(Json::as_u64).unwrap_or(0);
    if actual != expected_version {
        return Err(Error::SchemaMismatch {
            expected: expected_version,
            actual,
        });
    }

    let network = optional_string(root, "network")?;
    if network.is_empty() {
        return Err(Error::MissingRequiredField("network"));
    }
    let salt_prefix = match root.get("systemSaltString") {
        Some(_) => optional_string(root, "systemSaltString")?,
        None => optional_string(root, "saltPrefix")?,
    };
    if salt_prefix.is_empty() {
        return Err(Error::MissingRequiredField("systemSaltString"));
    }

    let header = DocumentHeader {
        network,
        salt_prefix,
        chain_id: optional_uint(root, "chainId")?,
        deployer_service: optional_address(root, "deployerService")?,
        last_updated: parse_timestamp(&optional_string(root, "lastUpdated")?)?,
    };

    let runs = match root.get("runs") {
        None => Vec::new(),
        Some(Json::Array(items)) => items.iter().map(parse_run).collect::<Result<_>>()?,
        Some(_) => return Err(invalid("runs", "array")),
    };

    let mut store = TypedStore::new(schema);
    match root.get("deployment") {
        None => {}
        Some(Json::Object(tree)) => load_tree(&mut store, None, tree)?,
        Some(_) => return Err(invalid("deployment", "object")),
    }

    let state = parse_collections(root)?;

    Ok(DeploymentDocument {
        header,
        runs,
        store,
        state,
    })
}

fn parse_run(value: &Json) -> Result<Run> {
    let fields = value.as_object().ok_or_else(|| invalid("runs", "object"))?;
    Ok(Run {
        network: optional_string(fields, "network")?,
        version: optional_string(fields, "version")?,
        deployer: optional_address(fields, "deployer")?,
        owner: optional_address(fields, "owner")?,
        salt_prefix: optional_string(fields, "systemSaltString")?,
        start_timestamp: parse_timestamp(&optional_string(fields, "startTimestamp")?)?,
        start_block: optional_uint(fields, "startBlock")?,
        finish_timestamp: parse_timestamp(&optional_string(fields, "finishTimestamp")?)?,
        finish_block: optional_uint(fields, "finishBlock")?,
    })
}

fn load_tree(store: &mut TypedStore, prefix: Option<&str>, tree: &Map<String, Json>) -> Result<()> {
    for (name, node) in tree {
        let path = match prefix {
            Some(p) => key::join(p, name),
            None => name.clone(),
        };
        match node {
            Json::Object(children) => {
                if let Ok(declared) = store.schema().lookup(&path) {
                    if declared.is_value() {
                        return Err(invalid(&path, declared.name()));
                    }
                }
                if let Some(kind) = record_kind(store.schema(), &path, children) {
                    store.schema_mut().register_deployable(&path, kind)?;
                }
                load_tree(store, Some(&path), children)?;
            }
            leaf => {
                let declared = store.schema_mut().lookup_or_discover(&path)?;
                let value = json_to_value(&path, declared, leaf)?;
                store.set(&path, value)?;
            }
        }
    }
    Ok(())
}

/// Record kind of the subtree at `path`, if it is a registry record
///
/// A `kind` leaf the schema already declares as a plain key of an unrelated
/// subtree does not count.
fn record_kind(schema: &KeySchema, path: &str, children: &Map<String, Json>) -> Option<DataType> {
    let kind = children
        .get(fields::KIND)
        .and_then(Json::as_str)
        .and_then(DataType::from_record_kind)?;
    if !children.contains_key(fields::ADDRESS) {
        return None;
    }
    match schema.lookup(path) {
        Ok(declared) if declared.is_deployable() => Some(kind),
        Ok(_) => None,
        Err(_) if schema.is_registered(&key::join(path, fields::KIND)) => None,
        Err(_) => Some(kind),
    }
}

fn json_to_value(path: &str, declared: DataType, json: &Json) -> Result<Value> {
    let wrong = || invalid(path, declared.name());

    let value = match declared {
        DataType::Address => Value::Address(json.as_str().ok_or_else(wrong)?.to_string()),
        DataType::String => Value::String(json.as_str().ok_or_else(wrong)?.to_string()),
        DataType::Uint => Value::Uint(json.as_u64().ok_or_else(wrong)?),
        DataType::Int => Value::Int(json.as_i64().ok_or_else(wrong)?),
        DataType::Bool => Value::Bool(json.as_bool().ok_or_else(wrong)?),
        DataType::AddressArray => Value::AddressArray(
            elements(json, wrong)?
                .map(|e| e.as_str().ok_or_else(wrong).and_then(Address::parse))
                .collect::<Result<_>>()?,
        ),
        DataType::StringArray => Value::StringArray(
            elements(json, wrong)?
                .map(|e| e.as_str().map(str::to_string).ok_or_else(wrong))
                .collect::<Result<_>>()?,
        ),
        DataType::UintArray => Value::UintArray(
            elements(json, wrong)?
                .map(|e| e.as_u64().ok_or_else(wrong))
                .collect::<Result<_>>()?,
        ),
        DataType::IntArray => Value::IntArray(
            elements(json, wrong)?
                .map(|e| e.as_i64().ok_or_else(wrong))
                .collect::<Result<_>>()?,
        ),
        DataType::BoolArray => Value::BoolArray(
            elements(json, wrong)?
                .map(|e| e.as_bool().ok_or_else(wrong))
                .collect::<Result<_>>()?,
        ),
        DataType::Contract
        | DataType::Proxy
        | DataType::Library
        | DataType::Parameter
        | DataType::Role => return Err(invalid(path, "object")),
    };
    Ok(value)
}

fn elements<'a>(
    json: &'a Json,
    wrong: impl Fn() -> Error,
) -> Result<std::slice::Iter<'a, Json>> {
    json.as_array().map(|a| a.iter()).ok_or_else(wrong)
}

fn invalid(key: &str, expected: &str) -> Error {
    Error::InvalidJsonValue {
        key: key.to_string(),
        expected: expected.to_string(),
    }
}

fn optional_string(fields: &Map<String, Json>, name: &str) -> Result<String> {
    match fields.get(name) {
        None | Some(Json::Null) => Ok(String::new()),
        Some(Json::String(s)) => Ok(s.clone()),
        Some(_) => Err(invalid(name, "string")),
    }
}

fn optional_uint(fields: &Map<String, Json>, name: &str) -> Result<u64> {
    match fields.get(name) {
        None | Some(Json::Null) => Ok(0),
        Some(v) => v.as_u64().ok_or_else(|| invalid(name, "unsigned integer")),
    }
}

fn optional_address(fields: &Map<String, Json>, name: &str) -> Result<Address> {
    let raw = optional_string(fields, name)?;
    if raw.is_empty() {
        return Ok(Address::ZERO);
    }
    Address::parse(&raw)
}
