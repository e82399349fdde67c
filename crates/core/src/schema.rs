//! Key schema
//!
//! The schema maps dot-path keys to their declared `DataType`. Keys are either
//! registered explicitly or covered by a wildcard pattern of the form
//! `prefix.<anything>.suffix`, which lets dynamically-named children (one entry
//! per network, per role, ...) be declared before their names are known.
//!
//! ## Rules
//!
//! - Registering a key twice with the same type is a no-op; with a different
//!   type it fails `KeyTypeConflict`
//! - A value key (scalar or array) can have neither a value-key ancestor nor
//!   any registered descendant
//! - Entries are never removed; pattern matches discovered during a load are
//!   registered as explicit keys
//! - Roles are a restricted pattern: only the listed role names under
//!   `<contract>.roles.*` exist

use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::key::{self, validate_key};
use std::collections::BTreeMap;

/// Sub-key names of registry records
pub mod fields {
    /// Record kind (`contract`, `proxy` or `library`)
    pub const KIND: &str = "kind";
    /// Deployed address
    pub const ADDRESS: &str = "address";
    /// Source type name
    pub const CONTRACT_TYPE: &str = "contractType";
    /// Source path
    pub const CONTRACT_PATH: &str = "contractPath";
    /// Category label
    pub const CATEGORY: &str = "category";
    /// Identity that deployed the unit
    pub const DEPLOYER: &str = "deployer";
    /// Block number at registration
    pub const BLOCK_NUMBER: &str = "blockNumber";
    /// ISO timestamp at registration
    pub const DEPLOYED_AT: &str = "deployedAt";
    /// Deterministic deployment salt
    pub const SALT: &str = "salt";
    /// Current administrative owner (proxies)
    pub const OWNER: &str = "owner";
    /// Implementation subtree (proxies)
    pub const IMPLEMENTATION: &str = "implementation";
    /// Ownership-model label (proxy implementations)
    pub const OWNERSHIP_MODEL: &str = "ownershipModel";
    /// Derived implementation key (proxy implementations)
    pub const KEY: &str = "key";
    /// Roles subtree
    pub const ROLES: &str = "roles";
    /// Role bit value
    pub const VALUE: &str = "value";
    /// Role grantee list
    pub const GRANTEES: &str = "grantees";
}

const DEPLOYED_FIELDS: &[(&str, DataType)] = &[
    (fields::KIND, DataType::String),
    (fields::ADDRESS, DataType::Address),
    (fields::CONTRACT_TYPE, DataType::String),
    (fields::CONTRACT_PATH, DataType::String),
    (fields::CATEGORY, DataType::String),
    (fields::DEPLOYER, DataType::Address),
    (fields::BLOCK_NUMBER, DataType::Uint),
    (fields::DEPLOYED_AT, DataType::String),
    (fields::SALT, DataType::String),
];

const PROXY_FIELDS: &[(&str, DataType)] = &[
    (fields::KIND, DataType::String),
    (fields::ADDRESS, DataType::Address),
    (fields::CATEGORY, DataType::String),
    (fields::OWNER, DataType::Address),
    (fields::SALT, DataType::String),
    (fields::DEPLOYER, DataType::Address),
    (fields::BLOCK_NUMBER, DataType::Uint),
    (fields::DEPLOYED_AT, DataType::String),
    ("implementation.address", DataType::Address),
    ("implementation.contractType", DataType::String),
    ("implementation.contractPath", DataType::String),
    ("implementation.ownershipModel", DataType::String),
    ("implementation.key", DataType::String),
];

/// `<contract>.roles.<role>`
pub fn role_key(contract: &str, role: &str) -> String {
    format!("{}.{}.{}", contract, fields::ROLES, role)
}

/// `<contract>.roles.<role>.value`
pub fn role_value_key(contract: &str, role: &str) -> String {
    key::join(&role_key(contract, role), fields::VALUE)
}

/// `<contract>.roles.<role>.grantees`
pub fn role_grantees_key(contract: &str, role: &str) -> String {
    key::join(&role_key(contract, role), fields::GRANTEES)
}

/// Wildcard rule: any key `prefix.<anything>.suffix` has `data_type`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    prefix: String,
    suffix: String,
    data_type: DataType,
}

impl KeyPattern {
    /// Key prefix before the wildcard
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key suffix after the wildcard
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Declared type of matching keys
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Check whether `key` is `prefix.<non-empty>.suffix`
    pub fn matches(&self, key: &str) -> bool {
        let Some(rest) = key.strip_prefix(self.prefix.as_str()) else {
            return false;
        };
        let Some(rest) = rest.strip_prefix(key::SEPARATOR) else {
            return false;
        };
        let Some(middle) = rest.strip_suffix(self.suffix.as_str()) else {
            return false;
        };
        match middle.strip_suffix(key::SEPARATOR) {
            Some(wildcard) => !wildcard.is_empty(),
            None => false,
        }
    }
}

/// Registry of keys and wildcard patterns
#[derive(Debug, Clone, Default)]
pub struct KeySchema {
    keys: BTreeMap<String, DataType>,
    patterns: Vec<KeyPattern>,
    roles: BTreeMap<String, Vec<String>>,
}

impl KeySchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a key with its type
    ///
    /// Idempotent for an identical registration.
    pub fn register_key(&mut self, path: &str, data_type: DataType) -> Result<()> {
        validate_key(path)?;

        if let Some(existing) = self.keys.get(path) {
            if *existing == data_type {
                return Ok(());
            }
            return Err(Error::KeyTypeConflict {
                key: path.to_string(),
                existing: *existing,
                requested: data_type,
            });
        }

        if let Some(ancestor) = key::ancestors(path)
            .find(|a| self.keys.get(*a).map_or(false, DataType::is_value))
        {
            return Err(Error::KeyConflict {
                key: path.to_string(),
                existing: ancestor.to_string(),
            });
        }

        if data_type.is_value() {
            if let Some(descendant) = self.first_descendant(path) {
                return Err(Error::KeyConflict {
                    key: path.to_string(),
                    existing: descendant.to_string(),
                });
            }
        }

        self.keys.insert(path.to_string(), data_type);
        Ok(())
    }

    /// Register a wildcard pattern `prefix.<anything>.suffix`
    pub fn register_pattern(&mut self, prefix: &str, suffix: &str, data_type: DataType) -> Result<()> {
        validate_key(prefix)?;
        validate_key(suffix)?;
        let pattern = KeyPattern {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            data_type,
        };
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
        Ok(())
    }

    /// Register the role names valid under `<contract>.roles`
    ///
    /// Each role gets a `value` (UINT) and `grantees` (STRING_ARRAY) sub-key.
    pub fn register_roles<S: AsRef<str>>(&mut self, contract: &str, roles: &[S]) -> Result<()> {
        validate_key(contract)?;
        for role in roles {
            let role = role.as_ref();
            let base = role_key(contract, role);
            validate_key(&base)?;
            self.register_key(&base, DataType::Role)?;
            self.register_key(&role_value_key(contract, role), DataType::Uint)?;
            self.register_key(&role_grantees_key(contract, role), DataType::StringArray)?;

            let known = self.roles.entry(contract.to_string()).or_default();
            if !known.iter().any(|r| r == role) {
                known.push(role.to_string());
            }
        }
        Ok(())
    }

    /// Register a contract record and its sub-keys
    pub fn register_contract(&mut self, path: &str) -> Result<()> {
        self.register_record(path, DataType::Contract, DEPLOYED_FIELDS)
    }

    /// Register a library record and its sub-keys
    pub fn register_library(&mut self, path: &str) -> Result<()> {
        self.register_record(path, DataType::Library, DEPLOYED_FIELDS)
    }

    /// Register a proxy record and its sub-keys
    pub fn register_proxy(&mut self, path: &str) -> Result<()> {
        self.register_record(path, DataType::Proxy, PROXY_FIELDS)
    }

    /// Register a record of any deployable kind
    ///
    /// Fails `KeyTypeConflict` for a kind that is not deployable.
    pub fn register_deployable(&mut self, path: &str, kind: DataType) -> Result<()> {
        match kind {
            DataType::Contract => self.register_contract(path),
            DataType::Library => self.register_library(path),
            DataType::Proxy => self.register_proxy(path),
            other => Err(Error::KeyTypeConflict {
                key: path.to_string(),
                existing: other,
                requested: DataType::Contract,
            }),
        }
    }

    fn register_record(
        &mut self,
        path: &str,
        kind: DataType,
        sub_keys: &[(&str, DataType)],
    ) -> Result<()> {
        self.register_key(path, kind)?;
        for (field, data_type) in sub_keys {
            self.register_key(&key::join(path, field), *data_type)?;
        }
        Ok(())
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Declared type of a key, explicit or pattern-matched
    pub fn lookup(&self, path: &str) -> Result<DataType> {
        validate_key(path)?;
        if let Some(data_type) = self.keys.get(path) {
            return Ok(*data_type);
        }
        self.matching_pattern(path)
            .map(KeyPattern::data_type)
            .ok_or_else(|| Error::KeyNotRegistered(path.to_string()))
    }

    /// Like `lookup`, registering a pattern match as an explicit key
    pub fn lookup_or_discover(&mut self, path: &str) -> Result<DataType> {
        validate_key(path)?;
        if let Some(data_type) = self.keys.get(path) {
            return Ok(*data_type);
        }
        let data_type = self
            .matching_pattern(path)
            .map(KeyPattern::data_type)
            .ok_or_else(|| Error::KeyNotRegistered(path.to_string()))?;
        self.register_key(path, data_type)?;
        Ok(data_type)
    }

    /// First registered pattern matching the key
    pub fn matching_pattern(&self, path: &str) -> Option<&KeyPattern> {
        self.patterns.iter().find(|p| p.matches(path))
    }

    /// Check whether the key is explicitly registered
    pub fn is_registered(&self, path: &str) -> bool {
        self.keys.contains_key(path)
    }

    /// Explicit keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = (&str, DataType)> {
        self.keys.iter().map(|(k, t)| (k.as_str(), *t))
    }

    /// Registered patterns in registration order
    pub fn patterns(&self) -> &[KeyPattern] {
        &self.patterns
    }

    /// Role names registered for a contract
    pub fn roles_of(&self, contract: &str) -> &[String] {
        self.roles.get(contract).map_or(&[], Vec::as_slice)
    }

    /// Number of explicit keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check for an empty schema
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.patterns.is_empty()
    }

    fn first_descendant(&self, path: &str) -> Option<&str> {
        let lower = format!("{}{}", path, key::SEPARATOR);
        self.keys
            .range(lower.clone()..)
            .map(|(k, _)| k.as_str())
            .take_while(|k| k.starts_with(&lower))
            .next()
    }
}
