//! Contract, library and proxy registration
//!
//! Each deployed unit is a subtree of the key space:
//!
//! ```text
//! pegged.address          pegged.contractType   pegged.contractPath
//! pegged.category         pegged.deployer       pegged.blockNumber
//! pegged.deployedAt       pegged.salt
//! ```
//!
//! Proxies additionally carry `owner` and an `implementation` subtree, and
//! are mirrored in the implementation/proxy collections.
//!
//! Looking up the address of a key that was never registered fails with
//! `ContractNotFound`; callers register in dependency order.

use crate::deployer::{commitment_hash, derive_salt, DeployKind, Salt};
use crate::session::Session;
use keystone_core::schema::fields;
use keystone_core::store::validate_text;
use keystone_core::{
    key, Address, DataType, Error, ImplementationRecord, KeySchema, ProxyRecord, Registration,
    Result, Value, OWNERSHIP_DEPLOYER_OWNED, OWNERSHIP_TRANSFERRED,
};
use tracing::{debug, error, info};

/// Category recorded by `use_existing`
pub const CATEGORY_EXISTING: &str = "existing";

/// Category recorded for proxies
pub const CATEGORY_PROXY: &str = "proxy";

/// Source description of a deployed unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractInfo<'a> {
    /// Source type name
    pub contract_type: &'a str,
    /// Source path
    pub contract_path: &'a str,
    /// Category label
    pub category: &'a str,
}

impl<'a> ContractInfo<'a> {
    /// Describe a unit
    pub fn new(contract_type: &'a str, contract_path: &'a str, category: &'a str) -> Self {
        ContractInfo {
            contract_type,
            contract_path,
            category,
        }
    }
}

struct Record<'a> {
    key: &'a str,
    kind: DataType,
    address: Address,
    info: ContractInfo<'a>,
    salt: String,
    /// Live schema with the record's sub-keys registered
    schema: KeySchema,
}

impl Session {
    // =========================================================================
    // Contracts and libraries
    // =========================================================================

    /// Register a deployed contract
    pub fn register_contract(
        &mut self,
        key: &str,
        address: Address,
        info: ContractInfo<'_>,
    ) -> Result<Address> {
        self.ensure_mutable()?;
        self.ensure_new(key, DataType::Contract)?;
        ensure_nonzero(address)?;
        let schema = self.record_schema(key, DataType::Contract)?;
        self.write_record(Record {
            key,
            kind: DataType::Contract,
            address,
            info,
            salt: String::new(),
            schema,
        })
    }

    /// Register a deployed library
    pub fn register_library(
        &mut self,
        key: &str,
        address: Address,
        info: ContractInfo<'_>,
    ) -> Result<Address> {
        self.ensure_mutable()?;
        self.ensure_new(key, DataType::Library)?;
        ensure_nonzero(address)?;
        let schema = self.record_schema(key, DataType::Library)?;
        self.write_record(Record {
            key,
            kind: DataType::Library,
            address,
            info,
            salt: String::new(),
            schema,
        })
    }

    /// Record an instance that already exists on chain
    ///
    /// The only registration that accepts the zero address.
    pub fn use_existing(
        &mut self,
        key: &str,
        address: Address,
        contract_type: &str,
        contract_path: &str,
    ) -> Result<Address> {
        self.ensure_mutable()?;
        self.ensure_new(key, DataType::Contract)?;
        let schema = self.record_schema(key, DataType::Contract)?;
        self.write_record(Record {
            key,
            kind: DataType::Contract,
            address,
            info: ContractInfo::new(contract_type, contract_path, CATEGORY_EXISTING),
            salt: String::new(),
            schema,
        })
    }

    /// Replace an existing contract record
    pub fn overwrite_contract(
        &mut self,
        key: &str,
        address: Address,
        info: ContractInfo<'_>,
    ) -> Result<Address> {
        self.ensure_mutable()?;
        key::validate_key(key)?;
        if self.doc.store.schema().lookup(key).ok() != Some(DataType::Contract)
            || !self.is_registered(key)
        {
            return Err(Error::ContractNotFound(key.to_string()));
        }
        ensure_nonzero(address)?;
        info!(target: "keystone::registry", key, %address, "Overwriting contract");
        let schema = self.record_schema(key, DataType::Contract)?;
        self.write_record(Record {
            key,
            kind: DataType::Contract,
            address,
            info,
            salt: String::new(),
            schema,
        })
    }

    /// Deploy a contract deterministically and register it
    pub fn deploy_contract(
        &mut self,
        key: &str,
        init_code: &[u8],
        value: u64,
        info: ContractInfo<'_>,
    ) -> Result<Address> {
        self.deploy_unit(key, DataType::Contract, DeployKind::Contract, init_code, value, info)
    }

    /// Deploy a library deterministically and register it
    pub fn deploy_library(
        &mut self,
        key: &str,
        init_code: &[u8],
        info: ContractInfo<'_>,
    ) -> Result<Address> {
        self.deploy_unit(key, DataType::Library, DeployKind::Library, init_code, 0, info)
    }

    fn deploy_unit(
        &mut self,
        key: &str,
        kind: DataType,
        deploy_kind: DeployKind,
        init_code: &[u8],
        value: u64,
        info: ContractInfo<'_>,
    ) -> Result<Address> {
        self.ensure_mutable()?;
        self.ensure_new(key, kind)?;
        check_info_text(key, &info)?;
        let schema = self.record_schema(key, kind)?;
        let salt = self.salt_for(key, deploy_kind);
        let address = self.deploy_with_salt(key, &salt, init_code, value)?;
        self.write_record(Record {
            key,
            kind,
            address,
            info,
            salt: salt.to_string(),
            schema,
        })
    }

    /// Schema with the record's sub-keys registered, leaving the live one untouched
    fn record_schema(&self, key: &str, kind: DataType) -> Result<KeySchema> {
        let mut schema = self.doc.store.schema().clone();
        schema.register_deployable(key, kind)?;
        Ok(schema)
    }

    fn ensure_new(&self, key: &str, kind: DataType) -> Result<()> {
        key::validate_key(key)?;
        if self.is_registered(key) {
            return Err(match kind {
                DataType::Library => Error::LibraryAlreadyExists(key.to_string()),
                _ => Error::ContractAlreadyExists(key.to_string()),
            });
        }
        Ok(())
    }

    fn write_record(&mut self, record: Record<'_>) -> Result<Address> {
        let Record {
            key,
            kind,
            address,
            info,
            salt,
            schema,
        } = record;

        let writes = vec![
            (key::join(key, fields::KIND), Value::from(record_kind(kind))),
            (key::join(key, fields::ADDRESS), Value::from(address)),
            (key::join(key, fields::CONTRACT_TYPE), Value::from(info.contract_type)),
            (key::join(key, fields::CONTRACT_PATH), Value::from(info.contract_path)),
            (key::join(key, fields::CATEGORY), Value::from(info.category)),
            (key::join(key, fields::DEPLOYER), Value::from(self.operator)),
            (
                key::join(key, fields::BLOCK_NUMBER),
                Value::Uint(self.clock.block_number()),
            ),
            (key::join(key, fields::DEPLOYED_AT), Value::String(self.now_string()?)),
            (key::join(key, fields::SALT), Value::String(salt)),
        ];

        self.transact(|s| {
            *s.doc.store.schema_mut() = schema;
            s.doc.store.set_all(writes)?;

            info!(
                target: "keystone::registry",
                key,
                %address,
                kind = kind.name(),
                contract_type = info.contract_type,
                "Registered"
            );
            s.after_mutation()?;
            Ok(address)
        })
    }

    // =========================================================================
    // Proxies
    // =========================================================================

    /// Deploy and register an upgradeable proxy
    ///
    /// The implementation key is `<proxyId>::<typeName>`, the proxy id being
    /// the key's segments joined with `::`. `owner` defaults to the operator;
    /// a deployer-owned proxy is handed to the final owner at `finish()`.
    /// Registering an identical proxy again is a no-op reporting
    /// `AlreadyExists`.
    pub fn register_proxy(
        &mut self,
        key: &str,
        implementation: Address,
        init_data: &[u8],
        contract_type: &str,
        contract_path: &str,
        owner: Option<Address>,
    ) -> Result<Registration> {
        self.ensure_mutable()?;
        if key.is_empty() {
            return Err(Error::ProxyKeyRequired);
        }
        key::validate_key(key)?;
        if implementation.is_zero() {
            return Err(Error::ImplementationAddressRequired(key.to_string()));
        }
        check_info_text(key, &ContractInfo::new(contract_type, contract_path, CATEGORY_PROXY))?;

        let id = key::to_compound_id(key);
        let implementation_key = format!("{}::{}", id, contract_type);
        let salt = self.salt_for(key, DeployKind::Proxy);
        let address = self.deployer.predict(&salt);
        let deployed_at = self.clock.now();

        let implementation_record = ImplementationRecord {
            address: implementation,
            proxy: id.clone(),
            contract_path: contract_path.to_string(),
            contract_type: contract_type.to_string(),
            deployed_at,
        };
        let proxy_record = ProxyRecord {
            id: id.clone(),
            address,
            implementation,
            salt: salt.to_string(),
            deployed_at,
        };

        self.doc.state.check_implementation(&implementation_record)?;
        if self.doc.state.check_proxy(&proxy_record)? {
            debug!(target: "keystone::registry", proxy = %id, "Proxy already registered");
            return Ok(Registration::AlreadyExists(address));
        }
        if self.is_registered(key) {
            return Err(Error::DuplicateProxy(id));
        }

        let owner = owner.unwrap_or(self.operator);
        let ownership_model = if owner == self.operator {
            OWNERSHIP_DEPLOYER_OWNED
        } else {
            OWNERSHIP_TRANSFERRED
        };

        let schema = self.record_schema(key, DataType::Proxy)?;
        let writes = vec![
            (key::join(key, fields::KIND), Value::from(record_kind(DataType::Proxy))),
            (key::join(key, fields::ADDRESS), Value::from(address)),
            (key::join(key, fields::CATEGORY), Value::from(CATEGORY_PROXY)),
            (key::join(key, fields::OWNER), Value::from(owner)),
            (key::join(key, fields::SALT), Value::String(salt.to_string())),
            (key::join(key, fields::DEPLOYER), Value::from(self.operator)),
            (
                key::join(key, fields::BLOCK_NUMBER),
                Value::Uint(self.clock.block_number()),
            ),
            (key::join(key, fields::DEPLOYED_AT), Value::String(self.now_string()?)),
            (key::join(key, "implementation.address"), Value::from(implementation)),
            (key::join(key, "implementation.contractType"), Value::from(contract_type)),
            (key::join(key, "implementation.contractPath"), Value::from(contract_path)),
            (key::join(key, "implementation.ownershipModel"), Value::from(ownership_model)),
            (key::join(key, "implementation.key"), Value::String(implementation_key)),
        ];

        let mut init_code = self.proxy_creation_code.clone();
        init_code.extend_from_slice(&implementation.to_word());
        init_code.extend_from_slice(init_data);
        self.deploy_with_salt(key, &salt, &init_code, 0)?;

        self.transact(|s| {
            *s.doc.store.schema_mut() = schema;
            s.doc.store.set_all(writes)?;
            s.doc.state.record_implementation(implementation_record)?;
            let registration = s.doc.state.record_proxy(proxy_record)?;

            info!(
                target: "keystone::registry",
                proxy = %id,
                %address,
                %implementation,
                %owner,
                "Registered proxy"
            );
            s.after_mutation()?;
            Ok(registration)
        })
    }

    // =========================================================================
    // Deterministic deployment
    // =========================================================================

    /// Salt of `key` under the session's salt prefix
    pub fn salt_for(&self, key: &str, kind: DeployKind) -> Salt {
        derive_salt(&self.doc.header.salt_prefix, key, kind)
    }

    /// Predicted address of `key`
    pub fn predict(&self, key: &str, kind: DeployKind) -> Address {
        self.deployer.predict(&self.salt_for(key, kind))
    }

    /// Run predict/commit/reveal for `init_code` under `salt`
    ///
    /// Code already at the predicted address is taken as deployed. A reveal
    /// landing anywhere but the predicted address poisons the session.
    pub fn deploy_with_salt(
        &mut self,
        key: &str,
        salt: &Salt,
        init_code: &[u8],
        value: u64,
    ) -> Result<Address> {
        self.ensure_mutable()?;
        let predicted = self.deployer.predict(salt);
        if self.deployer.is_deployed(&predicted) {
            debug!(target: "keystone::registry", key, %predicted, "Code already deployed");
            return Ok(predicted);
        }
        let commitment = commitment_hash(&self.operator, value, salt, init_code);
        self.deployer.commit(self.operator, commitment)?;
        let actual = self.deployer.reveal(self.operator, init_code, salt, value)?;

        if actual != predicted {
            self.poisoned = true;
            error!(
                target: "keystone::registry",
                key,
                %predicted,
                %actual,
                "Deterministic deployment landed at an unexpected address"
            );
            return Err(Error::DeploymentAddressMismatch {
                key: key.to_string(),
                predicted,
                actual,
            });
        }
        debug!(target: "keystone::registry", key, %actual, %salt, "Deployed");
        Ok(actual)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Address of a registered unit, or a hex literal passed through
    pub fn address_of(&self, key_or_address: &str) -> Result<Address> {
        if let Ok(address) = Address::parse(key_or_address) {
            return Ok(address);
        }
        if !self.is_registered(key_or_address) {
            return Err(Error::ContractNotFound(key_or_address.to_string()));
        }
        self.doc
            .store
            .get_address(&key::join(key_or_address, fields::ADDRESS))
    }

    /// One recorded field of a registered unit, as text
    ///
    /// `field` is a sub-key such as `address`, `contractType` or
    /// `implementation.address`.
    pub fn field(&self, key: &str, field: &str) -> Result<String> {
        if !self.is_registered(key) {
            return Err(Error::ContractNotFound(key.to_string()));
        }
        let store = &self.doc.store;
        let path = key::join(key, field);
        match store.get(&path)? {
            Value::Address(_) => Ok(store.get_address(&path)?.to_string()),
            other => Ok(other.to_display_string()),
        }
    }

    /// Check whether `key` names a registered contract, library or proxy
    pub fn is_registered(&self, key: &str) -> bool {
        let store = &self.doc.store;
        store.schema().lookup(key).map_or(false, |t| t.is_deployable())
            && store.has_value(&key::join(key, fields::ADDRESS))
    }
}

fn record_kind(kind: DataType) -> &'static str {
    kind.record_kind().unwrap_or("contract")
}

fn check_info_text(key: &str, info: &ContractInfo<'_>) -> Result<()> {
    validate_text(&key::join(key, fields::CONTRACT_TYPE), info.contract_type)?;
    validate_text(&key::join(key, fields::CONTRACT_PATH), info.contract_path)?;
    validate_text(&key::join(key, fields::CATEGORY), info.category)
}

fn ensure_nonzero(address: Address) -> Result<()> {
    if address.is_zero() {
        return Err(Error::InvalidAddress(address.to_string()));
    }
    Ok(())
}
