//! Deployment session
//!
//! A `Session` owns one logical deployment run: the typed key/value tree, the
//! implementation/proxy collections and the run history, plus the collaborators
//! it was built with (clock, deterministic deployer, storage).
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --start()--> Active --finish()--> Finished
//! ```
//!
//! Every mutation requires `Active`. `start()` may resume from a previously
//! rendered document, replaying its entries and records before anything else
//! is accepted. A failing call writes nothing, so it can be re-issued once
//! the input is fixed.
//!
//! ## Persistence
//!
//! With `PersistMode::EveryMutation` the whole document is written after each
//! successful mutation; with `PersistMode::OnFinish` only `finish()` writes.
//!
//! Registration lives in `registry.rs`, role bookkeeping in `roles.rs`.

use crate::clock::Clock;
use crate::config::{PersistMode, SessionConfig};
use crate::deployer::DeterministicDeployer;
use crate::persistence::Storage;
use keystone_codec::{format_timestamp, DeploymentDocument, JsonCodec};
use keystone_core::schema::fields;
use keystone_core::store::validate_text;
use keystone_core::{
    key, Address, DataType, DeploymentState, Error, KeySchema, Result, Run, Timestamp,
    TypedStore, Value, OWNERSHIP_DEPLOYER_OWNED, OWNERSHIP_TRANSFERRED,
};
use tracing::{debug, info};

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Built, not started
    Uninitialized,
    /// Accepting mutations
    Active,
    /// Finished; read-only
    Finished,
}

impl SessionStatus {
    fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Uninitialized => "uninitialized",
            SessionStatus::Active => "active",
            SessionStatus::Finished => "finished",
        }
    }
}

/// Arguments to `Session::start`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartParams {
    /// Final owner proxies are handed to at `finish()`
    pub owner: Address,
    /// Network name
    pub network: String,
    /// Deployment script version
    pub version: String,
    /// Salt prefix for address derivation
    pub salt_prefix: String,
}

/// One deployment run
pub struct Session {
    pub(crate) persist: PersistMode,
    pub(crate) operator: Address,
    pub(crate) transfer_ownership: bool,
    pub(crate) proxy_creation_code: Vec<u8>,
    pub(crate) chain_id: u64,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) deployer: Box<dyn DeterministicDeployer>,
    pub(crate) storage: Box<dyn Storage>,
    pub(crate) codec: JsonCodec,
    pub(crate) doc: DeploymentDocument,
    pub(crate) status: SessionStatus,
    pub(crate) poisoned: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("status", &self.status)
            .field("operator", &self.operator)
            .field("network", &self.doc.header.network)
            .field("keys", &self.doc.store.len())
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

impl Session {
    /// Build an uninitialized session
    ///
    /// Fails with `InvalidConfig` if any config value does not parse.
    pub fn new(
        config: SessionConfig,
        schema: KeySchema,
        clock: Box<dyn Clock>,
        deployer: Box<dyn DeterministicDeployer>,
        storage: Box<dyn Storage>,
    ) -> Result<Self> {
        Ok(Session {
            persist: config.persist_mode()?,
            operator: config.deployer_address()?,
            transfer_ownership: config.transfer_ownership,
            proxy_creation_code: config.proxy_creation_code_bytes()?,
            chain_id: config.chain_id,
            clock,
            deployer,
            storage,
            codec: JsonCodec::new(),
            doc: DeploymentDocument::new(schema),
            status: SessionStatus::Uninitialized,
            poisoned: false,
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start the run, optionally resuming from a rendered document
    ///
    /// A resumed document must belong to the same network and salt prefix.
    /// Its keys, records and runs are replayed and a new run is appended.
    pub fn start(&mut self, params: StartParams, resume_from: Option<&str>) -> Result<()> {
        if self.status != SessionStatus::Uninitialized {
            return Err(Error::AlreadyInitialized);
        }
        if params.network.is_empty() {
            return Err(Error::MissingRequiredField("network"));
        }
        if params.salt_prefix.is_empty() {
            return Err(Error::MissingRequiredField("systemSaltString"));
        }
        validate_text("network", &params.network)?;
        validate_text("version", &params.version)?;
        validate_text("systemSaltString", &params.salt_prefix)?;

        let mut doc = match resume_from {
            Some(raw) => {
                let doc = self.codec.parse(raw, self.doc.store.schema().clone())?;
                check_resume("network", &params.network, &doc.header.network)?;
                check_resume("systemSaltString", &params.salt_prefix, &doc.header.salt_prefix)?;
                info!(
                    target: "keystone::session",
                    network = %params.network,
                    keys = doc.store.len(),
                    runs = doc.runs.len(),
                    "Resuming deployment"
                );
                doc
            }
            None => DeploymentDocument::new(self.doc.store.schema().clone()),
        };

        let now = self.clock.now();
        doc.header.network = params.network.clone();
        doc.header.salt_prefix = params.salt_prefix.clone();
        doc.header.chain_id = self.chain_id;
        doc.header.deployer_service = self.deployer.address();
        doc.header.last_updated = now;
        doc.runs.push(Run {
            network: params.network,
            version: params.version,
            deployer: self.operator,
            owner: params.owner,
            salt_prefix: params.salt_prefix,
            start_timestamp: now,
            start_block: self.clock.block_number(),
            finish_timestamp: Timestamp::EPOCH,
            finish_block: 0,
        });

        self.transact(|s| {
            s.doc = doc;
            s.status = SessionStatus::Active;
            info!(
                target: "keystone::session",
                network = %s.doc.header.network,
                run = s.doc.runs.len(),
                "Session started"
            );
            s.after_mutation()
        })
    }

    /// Start from whatever the storage backend holds
    pub fn start_from_storage(&mut self, params: StartParams) -> Result<()> {
        let raw = self.storage.load()?;
        self.start(params, raw.as_deref())
    }

    /// Finish the run
    ///
    /// Stamps finish time and block (not earlier than start), hands
    /// deployer-owned proxies to the final owner when configured, and writes
    /// the document regardless of persistence mode.
    pub fn finish(&mut self) -> Result<()> {
        self.ensure_mutable()?;

        let mut run = self.current_run()?.clone();
        run.finish(self.clock.now(), self.clock.block_number())?;

        self.transact(|s| {
            let mut transferred = 0;
            if s.transfer_ownership {
                let writes = s.ownership_transfers(run.owner);
                transferred = writes.len() / 2;
                s.doc.store.set_all(writes)?;
            }

            if let Some(current) = s.doc.runs.last_mut() {
                *current = run;
            }
            s.status = SessionStatus::Finished;
            s.doc.header.last_updated = s.clock.now();
            info!(
                target: "keystone::session",
                network = %s.doc.header.network,
                transferred,
                "Session finished"
            );
            s.save()
        })
    }

    fn ownership_transfers(&self, owner: Address) -> Vec<(String, Value)> {
        let store = &self.doc.store;
        let mut writes = Vec::new();
        for (proxy, data_type) in store.schema().keys() {
            if data_type != DataType::Proxy || !store.has(proxy) {
                continue;
            }
            let model_key = key::join(proxy, "implementation.ownershipModel");
            if store.get_string(&model_key).ok() != Some(OWNERSHIP_DEPLOYER_OWNED) {
                continue;
            }
            writes.push((key::join(proxy, fields::OWNER), Value::from(owner)));
            writes.push((model_key, Value::from(OWNERSHIP_TRANSFERRED)));
        }
        writes
    }

    /// Lifecycle state
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Check whether an earlier protocol violation blocks mutation
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub(crate) fn ensure_mutable(&self) -> Result<()> {
        if self.poisoned {
            return Err(Error::SessionPoisoned);
        }
        if self.status != SessionStatus::Active {
            return Err(Error::SessionNotActive(self.status.as_str()));
        }
        Ok(())
    }

    /// Run `op`, restoring the document and status if it fails
    ///
    /// Deployer side effects stay; a retried deployment finds its code
    /// already at the predicted address.
    pub(crate) fn transact<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let doc = self.doc.clone();
        let status = self.status;
        let result = op(self);
        if result.is_err() {
            self.doc = doc;
            self.status = status;
        }
        result
    }

    pub(crate) fn after_mutation(&mut self) -> Result<()> {
        self.doc.header.last_updated = self.clock.now();
        match self.persist {
            PersistMode::EveryMutation => self.save(),
            PersistMode::OnFinish => Ok(()),
        }
    }

    pub(crate) fn now_string(&self) -> Result<String> {
        format_timestamp(self.clock.now())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Render the full document
    pub fn render(&self) -> Result<String> {
        self.codec.render(&self.doc)
    }

    /// Render the compact implementations/proxies document
    pub fn render_state(&self) -> Result<String> {
        self.codec.render_state(&self.doc.state)
    }

    /// Write the full document to storage now
    pub fn save(&mut self) -> Result<()> {
        let raw = self.render()?;
        self.storage.save(&raw)?;
        debug!(target: "keystone::session", bytes = raw.len(), "Document saved");
        Ok(())
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Write a parameter once
    ///
    /// The key must be declared (explicitly or by pattern) with the value's
    /// type. A second write fails `ParameterAlreadyExists`.
    pub fn set_parameter(&mut self, key: &str, value: Value) -> Result<()> {
        self.ensure_mutable()?;
        if self.doc.store.has_value(key) {
            return Err(Error::ParameterAlreadyExists(key.to_string()));
        }
        self.transact(|s| {
            s.doc.store.set(key, value)?;
            debug!(target: "keystone::session", key, "Parameter set");
            s.after_mutation()
        })
    }

    /// Set an address parameter
    pub fn set_address(&mut self, key: &str, value: Address) -> Result<()> {
        self.set_parameter(key, Value::from(value))
    }

    /// Set an address parameter from raw text (hex literal or key reference)
    pub fn set_address_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_parameter(key, Value::Address(value.to_string()))
    }

    /// Set a string parameter
    pub fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_parameter(key, Value::from(value))
    }

    /// Set an unsigned integer parameter
    pub fn set_uint(&mut self, key: &str, value: u64) -> Result<()> {
        self.set_parameter(key, Value::Uint(value))
    }

    /// Set a signed integer parameter
    pub fn set_int(&mut self, key: &str, value: i64) -> Result<()> {
        self.set_parameter(key, Value::Int(value))
    }

    /// Set a boolean parameter
    pub fn set_bool(&mut self, key: &str, value: bool) -> Result<()> {
        self.set_parameter(key, Value::Bool(value))
    }

    /// Set an address array parameter
    pub fn set_address_array(&mut self, key: &str, values: &[Address]) -> Result<()> {
        self.set_parameter(key, Value::AddressArray(values.to_vec()))
    }

    /// Set a string array parameter
    pub fn set_string_array<S: AsRef<str>>(&mut self, key: &str, values: &[S]) -> Result<()> {
        let values = values.iter().map(|s| s.as_ref().to_string()).collect();
        self.set_parameter(key, Value::StringArray(values))
    }

    /// Set an unsigned integer array parameter
    pub fn set_uint_array(&mut self, key: &str, values: &[u64]) -> Result<()> {
        self.set_parameter(key, Value::UintArray(values.to_vec()))
    }

    /// Set a signed integer array parameter
    pub fn set_int_array(&mut self, key: &str, values: &[i64]) -> Result<()> {
        self.set_parameter(key, Value::IntArray(values.to_vec()))
    }

    /// Set a boolean array parameter
    pub fn set_bool_array(&mut self, key: &str, values: &[bool]) -> Result<()> {
        self.set_parameter(key, Value::BoolArray(values.to_vec()))
    }

    /// Stored parameter value
    ///
    /// Fails `ParameterNotFound` if the key is declared but unset.
    pub fn parameter(&self, key: &str) -> Result<&Value> {
        self.doc.store.get(key).map_err(|e| match e {
            Error::ValueNotSet(k) => Error::ParameterNotFound(k),
            other => other,
        })
    }

    /// Address, resolving a key reference by one hop
    pub fn get_address(&self, key: &str) -> Result<Address> {
        self.doc.store.get_address(key)
    }

    /// String value
    pub fn get_string(&self, key: &str) -> Result<&str> {
        self.doc.store.get_string(key)
    }

    /// Unsigned integer value
    pub fn get_uint(&self, key: &str) -> Result<u64> {
        self.doc.store.get_uint(key)
    }

    /// Signed integer value
    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.doc.store.get_int(key)
    }

    /// Boolean value
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.doc.store.get_bool(key)
    }

    /// Address array value
    pub fn get_address_array(&self, key: &str) -> Result<&[Address]> {
        self.doc.store.get_address_array(key)
    }

    /// String array value
    pub fn get_string_array(&self, key: &str) -> Result<&[String]> {
        self.doc.store.get_string_array(key)
    }

    /// Unsigned integer array value
    pub fn get_uint_array(&self, key: &str) -> Result<&[u64]> {
        self.doc.store.get_uint_array(key)
    }

    /// Signed integer array value
    pub fn get_int_array(&self, key: &str) -> Result<&[i64]> {
        self.doc.store.get_int_array(key)
    }

    /// Boolean array value
    pub fn get_bool_array(&self, key: &str) -> Result<&[bool]> {
        self.doc.store.get_bool_array(key)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Key/value tree
    pub fn store(&self) -> &TypedStore {
        &self.doc.store
    }

    /// Schema, extendable while the session runs
    pub fn schema_mut(&mut self) -> &mut KeySchema {
        self.doc.store.schema_mut()
    }

    /// Implementation and proxy collections
    pub fn state(&self) -> &DeploymentState {
        &self.doc.state
    }

    /// Run history, oldest first
    pub fn runs(&self) -> &[Run] {
        &self.doc.runs
    }

    /// Current run
    pub fn current_run(&self) -> Result<&Run> {
        self.doc
            .runs
            .last()
            .ok_or(Error::SessionNotActive(self.status.as_str()))
    }

    /// Whole document
    pub fn document(&self) -> &DeploymentDocument {
        &self.doc
    }

    /// Operator identity
    pub fn operator(&self) -> Address {
        self.operator
    }

    /// Salt prefix of the running session
    pub fn salt_prefix(&self) -> &str {
        &self.doc.header.salt_prefix
    }
}

fn check_resume(field: &'static str, expected: &str, actual: &str) -> Result<()> {
    if expected != actual {
        return Err(Error::ResumeMismatch {
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}
