//! Deployment records
//!
//! - `Run`: metadata of one session; a document accumulates one per resume
//! - `ImplementationRecord` / `ProxyRecord`: address-prediction bookkeeping
//! - `DeploymentState`: both record collections with their uniqueness rules
//!
//! ## Uniqueness
//!
//! - An implementation address belongs to at most one proxy id
//! - Proxy ids are unique; so are proxy addresses
//! - Recording an identical proxy again is a no-op reporting `AlreadyExists`

use crate::address::Address;
use crate::error::{Error, Result};
use crate::timestamp::Timestamp;
use std::collections::BTreeMap;

/// Ownership label while the deploying session owns a proxy
pub const OWNERSHIP_DEPLOYER_OWNED: &str = "deployer-owned";

/// Ownership label once `finish()` handed the proxy to the final owner
pub const OWNERSHIP_TRANSFERRED: &str = "transferred-after-deploy";

/// Outcome of an idempotent registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new record was written
    Created(Address),
    /// An identical record already existed; nothing was written
    AlreadyExists(Address),
}

impl Registration {
    /// Address of the registered unit
    pub fn address(&self) -> Address {
        match self {
            Registration::Created(a) | Registration::AlreadyExists(a) => *a,
        }
    }

    /// Check for the no-op outcome
    pub fn already_existed(&self) -> bool {
        matches!(self, Registration::AlreadyExists(_))
    }
}

/// One session's metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    /// Network name
    pub network: String,
    /// Deployment script version
    pub version: String,
    /// Identity running the deployment
    pub deployer: Address,
    /// Intended final owner
    pub owner: Address,
    /// Salt prefix used for address derivation
    pub salt_prefix: String,
    /// Start time
    pub start_timestamp: Timestamp,
    /// Block number at start
    pub start_block: u64,
    /// Finish time (epoch while unfinished)
    pub finish_timestamp: Timestamp,
    /// Block number at finish (0 while unfinished)
    pub finish_block: u64,
}

impl Run {
    /// Check whether the run has been finished
    pub fn is_finished(&self) -> bool {
        !self.finish_timestamp.is_epoch()
    }

    /// Stamp the finish, enforcing finish >= start
    pub fn finish(&mut self, timestamp: Timestamp, block: u64) -> Result<()> {
        if timestamp < self.start_timestamp {
            return Err(Error::InvalidRunTiming {
                field: "timestamp",
                start: self.start_timestamp.as_secs(),
                finish: timestamp.as_secs(),
            });
        }
        if block < self.start_block {
            return Err(Error::InvalidRunTiming {
                field: "block",
                start: self.start_block,
                finish: block,
            });
        }
        self.finish_timestamp = timestamp;
        self.finish_block = block;
        Ok(())
    }
}

/// Implementation deployed behind a proxy, keyed by its address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationRecord {
    /// Deployed implementation address
    pub address: Address,
    /// Id of the proxy using it
    pub proxy: String,
    /// Source path
    pub contract_path: String,
    /// Source type name
    pub contract_type: String,
    /// When it was recorded
    pub deployed_at: Timestamp,
}

/// Proxy, keyed by its compound `::`-delimited id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRecord {
    /// Compound id
    pub id: String,
    /// Proxy address
    pub address: Address,
    /// Current implementation address
    pub implementation: Address,
    /// Deterministic deployment salt (hex)
    pub salt: String,
    /// When it was recorded
    pub deployed_at: Timestamp,
}

/// Implementation and proxy collections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentState {
    implementations: BTreeMap<Address, ImplementationRecord>,
    proxies: BTreeMap<String, ProxyRecord>,
}

impl DeploymentState {
    /// Create empty collections
    pub fn new() -> Self {
        Self::default()
    }

    /// Implementations by address
    pub fn implementations(&self) -> impl Iterator<Item = &ImplementationRecord> {
        self.implementations.values()
    }

    /// Proxies by id
    pub fn proxies(&self) -> impl Iterator<Item = &ProxyRecord> {
        self.proxies.values()
    }

    /// Look up an implementation by address
    pub fn implementation(&self, address: &Address) -> Option<&ImplementationRecord> {
        self.implementations.get(address)
    }

    /// Look up a proxy by id
    pub fn proxy(&self, id: &str) -> Option<&ProxyRecord> {
        self.proxies.get(id)
    }

    /// Look up a proxy by address
    pub fn proxy_by_address(&self, address: &Address) -> Option<&ProxyRecord> {
        self.proxies.values().find(|p| p.address == *address)
    }

    /// Check an implementation record against the uniqueness rules
    pub fn check_implementation(&self, record: &ImplementationRecord) -> Result<()> {
        match self.implementations.get(&record.address) {
            Some(existing) if existing.proxy != record.proxy => Err(Error::DuplicateImplementation {
                address: record.address,
                proxy: existing.proxy.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Check a proxy record against the uniqueness rules
    ///
    /// Returns true if an identical record is already present.
    pub fn check_proxy(&self, record: &ProxyRecord) -> Result<bool> {
        if let Some(existing) = self.proxies.get(&record.id) {
            if existing.address == record.address && existing.implementation == record.implementation {
                return Ok(true);
            }
            return Err(Error::DuplicateProxy(record.id.clone()));
        }
        if self.proxy_by_address(&record.address).is_some() {
            return Err(Error::DuplicateProxyAddress(record.address));
        }
        Ok(false)
    }

    /// Record an implementation
    pub fn record_implementation(&mut self, record: ImplementationRecord) -> Result<Registration> {
        self.check_implementation(&record)?;
        let address = record.address;
        if self.implementations.contains_key(&address) {
            return Ok(Registration::AlreadyExists(address));
        }
        self.implementations.insert(address, record);
        Ok(Registration::Created(address))
    }

    /// Record a proxy
    pub fn record_proxy(&mut self, record: ProxyRecord) -> Result<Registration> {
        let address = record.address;
        if self.check_proxy(&record)? {
            return Ok(Registration::AlreadyExists(address));
        }
        self.proxies.insert(record.id.clone(), record);
        Ok(Registration::Created(address))
    }

    /// Number of implementations
    pub fn implementation_count(&self) -> usize {
        self.implementations.len()
    }

    /// Number of proxies
    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn implementation(address: u64, proxy: &str) -> ImplementationRecord {
        ImplementationRecord {
            address: Address::from_low_u64(address),
            proxy: proxy.to_string(),
            contract_path: "src/Minter.sol".to_string(),
            contract_type: "Minter".to_string(),
            deployed_at: Timestamp::from_secs(100),
        }
    }

    fn proxy(id: &str, address: u64, implementation: u64) -> ProxyRecord {
        ProxyRecord {
            id: id.to_string(),
            address: Address::from_low_u64(address),
            implementation: Address::from_low_u64(implementation),
            salt: "0x01".to_string(),
            deployed_at: Timestamp::from_secs(100),
        }
    }

    #[test]
    fn test_duplicate_implementation() {
        let mut state = DeploymentState::new();
        state.record_implementation(implementation(1, "BTC")).unwrap();
        let err = state
            .record_implementation(implementation(1, "ETH"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateImplementation { proxy, .. } if proxy == "BTC"));
        assert!(state
            .record_implementation(implementation(1, "BTC"))
            .unwrap()
            .already_existed());
    }

    #[test]
    fn test_duplicate_proxy_id() {
        let mut state = DeploymentState::new();
        state.record_proxy(proxy("BTC", 10, 1)).unwrap();
        assert!(matches!(
            state.record_proxy(proxy("BTC", 11, 1)),
            Err(Error::DuplicateProxy(id)) if id == "BTC"
        ));
    }

    #[test]
    fn test_duplicate_proxy_address() {
        let mut state = DeploymentState::new();
        state.record_proxy(proxy("BTC", 10, 1)).unwrap();
        assert!(matches!(
            state.record_proxy(proxy("ETH", 10, 2)),
            Err(Error::DuplicateProxyAddress(_))
        ));
    }

    #[test]
    fn test_identical_proxy_is_noop() {
        let mut state = DeploymentState::new();
        let first = state.record_proxy(proxy("BTC", 10, 1)).unwrap();
        let second = state.record_proxy(proxy("BTC", 10, 1)).unwrap();
        assert_eq!(first, Registration::Created(Address::from_low_u64(10)));
        assert!(second.already_existed());
        assert_eq!(state.proxy_count(), 1);
    }

    #[test]
    fn test_run_finish_ordering() {
        let mut run = Run {
            network: "mainnet".to_string(),
            version: "v1".to_string(),
            deployer: Address::from_low_u64(1),
            owner: Address::from_low_u64(2),
            salt_prefix: "bao".to_string(),
            start_timestamp: Timestamp::from_secs(100),
            start_block: 10,
            finish_timestamp: Timestamp::EPOCH,
            finish_block: 0,
        };
        assert!(!run.is_finished());
        assert!(matches!(
            run.finish(Timestamp::from_secs(99), 11),
            Err(Error::InvalidRunTiming { field: "timestamp", .. })
        ));
        assert!(matches!(
            run.finish(Timestamp::from_secs(100), 9),
            Err(Error::InvalidRunTiming { field: "block", .. })
        ));
        run.finish(Timestamp::from_secs(100), 10).unwrap();
        assert!(run.is_finished());
    }
}
