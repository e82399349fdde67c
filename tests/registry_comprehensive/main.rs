//! Registry Comprehensive Test Suite
//!
//! Cross-crate behaviour of sessions, documents and collaborators.
//!
//! ## Modules
//!
//! - `lifecycle`: start/finish, parameters, persistence modes
//! - `addressing`: hex parsing and one-hop reference resolution
//! - `proxies`: proxy registration and uniqueness
//! - `roles`: role values, grantees and bitmap checks
//! - `round_trip`: render/parse fidelity of full and state documents
//! - `resume`: multi-phase deployments across process restarts
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test registry_comprehensive
//! cargo test --test registry_comprehensive round_trip::
//! ```

use keystone::{
    Address, DataType, InMemoryDeployer, KeySchema, ManualClock, MemoryStorage, Session,
    SessionConfig, StartParams, Storage, Timestamp,
};

pub mod addressing;
pub mod lifecycle;
pub mod proxies;
pub mod resume;
pub mod roles;
pub mod round_trip;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Operator running every test deployment
pub fn operator() -> Address {
    Address::from_low_u64(0xaa)
}

/// Final owner proxies are handed to
pub fn final_owner() -> Address {
    Address::from_low_u64(0xbb)
}

/// Address of the deterministic deployer service
pub fn deployer_service() -> Address {
    Address::from_low_u64(0xd0)
}

/// Schema shared by the suite
pub fn schema() -> KeySchema {
    let mut schema = KeySchema::new();
    schema.register_key("fee", DataType::Uint).unwrap();
    schema.register_key("treasury", DataType::Address).unwrap();
    schema.register_key("feeReceiver", DataType::Address).unwrap();
    schema.register_key("label", DataType::String).unwrap();
    schema.register_key("offset", DataType::Int).unwrap();
    schema.register_key("paused", DataType::Bool).unwrap();
    schema.register_key("minters", DataType::AddressArray).unwrap();
    schema.register_key("tiers", DataType::UintArray).unwrap();
    schema.register_key("symbols", DataType::StringArray).unwrap();
    schema.register_key("deltas", DataType::IntArray).unwrap();
    schema.register_key("flags", DataType::BoolArray).unwrap();
    schema
        .register_pattern("networks", "rpc", DataType::String)
        .unwrap();
    schema
        .register_pattern("networks", "chainId", DataType::Uint)
        .unwrap();
    schema
        .register_roles("pegged", &["MINTER_ROLE", "BURNER_ROLE"])
        .unwrap();
    schema
}

/// Start parameters for the default network
pub fn params() -> StartParams {
    StartParams {
        owner: final_owner(),
        network: "mainnet".to_string(),
        version: "v1.0.0".to_string(),
        salt_prefix: "bao-v1".to_string(),
    }
}

/// Session wired to inspectable collaborators
pub struct TestSession {
    pub session: Session,
    pub clock: ManualClock,
    pub storage: MemoryStorage,
}

impl TestSession {
    /// Unstarted session over `storage`
    pub fn with_storage(config: SessionConfig, storage: MemoryStorage) -> Self {
        let clock = ManualClock::new(Timestamp::from_secs(1_700_000_000), 18_000_000);
        let session = Session::new(
            config,
            schema(),
            Box::new(clock.clone()),
            Box::new(InMemoryDeployer::new(deployer_service(), operator())),
            Box::new(storage.clone()),
        )
        .unwrap();
        TestSession {
            session,
            clock,
            storage,
        }
    }

    /// Unstarted session with fresh storage
    pub fn new(config: SessionConfig) -> Self {
        Self::with_storage(config, MemoryStorage::new())
    }

    /// Started session with default config
    pub fn started() -> Self {
        let mut t = Self::new(SessionConfig::for_deployer(operator()));
        t.session.start(params(), None).unwrap();
        t
    }

    /// Last persisted document
    pub fn persisted(&self) -> String {
        self.storage.load().unwrap().unwrap()
    }
}
