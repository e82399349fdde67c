//! Deployment sessions for keystone
//!
//! A `Session` records what a deployment script deploys and configures:
//! - typed, write-once parameters
//! - contract, library and proxy registrations with uniqueness checks
//! - deterministic deployment through a commit/reveal deployer service
//! - role values and their expected grantees
//!
//! Collaborators are passed in explicitly:
//! - `Clock` for timestamps and block heights
//! - `DeterministicDeployer` for address prediction and deployment
//! - `Storage` for the persisted document
//! - `SessionConfig` for operator identity and persistence policy
//!
//! # Example
//!
//! ```
//! use keystone_core::{Address, DataType, KeySchema, Timestamp};
//! use keystone_registry::{
//!     ContractInfo, InMemoryDeployer, ManualClock, MemoryStorage, Session, SessionConfig,
//!     StartParams,
//! };
//!
//! let operator = Address::from_low_u64(0xaa);
//! let mut schema = KeySchema::new();
//! schema.register_key("fee", DataType::Uint).unwrap();
//!
//! let mut session = Session::new(
//!     SessionConfig::for_deployer(operator),
//!     schema,
//!     Box::new(ManualClock::new(Timestamp::from_secs(1_700_000_000), 1)),
//!     Box::new(InMemoryDeployer::new(Address::from_low_u64(0xd0), operator)),
//!     Box::new(MemoryStorage::new()),
//! )
//! .unwrap();
//!
//! session
//!     .start(
//!         StartParams {
//!             owner: Address::from_low_u64(0xbb),
//!             network: "mainnet".to_string(),
//!             version: "v1".to_string(),
//!             salt_prefix: "bao".to_string(),
//!         },
//!         None,
//!     )
//!     .unwrap();
//! session.set_uint("fee", 30).unwrap();
//! let minter = session
//!     .deploy_contract("minter", b"code", 0, ContractInfo::new("Minter", "src/Minter.sol", "core"))
//!     .unwrap();
//! assert_eq!(session.address_of("minter").unwrap(), minter);
//! session.finish().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod config;
pub mod deployer;
pub mod persistence;
pub mod registry;
pub mod roles;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{PersistMode, SessionConfig, CONFIG_FILE_NAME};
pub use deployer::{
    commitment_hash, derive_salt, predict_address, DeployKind, DeterministicDeployer,
    InMemoryDeployer, Salt,
};
pub use persistence::{FileStorage, MemoryStorage, Storage};
pub use registry::{ContractInfo, CATEGORY_EXISTING, CATEGORY_PROXY};
pub use roles::RoleCheck;
pub use session::{Session, SessionStatus, StartParams};
