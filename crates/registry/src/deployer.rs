//! Deterministic deployment
//!
//! Addresses are fixed before deployment: the salt is derived from the salt
//! prefix and the key, the deployer service predicts the address from the
//! salt alone, and a commit/reveal exchange performs the deployment.
//!
//! ## Protocol
//!
//! 1. `predict(salt)` yields the address
//! 2. `commit(commitment_hash(caller, value, salt, init_code))`
//! 3. `reveal(init_code, salt, value)` deploys and returns the address
//!
//! A reveal returning anything other than the predicted address is a protocol
//! violation; the session refuses further mutation afterwards.

use keystone_core::{Address, Error, Result};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// 32-byte hash output
pub type Hash = [u8; 32];

/// Kind of deployed unit, mixed into its salt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeployKind {
    /// Plain contract
    Contract,
    /// Upgradeable proxy
    Proxy,
    /// Library
    Library,
}

impl DeployKind {
    /// Salt component
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployKind::Contract => "contract",
            DeployKind::Proxy => "proxy",
            DeployKind::Library => "library",
        }
    }
}

/// Deterministic deployment salt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Salt(Hash);

impl Salt {
    /// Wrap raw bytes
    pub const fn new(bytes: Hash) -> Self {
        Salt(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Salt for `key`: SHA-256 of `prefix/key/kind`
pub fn derive_salt(prefix: &str, key: &str, kind: DeployKind) -> Salt {
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(b"/");
    hasher.update(key.as_bytes());
    hasher.update(b"/");
    hasher.update(kind.as_str().as_bytes());
    Salt(hasher.finalize().into())
}

/// Commitment over a pending reveal
///
/// SHA-256 of caller, value as a 32-byte big-endian word, salt and the
/// SHA-256 of the init code.
pub fn commitment_hash(caller: &Address, value: u64, salt: &Salt, init_code: &[u8]) -> Hash {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());

    let mut hasher = Sha256::new();
    hasher.update(caller.as_bytes());
    hasher.update(word);
    hasher.update(salt.as_bytes());
    hasher.update(Sha256::digest(init_code));
    hasher.finalize().into()
}

/// Predicted address: last 20 bytes of SHA-256(0xff ‖ service ‖ salt)
///
/// The init code does not participate, so the address is known before the
/// code is.
pub fn predict_address(service: &Address, salt: &Salt) -> Address {
    let mut hasher = Sha256::new();
    hasher.update([0xffu8]);
    hasher.update(service.as_bytes());
    hasher.update(salt.as_bytes());
    let digest: Hash = hasher.finalize().into();

    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    Address::new(out)
}

/// Deterministic deployer service
pub trait DeterministicDeployer {
    /// Address of the service itself
    fn address(&self) -> Address;

    /// Address a reveal with `salt` will deploy to
    fn predict(&self, salt: &Salt) -> Address;

    /// Check whether code already lives at `address`
    fn is_deployed(&self, address: &Address) -> bool;

    /// Record a commitment from `caller`
    fn commit(&mut self, caller: Address, commitment: Hash) -> Result<()>;

    /// Deploy `init_code` under `salt`, consuming the matching commitment
    fn reveal(&mut self, caller: Address, init_code: &[u8], salt: &Salt, value: u64)
        -> Result<Address>;
}

/// In-process deployer gated to one operator
#[derive(Debug, Clone)]
pub struct InMemoryDeployer {
    address: Address,
    operator: Address,
    commitments: HashSet<Hash>,
    used_salts: HashSet<Salt>,
    deployed: BTreeMap<Address, Vec<u8>>,
}

impl InMemoryDeployer {
    /// Service at `address` accepting calls from `operator`
    pub fn new(address: Address, operator: Address) -> Self {
        InMemoryDeployer {
            address,
            operator,
            commitments: HashSet::new(),
            used_salts: HashSet::new(),
            deployed: BTreeMap::new(),
        }
    }

    /// Operator identity
    pub fn operator(&self) -> Address {
        self.operator
    }

    /// Init code deployed at `address`
    pub fn code_at(&self, address: &Address) -> Option<&[u8]> {
        self.deployed.get(address).map(Vec::as_slice)
    }

    /// Number of completed deployments
    pub fn deployment_count(&self) -> usize {
        self.deployed.len()
    }

    /// Number of commitments awaiting a reveal
    pub fn pending_commitments(&self) -> usize {
        self.commitments.len()
    }

    fn authorize(&self, caller: Address) -> Result<()> {
        if caller != self.operator {
            return Err(Error::DeployerUnauthorized(caller));
        }
        Ok(())
    }
}

impl DeterministicDeployer for InMemoryDeployer {
    fn address(&self) -> Address {
        self.address
    }

    fn predict(&self, salt: &Salt) -> Address {
        predict_address(&self.address, salt)
    }

    fn is_deployed(&self, address: &Address) -> bool {
        self.deployed.contains_key(address)
    }

    fn commit(&mut self, caller: Address, commitment: Hash) -> Result<()> {
        self.authorize(caller)?;
        self.commitments.insert(commitment);
        Ok(())
    }

    fn reveal(
        &mut self,
        caller: Address,
        init_code: &[u8],
        salt: &Salt,
        value: u64,
    ) -> Result<Address> {
        self.authorize(caller)?;
        let commitment = commitment_hash(&caller, value, salt, init_code);
        if !self.commitments.contains(&commitment) {
            return Err(Error::UnknownCommitment(format!("0x{}", hex::encode(commitment))));
        }
        if self.used_salts.contains(salt) {
            return Err(Error::SaltAlreadyUsed(salt.to_string()));
        }
        self.commitments.remove(&commitment);
        self.used_salts.insert(*salt);

        let address = self.predict(salt);
        self.deployed.insert(address, init_code.to_vec());
        Ok(address)
    }
}
