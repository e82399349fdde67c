//! Session configuration via `keystone.toml`
//!
//! Infrastructure identities that a deployment script would otherwise assume
//! implicitly (the operator, the proxy bytecode, when to write the document)
//! are explicit values handed to `Session::new`.

use keystone_core::{Address, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "keystone.toml";

/// When the session writes its document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// After every successful mutation
    EveryMutation,
    /// Only at `finish()`
    OnFinish,
}

/// Session configuration loaded from `keystone.toml`.
///
/// # Example
///
/// ```toml
/// persist = "every-mutation"
/// chain_id = 1
/// deployer = "0x00000000000000000000000000000000000000aa"
/// transfer_ownership = true
/// proxy_creation_code = "0x6080"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// Persistence point: `"every-mutation"` or `"on-finish"`.
    #[serde(default = "default_persist_str")]
    pub persist: String,
    /// Chain id recorded in the document.
    #[serde(default)]
    pub chain_id: u64,
    /// Operator identity running the deployment (hex address).
    #[serde(default = "default_deployer_str")]
    pub deployer: String,
    /// Hand proxies to the final owner at `finish()`.
    #[serde(default = "default_transfer_ownership")]
    pub transfer_ownership: bool,
    /// Proxy creation code (hex, optional `0x` prefix).
    #[serde(default)]
    pub proxy_creation_code: String,
}

fn default_persist_str() -> String {
    "every-mutation".to_string()
}

fn default_deployer_str() -> String {
    Address::ZERO.to_string()
}

fn default_transfer_ownership() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persist: default_persist_str(),
            chain_id: 0,
            deployer: default_deployer_str(),
            transfer_ownership: default_transfer_ownership(),
            proxy_creation_code: String::new(),
        }
    }
}

impl SessionConfig {
    /// Default config operated by `deployer`
    pub fn for_deployer(deployer: Address) -> Self {
        Self {
            deployer: deployer.to_string(),
            ..Self::default()
        }
    }

    /// Parse the persistence string into a `PersistMode`.
    pub fn persist_mode(&self) -> Result<PersistMode> {
        match self.persist.as_str() {
            "every-mutation" => Ok(PersistMode::EveryMutation),
            "on-finish" => Ok(PersistMode::OnFinish),
            other => Err(Error::InvalidConfig(format!(
                "Invalid persist mode '{}'. Expected \"every-mutation\" or \"on-finish\".",
                other
            ))),
        }
    }

    /// Parse the operator address.
    pub fn deployer_address(&self) -> Result<Address> {
        Address::parse(&self.deployer).map_err(|e| {
            Error::InvalidConfig(format!("Invalid deployer '{}': {}", self.deployer, e))
        })
    }

    /// Decode the proxy creation code.
    pub fn proxy_creation_code_bytes(&self) -> Result<Vec<u8>> {
        let raw = self.proxy_creation_code.trim();
        let digits = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        hex::decode(digits).map_err(|e| {
            Error::InvalidConfig(format!("Invalid proxy_creation_code: {}", e))
        })
    }

    /// Check every field parses.
    pub fn validate(&self) -> Result<()> {
        self.persist_mode()?;
        self.deployer_address()?;
        self.proxy_creation_code_bytes()?;
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Keystone session configuration
#
# When to write the deployment document: "every-mutation" (default) or "on-finish"
persist = "every-mutation"

# Chain id recorded in the document
chain_id = 0

# Operator identity running the deployment; also the interim proxy owner
deployer = "0x0000000000000000000000000000000000000000"

# Hand proxies to the final owner when the session finishes
transfer_ownership = true

# Creation code prefixed to every proxy's init code (hex)
proxy_creation_code = ""
"#
    }

    /// Read and parse config from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: SessionConfig = toml::from_str(&content).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
