//! Role and grantee bookkeeping
//!
//! Roles live under `<contract>.roles.<ROLE>` with a `value` bit and an
//! ordered `grantees` list. Only roles registered in the schema for the
//! contract exist.
//!
//! Setting a role again with the same value is a no-op; a different value
//! fails, catching drift between deployment phases. Comparing expected roles
//! against an observed bitmap never fails: the comparison runs after
//! irreversible on-chain effects, so mismatches are reported, not raised.

use crate::session::Session;
use keystone_core::schema::{role_grantees_key, role_value_key};
use keystone_core::{Error, Result};
use tracing::{debug, info, warn};

/// Outcome of comparing expected roles with an observed bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleCheck {
    /// Bitwise OR of the roles recorded for the grantee
    pub expected: u64,
    /// Bitmap observed on chain
    pub actual: u64,
}

impl RoleCheck {
    /// Check for an exact match
    pub fn is_match(&self) -> bool {
        self.expected == self.actual
    }

    /// Bits expected but not observed
    pub fn missing(&self) -> u64 {
        self.expected & !self.actual
    }

    /// Bits observed but not expected
    pub fn unexpected(&self) -> u64 {
        self.actual & !self.expected
    }
}

impl Session {
    /// Set a role's bit value
    pub fn set_role(&mut self, contract: &str, role: &str, value: u64) -> Result<()> {
        self.ensure_mutable()?;
        let path = role_value_key(contract, role);
        self.doc.store.schema().lookup(&path)?;

        if self.doc.store.has_value(&path) {
            let old = self.doc.store.get_uint(&path)?;
            if old == value {
                debug!(target: "keystone::roles", path = %path, value, "Role already set");
                return Ok(());
            }
            return Err(Error::RoleValueMismatch {
                path,
                old,
                new: value,
            });
        }

        self.transact(|s| {
            s.doc.store.set_uint(&path, value)?;
            info!(target: "keystone::roles", contract, role, value, "Role set");
            s.after_mutation()
        })
    }

    /// Record `grantee` as an expected holder of a role
    ///
    /// The role's value must already be set.
    pub fn set_grantee(&mut self, grantee: &str, contract: &str, role: &str) -> Result<()> {
        self.ensure_mutable()?;
        let value_path = role_value_key(contract, role);
        self.doc.store.get_uint(&value_path)?;

        let path = role_grantees_key(contract, role);
        let mut grantees = self.grantees_of(contract, role)?.to_vec();
        if grantees.iter().any(|g| g == grantee) {
            return Err(Error::DuplicateGrantee {
                grantee: grantee.to_string(),
                path,
            });
        }
        grantees.push(grantee.to_string());

        self.transact(|s| {
            s.doc.store.set_string_array(&path, &grantees)?;
            info!(target: "keystone::roles", grantee, contract, role, "Grantee recorded");
            s.after_mutation()
        })
    }

    /// Bitwise OR of every role value granted to `grantee` on `contract`
    pub fn compute_expected_roles(&self, contract: &str, grantee: &str) -> u64 {
        let store = &self.doc.store;
        self.roles_of(contract)
            .iter()
            .filter(|role| {
                store
                    .get_string_array(&role_grantees_key(contract, role))
                    .map_or(false, |gs| gs.iter().any(|g| g == grantee))
            })
            .filter_map(|role| store.get_uint(&role_value_key(contract, role)).ok())
            .fold(0, |acc, bit| acc | bit)
    }

    /// Compare recorded roles with a bitmap observed on chain
    ///
    /// Mismatches are logged and returned, never raised.
    pub fn expect_roles_of(&self, contract: &str, grantee: &str, actual: u64) -> RoleCheck {
        let check = RoleCheck {
            expected: self.compute_expected_roles(contract, grantee),
            actual,
        };
        if !check.is_match() {
            warn!(
                target: "keystone::roles",
                contract,
                grantee,
                expected = check.expected,
                actual = check.actual,
                missing = check.missing(),
                unexpected = check.unexpected(),
                "Role bitmap mismatch"
            );
        }
        check
    }

    /// Resolve a role to its value
    ///
    /// Accepts a numeric literal (decimal or `0x` hex) or a role name
    /// registered for `contract`.
    pub fn role_value_of(&self, contract: &str, role: &str) -> Result<u64> {
        if let Some(digits) = role.strip_prefix("0x").or_else(|| role.strip_prefix("0X")) {
            if let Ok(value) = u64::from_str_radix(digits, 16) {
                return Ok(value);
            }
        } else if let Ok(value) = role.parse::<u64>() {
            return Ok(value);
        }
        self.doc.store.get_uint(&role_value_key(contract, role))
    }

    /// Role names registered for `contract`
    pub fn roles_of(&self, contract: &str) -> &[String] {
        self.doc.store.schema().roles_of(contract)
    }

    /// Grantees recorded for a role, in registration order
    ///
    /// Empty while none are recorded; fails if the role is not registered.
    pub fn grantees_of(&self, contract: &str, role: &str) -> Result<&[String]> {
        match self.doc.store.get_string_array(&role_grantees_key(contract, role)) {
            Ok(grantees) => Ok(grantees),
            Err(Error::ValueNotSet(_)) => Ok(&[]),
            Err(e) => Err(e),
        }
    }
}
