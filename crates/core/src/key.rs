//! Dot-path key validation
//!
//! Keys are hierarchical identifiers such as `contracts.minter.feeReceiver`.
//!
//! ## Contract
//!
//! - Keys must not be empty
//! - Segments are separated by `.` and no segment may be empty
//! - Segments are opaque and case-sensitive

use crate::error::{Error, Result};

/// Segment separator
pub const SEPARATOR: char = '.';

/// Validate a dot-path key
///
/// # Examples
///
/// ```
/// use keystone_core::key::validate_key;
///
/// assert!(validate_key("contracts.minter").is_ok());
/// assert!(validate_key("").is_err());
/// assert!(validate_key("contracts..minter").is_err());
/// assert!(validate_key(".minter").is_err());
/// ```
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::KeyRequired);
    }
    if key.split(SEPARATOR).any(str::is_empty) {
        return Err(Error::InvalidKey {
            key: key.to_string(),
            reason: "empty segment",
        });
    }
    Ok(())
}

/// Join a parent key and a child segment path
pub fn join(parent: &str, child: &str) -> String {
    format!("{}{}{}", parent, SEPARATOR, child)
}

/// Parent key, if the key has more than one segment
pub fn parent(key: &str) -> Option<&str> {
    key.rfind(SEPARATOR).map(|i| &key[..i])
}

/// Iterate over the strict ancestors of a key, nearest first
pub fn ancestors(key: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(parent(key), |k| parent(*k))
}

/// Check whether `key` lies strictly under `prefix`
pub fn is_descendant(key: &str, prefix: &str) -> bool {
    key.len() > prefix.len()
        && key.starts_with(prefix)
        && key[prefix.len()..].starts_with(SEPARATOR)
}

/// Build a proxy id: the key's segments joined with `::`
pub fn to_compound_id(key: &str) -> String {
    key.split(SEPARATOR).collect::<Vec<_>>().join("::")
}
