//! Second-precision timestamp type
//!
//! Deployment records, runs and the document header are stamped in whole
//! seconds since the Unix epoch. The ISO-8601 text form lives in the codec.
//!
//! ```
//! use keystone_core::Timestamp;
//!
//! let ts = Timestamp::from_secs(1_700_000_000);
//! assert_eq!(ts.as_secs(), 1_700_000_000);
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since Unix epoch
///
/// ## Invariants
///
/// - Timestamps are always non-negative (u64)
/// - The zero timestamp represents "unset" in run finish fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Create a timestamp for the current moment
    ///
    /// Returns epoch (0) if the system clock is before the Unix epoch.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_secs())
    }

    /// Create a timestamp from seconds since epoch
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs)
    }

    /// Get seconds since Unix epoch
    #[inline]
    pub const fn as_secs(&self) -> u64 {
        self.0
    }

    /// Check for the epoch / unset value
    #[inline]
    pub const fn is_epoch(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(secs: u64) -> Self {
        Timestamp(secs)
    }
}

impl From<Timestamp> for u64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
