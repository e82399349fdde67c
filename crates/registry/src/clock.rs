//! Time and block-height source
//!
//! Runs and registry records are stamped with both. A session takes its clock
//! at construction so tests can drive time explicitly.

use keystone_core::Timestamp;
use std::cell::Cell;
use std::rc::Rc;

/// Source of the current time and block height
pub trait Clock {
    /// Current time
    fn now(&self) -> Timestamp;

    /// Current block height
    fn block_number(&self) -> u64;
}

/// Wall clock with a fixed block height
///
/// Without a chain attached there is no block to observe; the height is
/// whatever the caller supplies.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    block: u64,
}

impl SystemClock {
    /// Wall clock at block 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Wall clock reporting a given block height
    pub fn at_block(block: u64) -> Self {
        SystemClock { block }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn block_number(&self) -> u64 {
        self.block
    }
}

/// Settable clock
///
/// Clones share state: keep one handle, give the other to the session.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    secs: Rc<Cell<u64>>,
    block: Rc<Cell<u64>>,
}

impl ManualClock {
    /// Clock stopped at `timestamp` and `block`
    pub fn new(timestamp: Timestamp, block: u64) -> Self {
        ManualClock {
            secs: Rc::new(Cell::new(timestamp.as_secs())),
            block: Rc::new(Cell::new(block)),
        }
    }

    /// Set the time
    pub fn set_time(&self, timestamp: Timestamp) {
        self.secs.set(timestamp.as_secs());
    }

    /// Set the block height
    pub fn set_block(&self, block: u64) {
        self.block.set(block);
    }

    /// Move time forward by `secs` and height by `blocks`
    pub fn advance(&self, secs: u64, blocks: u64) {
        self.secs.set(self.secs.get() + secs);
        self.block.set(self.block.get() + blocks);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_secs(self.secs.get())
    }

    fn block_number(&self) -> u64 {
        self.block.get()
    }
}
