//! TX policy: closed-world allow-list over outbound frames.
//!
//! No frame is ever allowed by default. An outbound frame passes only when
//! some entry matches its `(address, bus)` *and* declares exactly its
//! length, so a truncated or padded frame is denied, never partially sent.

use cangate_types::Frame;
use tracing::debug;

/// One permitted outbound message shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowListEntry {
    pub address: u32,
    pub bus: u8,
    pub length: u8,
    /// Entry is additionally cross-checked by the external relay-integrity
    /// monitor. Does not change the allow/deny outcome here.
    pub check_relay: bool,
}

impl AllowListEntry {
    pub const fn new(address: u32, bus: u8, length: u8, check_relay: bool) -> Self {
        Self {
            address,
            bus,
            length,
            check_relay,
        }
    }
}

/// Fixed allow-list; order-irrelevant, duplicates tolerated as a
/// configuration smell rather than a runtime error.
#[derive(Debug, Clone, Default)]
pub struct TxPolicy {
    entries: Vec<AllowListEntry>,
}

impl TxPolicy {
    pub fn new(entries: Vec<AllowListEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[AllowListEntry] {
        &self.entries
    }

    /// Allow/deny verdict for one outbound frame. Pure: no state is read or
    /// written besides the fixed table.
    pub fn check(&self, frame: &Frame) -> bool {
        // Lengths compare as usize so an oversized payload can never alias a
        // narrower entry.
        let allowed = self.entries.iter().any(|entry| {
            entry.address == frame.address
                && entry.bus == frame.bus
                && usize::from(entry.length) == frame.len()
        });
        if !allowed {
            debug!(
                address = frame.address,
                bus = frame.bus,
                length = frame.len(),
                "tx denied: no matching allow-list entry"
            );
        }
        allowed
    }
}
