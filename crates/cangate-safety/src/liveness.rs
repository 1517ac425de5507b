//! RX liveness: a declarative table of required periodic messages, plus a
//! deadline monitor over it.
//!
//! Each [`LivenessEntry`] asserts "a frame at this address/bus must arrive
//! at least once per `max_period_ms`". The table itself is data; the
//! [`LivenessMonitor`] tracks arrival timestamps and reports the entries
//! whose deadline has lapsed so a supervisor can declare the policy
//! degraded.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use cangate_types::Frame;
use tracing::warn;

/// One required periodic inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessEntry {
    pub address: u32,
    pub bus: u8,
    pub length: u8,
    pub max_period_ms: u32,
    /// The `ignore_*` flags suppress content validation for frames whose
    /// vehicle-specific integrity scheme is not modeled; the frame is still
    /// required to arrive.
    pub ignore_checksum: bool,
    pub ignore_counter: bool,
    pub ignore_quality_flag: bool,
}

impl LivenessEntry {
    /// Entry with all integrity checks suppressed, the common case for
    /// vehicles whose checksum/counter scheme is unknown.
    pub const fn unchecked(address: u32, bus: u8, length: u8, max_period_ms: u32) -> Self {
        Self {
            address,
            bus,
            length,
            max_period_ms,
            ignore_checksum: true,
            ignore_counter: true,
            ignore_quality_flag: true,
        }
    }
}

/// The fixed liveness table owned by a policy.
#[derive(Debug, Clone, Default)]
pub struct LivenessTable {
    entries: Vec<LivenessEntry>,
}

impl LivenessTable {
    pub fn new(entries: Vec<LivenessEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LivenessEntry] {
        &self.entries
    }
}

struct DeadlineSlot {
    last_seen: Instant,
    period: Duration,
}

/// Tracks arrival times for each liveness entry and flags the stale ones.
///
/// Deadlines start counting at monitor construction, so a vehicle that never
/// sends a required message turns stale after one period rather than never.
pub struct LivenessMonitor {
    slots: HashMap<(u32, u8), DeadlineSlot>,
}

impl LivenessMonitor {
    pub fn new(table: &LivenessTable) -> Self {
        let now = Instant::now();
        let slots = table
            .entries()
            .iter()
            .map(|entry| {
                (
                    (entry.address, entry.bus),
                    DeadlineSlot {
                        last_seen: now,
                        period: Duration::from_millis(u64::from(entry.max_period_ms)),
                    },
                )
            })
            .collect();
        Self { slots }
    }

    /// Record an inbound frame. No-ops for frames outside the table.
    pub fn observe(&mut self, frame: &Frame) {
        if let Some(slot) = self.slots.get_mut(&(frame.address, frame.bus)) {
            slot.last_seen = Instant::now();
        }
    }

    /// `(address, bus)` pairs whose deadline has been exceeded. Order is
    /// unspecified.
    pub fn stale(&self) -> Vec<(u32, u8)> {
        let lapsed: Vec<(u32, u8)> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.last_seen.elapsed() > slot.period)
            .map(|(key, _)| *key)
            .collect();
        for (address, bus) in &lapsed {
            warn!(address, bus, "required periodic message is stale");
        }
        lapsed
    }

    /// The policy-is-healthy predicate: every required message is current.
    pub fn healthy(&self) -> bool {
        self.slots
            .values()
            .all(|slot| slot.last_seen.elapsed() <= slot.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cangate_types::{CAMERA_BUS, MAIN_BUS};
    use std::thread;

    fn table() -> LivenessTable {
        LivenessTable::new(vec![
            LivenessEntry::unchecked(608, MAIN_BUS, 8, 20),
            LivenessEntry::unchecked(627, CAMERA_BUS, 8, 60_000),
        ])
    }

    #[test]
    fn fresh_monitor_is_healthy() {
        let monitor = LivenessMonitor::new(&table());
        assert!(monitor.healthy());
        assert!(monitor.stale().is_empty());
    }

    #[test]
    fn silent_entry_turns_stale() {
        let monitor = LivenessMonitor::new(&table());
        thread::sleep(Duration::from_millis(30));
        let stale = monitor.stale();
        assert_eq!(stale, vec![(608, MAIN_BUS)]);
        assert!(!monitor.healthy());
    }

    #[test]
    fn observe_resets_deadline() {
        let mut monitor = LivenessMonitor::new(&table());
        thread::sleep(Duration::from_millis(12));
        monitor.observe(&Frame::new(MAIN_BUS, 608, vec![0; 8]));
        thread::sleep(Duration::from_millis(12));
        // Refreshed within its 20 ms window.
        assert!(monitor.healthy());
    }

    #[test]
    fn observe_ignores_untracked_frames() {
        let mut monitor = LivenessMonitor::new(&table());
        monitor.observe(&Frame::new(MAIN_BUS, 999, vec![0; 8]));
        thread::sleep(Duration::from_millis(30));
        assert!(!monitor.healthy());
    }

    #[test]
    fn observe_keys_on_address_and_bus() {
        let mut monitor = LivenessMonitor::new(&table());
        // 608 on the wrong bus must not refresh 608 on bus 0.
        monitor.observe(&Frame::new(CAMERA_BUS, 608, vec![0; 8]));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(monitor.stale(), vec![(608, MAIN_BUS)]);
    }

    #[test]
    fn empty_table_monitor_is_vacuously_healthy() {
        let monitor = LivenessMonitor::new(&LivenessTable::default());
        assert!(monitor.healthy());
        assert!(monitor.stale().is_empty());
    }

    #[test]
    fn unchecked_entry_sets_all_ignore_flags() {
        let entry = LivenessEntry::unchecked(608, MAIN_BUS, 8, 50);
        assert!(entry.ignore_checksum);
        assert!(entry.ignore_counter);
        assert!(entry.ignore_quality_flag);
    }
}
