use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Main powertrain/OBD vehicle bus.
pub const MAIN_BUS: u8 = 0;
/// Secondary / diagnostic-mux bus.
pub const OBD_BUS: u8 = 1;
/// Camera / ADAS bus.
pub const CAMERA_BUS: u8 = 2;

/// One CAN message as seen by the gate: source bus, numeric address, payload.
///
/// Frames are read-only inputs; the gate never constructs or rewrites them.
/// The accessor methods implement the bit/byte extraction contract the
/// signal rules rely on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub bus: u8,
    pub address: u32,
    pub data: Vec<u8>,
}

/// Byte order for multi-byte integer fields in a frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Most-significant byte first (the default for signal rules).
    Big,
    /// Least-significant byte first.
    Little,
}

impl Frame {
    pub fn new(bus: u8, address: u32, data: Vec<u8>) -> Self {
        Self { bus, address, data }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read payload bit `n` (byte `n / 8`, bit `n % 8`, LSB-first within a
    /// byte). Bits beyond the payload read as `false`.
    pub fn bit(&self, n: u32) -> bool {
        self.data
            .get((n / 8) as usize)
            .map(|byte| (byte >> (n % 8)) & 1 == 1)
            .unwrap_or(false)
    }

    /// Read `len` bytes starting at `offset` as an unsigned integer in the
    /// given byte order.
    ///
    /// Returns `None` when the range runs past the payload (or `len` exceeds
    /// eight bytes), so a truncated frame produces no value rather than a
    /// zero-padded one.
    pub fn uint(&self, order: ByteOrder, offset: usize, len: usize) -> Option<u64> {
        if len == 0 || len > 8 {
            return None;
        }
        let bytes = self.data.get(offset..offset + len)?;
        let mut value = 0u64;
        match order {
            ByteOrder::Big => {
                for b in bytes {
                    value = (value << 8) | u64::from(*b);
                }
            }
            ByteOrder::Little => {
                for b in bytes.iter().rev() {
                    value = (value << 8) | u64::from(*b);
                }
            }
        }
        Some(value)
    }
}

/// Trusted vehicle state derived from inbound frames.
///
/// A single instance lives for the whole gate session. Only the RX state
/// updater writes to it, one frame at a time; every field is overwritten
/// whole when a frame carrying its signal arrives (last write wins).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleState {
    pub brake_pressed: bool,
    pub gas_pressed: bool,
    pub cruise_main_on: bool,
    /// Whether the external controller may actuate. Must only become true as
    /// a direct consequence of a recognized cruise-engagement signal (or the
    /// explicitly chosen permissive mode).
    pub controls_allowed: bool,
    pub vehicle_moving: bool,
}

/// Relay verdict for one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwardDecision {
    /// Relay the frame onto the given bus.
    Forward(u8),
    /// Drop the frame; it must not reach the other side.
    Block,
    /// Not relayed; leave the frame to whatever default the host has.
    Unchanged,
}

/// Gate error taxonomy. Configuration errors are hard failures at policy
/// build time; frame-level anomalies are never errors (RX ignores, TX
/// denies).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateError {
    #[error("policy allow-list is empty; the gate could never transmit")]
    EmptyAllowList,

    #[error("allow-list entry {address} on bus {bus} declares length 0")]
    ZeroLengthEntry { address: u32, bus: u8 },

    #[error("liveness table is empty; call allow_empty_liveness() if intended")]
    EmptyLivenessTable,

    #[error("replay log error: {0}")]
    Replay(String),
}

/// Audit record emitted by the host loop for gate decisions worth keeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. "cangate-cli::replay"
    pub source: String,
    pub payload: GateEventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GateEventPayload {
    /// An outbound frame was denied by the allow-list.
    TxBlocked {
        address: u32,
        bus: u8,
        length: usize,
    },
    /// A required periodic message missed its deadline.
    LivenessStale { address: u32, bus: u8 },
    /// The derived vehicle state changed after an RX frame.
    StateChanged { state: VehicleState },
}

impl GateEvent {
    pub fn now(source: &str, payload: GateEventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.to_string(),
            payload,
        }
    }
}
