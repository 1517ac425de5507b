//! Table-driven signal extraction: vehicle-specific `(address, bus)` rules
//! mapped onto named [`VehicleState`][cangate_types::VehicleState] signals.
//!
//! The table is fixed at policy-build time; the engine iterating it is
//! generic. A frame that matches no rule yields no updates — that is the
//! normal case for most bus traffic, not an error.

use cangate_types::{ByteOrder, Frame};

/// The named vehicle-state signals a rule can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    BrakePressed,
    GasPressed,
    CruiseMainOn,
    /// Cruise engagement inferred from a nonzero command field.
    CruiseEngaged,
    VehicleMoving,
}

/// Where in the payload a rule reads its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    /// A single payload bit; `invert` handles active-low signals
    /// ("pressed when 0").
    Bit { offset: u32, invert: bool },
    /// An unsigned multi-byte field read in `order`; fires `true` only when
    /// the field is nonzero. A zero field means "no command" and produces no
    /// update at all.
    ///
    /// Known weakness: any nonzero value counts, with no validation against
    /// spoofed or noise values. The correct threshold is vehicle-protocol
    /// knowledge that is not modeled here.
    NonZeroUint {
        offset: usize,
        len: usize,
        order: ByteOrder,
    },
}

/// One extraction rule, keyed by `(address, bus)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalRule {
    pub address: u32,
    pub bus: u8,
    pub kind: SignalKind,
    pub source: SignalSource,
}

/// A signal value produced by a matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalUpdate {
    pub kind: SignalKind,
    pub value: bool,
}

impl SignalRule {
    /// Evaluate this rule against `frame`, or `None` when the rule does not
    /// apply (wrong address/bus, zero command field, truncated payload).
    fn extract(&self, frame: &Frame) -> Option<SignalUpdate> {
        if frame.address != self.address || frame.bus != self.bus {
            return None;
        }
        let value = match self.source {
            SignalSource::Bit { offset, invert } => frame.bit(offset) ^ invert,
            SignalSource::NonZeroUint { offset, len, order } => {
                let v = frame.uint(order, offset, len)?;
                if v == 0 {
                    return None;
                }
                true
            }
        };
        Some(SignalUpdate {
            kind: self.kind,
            value,
        })
    }
}

/// Immutable rule table plus the generic matching engine.
#[derive(Debug, Clone, Default)]
pub struct SignalRuleSet {
    rules: Vec<SignalRule>,
}

impl SignalRuleSet {
    pub fn new(rules: Vec<SignalRule>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All updates produced by `frame`, in rule order. Later rules for the
    /// same signal win when applied in order (last write wins).
    pub fn updates_for(&self, frame: &Frame) -> Vec<SignalUpdate> {
        self.rules
            .iter()
            .filter_map(|rule| rule.extract(frame))
            .collect()
    }
}
