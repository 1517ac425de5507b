//! [`SafetyGate`] – single interception point between the external
//! controller and the vehicle's CAN buses.
//!
//! A gate owns one immutable [`Policy`] and the single [`VehicleState`]
//! instance, and exposes the three per-frame operations:
//!
//! 1. **RX** ([`SafetyGate::rx`]): updates the trusted vehicle state from an
//!    inbound frame through the policy's signal rules. Never fails.
//! 2. **TX** ([`SafetyGate::tx`]): allow/deny verdict for an outbound frame
//!    against the closed-world allow-list. Pure, default deny.
//! 3. **Forward** ([`SafetyGate::forward`]): relay decision for an inbound
//!    frame, or `None` when the vehicle has no forwarding hook at all.
//!
//! Policies are produced by [`PolicyBuilder`], which rejects malformed
//! configurations (empty allow-list, zero-length entries, silently empty
//! liveness table) at build time so the gate can never run with one.
//!
//! # Example
//!
//! ```
//! use cangate_safety::{
//!     AllowListEntry, EngagementMode, LivenessEntry, LivenessTable,
//!     PolicyBuilder, SafetyGate, SignalKind, SignalRule, SignalRuleSet,
//!     SignalSource, TxPolicy,
//! };
//! use cangate_types::{Frame, MAIN_BUS};
//!
//! let rules = SignalRuleSet::new(vec![SignalRule {
//!     address: 161,
//!     bus: MAIN_BUS,
//!     kind: SignalKind::BrakePressed,
//!     source: SignalSource::Bit { offset: 5, invert: false },
//! }]);
//!
//! let policy = PolicyBuilder::new(rules, EngagementMode::Strict)
//!     .allow_list(TxPolicy::new(vec![AllowListEntry::new(464, MAIN_BUS, 8, true)]))
//!     .liveness(LivenessTable::new(vec![LivenessEntry::unchecked(161, MAIN_BUS, 8, 100)]))
//!     .build()
//!     .unwrap();
//!
//! let mut gate = SafetyGate::new(policy);
//! gate.rx(&Frame::new(MAIN_BUS, 161, vec![0x20, 0, 0, 0, 0, 0, 0, 0]));
//! assert!(gate.state().brake_pressed);
//!
//! assert!(gate.tx(&Frame::new(MAIN_BUS, 464, vec![0; 8])));
//! assert!(!gate.tx(&Frame::new(MAIN_BUS, 999, vec![0; 8])));
//! ```

use cangate_types::{ForwardDecision, Frame, GateError, VehicleState};
use tracing::info;

use crate::forward::ForwardPolicy;
use crate::liveness::LivenessTable;
use crate::rx::{EngagementMode, RxStateUpdater};
use crate::signal_rules::SignalRuleSet;
use crate::tx::TxPolicy;

/// The complete, immutable rule set for one vehicle session.
#[derive(Debug, Clone)]
pub struct Policy {
    rx: RxStateUpdater,
    allow_list: TxPolicy,
    liveness: LivenessTable,
    forward: Option<ForwardPolicy>,
}

impl Policy {
    pub fn allow_list(&self) -> &TxPolicy {
        &self.allow_list
    }

    pub fn liveness(&self) -> &LivenessTable {
        &self.liveness
    }

    pub fn engagement_mode(&self) -> EngagementMode {
        self.rx.mode()
    }

    pub fn has_forwarding(&self) -> bool {
        self.forward.is_some()
    }
}

/// Validating constructor for [`Policy`].
///
/// Build fails on configurations that can only be defects: an
/// outbound-capable gate with nothing it may transmit, an entry that allows
/// zero-length sends, or a liveness table left empty without saying so.
pub struct PolicyBuilder {
    rules: SignalRuleSet,
    mode: EngagementMode,
    allow_list: TxPolicy,
    liveness: LivenessTable,
    forward: Option<ForwardPolicy>,
    empty_liveness_allowed: bool,
}

impl PolicyBuilder {
    pub fn new(rules: SignalRuleSet, mode: EngagementMode) -> Self {
        Self {
            rules,
            mode,
            allow_list: TxPolicy::default(),
            liveness: LivenessTable::default(),
            forward: None,
            empty_liveness_allowed: false,
        }
    }

    pub fn allow_list(mut self, allow_list: TxPolicy) -> Self {
        self.allow_list = allow_list;
        self
    }

    pub fn liveness(mut self, liveness: LivenessTable) -> Self {
        self.liveness = liveness;
        self
    }

    /// Declare that this vehicle intentionally has no liveness checks.
    /// Without this call an empty table fails the build.
    pub fn allow_empty_liveness(mut self) -> Self {
        self.empty_liveness_allowed = true;
        self
    }

    pub fn forward(mut self, forward: ForwardPolicy) -> Self {
        self.forward = Some(forward);
        self
    }

    /// Validate and produce the immutable [`Policy`].
    ///
    /// # Errors
    ///
    /// - [`GateError::EmptyAllowList`] – no outbound message is permitted.
    /// - [`GateError::ZeroLengthEntry`] – an entry declares length 0.
    /// - [`GateError::EmptyLivenessTable`] – the table is empty and
    ///   [`allow_empty_liveness`][Self::allow_empty_liveness] was not called.
    pub fn build(self) -> Result<Policy, GateError> {
        if self.allow_list.is_empty() {
            return Err(GateError::EmptyAllowList);
        }
        if let Some(entry) = self.allow_list.entries().iter().find(|e| e.length == 0) {
            return Err(GateError::ZeroLengthEntry {
                address: entry.address,
                bus: entry.bus,
            });
        }
        if self.liveness.is_empty() && !self.empty_liveness_allowed {
            return Err(GateError::EmptyLivenessTable);
        }

        Ok(Policy {
            rx: RxStateUpdater::new(self.rules, self.mode),
            allow_list: self.allow_list,
            liveness: self.liveness,
            forward: self.forward,
        })
    }
}

/// A vehicle-specific gate definition. One concrete implementation exists
/// per supported vehicle and is selected at configuration time; the host
/// never branches on vehicle identity anywhere else.
pub trait VehicleGate: Send + Sync {
    /// Stable vehicle identifier, e.g. `"perodua-myvi-psd"`.
    fn name(&self) -> &str;

    /// Build this vehicle's immutable [`Policy`]. `param` is reserved for
    /// vehicle-specific variants and may be ignored.
    ///
    /// # Errors
    ///
    /// Any [`GateError`] configuration failure from [`PolicyBuilder::build`];
    /// the gate must not run in that case.
    fn init(&self, param: u16) -> Result<Policy, GateError>;
}

/// Live gate instance: one [`Policy`] plus the single [`VehicleState`].
///
/// Single-writer discipline: only [`rx`][Self::rx] mutates the state, and
/// the host must deliver frames strictly one at a time. None of the
/// operations block, sleep, or perform I/O.
pub struct SafetyGate {
    policy: Policy,
    state: VehicleState,
}

impl SafetyGate {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            state: VehicleState::default(),
        }
    }

    /// Build a gate for `vehicle` by running its [`VehicleGate::init`].
    pub fn for_vehicle(vehicle: &dyn VehicleGate, param: u16) -> Result<Self, GateError> {
        let policy = vehicle.init(param)?;
        info!(
            vehicle = vehicle.name(),
            mode = ?policy.engagement_mode(),
            "safety gate initialized"
        );
        Ok(Self::new(policy))
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Current trusted vehicle state. Read-only outside [`rx`][Self::rx].
    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Process one inbound frame, overwriting any state fields its signals
    /// carry. Unrecognized frames are silently ignored.
    pub fn rx(&mut self, frame: &Frame) {
        self.policy.rx.apply(&mut self.state, frame);
    }

    /// Allow/deny verdict for one outbound frame. Never mutates state.
    pub fn tx(&self, frame: &Frame) -> bool {
        self.policy.allow_list.check(frame)
    }

    /// Relay decision for an inbound frame, or `None` when this vehicle has
    /// no forwarding hook (distinct from `Some(Block)`).
    pub fn forward(&self, bus: u8, address: u32) -> Option<ForwardDecision> {
        self.policy
            .forward
            .as_ref()
            .map(|policy| policy.decide(bus, address))
    }
}
