//! `cangate-safety` – Gate Core
//!
//! The generic, vehicle-agnostic half of the CAN safety gate. It makes no
//! driving decisions; it derives trusted state from inbound frames and
//! gates what the external controller may send or relay.
//!
//! # Modules
//!
//! - [`signal_rules`] – [`SignalRuleSet`][signal_rules::SignalRuleSet]:
//!   table-driven extraction of named vehicle signals from `(address, bus)`
//!   keyed rules; the tables are vehicle-specific, the engine is not.
//! - [`rx`] – [`RxStateUpdater`][rx::RxStateUpdater]: applies signal updates
//!   to the single [`VehicleState`][cangate_types::VehicleState] instance
//!   under an explicit [`EngagementMode`][rx::EngagementMode].
//! - [`tx`] – [`TxPolicy`][tx::TxPolicy]: closed-world outbound allow-list;
//!   no frame is allowed by default.
//! - [`liveness`] – [`LivenessTable`][liveness::LivenessTable] and
//!   [`LivenessMonitor`][liveness::LivenessMonitor]: required periodic
//!   inbound messages and the deadline watchdog over them.
//! - [`forward`] – [`ForwardPolicy`][forward::ForwardPolicy]: per-frame
//!   inter-bus relay decisions.
//! - [`gate`] – [`Policy`][gate::Policy], [`PolicyBuilder`][gate::PolicyBuilder],
//!   the [`VehicleGate`][gate::VehicleGate] seam, and the
//!   [`SafetyGate`][gate::SafetyGate] facade exposing the RX/TX/Forward
//!   operations to the host runtime.

pub mod forward;
pub mod gate;
pub mod liveness;
pub mod rx;
pub mod signal_rules;
pub mod tx;

pub use forward::ForwardPolicy;
pub use gate::{Policy, PolicyBuilder, SafetyGate, VehicleGate};
pub use liveness::{LivenessEntry, LivenessMonitor, LivenessTable};
pub use rx::{EngagementMode, RxStateUpdater};
pub use signal_rules::{SignalKind, SignalRule, SignalRuleSet, SignalSource, SignalUpdate};
pub use tx::{AllowListEntry, TxPolicy};
