//! `cangate-vehicles` – per-vehicle gate parameterizations.
//!
//! Each vehicle contributes one [`VehicleGate`][cangate_safety::VehicleGate]
//! implementation carrying its message ids, bit offsets, allow-list,
//! liveness table, and forwarding rules. The generic decision logic lives in
//! `cangate-safety`; nothing here adds behavior, only constants.

pub mod perodua;

pub use perodua::PeroduaGate;
