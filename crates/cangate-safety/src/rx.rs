//! RX state updater: feeds each inbound frame through the signal rules and
//! overwrites the corresponding [`VehicleState`] fields.
//!
//! Side effects are confined to the `VehicleState` passed in; the updater
//! never blocks and never returns an error — an unrecognized frame is simply
//! ignored. The host must deliver frames one at a time (single-writer
//! discipline); the updater itself takes no locks.

use cangate_types::{Frame, VehicleState};
use tracing::trace;

use crate::signal_rules::{SignalKind, SignalRuleSet};

/// How `controls_allowed` / `vehicle_moving` are derived.
///
/// There is deliberately no `Default` impl: the mode is a reviewed,
/// per-vehicle policy choice and must be stated explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementMode {
    /// Only fields backed by a recognized signal are ever set.
    /// `controls_allowed` and `vehicle_moving` stay false until real
    /// evidence (engagement command, motion) is observed.
    Strict,
    /// `vehicle_moving` and `controls_allowed` are forced true on every RX
    /// call, regardless of observed signals. Only for vehicles with no
    /// reliable standstill/engagement signal.
    Permissive,
}

/// Applies signal rules to the single vehicle-state instance.
#[derive(Debug, Clone)]
pub struct RxStateUpdater {
    rules: SignalRuleSet,
    mode: EngagementMode,
}

impl RxStateUpdater {
    pub fn new(rules: SignalRuleSet, mode: EngagementMode) -> Self {
        Self { rules, mode }
    }

    pub fn mode(&self) -> EngagementMode {
        self.mode
    }

    /// Process one inbound frame. Each matched signal overwrites its field
    /// whole; unmatched frames leave the state untouched (strict mode).
    pub fn apply(&self, state: &mut VehicleState, frame: &Frame) {
        for update in self.rules.updates_for(frame) {
            match update.kind {
                SignalKind::BrakePressed => state.brake_pressed = update.value,
                SignalKind::GasPressed => state.gas_pressed = update.value,
                SignalKind::CruiseMainOn => state.cruise_main_on = update.value,
                SignalKind::CruiseEngaged => {
                    if update.value {
                        trace!(address = frame.address, bus = frame.bus, "cruise engagement observed");
                        state.controls_allowed = true;
                    }
                }
                SignalKind::VehicleMoving => state.vehicle_moving = update.value,
            }
        }

        if self.mode == EngagementMode::Permissive {
            state.vehicle_moving = true;
            state.controls_allowed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_rules::{SignalRule, SignalSource};
    use cangate_types::{ByteOrder, CAMERA_BUS, MAIN_BUS};

    fn test_rules() -> SignalRuleSet {
        SignalRuleSet::new(vec![
            SignalRule {
                address: 161,
                bus: MAIN_BUS,
                kind: SignalKind::BrakePressed,
                source: SignalSource::Bit {
                    offset: 5,
                    invert: false,
                },
            },
            SignalRule {
                address: 627,
                bus: CAMERA_BUS,
                kind: SignalKind::CruiseEngaged,
                source: SignalSource::NonZeroUint {
                    offset: 2,
                    len: 2,
                    order: ByteOrder::Big,
                },
            },
        ])
    }

    #[test]
    fn brake_bit_sets_and_clears_state() {
        let updater = RxStateUpdater::new(test_rules(), EngagementMode::Strict);
        let mut state = VehicleState::default();

        updater.apply(
            &mut state,
            &Frame::new(MAIN_BUS, 161, vec![0x20, 0, 0, 0, 0, 0, 0, 0]),
        );
        assert!(state.brake_pressed);

        updater.apply(&mut state, &Frame::new(MAIN_BUS, 161, vec![0; 8]));
        assert!(!state.brake_pressed);
    }

    #[test]
    fn last_write_wins_across_frames() {
        let updater = RxStateUpdater::new(test_rules(), EngagementMode::Strict);
        let mut state = VehicleState::default();

        let pressed = Frame::new(MAIN_BUS, 161, vec![0x20, 0, 0, 0, 0, 0, 0, 0]);
        let released = Frame::new(MAIN_BUS, 161, vec![0; 8]);
        for frame in [&pressed, &released, &pressed] {
            updater.apply(&mut state, frame);
        }
        assert!(state.brake_pressed);
    }

    #[test]
    fn nonzero_cruise_command_allows_controls() {
        let updater = RxStateUpdater::new(test_rules(), EngagementMode::Strict);
        let mut state = VehicleState::default();

        updater.apply(
            &mut state,
            &Frame::new(CAMERA_BUS, 627, vec![0, 0, 0x00, 0x01, 0, 0, 0, 0]),
        );
        assert!(state.controls_allowed);
    }

    #[test]
    fn zero_cruise_command_is_not_an_engagement() {
        let updater = RxStateUpdater::new(test_rules(), EngagementMode::Strict);
        let mut state = VehicleState::default();

        updater.apply(&mut state, &Frame::new(CAMERA_BUS, 627, vec![0; 8]));
        assert!(!state.controls_allowed);
    }

    #[test]
    fn zero_command_does_not_revoke_engagement() {
        let updater = RxStateUpdater::new(test_rules(), EngagementMode::Strict);
        let mut state = VehicleState::default();

        updater.apply(
            &mut state,
            &Frame::new(CAMERA_BUS, 627, vec![0, 0, 0x00, 0x05, 0, 0, 0, 0]),
        );
        updater.apply(&mut state, &Frame::new(CAMERA_BUS, 627, vec![0; 8]));
        assert!(state.controls_allowed);
    }

    #[test]
    fn strict_mode_leaves_unmatched_frames_inert() {
        let updater = RxStateUpdater::new(test_rules(), EngagementMode::Strict);
        let mut state = VehicleState::default();

        updater.apply(&mut state, &Frame::new(MAIN_BUS, 999, vec![0xFF; 8]));
        assert_eq!(state, VehicleState::default());
    }

    #[test]
    fn permissive_mode_forces_moving_and_allowed_on_any_rx() {
        let updater = RxStateUpdater::new(test_rules(), EngagementMode::Permissive);
        let mut state = VehicleState::default();

        // Even a frame matching no rule trips the unconditional overrides.
        updater.apply(&mut state, &Frame::new(MAIN_BUS, 999, vec![0; 8]));
        assert!(state.vehicle_moving);
        assert!(state.controls_allowed);
    }
}
