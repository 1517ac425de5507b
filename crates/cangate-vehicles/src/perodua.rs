//! Perodua Myvi PSD gate parameterization.
//!
//! Message ids and bit offsets come from the PSD powertrain DBC:
//! BRAKE (161), GAS_PEDAL_2 (399), PCM_BUTTONS (520), WHEEL_SPEED (608),
//! ACC_CMD_HUD (627) on the camera bus, STEERING_LKAS (464) and LKAS_HUD
//! (628) as the locally generated command frames.

use cangate_safety::{
    AllowListEntry, EngagementMode, ForwardPolicy, LivenessEntry, LivenessTable, Policy,
    PolicyBuilder, SignalKind, SignalRule, SignalRuleSet, SignalSource, TxPolicy, VehicleGate,
};
use cangate_types::{ByteOrder, CAMERA_BUS, GateError, MAIN_BUS, OBD_BUS};

// Command frames the vehicle-bus side emits; their stock camera copies are
// blocked from relay.
const STEERING_LKAS: u32 = 464;
const LKAS_HUD: u32 = 628;
const STEERING_LKAS_2: u32 = 625;
const ACC_CMD_HUD: u32 = 627;
const PCM_BUTTONS: u32 = 520;
const ADAS_AEB: u32 = 624;
const WHEEL_SPEED: u32 = 608;
const BRAKE: u32 = 161;
const GAS_PEDAL_2: u32 = 399;
const CAMERA_KEEPALIVE: u32 = 0x750;

// UDS diagnostics: 0x7DF functional, 0x18DB33F1 broadcast, and the
// 0x18DA00F1..=0x18DAF0F1 physical tester addresses (stride 0x1000).
const UDS_FUNCTIONAL: u32 = 0x7DF;
const UDS_BROADCAST: u32 = 0x18DB_33F1;
const UDS_PHYSICAL_BASE: u32 = 0x18DA_00F1;
const UDS_PHYSICAL_STRIDE: u32 = 0x1000;
const UDS_PHYSICAL_COUNT: u32 = 16;

fn signal_rules() -> SignalRuleSet {
    SignalRuleSet::new(vec![
        // Brake pressed from BRAKE bit 5.
        SignalRule {
            address: BRAKE,
            bus: MAIN_BUS,
            kind: SignalKind::BrakePressed,
            source: SignalSource::Bit {
                offset: 5,
                invert: false,
            },
        },
        // Gas pressed from GAS_PEDAL_2 bit 1, active low.
        SignalRule {
            address: GAS_PEDAL_2,
            bus: MAIN_BUS,
            kind: SignalKind::GasPressed,
            source: SignalSource::Bit {
                offset: 1,
                invert: true,
            },
        },
        // Fallback gas from PCM_BUTTONS PEDAL_DEPRESSED at bit 12.
        SignalRule {
            address: PCM_BUTTONS,
            bus: MAIN_BUS,
            kind: SignalKind::GasPressed,
            source: SignalSource::Bit {
                offset: 12,
                invert: false,
            },
        },
        // ACC availability from ACC_CMD_HUD bit 9 (SET_ME_1_2).
        SignalRule {
            address: ACC_CMD_HUD,
            bus: CAMERA_BUS,
            kind: SignalKind::CruiseMainOn,
            source: SignalSource::Bit {
                offset: 9,
                invert: false,
            },
        },
        // Any nonzero ACC_CMD (bytes 2..4) counts as engaged.
        SignalRule {
            address: ACC_CMD_HUD,
            bus: CAMERA_BUS,
            kind: SignalKind::CruiseEngaged,
            source: SignalSource::NonZeroUint {
                offset: 2,
                len: 2,
                order: ByteOrder::Big,
            },
        },
        // Nonzero front wheel speed means the vehicle is moving.
        SignalRule {
            address: WHEEL_SPEED,
            bus: MAIN_BUS,
            kind: SignalKind::VehicleMoving,
            source: SignalSource::NonZeroUint {
                offset: 0,
                len: 2,
                order: ByteOrder::Big,
            },
        },
    ])
}

fn allow_list() -> TxPolicy {
    let mut entries = vec![
        AllowListEntry::new(STEERING_LKAS, MAIN_BUS, 8, true),
        AllowListEntry::new(LKAS_HUD, MAIN_BUS, 8, true),
        AllowListEntry::new(STEERING_LKAS_2, MAIN_BUS, 8, true),
        AllowListEntry::new(ACC_CMD_HUD, MAIN_BUS, 8, true),
        AllowListEntry::new(PCM_BUTTONS, MAIN_BUS, 6, false),
        AllowListEntry::new(ADAS_AEB, MAIN_BUS, 8, false),
        // Tester-present keepalive for the camera.
        AllowListEntry::new(CAMERA_KEEPALIVE, CAMERA_BUS, 8, false),
    ];

    // OBD/UDS queries on both the vehicle bus and the diagnostic mux.
    for bus in [MAIN_BUS, OBD_BUS] {
        entries.push(AllowListEntry::new(UDS_FUNCTIONAL, bus, 8, false));
        entries.push(AllowListEntry::new(UDS_BROADCAST, bus, 8, false));
        for n in 0..UDS_PHYSICAL_COUNT {
            entries.push(AllowListEntry::new(
                UDS_PHYSICAL_BASE + n * UDS_PHYSICAL_STRIDE,
                bus,
                8,
                false,
            ));
        }
    }

    TxPolicy::new(entries)
}

fn liveness_table() -> LivenessTable {
    // WHEEL_SPEED and PCM_BUTTONS run at 20 Hz, the camera HUD frames at
    // 10 Hz. Integrity checks are suppressed: the PSD checksum/counter
    // scheme is not modeled.
    LivenessTable::new(vec![
        LivenessEntry::unchecked(WHEEL_SPEED, MAIN_BUS, 8, 50),
        LivenessEntry::unchecked(PCM_BUTTONS, MAIN_BUS, 6, 50),
        LivenessEntry::unchecked(ACC_CMD_HUD, CAMERA_BUS, 8, 100),
        LivenessEntry::unchecked(LKAS_HUD, CAMERA_BUS, 8, 100),
    ])
}

/// The Perodua Myvi PSD [`VehicleGate`].
///
/// The engagement mode must be chosen by the integrator. `Strict` derives
/// `controls_allowed`/`vehicle_moving` from the ACC command and wheel-speed
/// signals; `Permissive` forces both true on every RX tick and exists only
/// because early PSD units lacked a trustworthy standstill signal.
pub struct PeroduaGate {
    mode: EngagementMode,
}

impl PeroduaGate {
    pub fn new(mode: EngagementMode) -> Self {
        Self { mode }
    }
}

impl VehicleGate for PeroduaGate {
    fn name(&self) -> &str {
        "perodua-myvi-psd"
    }

    fn init(&self, _param: u16) -> Result<Policy, GateError> {
        PolicyBuilder::new(signal_rules(), self.mode)
            .allow_list(allow_list())
            .liveness(liveness_table())
            .forward(ForwardPolicy::new(vec![STEERING_LKAS, LKAS_HUD]))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cangate_safety::SafetyGate;
    use cangate_types::{ForwardDecision, Frame};

    fn strict_gate() -> SafetyGate {
        SafetyGate::for_vehicle(&PeroduaGate::new(EngagementMode::Strict), 0).unwrap()
    }

    #[test]
    fn policy_builds_for_both_modes() {
        assert!(PeroduaGate::new(EngagementMode::Strict).init(0).is_ok());
        assert!(PeroduaGate::new(EngagementMode::Permissive).init(0).is_ok());
    }

    #[test]
    fn brake_bit_drives_brake_pressed() {
        let mut gate = strict_gate();
        gate.rx(&Frame::new(MAIN_BUS, 161, vec![0x20, 0, 0, 0, 0, 0, 0, 0]));
        assert!(gate.state().brake_pressed);
        gate.rx(&Frame::new(MAIN_BUS, 161, vec![0; 8]));
        assert!(!gate.state().brake_pressed);
    }

    #[test]
    fn gas_pedal_is_active_low() {
        let mut gate = strict_gate();
        // Bit 1 set means the pedal is released.
        gate.rx(&Frame::new(MAIN_BUS, 399, vec![0x02, 0, 0, 0, 0, 0, 0, 0]));
        assert!(!gate.state().gas_pressed);
        gate.rx(&Frame::new(MAIN_BUS, 399, vec![0; 8]));
        assert!(gate.state().gas_pressed);
    }

    #[test]
    fn pcm_buttons_pedal_fallback() {
        let mut gate = strict_gate();
        gate.rx(&Frame::new(MAIN_BUS, 520, vec![0, 0x10, 0, 0, 0, 0]));
        assert!(gate.state().gas_pressed);
    }

    #[test]
    fn acc_command_engages_controls() {
        let mut gate = strict_gate();
        assert!(!gate.state().controls_allowed);
        gate.rx(&Frame::new(CAMERA_BUS, 627, vec![0, 0, 0x00, 0x01, 0, 0, 0, 0]));
        assert!(gate.state().controls_allowed);
    }

    #[test]
    fn zero_acc_command_does_not_engage() {
        let mut gate = strict_gate();
        gate.rx(&Frame::new(CAMERA_BUS, 627, vec![0; 8]));
        assert!(!gate.state().controls_allowed);
    }

    #[test]
    fn acc_main_on_follows_bit_9() {
        let mut gate = strict_gate();
        gate.rx(&Frame::new(CAMERA_BUS, 627, vec![0, 0x02, 0, 0, 0, 0, 0, 0]));
        assert!(gate.state().cruise_main_on);
    }

    #[test]
    fn wheel_speed_drives_vehicle_moving() {
        let mut gate = strict_gate();
        gate.rx(&Frame::new(MAIN_BUS, 608, vec![0x01, 0x40, 0, 0, 0, 0, 0, 0]));
        assert!(gate.state().vehicle_moving);
    }

    #[test]
    fn strict_mode_does_not_fabricate_engagement() {
        let mut gate = strict_gate();
        gate.rx(&Frame::new(MAIN_BUS, 161, vec![0; 8]));
        assert!(!gate.state().controls_allowed);
        assert!(!gate.state().vehicle_moving);
    }

    #[test]
    fn permissive_mode_forces_engagement_on_rx() {
        let mut gate =
            SafetyGate::for_vehicle(&PeroduaGate::new(EngagementMode::Permissive), 0).unwrap();
        gate.rx(&Frame::new(MAIN_BUS, 161, vec![0; 8]));
        assert!(gate.state().controls_allowed);
        assert!(gate.state().vehicle_moving);
    }

    #[test]
    fn lkas_and_acc_commands_are_transmittable() {
        let gate = strict_gate();
        for address in [464u32, 628, 625, 627, 624] {
            assert!(
                gate.tx(&Frame::new(MAIN_BUS, address, vec![0; 8])),
                "address {address} should be allowed"
            );
        }
        assert!(gate.tx(&Frame::new(MAIN_BUS, 520, vec![0; 6])));
        assert!(gate.tx(&Frame::new(CAMERA_BUS, 0x750, vec![0; 8])));
    }

    #[test]
    fn unlisted_address_is_denied() {
        let gate = strict_gate();
        assert!(!gate.tx(&Frame::new(MAIN_BUS, 999, vec![0; 8])));
    }

    #[test]
    fn wrong_length_command_is_denied() {
        let gate = strict_gate();
        assert!(!gate.tx(&Frame::new(MAIN_BUS, 520, vec![0; 8])));
        assert!(!gate.tx(&Frame::new(MAIN_BUS, 464, vec![0; 4])));
    }

    #[test]
    fn uds_tester_range_is_allowed_on_both_diag_buses() {
        let gate = strict_gate();
        for bus in [MAIN_BUS, OBD_BUS] {
            assert!(gate.tx(&Frame::new(bus, 2015, vec![0; 8])));
            assert!(gate.tx(&Frame::new(bus, 417_018_865, vec![0; 8])));
            // First and last physical tester addresses.
            assert!(gate.tx(&Frame::new(bus, 416_940_273, vec![0; 8])));
            assert!(gate.tx(&Frame::new(bus, 417_001_713, vec![0; 8])));
        }
        // The physical tester range is not open-ended.
        assert!(!gate.tx(&Frame::new(MAIN_BUS, 417_001_713 + 0x1000, vec![0; 8])));
    }

    #[test]
    fn stock_camera_commands_are_blocked_from_relay() {
        let gate = strict_gate();
        assert_eq!(gate.forward(CAMERA_BUS, 464), Some(ForwardDecision::Block));
        assert_eq!(gate.forward(CAMERA_BUS, 628), Some(ForwardDecision::Block));
    }

    #[test]
    fn default_relay_routes() {
        let gate = strict_gate();
        assert_eq!(
            gate.forward(MAIN_BUS, 161),
            Some(ForwardDecision::Forward(CAMERA_BUS))
        );
        assert_eq!(
            gate.forward(CAMERA_BUS, 627),
            Some(ForwardDecision::Forward(MAIN_BUS))
        );
        assert_eq!(
            gate.forward(OBD_BUS, 161),
            Some(ForwardDecision::Unchanged)
        );
    }

    #[test]
    fn allow_list_covers_commands_and_diagnostics() {
        let policy = PeroduaGate::new(EngagementMode::Strict).init(0).unwrap();
        let entries = policy.allow_list().entries();
        // 7 command/keepalive entries plus 18 UDS addresses on each of the
        // two diagnostic buses.
        assert_eq!(entries.len(), 7 + 2 * 18);
        assert!(
            entries
                .iter()
                .filter(|e| e.check_relay)
                .all(|e| e.bus == MAIN_BUS && e.length == 8)
        );
        assert!(entries.iter().all(|e| e.length > 0));
    }

    #[test]
    fn liveness_table_lists_required_messages() {
        let policy = PeroduaGate::new(EngagementMode::Strict).init(0).unwrap();
        let entries = policy.liveness().entries();
        assert_eq!(entries.len(), 4);
        assert!(
            entries
                .iter()
                .any(|e| e.address == 608 && e.bus == MAIN_BUS && e.max_period_ms == 50)
        );
        assert!(
            entries
                .iter()
                .any(|e| e.address == 627 && e.bus == CAMERA_BUS && e.max_period_ms == 100)
        );
        assert!(entries.iter().all(|e| e.ignore_checksum));
    }
}
