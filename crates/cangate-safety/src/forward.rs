//! Forwarding policy: per-frame relay decisions between the main vehicle
//! bus and the camera/ADAS bus.
//!
//! The camera must keep seeing real vehicle traffic, so main-bus frames are
//! relayed to the camera bus wholesale. Camera-bus frames flow back to the
//! main bus *except* the camera's own steering/cruise command messages —
//! those are blocked so the stock commands cannot reach the actuators while
//! an external controller is active.

use cangate_types::{CAMERA_BUS, ForwardDecision, Frame, MAIN_BUS};
use tracing::debug;

/// Relay rules for one vehicle. The blocked set lists camera-bus addresses
/// the gate's own main-bus side also emits.
#[derive(Debug, Clone)]
pub struct ForwardPolicy {
    blocked_camera_addresses: Vec<u32>,
}

impl ForwardPolicy {
    pub fn new(blocked_camera_addresses: Vec<u32>) -> Self {
        Self {
            blocked_camera_addresses,
        }
    }

    /// Decide relay for a frame received on `bus` with `address`.
    pub fn decide(&self, bus: u8, address: u32) -> ForwardDecision {
        match bus {
            MAIN_BUS => ForwardDecision::Forward(CAMERA_BUS),
            CAMERA_BUS => {
                if self.blocked_camera_addresses.contains(&address) {
                    debug!(address, "blocking stock camera command from relay");
                    ForwardDecision::Block
                } else {
                    ForwardDecision::Forward(MAIN_BUS)
                }
            }
            _ => ForwardDecision::Unchanged,
        }
    }

    /// Convenience over [`decide`][Self::decide] for an already-parsed frame.
    pub fn decide_frame(&self, frame: &Frame) -> ForwardDecision {
        self.decide(frame.bus, frame.address)
    }
}
