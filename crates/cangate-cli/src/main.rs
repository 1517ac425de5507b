//! `cangate-cli` – replay harness for the CAN safety gate.
//!
//! This binary is the host-side entry point for exercising a vehicle gate
//! offline.  It:
//!
//! 1. Checks for `~/.cangate/config.toml`; writes a default (strict-mode)
//!    config when the file is absent.
//! 2. Builds the configured vehicle's immutable policy and wraps it in a
//!    [`SafetyGate`].
//! 3. Replays a frame log through the gate: `rx` lines update vehicle state,
//!    refresh the liveness monitor, and get a forward decision; `tx` lines
//!    get an allow/deny verdict.
//! 4. Intercepts **Ctrl-C** to stop the replay at a frame boundary.
//!
//! Denied transmissions and stale liveness entries are reported as
//! [`GateEvent`]s, printed as JSON lines when `CANGATE_LOG_FORMAT=json`.

mod config;
mod replay;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use tracing::{info, warn};

use cangate_safety::{LivenessMonitor, SafetyGate, VehicleGate};
use cangate_types::{ForwardDecision, GateEvent, GateEventPayload};
use cangate_vehicles::PeroduaGate;

use replay::Direction;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // Initialise tracing-subscriber using RUST_LOG (defaults to "info").
    // Set CANGATE_LOG_FORMAT=json to emit newline-delimited JSON logs
    // suitable for log aggregators. Replay verdicts still use println! for
    // UX consistency.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    let json_output = std::env::var("CANGATE_LOG_FORMAT").as_deref() == Ok("json");
    if json_output {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    println!("{}", "cangate – CAN safety gate replay".bold());

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  No config found – wrote defaults ({} mode) to {}",
                    cfg.engagement_mode,
                    config::config_path().display()
                ),
                Err(e) => warn!(error = %e, "could not write default config"),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "Ctrl-C received – stopping replay".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    // ── Gate construction ─────────────────────────────────────────────────
    let vehicle = PeroduaGate::new(cfg.engagement_mode.into());
    if cfg.vehicle != vehicle.name() {
        println!(
            "{}: unknown vehicle '{}', only '{}' is built in",
            "Config error".red(),
            cfg.vehicle,
            vehicle.name()
        );
        std::process::exit(2);
    }
    let mut gate = match SafetyGate::for_vehicle(&vehicle, 0) {
        Ok(gate) => gate,
        Err(e) => {
            println!("{}: {}", "Invalid policy".red(), e);
            std::process::exit(2);
        }
    };

    // ── Frame log ─────────────────────────────────────────────────────────
    let log_path = std::env::args().nth(1).unwrap_or_else(|| cfg.log_path.clone());
    let raw = match std::fs::read_to_string(&log_path) {
        Ok(raw) => raw,
        Err(e) => {
            println!("{}: {} ({})", "Cannot read frame log".red(), log_path, e);
            std::process::exit(1);
        }
    };
    let records = match replay::parse_log(&raw) {
        Ok(records) => records,
        Err(e) => {
            println!("{}: {}", "Malformed frame log".red(), e);
            std::process::exit(1);
        }
    };
    info!(path = %log_path, frames = records.len(), "replaying frame log");

    // ── Replay loop ───────────────────────────────────────────────────────
    let mut monitor = cfg
        .require_liveness
        .then(|| LivenessMonitor::new(gate.policy().liveness()));
    let mut events: Vec<GateEvent> = Vec::new();
    let mut denied = 0usize;
    let mut blocked_relays = 0usize;

    for record in &records {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match record.direction {
            Direction::Rx => {
                let before = *gate.state();
                gate.rx(&record.frame);
                if let Some(monitor) = monitor.as_mut() {
                    monitor.observe(&record.frame);
                }
                if before != *gate.state() {
                    events.push(GateEvent::now(
                        "cangate-cli::replay",
                        GateEventPayload::StateChanged {
                            state: *gate.state(),
                        },
                    ));
                }
                if cfg.relay_enabled
                    && gate.forward(record.frame.bus, record.frame.address)
                        == Some(ForwardDecision::Block)
                {
                    blocked_relays += 1;
                }
            }
            Direction::Tx => {
                if gate.tx(&record.frame) {
                    println!(
                        "  tx {:>4} bus {} {}",
                        record.frame.address,
                        record.frame.bus,
                        "allowed".green()
                    );
                } else {
                    denied += 1;
                    println!(
                        "  tx {:>4} bus {} {}",
                        record.frame.address,
                        record.frame.bus,
                        "DENIED".red().bold()
                    );
                    events.push(GateEvent::now(
                        "cangate-cli::replay",
                        GateEventPayload::TxBlocked {
                            address: record.frame.address,
                            bus: record.frame.bus,
                            length: record.frame.len(),
                        },
                    ));
                }
            }
        }
    }

    if let Some(monitor) = &monitor {
        for (address, bus) in monitor.stale() {
            events.push(GateEvent::now(
                "cangate-cli::replay",
                GateEventPayload::LivenessStale { address, bus },
            ));
        }
    }

    // ── Summary ───────────────────────────────────────────────────────────
    let state = gate.state();
    println!();
    println!("{}", "Replay summary".bold());
    println!("  frames replayed : {}", records.len());
    println!("  tx denied       : {}", denied);
    println!("  relays blocked  : {}", blocked_relays);
    println!(
        "  policy healthy  : {}",
        match &monitor {
            Some(m) if m.healthy() => "yes".green(),
            Some(_) => "no".red(),
            None => "not tracked".yellow(),
        }
    );
    println!(
        "  vehicle state   : brake={} gas={} cruise_main={} controls_allowed={} moving={}",
        state.brake_pressed,
        state.gas_pressed,
        state.cruise_main_on,
        state.controls_allowed,
        state.vehicle_moving
    );

    if json_output {
        for event in &events {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "failed to serialize gate event"),
            }
        }
    }
}
