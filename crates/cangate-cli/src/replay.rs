//! Frame-log parser for the replay harness.
//!
//! One frame per line:
//!
//! ```text
//! # direction  bus  address  payload-hex
//! rx 0 161 2000000000000000
//! rx 2 627 0000000100000000
//! tx 0 464 0011223344556677
//! ```
//!
//! `rx` lines are inbound vehicle frames; `tx` lines are frames the
//! controller wants to send. Addresses are decimal or `0x`-prefixed hex.
//! Blank lines and `#` comments are skipped.

use cangate_types::{Frame, GateError};

/// Largest payload a logged frame may carry (CAN FD maximum).
const MAX_PAYLOAD_BYTES: usize = 64;

/// Whether a logged frame is inbound or controller-outbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

/// One parsed log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub direction: Direction,
    pub frame: Frame,
}

/// Parse a whole log. Fails on the first malformed line, reporting its
/// 1-based number.
pub fn parse_log(input: &str) -> Result<Vec<Record>, GateError> {
    let mut records = Vec::new();
    for (idx, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        records.push(
            parse_line(line)
                .map_err(|e| GateError::Replay(format!("line {}: {}", idx + 1, e)))?,
        );
    }
    Ok(records)
}

fn parse_line(line: &str) -> Result<Record, String> {
    let mut parts = line.split_whitespace();
    let direction = match parts.next() {
        Some("rx") => Direction::Rx,
        Some("tx") => Direction::Tx,
        Some(other) => return Err(format!("unknown direction '{}'", other)),
        None => return Err("empty line".to_string()),
    };
    let bus: u8 = parts
        .next()
        .ok_or("missing bus")?
        .parse()
        .map_err(|e| format!("bad bus: {}", e))?;
    let address = parse_address(parts.next().ok_or("missing address")?)?;
    let payload = parse_hex(parts.next().ok_or("missing payload")?)?;
    if parts.next().is_some() {
        return Err("trailing tokens".to_string());
    }
    Ok(Record {
        direction,
        frame: Frame::new(bus, address, payload),
    })
}

fn parse_address(token: &str) -> Result<u32, String> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("bad address: {}", e))
    } else {
        token.parse().map_err(|e| format!("bad address: {}", e))
    }
}

fn parse_hex(token: &str) -> Result<Vec<u8>, String> {
    if token.len() % 2 != 0 {
        return Err("payload hex has odd length".to_string());
    }
    if token.len() / 2 > MAX_PAYLOAD_BYTES {
        return Err(format!(
            "payload is {} bytes, max is {}",
            token.len() / 2,
            MAX_PAYLOAD_BYTES
        ));
    }
    (0..token.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&token[i..i + 2], 16).map_err(|e| format!("bad payload: {}", e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cangate_types::{CAMERA_BUS, MAIN_BUS};

    #[test]
    fn parses_rx_and_tx_lines() {
        let log = "rx 0 161 2000000000000000\ntx 0 464 0011223344556677\n";
        let records = parse_log(log).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].direction, Direction::Rx);
        assert_eq!(records[0].frame, Frame::new(MAIN_BUS, 161, vec![0x20, 0, 0, 0, 0, 0, 0, 0]));
        assert_eq!(records[1].direction, Direction::Tx);
        assert_eq!(records[1].frame.address, 464);
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let log = "# header\n\nrx 2 627 0000000100000000\n";
        let records = parse_log(log).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].frame.bus, CAMERA_BUS);
    }

    #[test]
    fn hex_addresses_are_accepted() {
        let records = parse_log("tx 2 0x750 0000000000000000").unwrap();
        assert_eq!(records[0].frame.address, 0x750);
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let err = parse_log("rx 0 161 2000000000000000\nzz 0 161 00\n").unwrap_err();
        match err {
            GateError::Replay(msg) => {
                assert!(msg.contains("line 2"));
                assert!(msg.contains("zz"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn odd_length_payload_is_rejected() {
        assert!(parse_log("rx 0 161 200").is_err());
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let hex = "00".repeat(65);
        assert!(parse_log(&format!("tx 0 464 {}", hex)).is_err());
        // The CAN FD maximum itself is fine.
        let hex = "00".repeat(64);
        assert!(parse_log(&format!("tx 0 464 {}", hex)).is_ok());
    }

    #[test]
    fn missing_fields_are_rejected() {
        assert!(parse_log("rx 0 161").is_err());
        assert!(parse_log("rx 0").is_err());
        assert!(parse_log("rx").is_err());
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert!(parse_log("rx 0 161 00 extra").is_err());
    }
}
