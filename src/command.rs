use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::core::{encode_swapped_address, RegisterRef};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command not supported for {0:?}")]
    NotSupportedCommand(String),
}

/// Discrete outputs that accept a set/reset command: bit memory and outputs.
static OUTPUT_PIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<kind>[MY])(?P<pin>[0-9]+)$").expect("static regex"));

const READ_OPCODE: char = '0';
const FORCE_ON_OPCODE: char = '7';
const FORCE_OFF_OPCODE: char = '8';
const MONITOR_INSTALL_PREFIX: &str = "E101400";
const MONITOR_DATA_MARKER: &str = "81";
const MONITOR_BIT_MARKER: &str = "00";
const MONITOR_SAMPLE_PREFIX: &str = "E001790";

/// `0` + address (4 hex) + byte count (2 hex).
pub fn build_read(address: u16, count: u8) -> String {
    format!("{READ_OPCODE}{address:04X}{count:02X}")
}

/// Force a discrete output on or off. `pin` is matched after upper-casing.
pub fn build_set_output(pin: &str, state: bool) -> Result<String, CommandError> {
    let normalized = pin.to_ascii_uppercase();
    let captures = OUTPUT_PIN_PATTERN
        .captures(&normalized)
        .ok_or_else(|| CommandError::NotSupportedCommand(pin.to_string()))?;

    let number = captures["pin"]
        .parse::<u8>()
        .map_err(|_| CommandError::NotSupportedCommand(pin.to_string()))?;

    let opcode = if state { FORCE_ON_OPCODE } else { FORCE_OFF_OPCODE };
    let selector = if &captures["kind"] == "M" { "01" } else { "05" };

    Ok(format!("{opcode}{number:02X}{selector}"))
}

/// Install a batched poll: data registers first, then bit registers, each
/// address sent low byte first.
pub fn build_monitor_install(data_refs: &[RegisterRef], bit_refs: &[RegisterRef]) -> String {
    let data_len = data_refs.len();
    let bit_len = bit_refs.len();
    let length = (data_len + bit_len) * 2 + 4;

    let mut payload = format!(
        "{MONITOR_INSTALL_PREFIX}{length:02X}{data_len:02X}{MONITOR_DATA_MARKER}{bit_len:02X}{MONITOR_BIT_MARKER}"
    );
    for reg in data_refs.iter().chain(bit_refs) {
        payload.push_str(&encode_swapped_address(reg.address()));
    }
    payload
}

/// Request the cached monitor block: two bytes per data register plus one
/// byte per eight bit registers.
pub fn build_monitor_sample(data_count: usize, bit_count: usize) -> String {
    let length = data_count * 2 + bit_count.div_ceil(8);
    format!("{MONITOR_SAMPLE_PREFIX}{length:02X}")
}
