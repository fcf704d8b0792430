use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    #[error("Invalid register syntax: {0:?}")]
    InvalidRegisterSyntax(String),

    #[error("Register type not supported: {0:?}")]
    NotSupportedRegister(String),

    #[error("Register {register:?} is not {expected:?}-sized")]
    SizeMismatch { register: String, expected: WordSize },
}

static REGISTER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<kind>[A-Z]+)(?P<index>[0-9]+)$").expect("static regex"));

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RegisterKind {
    /// Data word
    D,
    /// Counter
    C,
    /// Timer
    T,
    /// Internal relay (bit memory)
    M,
    /// Discrete input
    X,
    /// Discrete output
    Y,
}

/// Size of one register in the linear address space.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WordSize {
    Bit = 1,
    Word = 2,
}

impl WordSize {
    pub fn bytes(self) -> u16 {
        self as u16
    }
}

impl RegisterKind {
    pub fn from_letters(letters: &str) -> Option<Self> {
        match letters {
            "D" => Some(RegisterKind::D),
            "C" => Some(RegisterKind::C),
            "T" => Some(RegisterKind::T),
            "M" => Some(RegisterKind::M),
            "X" => Some(RegisterKind::X),
            "Y" => Some(RegisterKind::Y),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            RegisterKind::D => 'D',
            RegisterKind::C => 'C',
            RegisterKind::T => 'T',
            RegisterKind::M => 'M',
            RegisterKind::X => 'X',
            RegisterKind::Y => 'Y',
        }
    }

    /// Base address and word size of this kind.
    ///
    /// Word kinds (`D`, `C`, `T`) take two bytes per index, bit kinds
    /// (`M`, `X`, `Y`) one.
    pub fn offset(self) -> (u16, WordSize) {
        match self {
            RegisterKind::D => (0x4000, WordSize::Word),
            RegisterKind::C => (0x0A00, WordSize::Word),
            RegisterKind::T => (0x1000, WordSize::Word),
            RegisterKind::M => (0x0000, WordSize::Bit),
            RegisterKind::X => (0x1200, WordSize::Bit),
            RegisterKind::Y => (0x0C00, WordSize::Bit),
        }
    }
}

/// A parsed register name such as `D100`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegisterRef {
    pub kind: RegisterKind,
    pub index: u16,
}

impl RegisterRef {
    pub fn parse(name: &str) -> Result<Self, RegisterError> {
        let captures = REGISTER_PATTERN
            .captures(name)
            .ok_or_else(|| RegisterError::InvalidRegisterSyntax(name.to_string()))?;

        let kind = RegisterKind::from_letters(&captures["kind"])
            .ok_or_else(|| RegisterError::NotSupportedRegister(name.to_string()))?;

        // digits only, so the sole failure is an index past u16
        let index = captures["index"]
            .parse::<u16>()
            .map_err(|_| RegisterError::InvalidRegisterSyntax(name.to_string()))?;

        Ok(RegisterRef { kind, index })
    }

    pub fn size(&self) -> WordSize {
        self.kind.offset().1
    }

    /// Linear device address. Wraps silently; the device address space is
    /// not checked.
    pub fn address(&self) -> u16 {
        let (base, size) = self.kind.offset();
        base.wrapping_add(size.bytes().wrapping_mul(self.index))
    }
}

impl fmt::Display for RegisterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.letter(), self.index)
    }
}

/// Resolve a register name to its reference, linear address and size.
pub fn resolve(name: &str) -> Result<(RegisterRef, u16, WordSize), RegisterError> {
    let reg = RegisterRef::parse(name)?;
    Ok((reg, reg.address(), reg.size()))
}

/// Swap the two byte pairs of a 4-digit hex string. The device keeps 16-bit
/// values low byte first.
pub fn swap_hex_word(hex: &str) -> String {
    match (hex.get(0..2), hex.get(2..4)) {
        (Some(high), Some(low)) if hex.len() == 4 => format!("{low}{high}"),
        _ => hex.to_string(),
    }
}

/// `0x1234` becomes `"3412"`.
pub fn encode_swapped_address(address: u16) -> String {
    swap_hex_word(&format!("{address:04X}"))
}

/// `"3412"` becomes `0x1234`.
pub fn decode_swapped_word(hex: &str) -> Option<u16> {
    if hex.len() != 4 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(&swap_hex_word(hex), 16).ok()
}
