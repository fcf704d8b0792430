// lib.rs

mod core;
mod command;
mod frame;
mod monitor;
mod plc;
mod transport;

pub use self::core::{
    decode_swapped_word, encode_swapped_address, resolve, swap_hex_word, RegisterError,
    RegisterKind, RegisterRef, WordSize,
};
pub use command::{
    build_monitor_install, build_monitor_sample, build_read, build_set_output, CommandError,
};
pub use frame::{
    checksum, decode_response, encode_command, encode_raw, FrameError, Response, ACK, CL, CR,
    ENQ, EOT, ETX, LF, NAK, STX,
};
pub use monitor::{MonitorSample, MonitorSession, MonitorValue, SampleMode};
pub use plc::Plc;
pub use transport::{LinkConfig, Parity, Transport};

#[cfg(feature = "serial")]
pub use transport::SerialTransport;

#[derive(Debug, thiserror::Error)]
pub enum PlcError {
    #[error("Register error: {0}")]
    Register(#[from] RegisterError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Link I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No answer from PLC")]
    NoResponse,

    #[error("Unexpected response: {0:?}")]
    UnexpectedResponse(Response),

    #[error("Monitor is not installed")]
    MonitorNotArmed,

    #[error("Response too short: expected {expected} characters, got {actual}")]
    ShortResponse { expected: usize, actual: usize },

    #[error("Invalid hex field: {0:?}")]
    InvalidHex(String),
}
