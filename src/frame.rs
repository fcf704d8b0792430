use std::io;

use thiserror::Error;

use crate::transport::Transport;

pub const STX: u8 = 0x02;
pub const ETX: u8 = 0x03;
pub const EOT: u8 = 0x04;
pub const ENQ: u8 = 0x05;
pub const ACK: u8 = 0x06;
pub const LF: u8 = 0x0A;
pub const CL: u8 = 0x0C;
pub const CR: u8 = 0x0D;
pub const NAK: u8 = 0x15;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Response malformed: end of text never received after {} bytes", .received.len())]
    ResponseMalformed { received: Vec<u8> },

    #[error("Wrong checksum: expected {expected}, received {received}")]
    WrongChecksum { expected: String, received: String },

    #[error("Link I/O error: {0}")]
    Io(#[from] io::Error),
}

/// One decoded reply from the device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    Ack,
    Message(String),
    /// The link timed out before the first byte.
    NoResponse,
    /// Leading byte was neither ACK nor STX; passed through untouched.
    Raw(Vec<u8>),
}

/// `(3 + sum of payload bytes) & 0xFF` as two uppercase hex digits. The 3
/// accounts for the ETX byte.
pub fn checksum(payload: &[u8]) -> String {
    let sum = payload
        .iter()
        .fold(ETX, |acc, &byte| acc.wrapping_add(byte));
    format!("{sum:02X}")
}

/// STX + payload + ETX + checksum.
pub fn encode_command(payload: &str) -> Vec<u8> {
    let bytes = payload.as_bytes();
    let mut frame = Vec::with_capacity(bytes.len() + 4);
    frame.push(STX);
    frame.extend_from_slice(bytes);
    frame.push(ETX);
    frame.extend_from_slice(checksum(bytes).as_bytes());
    frame
}

/// Link-level single byte signals go out unframed.
pub fn encode_raw(byte: u8) -> Vec<u8> {
    vec![byte]
}

pub fn decode_response<T: Transport + ?Sized>(transport: &mut T) -> Result<Response, FrameError> {
    let first = transport.read(1)?;
    let Some(&lead) = first.first() else {
        tracing::error!("No answer from PLC");
        return Ok(Response::NoResponse);
    };

    match lead {
        ACK => {
            tracing::debug!("> ACK");
            Ok(Response::Ack)
        }
        STX => decode_message(transport),
        other => {
            tracing::warn!("Received unknown character: 0x{other:02X}");
            Ok(Response::Raw(first))
        }
    }
}

fn decode_message<T: Transport + ?Sized>(transport: &mut T) -> Result<Response, FrameError> {
    let mut payload = Vec::new();
    loop {
        let chunk = transport.read(1)?;
        match chunk.first() {
            Some(&ETX) => break,
            Some(&byte) => payload.push(byte),
            None => {
                let mut received = vec![STX];
                received.extend_from_slice(&payload);
                tracing::debug!(
                    "> [{}] {} bytes - Timeout of communication",
                    printable(&received),
                    received.len()
                );
                return Err(FrameError::ResponseMalformed { received });
            }
        }
    }

    let received = transport.read(2)?;
    tracing::debug!(
        "> [{}{}] {} bytes",
        printable(&payload),
        printable(&received),
        payload.len() + received.len() + 2
    );

    let expected = checksum(&payload);
    if received != expected.as_bytes() {
        return Err(FrameError::WrongChecksum {
            expected,
            received: String::from_utf8_lossy(&received).into_owned(),
        });
    }

    // the link is 7-bit; anything else is line noise that slipped past the sum
    match String::from_utf8(payload) {
        Ok(text) if text.is_ascii() => Ok(Response::Message(text)),
        Ok(text) => Err(FrameError::ResponseMalformed {
            received: text.into_bytes(),
        }),
        Err(e) => Err(FrameError::ResponseMalformed {
            received: e.into_bytes(),
        }),
    }
}

/// Control bytes shown as `.` for frame traces.
pub(crate) fn printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b > 0x0F && b.is_ascii() { b as char } else { '.' })
        .collect()
}
