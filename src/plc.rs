use tracing::Span;

use super::*;
use crate::frame::{decode_response, encode_command, encode_raw, printable, ENQ};

/// Driver for one serial link. Every exchange is a single half-duplex
/// request/response cycle; wrap the driver in a `Mutex` if several threads
/// share the link.
pub struct Plc<T: Transport> {
    transport: T,
    span: Span,
    flush_before: bool,
    ready: bool,
}

impl<T: Transport> Plc<T> {
    /// Wrap a transport without touching the link.
    pub fn new(transport: T) -> Self {
        Self::with_span(transport, tracing::info_span!("plc"))
    }

    /// Wrap a transport, logging under the given span.
    pub fn with_span(transport: T, span: Span) -> Self {
        Plc {
            transport,
            span,
            flush_before: true,
            ready: false,
        }
    }

    /// Wrap a transport and run the handshake. A failed handshake is logged
    /// and the driver is returned anyway.
    pub fn connect(transport: T) -> Self {
        let mut plc = Self::new(transport);
        plc.handshake();
        plc
    }

    /// Send ENQ and expect ACK. Never fails; the outcome is logged and kept
    /// in [`Plc::is_ready`].
    pub fn handshake(&mut self) -> bool {
        let outcome = self.send_raw(ENQ);
        self.ready = matches!(outcome, Ok(Response::Ack));
        if !self.ready {
            let _guard = self.span.enter();
            tracing::error!(outcome = ?outcome, "Unable to handshake with plc");
        }
        self.ready
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Clear both directions of the link before each exchange (on by default).
    pub fn set_flush_before(&mut self, flush_before: bool) {
        self.flush_before = flush_before;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Frame `payload`, send it and decode the reply.
    pub fn send_command(&mut self, payload: &str) -> Result<Response, PlcError> {
        self.exchange(&encode_command(payload))
    }

    /// Send one unframed link-level byte and decode the reply.
    pub fn send_raw(&mut self, byte: u8) -> Result<Response, PlcError> {
        self.exchange(&encode_raw(byte))
    }

    fn exchange(&mut self, bytes: &[u8]) -> Result<Response, PlcError> {
        let _guard = self.span.enter();
        if self.flush_before {
            self.transport.clear_output()?;
            self.transport.clear_input()?;
        }
        tracing::debug!("< [{}] {} bytes", printable(bytes), bytes.len());
        self.transport.write(bytes)?;
        Ok(decode_response(&mut self.transport)?)
    }

    /// Send a command that must answer with a framed message.
    pub fn request(&mut self, payload: &str) -> Result<String, PlcError> {
        match self.send_command(payload)? {
            Response::Message(text) => Ok(text),
            Response::NoResponse => Err(PlcError::NoResponse),
            other => Err(PlcError::UnexpectedResponse(other)),
        }
    }

    /// Read `count` bytes starting at a linear device address.
    pub fn read_address(&mut self, address: u16, count: u8) -> Result<String, PlcError> {
        self.request(&build_read(address, count))
    }

    /// Read the raw hex text of one register.
    pub fn read_register(&mut self, name: &str) -> Result<String, PlcError> {
        let (_, address, size) = resolve(name)?;
        self.read_address(address, size.bytes() as u8)
    }

    /// Read a word register as an integer.
    pub fn read_word(&mut self, name: &str) -> Result<u16, PlcError> {
        let (_, address, size) = resolve(name)?;
        if size != WordSize::Word {
            return Err(RegisterError::SizeMismatch {
                register: name.to_string(),
                expected: WordSize::Word,
            }
            .into());
        }
        let text = self.read_address(address, WordSize::Word.bytes() as u8)?;
        let hex = text.get(0..4).ok_or(PlcError::ShortResponse {
            expected: 4,
            actual: text.len(),
        })?;
        decode_swapped_word(hex).ok_or_else(|| PlcError::InvalidHex(hex.to_string()))
    }

    /// Force a discrete output. Returns whether the device acknowledged.
    pub fn set_output(&mut self, pin: &str, state: bool) -> Result<bool, PlcError> {
        let payload = build_set_output(pin, state)?;
        Ok(self.send_command(&payload)? == Response::Ack)
    }
}
