#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;

use a3ot_plc_link::{checksum, Transport, ACK, ETX, STX};

/// In-memory link: each write releases the next scripted reply.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: VecDeque<Vec<u8>>,
    input: VecDeque<u8>,
    pub written: Vec<Vec<u8>>,
    pub input_clears: usize,
    pub output_clears: usize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.replies.push_back(bytes.into());
        self
    }

    pub fn reply_ack(self) -> Self {
        self.reply(vec![ACK])
    }

    pub fn reply_message(self, payload: &str) -> Self {
        self.reply(message_frame(payload))
    }

    pub fn reply_silence(self) -> Self {
        self.reply(Vec::new())
    }

    /// Bytes already available before any write.
    pub fn pending(mut self, bytes: &[u8]) -> Self {
        self.input.extend(bytes);
        self
    }

    pub fn last_written(&self) -> &[u8] {
        self.written.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Transport for ScriptedTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.written.push(bytes.to_vec());
        if let Some(reply) = self.replies.pop_front() {
            self.input.extend(reply);
        }
        Ok(())
    }

    fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let take = n.min(self.input.len());
        Ok(self.input.drain(..take).collect())
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.input_clears += 1;
        self.input.clear();
        Ok(())
    }

    fn clear_output(&mut self) -> io::Result<()> {
        self.output_clears += 1;
        Ok(())
    }
}

/// A reply frame exactly as the PLC sends it.
pub fn message_frame(payload: &str) -> Vec<u8> {
    let mut frame = vec![STX];
    frame.extend_from_slice(payload.as_bytes());
    frame.push(ETX);
    frame.extend_from_slice(checksum(payload.as_bytes()).as_bytes());
    frame
}
