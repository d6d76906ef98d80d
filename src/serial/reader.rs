//! Serial line reader and reply writer
//!
//! The reader pulls raw bytes for the ingress parser; the writer renders
//! [`Reply`] values as text lines.

use crate::config::serial::RX_BUFFER_SIZE;
use crate::serial::reply::{Reply, ReplySerialiser};
use crate::serial::traits::{SerialError, SerialPort};

/// Pulls chunks of bytes from the host line
pub struct SerialReader {
    buf: [u8; RX_BUFFER_SIZE],
}

impl SerialReader {
    pub fn new() -> Self {
        Self {
            buf: [0; RX_BUFFER_SIZE],
        }
    }

    /// Wait for the next chunk of input. May be empty.
    pub async fn read_chunk<S: SerialPort>(
        &mut self,
        serial: &mut S,
    ) -> Result<&[u8], SerialError> {
        let n = serial.read(&mut self.buf).await?;
        Ok(&self.buf[..n.min(RX_BUFFER_SIZE)])
    }
}

impl Default for SerialReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes reply lines to the host
pub struct ReplyWriter {
    serialiser: ReplySerialiser,
}

impl ReplyWriter {
    pub fn new() -> Self {
        Self {
            serialiser: ReplySerialiser::new(),
        }
    }

    pub async fn write_reply<S: SerialPort>(
        &self,
        serial: &mut S,
        reply: &Reply,
    ) -> Result<(), SerialError> {
        let line = self.serialiser.serialise(reply);
        serial.write(line.as_bytes()).await?;
        serial.flush().await
    }
}

impl Default for ReplyWriter {
    fn default() -> Self {
        Self::new()
    }
}
