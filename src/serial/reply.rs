//! Serial reply lines
//!
//! # Format
//!
//! Every reply is one ASCII line:
//! ```text
//! <+                                  request accepted
//! <-<code>/<state>                    request rejected
//! <<letter><node>:<ticks>:<cmd>:<d0>,<d1>,...   packet from the link
//! ```
//!
//! `<state>` is the operational state number and `<letter>` the channel
//! (`A` = channel 0).

use crate::config::serial::MAX_REPLY_LEN;
use crate::device::context::OperationalState;
use crate::packet::Packet;
use core::fmt::Write;
use heapless::String;

/// Error codes reported in `<-code/state`
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Channel letter unknown, disabled or receive-only (1)
    InvalidChannel = 1,
    /// Channel already holds a packet (2)
    Busy = 2,
    /// More data bytes than one packet carries (3)
    TooMuchData = 3,
    /// Number above 255 (4)
    TooBig = 4,
    /// Character not valid at this point of the line (5)
    UnexpectedCharacter = 5,
    /// Only ACTIVATE is accepted until the controller is active (6)
    NotActive = 6,
    /// Radio could not be powered (7)
    PowerFailure = 7,
    /// Local command malformed or unknown (8)
    BadCommand = 8,
}

impl ErrorCode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::InvalidChannel),
            2 => Some(Self::Busy),
            3 => Some(Self::TooMuchData),
            4 => Some(Self::TooBig),
            5 => Some(Self::UnexpectedCharacter),
            6 => Some(Self::NotActive),
            7 => Some(Self::PowerFailure),
            8 => Some(Self::BadCommand),
            _ => None,
        }
    }
}

/// One line for the upstream host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ack,
    Error {
        code: ErrorCode,
        state: OperationalState,
    },
    /// Packet heard on (or built for) `channel`
    Packet {
        channel: u8,
        ticks: u16,
        packet: Packet,
    },
}

impl Reply {
    pub fn error(code: ErrorCode, state: OperationalState) -> Self {
        Self::Error { code, state }
    }
}

/// Text serialiser for [`Reply`]
pub struct ReplySerialiser;

impl ReplySerialiser {
    pub fn new() -> Self {
        Self
    }

    /// Render `reply` as a newline-terminated line
    pub fn serialise(&self, reply: &Reply) -> String<MAX_REPLY_LEN> {
        let mut line: String<MAX_REPLY_LEN> = String::new();
        // the longest packet line is 120 characters
        let _ = self.write_line(&mut line, reply);
        line
    }

    fn write_line(&self, line: &mut String<MAX_REPLY_LEN>, reply: &Reply) -> core::fmt::Result {
        match reply {
            Reply::Ack => line.write_str("<+")?,
            Reply::Error { code, state } => write!(line, "<-{}/{}", *code as u8, *state as u8)?,
            Reply::Packet {
                channel,
                ticks,
                packet,
            } => {
                let letter = (b'A'.wrapping_add(*channel)) as char;
                write!(line, "<{}{}:{}:{}:", letter, packet.node, ticks, packet.cmd)?;
                for (i, byte) in packet.data.iter().enumerate() {
                    if i > 0 {
                        line.write_char(',')?;
                    }
                    write!(line, "{}", byte)?;
                }
            }
        }
        line.write_char('\n')
    }
}

impl Default for ReplySerialiser {
    fn default() -> Self {
        Self::new()
    }
}
