//! Serial ingress parser
//!
//! Turns operator lines into packets for the channel table.
//!
//! # Syntax
//!
//! ```text
//! >A12:3:1,2,3.      channel A, node 12, command 3, data [1, 2, 3]
//! >B0:4.             channel B, node 0, command 4, no data
//! >S  >T             local dynamic / static status
//! >R                 reboot the controller
//! ```
//!
//! `.` submits at once; a newline submits if the command number was seen
//! and otherwise abandons the line. The channel is claimed (EMPTY -> ADDING)
//! as soon as its letter is read and released again if the line fails.

use crate::config::radio::MAX_PAYLOAD_SIZE;
use crate::config::scheduler::CHANNEL_LETTERS;
use crate::packet::{Packet, StatusKind};
use crate::scheduler::channel::{ChannelState, ChannelTable};
use crate::serial::reply::ErrorCode;
use heapless::Vec;

/// Something the controller must act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingress {
    /// A complete packet for a claimed channel
    Submit { channel: usize, packet: Packet },
    /// `>S` or `>T`
    LocalStatus(StatusKind),
    /// `>R`
    Reset,
    /// Line rejected; the parser now skips to the next newline
    Error(ErrorCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Newline,
    WaitNl,
    WaitChan,
    WaitNode,
    WaitCmd,
    WaitData,
}

/// Byte-at-a-time line parser
pub struct IngressParser {
    state: ParseState,
    /// Number being accumulated
    value: u16,
    /// Digits seen since the last separator
    digits: bool,
    channel: Option<usize>,
    node: u8,
    cmd: u8,
    data: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl IngressParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::Newline,
            value: 0,
            digits: false,
            channel: None,
            node: 0,
            cmd: 0,
            data: Vec::new(),
        }
    }

    /// Feed one byte
    pub fn push(&mut self, byte: u8, channels: &mut ChannelTable) -> Option<Ingress> {
        if byte == b'\n' || byte == b'\r' {
            return self.end_of_line(channels);
        }

        match (self.state, byte) {
            (ParseState::WaitNl, _) => None,
            (ParseState::Newline, b'>') => {
                self.state = ParseState::WaitChan;
                None
            }
            (ParseState::Newline, _) => self.fail(ErrorCode::UnexpectedCharacter, channels),
            (ParseState::WaitChan, b'S') | (ParseState::WaitChan, b'T') => {
                self.state = ParseState::Newline;
                let kind = if byte == b'S' {
                    StatusKind::Dynamic
                } else {
                    StatusKind::Static
                };
                Some(Ingress::LocalStatus(kind))
            }
            (ParseState::WaitChan, b'R') => {
                self.state = ParseState::WaitNl;
                Some(Ingress::Reset)
            }
            (ParseState::WaitChan, b'A'..=b'Z') if byte - b'A' < CHANNEL_LETTERS => {
                self.select_channel((byte - b'A') as usize, channels)
            }
            (ParseState::WaitChan, _) => self.fail(ErrorCode::InvalidChannel, channels),
            (ParseState::WaitNode | ParseState::WaitCmd | ParseState::WaitData, b'0'..=b'9') => {
                self.value = self.value * 10 + (byte - b'0') as u16;
                self.digits = true;
                if self.value > u8::MAX as u16 {
                    return self.fail(ErrorCode::TooBig, channels);
                }
                None
            }
            (ParseState::WaitNode, b':') if self.digits => {
                self.node = self.take_value();
                self.state = ParseState::WaitCmd;
                None
            }
            (ParseState::WaitCmd, b':') | (ParseState::WaitCmd, b'.') if self.digits => {
                self.cmd = self.take_value();
                self.state = ParseState::WaitData;
                if byte == b'.' {
                    return self.submit();
                }
                None
            }
            (ParseState::WaitData, b',') | (ParseState::WaitData, b':') if self.digits => {
                self.push_value(channels)
            }
            (ParseState::WaitData, b'.') => {
                if self.digits {
                    if let Some(error) = self.push_value(channels) {
                        return Some(error);
                    }
                }
                self.submit()
            }
            _ => self.fail(ErrorCode::UnexpectedCharacter, channels),
        }
    }

    fn select_channel(&mut self, index: usize, channels: &mut ChannelTable) -> Option<Ingress> {
        match channels.claim(index) {
            Ok(()) => {
                self.channel = Some(index);
                self.node = 0;
                self.cmd = 0;
                self.data.clear();
                self.take_value();
                self.state = ParseState::WaitNode;
                None
            }
            Err(ChannelState::Disabled) | Err(ChannelState::ReadOnly) => {
                self.fail(ErrorCode::InvalidChannel, channels)
            }
            Err(_) => self.fail(ErrorCode::Busy, channels),
        }
    }

    fn push_value(&mut self, channels: &mut ChannelTable) -> Option<Ingress> {
        let value = self.take_value();
        if self.data.push(value).is_err() {
            return self.fail(ErrorCode::TooMuchData, channels);
        }
        None
    }

    fn end_of_line(&mut self, channels: &mut ChannelTable) -> Option<Ingress> {
        let result = match self.state {
            ParseState::WaitCmd if self.digits => {
                self.cmd = self.take_value();
                self.submit()
            }
            ParseState::WaitData => {
                if self.digits {
                    if let Some(error) = self.push_value(channels) {
                        self.state = ParseState::Newline;
                        return Some(error);
                    }
                }
                self.submit()
            }
            _ => {
                self.abandon(channels);
                None
            }
        };
        self.state = ParseState::Newline;
        result
    }

    fn submit(&mut self) -> Option<Ingress> {
        self.state = ParseState::WaitNl;
        let channel = self.channel.take()?;
        let mut packet = Packet::new(self.node, self.cmd);
        packet.data = core::mem::take(&mut self.data);
        Some(Ingress::Submit { channel, packet })
    }

    fn fail(&mut self, code: ErrorCode, channels: &mut ChannelTable) -> Option<Ingress> {
        self.abandon(channels);
        self.state = ParseState::WaitNl;
        Some(Ingress::Error(code))
    }

    fn abandon(&mut self, channels: &mut ChannelTable) {
        if let Some(index) = self.channel.take() {
            channels.release(index);
        }
        self.take_value();
        self.data.clear();
    }

    fn take_value(&mut self) -> u8 {
        let value = self.value as u8;
        self.value = 0;
        self.digits = false;
        value
    }
}

impl Default for IngressParser {
    fn default() -> Self {
        Self::new()
    }
}
