//! Packet and command types shared by the radio link
//!
//! # Command space
//!
//! Built-in commands occupy 0-10. Anything from [`APPLICATION_BASE`] upwards
//! belongs to the application running on the node.
//!
//! | ID | Command          | Payload                                    |
//! |----|------------------|--------------------------------------------|
//! | 0  | NOOP             | none                                       |
//! | 1  | FIRMWARE         | reserved                                   |
//! | 2  | STATUS           | `[reply_channel, reply_node, status_type]` |
//! | 3  | ACTIVATE         | `[channel, node, cat1, cat2, num1, num2]`  |
//! | 4  | DEACTIVATE       | none                                       |
//! | 5  | SET_TIME         | `[tom]` or `[ticks_lo, ticks_hi, tom]`     |
//! | 6  | SET_DATE         | `[date_lo, date_hi]`                       |
//! | 7  | READ_EEPROM      | `[reply_channel, reply_node, len, lo, hi]` |
//! | 8  | WRITE_EEPROM     | `[len, lo, hi, data...]`                   |
//! | 9  | STATUS_RESPONSE  | status block                               |
//! | 10 | EEPROM_RESPONSE  | EEPROM bytes                               |

use crate::config::radio::MAX_PAYLOAD_SIZE;
use heapless::Vec;

/// First command number available to applications
pub const APPLICATION_BASE: u8 = 16;

/// Node id meaning broadcast (or not yet assigned)
pub const BROADCAST_NODE: u8 = 0;

/// Built-in command IDs
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
    Noop = 0,
    Firmware = 1,
    Status = 2,
    Activate = 3,
    Deactivate = 4,
    SetTime = 5,
    SetDate = 6,
    ReadEeprom = 7,
    WriteEeprom = 8,
    StatusResponse = 9,
    EepromResponse = 10,
}

impl CommandId {
    /// Try to convert a byte to a built-in CommandId
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Noop),
            1 => Some(Self::Firmware),
            2 => Some(Self::Status),
            3 => Some(Self::Activate),
            4 => Some(Self::Deactivate),
            5 => Some(Self::SetTime),
            6 => Some(Self::SetDate),
            7 => Some(Self::ReadEeprom),
            8 => Some(Self::WriteEeprom),
            9 => Some(Self::StatusResponse),
            10 => Some(Self::EepromResponse),
            _ => None,
        }
    }

    /// Requests whose sender should stay in RX for the answer
    pub fn solicits_reply(self) -> bool {
        matches!(self, Self::Status | Self::ReadEeprom)
    }
}

/// Status block selector carried in a STATUS request
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// State, time of day, battery and packet counters
    Dynamic = 0,
    /// Identity and firmware version
    Static = 1,
}

impl StatusKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Dynamic),
            1 => Some(Self::Static),
            _ => None,
        }
    }
}

/// Errors building a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    /// Payload longer than MAX_PAYLOAD_SIZE
    TooBig,
}

/// A single link-layer packet
///
/// The network timestamp is not part of the packet; it is added on encode
/// and returned separately on decode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    /// Destination node (0 = broadcast)
    pub node: u8,
    /// Command byte
    pub cmd: u8,
    /// Payload, at most MAX_PAYLOAD_SIZE bytes
    pub data: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Packet {
    /// Create a packet with no payload
    pub fn new(node: u8, cmd: u8) -> Self {
        Self {
            node,
            cmd,
            data: Vec::new(),
        }
    }

    /// Create a packet carrying `data`
    pub fn with_data(node: u8, cmd: u8, data: &[u8]) -> Result<Self, PacketError> {
        let mut packet = Self::new(node, cmd);
        packet
            .data
            .extend_from_slice(data)
            .map_err(|_| PacketError::TooBig)?;
        Ok(packet)
    }

    /// Payload length as carried in the header
    pub fn len(&self) -> u8 {
        self.data.len() as u8
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Built-in command this packet carries, if any
    pub fn command(&self) -> Option<CommandId> {
        CommandId::from_byte(self.cmd)
    }

    /// Whether transmitting this packet should leave the radio listening
    pub fn solicits_reply(&self) -> bool {
        self.command().is_some_and(CommandId::solicits_reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_from_byte() {
        assert_eq!(CommandId::from_byte(0), Some(CommandId::Noop));
        assert_eq!(CommandId::from_byte(3), Some(CommandId::Activate));
        assert_eq!(CommandId::from_byte(10), Some(CommandId::EepromResponse));
        assert_eq!(CommandId::from_byte(11), None);
        assert_eq!(CommandId::from_byte(APPLICATION_BASE), None);
    }

    #[test]
    fn test_solicits_reply() {
        assert!(CommandId::Status.solicits_reply());
        assert!(CommandId::ReadEeprom.solicits_reply());
        assert!(!CommandId::SetTime.solicits_reply());
        assert!(!Packet::new(5, APPLICATION_BASE).solicits_reply());
    }

    #[test]
    fn test_with_data_rejects_oversize() {
        let data = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(Packet::with_data(1, 2, &data), Err(PacketError::TooBig));

        let packet = Packet::with_data(1, 2, &data[..MAX_PAYLOAD_SIZE]).unwrap();
        assert_eq!(packet.len() as usize, MAX_PAYLOAD_SIZE);
    }
}
