//! Command dispatcher
//!
//! Executes the built-in command vocabulary against a [`Node`] and forwards
//! anything else to the application. Requests arrive either over the air or
//! from the controller's own serial front-end; responses to the latter are
//! handed back to the caller instead of being transmitted.

use crate::config::{eeprom, firmware, timing};
use crate::device::context::OperationalState;
use crate::device::node::Node;
use crate::dispatcher::traits::{Application, Eeprom, Handling};
use crate::packet::{CommandId, Packet, StatusKind};
use crate::radio::traits::ChipBus;

/// Where a command came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Received over the air
    Radio,
    /// Entered on this controller's serial line
    Local,
}

/// Result of dispatching one packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    /// Response built for a local request, to be reported upstream
    Response { channel: u8, packet: Packet },
    /// Malformed, out of range or not for us
    Ignored,
    /// Forwarded to the application, which did not know it
    Unrecognised,
}

/// Built-in command executor
pub struct CommandDispatcher;

impl CommandDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Execute `packet` on `node`
    pub fn dispatch<B: ChipBus, A: Application, E: Eeprom>(
        &self,
        node: &mut Node<'_, B, A, E>,
        packet: &Packet,
        origin: Origin,
    ) -> Outcome {
        let data = packet.data.as_slice();
        let Some(command) = packet.command() else {
            return match node.app.operate(packet) {
                Handling::Handled => Outcome::Handled,
                Handling::Unrecognised => {
                    log::debug!("unrecognised command {}", packet.cmd);
                    Outcome::Unrecognised
                }
            };
        };

        match command {
            CommandId::Noop => Outcome::Handled,
            CommandId::Firmware => {
                log::info!("firmware update requested, not supported");
                Outcome::Handled
            }
            CommandId::Status => self.handle_status(node, data, origin),
            CommandId::Activate => self.handle_activate(node, data, origin),
            CommandId::Deactivate => self.handle_deactivate(node, data),
            CommandId::SetTime => self.handle_set_time(node, data),
            CommandId::SetDate => self.handle_set_date(node, data),
            CommandId::ReadEeprom => self.handle_read_eeprom(node, data, origin),
            CommandId::WriteEeprom => self.handle_write_eeprom(node, data),
            CommandId::StatusResponse | CommandId::EepromResponse => Outcome::Ignored,
        }
    }

    /// STATUS `[reply_channel, reply_node, kind]`
    fn handle_status<B: ChipBus, A: Application, E: Eeprom>(
        &self,
        node: &mut Node<'_, B, A, E>,
        data: &[u8],
        origin: Origin,
    ) -> Outcome {
        let &[channel, reply_node, kind] = data else {
            return Outcome::Ignored;
        };

        let mut block = [0u8; 16];
        let len = match StatusKind::from_byte(kind) {
            Some(StatusKind::Dynamic) => {
                let device = &node.device;
                let battery = node.app.battery_voltage().to_be_bytes();
                let rx = device.counters.rx_packets.to_be_bytes();
                let tx = device.counters.tx_packets.to_be_bytes();
                let fields = [
                    StatusKind::Dynamic as u8,
                    device.state() as u8,
                    device.tens_of_minutes(),
                    battery[0],
                    battery[1],
                    rx[0],
                    rx[1],
                    tx[0],
                    tx[1],
                ];
                block[..fields.len()].copy_from_slice(&fields);
                fields.len()
            }
            Some(StatusKind::Static) => {
                let id = node.device.identity;
                let fields = [
                    StatusKind::Static as u8,
                    id.cat1,
                    id.cat2,
                    id.num1,
                    id.num2,
                    firmware::VERSION_MAJOR,
                    firmware::VERSION_MINOR,
                ];
                block[..fields.len()].copy_from_slice(&fields);
                fields.len()
            }
            None => {
                block[0] = kind;
                let n = node.app.fetch_status(kind, &mut block[1..]);
                if n == 0 {
                    return Outcome::Unrecognised;
                }
                n + 1
            }
        };

        self.respond(node, channel, reply_node, CommandId::StatusResponse, &block[..len], origin)
    }

    /// ACTIVATE `[channel, node, cat1, cat2, num1, num2]`
    ///
    /// Local activations may omit the identity.
    fn handle_activate<B: ChipBus, A: Application, E: Eeprom>(
        &self,
        node: &mut Node<'_, B, A, E>,
        data: &[u8],
        origin: Origin,
    ) -> Outcome {
        let accepted = match (origin, data.len()) {
            (Origin::Local, 2) | (Origin::Local, 6) => true,
            (Origin::Radio, 6) => node.device.identity.matches(&data[2..]),
            _ => false,
        };
        if !accepted {
            return Outcome::Ignored;
        }

        let device = &mut node.device;
        device.my_channel = data[0];
        device.my_node_id = data[1];
        device.set_state(OperationalState::Active);
        device.rearm_active_window();
        log::info!("activated as node {} on channel {}", data[1], data[0]);
        Outcome::Handled
    }

    fn handle_deactivate<B: ChipBus, A: Application, E: Eeprom>(
        &self,
        node: &mut Node<'_, B, A, E>,
        data: &[u8],
    ) -> Outcome {
        if !data.is_empty() {
            return Outcome::Ignored;
        }
        let device = &mut node.device;
        device.my_channel = 0;
        device.my_node_id = 0;
        device.set_state(OperationalState::Warm);
        Outcome::Handled
    }

    /// SET_TIME `[tom]` or `[ticks_lo, ticks_hi, tom]`
    fn handle_set_time<B: ChipBus, A: Application, E: Eeprom>(
        &self,
        node: &mut Node<'_, B, A, E>,
        data: &[u8],
    ) -> Outcome {
        let (ticks, tom) = match data {
            &[tom] => (None, tom),
            &[lo, hi, tom] => (Some(u16::from_le_bytes([lo, hi])), tom),
            _ => return Outcome::Ignored,
        };
        if tom >= timing::TENS_OF_MINUTES_PER_DAY && tom != timing::TIME_UNKNOWN {
            return Outcome::Ignored;
        }

        let clock = node.device.clock();
        if let Some(ticks) = ticks {
            clock.set_ms_ticks(ticks);
        }
        clock.set_tens_of_minutes(tom);
        Outcome::Handled
    }

    /// SET_DATE `[lo, hi]`
    fn handle_set_date<B: ChipBus, A: Application, E: Eeprom>(
        &self,
        node: &mut Node<'_, B, A, E>,
        data: &[u8],
    ) -> Outcome {
        let &[lo, hi] = data else {
            return Outcome::Ignored;
        };
        node.device.date = u16::from_le_bytes([lo, hi]);
        Outcome::Handled
    }

    /// READ_EEPROM `[reply_channel, reply_node, len, addr_lo, addr_hi]`
    fn handle_read_eeprom<B: ChipBus, A: Application, E: Eeprom>(
        &self,
        node: &mut Node<'_, B, A, E>,
        data: &[u8],
        origin: Origin,
    ) -> Outcome {
        let &[channel, reply_node, len, lo, hi] = data else {
            return Outcome::Ignored;
        };
        let len = len as usize;
        if len == 0 || len > eeprom::MAX_READ {
            return Outcome::Ignored;
        }

        let mut bytes = [0u8; eeprom::MAX_READ];
        if let Err(e) = node
            .eeprom
            .read(u16::from_le_bytes([lo, hi]), &mut bytes[..len])
        {
            log::warn!("eeprom read failed: {:?}", e);
            return Outcome::Ignored;
        }

        self.respond(node, channel, reply_node, CommandId::EepromResponse, &bytes[..len], origin)
    }

    /// WRITE_EEPROM `[len, addr_lo, addr_hi, data...]`
    fn handle_write_eeprom<B: ChipBus, A: Application, E: Eeprom>(
        &self,
        node: &mut Node<'_, B, A, E>,
        data: &[u8],
    ) -> Outcome {
        let [len, lo, hi, bytes @ ..] = data else {
            return Outcome::Ignored;
        };
        if bytes.is_empty() || bytes.len() > eeprom::MAX_WRITE || *len as usize != bytes.len() {
            return Outcome::Ignored;
        }

        match node.eeprom.write(u16::from_le_bytes([*lo, *hi]), bytes) {
            Ok(()) => Outcome::Handled,
            Err(e) => {
                log::warn!("eeprom write failed: {:?}", e);
                Outcome::Ignored
            }
        }
    }

    fn respond<B: ChipBus, A: Application, E: Eeprom>(
        &self,
        node: &mut Node<'_, B, A, E>,
        channel: u8,
        reply_node: u8,
        command: CommandId,
        data: &[u8],
        origin: Origin,
    ) -> Outcome {
        let Ok(packet) = Packet::with_data(reply_node, command as u8, data) else {
            return Outcome::Ignored;
        };

        match origin {
            Origin::Local => Outcome::Response { channel, packet },
            Origin::Radio => {
                if !node.radio.send(&mut node.device, channel, &packet) {
                    log::warn!("{:?} for node {} not sent", command, reply_node);
                }
                Outcome::Handled
            }
        }
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
