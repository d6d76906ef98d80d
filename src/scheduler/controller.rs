//! Controller: a node with a serial front-end and a transmit scheduler
//!
//! Packets typed on the serial line land in the channel table. Each pass the
//! scheduler picks one queued channel, sends it, and ages the rest so that
//! every channel is eventually served. A request that solicits a reply pins
//! its channel until the reply is heard or the wait runs out; while pinned,
//! nothing else is transmitted.

use crate::config::scheduler::{BROADCAST_CHANNEL, BROADCAST_PRIORITY, INITIAL_CHANNELS};
use crate::config::serial::OUTBOX_SIZE;
use crate::device::context::OperationalState;
use crate::device::node::Node;
use crate::dispatcher::handler::{CommandDispatcher, Origin, Outcome};
use crate::dispatcher::traits::{Application, Eeprom};
use crate::packet::{CommandId, Frame, Packet, StatusKind, APPLICATION_BASE, BROADCAST_NODE};
use crate::radio::traits::ChipBus;
use crate::scheduler::channel::{base_priority, bump_priority, ChannelState, ChannelTable};
use crate::serial::ingress::{Ingress, IngressParser};
use crate::serial::reply::{ErrorCode, Reply};
use heapless::Deque;

/// Controller-only command: `[channel, config]` with config 0 = disabled,
/// 1 = receive only, 2 = enabled
pub const CMD_SET_CHANNEL: u8 = APPLICATION_BASE;

pub struct Controller<'a, B: ChipBus, A: Application, E: Eeprom> {
    pub node: Node<'a, B, A, E>,
    pub channels: ChannelTable,
    ingress: IngressParser,
    outbox: Deque<Reply, OUTBOX_SIZE>,
    /// ms_ticks modulo seen by the previous scheduler tick
    last_modulo: u16,
    reset_requested: bool,
}

impl<'a, B: ChipBus, A: Application, E: Eeprom> Controller<'a, B, A, E> {
    pub fn new(node: Node<'a, B, A, E>) -> Self {
        let mut channels = ChannelTable::new();
        for index in 0..INITIAL_CHANNELS {
            channels.configure(index, ChannelState::Empty);
        }
        Self {
            node,
            channels,
            ingress: IngressParser::new(),
            outbox: Deque::new(),
            last_modulo: 0,
            reset_requested: false,
        }
    }

    /// Feed one byte from the serial line
    pub fn feed_serial(&mut self, byte: u8) {
        let Some(ingress) = self.ingress.push(byte, &mut self.channels) else {
            return;
        };
        let reply = match ingress {
            Ingress::Submit { channel, packet } => self.enqueue(channel, packet),
            Ingress::LocalStatus(kind) => self.local_status(kind),
            Ingress::Reset => {
                log::warn!("reset requested on serial");
                self.reset_requested = true;
                Reply::Ack
            }
            Ingress::Error(code) => self.error(code),
        };
        self.emit(reply);
    }

    /// Next line for the serial port
    pub fn take_reply(&mut self) -> Option<Reply> {
        self.outbox.pop_front()
    }

    /// Whether `>R` was received since the last call
    pub fn take_reset_request(&mut self) -> bool {
        core::mem::take(&mut self.reset_requested)
    }

    /// Queue `packet` on channel `index`, or run it here when it is
    /// addressed to this controller
    pub fn enqueue(&mut self, index: usize, packet: Packet) -> Reply {
        let state = self.node.device.state();
        let Some(slot_state) = self.channels.get(index).map(|slot| slot.state) else {
            return self.error(ErrorCode::InvalidChannel);
        };
        if !slot_state.is_addressable() {
            return self.error(ErrorCode::InvalidChannel);
        }

        let activating =
            packet.cmd == CommandId::Activate as u8 && state < OperationalState::Active;
        if packet.node == self.node.device.my_node_id || activating {
            let reply = self.execute_local(&packet);
            self.channels.release(index);
            return reply;
        }

        if state != OperationalState::Active {
            if let Some(slot) = self.channels.get_mut(index) {
                slot.clear();
            }
            let code = if state == OperationalState::Error {
                ErrorCode::PowerFailure
            } else {
                ErrorCode::NotActive
            };
            return self.error(code);
        }

        let Some(slot) = self.channels.get_mut(index) else {
            return self.error(ErrorCode::InvalidChannel);
        };
        if slot.state == ChannelState::AwaitReply {
            return self.error(ErrorCode::Busy);
        }
        if slot.state.is_queued() {
            log::warn!(
                "channel {} replaced queued node {} cmd {}",
                index,
                slot.packet.node,
                slot.packet.cmd
            );
            let counters = &mut self.node.device.counters;
            counters.displaced = counters.displaced.wrapping_add(1);
        }

        slot.state = if packet.solicits_reply() {
            ChannelState::TransmitAwaitReply
        } else {
            ChannelState::Transmit
        };
        slot.priority = if slot.priority == 0 {
            base_priority(index)
        } else {
            bump_priority(slot.priority)
        };
        log::debug!(
            "queued node {} cmd {} on {} at priority {}",
            packet.node,
            packet.cmd,
            index,
            slot.priority
        );
        slot.packet = packet;
        // serial traffic keeps the active window open
        self.node.device.saw_rx = true;
        Reply::Ack
    }

    /// Run a packet addressed to this controller
    pub fn execute_local(&mut self, packet: &Packet) -> Reply {
        if packet.cmd == CMD_SET_CHANNEL {
            return self.set_channel(&packet.data);
        }

        match CommandDispatcher::new().dispatch(&mut self.node, packet, Origin::Local) {
            Outcome::Handled => Reply::Ack,
            Outcome::Response {
                channel,
                mut packet,
            } => {
                packet.node = self.node.device.my_node_id;
                Reply::Packet {
                    channel,
                    ticks: self.node.device.clock().ms_ticks(),
                    packet,
                }
            }
            Outcome::Ignored | Outcome::Unrecognised => self.error(ErrorCode::BadCommand),
        }
    }

    /// `>S` / `>T`: this controller's own status block
    pub fn local_status(&mut self, kind: StatusKind) -> Reply {
        let request = Packet {
            node: self.node.device.my_node_id,
            cmd: CommandId::Status as u8,
            data: heapless::Vec::from_slice(&[0, BROADCAST_NODE, kind as u8]).unwrap_or_default(),
        };
        self.execute_local(&request)
    }

    fn set_channel(&mut self, data: &[u8]) -> Reply {
        let &[index, config] = data else {
            return self.error(ErrorCode::BadCommand);
        };
        match ChannelState::from_config(config) {
            Some(state) if self.channels.configure(index as usize, state) => {
                log::info!("channel {} set to {:?}", index, state);
                Reply::Ack
            }
            _ => self.error(ErrorCode::BadCommand),
        }
    }

    /// One main-loop pass
    pub fn pass(&mut self) {
        if let Some(index) = self.channels.awaiting() {
            self.poll_reply(index, true);
            self.node.run_timers();
        } else if let Some(frame) = self.node.run_pass() {
            let channel = self.node.device.my_channel;
            self.forward(channel, frame);
        }
        self.scheduler_tick();
    }

    /// Frame signalled by the chip between passes
    pub fn service_irq(&mut self) {
        match self.channels.awaiting() {
            Some(index) => {
                if self.node.device.clock().take_irq_fired() {
                    self.poll_reply(index, false);
                }
            }
            None => {
                if let Some(frame) = self.node.service_irq() {
                    let channel = self.node.device.my_channel;
                    self.forward(channel, frame);
                }
            }
        }
    }

    /// Pick and send at most one queued packet. Returns the channel tried.
    pub fn scheduler_tick(&mut self) -> Option<usize> {
        if !self.node.device.state().is_awake() {
            return None;
        }
        if self.channels.awaiting().is_some() {
            // keep the broadcast phase current so it does not fire late
            self.last_modulo = self.broadcast_phase();
            self.channels.age(None);
            return None;
        }

        let broadcast = self.broadcast_due();
        let selected = broadcast.or_else(|| self.channels.select());
        if let Some(index) = selected {
            self.transmit(index);
        }
        self.channels.age(selected);
        selected
    }

    /// Load the time broadcast when ms_ticks wraps the broadcast modulus
    fn broadcast_due(&mut self) -> Option<usize> {
        let modulo = self.broadcast_phase();
        let wrapped = modulo < self.last_modulo;
        self.last_modulo = modulo;
        if !wrapped {
            return None;
        }

        let tom = self.node.device.tens_of_minutes();
        let slot = self.channels.get_mut(BROADCAST_CHANNEL)?;
        if slot.state != ChannelState::Empty {
            return None;
        }
        slot.packet = Packet {
            node: BROADCAST_NODE,
            cmd: CommandId::SetTime as u8,
            data: heapless::Vec::from_slice(&[tom]).unwrap_or_default(),
        };
        slot.state = ChannelState::Transmit;
        slot.priority = BROADCAST_PRIORITY;
        log::debug!("time broadcast {}", tom);
        Some(BROADCAST_CHANNEL)
    }

    fn broadcast_phase(&self) -> u16 {
        let device = &self.node.device;
        device.clock().ms_ticks() % device.config.time_broadcast_modulo_ms.max(1)
    }

    fn transmit(&mut self, index: usize) {
        let Some(packet) = self.channels.get(index).map(|slot| slot.packet.clone()) else {
            return;
        };
        let sent = self.node.radio.send(&mut self.node.device, index as u8, &packet);
        let wait = self.node.device.config.reply_wait_passes;
        let Some(slot) = self.channels.get_mut(index) else {
            return;
        };

        if !sent {
            slot.priority = base_priority(index);
            if self.node.device.state() == OperationalState::Error {
                self.emit(self.error(ErrorCode::PowerFailure));
            }
        } else if slot.state == ChannelState::TransmitAwaitReply {
            slot.state = ChannelState::AwaitReply;
            slot.priority = 0;
            slot.reply_wait = wait;
            self.node.device.clock().use_irq(true);
        } else {
            slot.clear();
        }
    }

    /// Listen on a pinned channel. Only passes count down the wait.
    fn poll_reply(&mut self, index: usize, count_down: bool) {
        let frame = self.node.radio.receive(&mut self.node.device, index as u8);
        let is_reply = frame.as_ref().is_some_and(|f| is_response(&f.packet));

        let Some(slot) = self.channels.get_mut(index) else {
            return;
        };
        if let (true, Some(frame)) = (is_reply, frame) {
            let mut packet = frame.packet;
            packet.node = slot.packet.node;
            slot.clear();
            self.node.device.clock().use_irq(false);
            self.emit(Reply::Packet {
                channel: index as u8,
                ticks: frame.ticks,
                packet,
            });
            return;
        }

        if count_down {
            slot.reply_wait = slot.reply_wait.saturating_sub(1);
            if slot.reply_wait == 0 {
                log::warn!("no reply from node {} on {}", slot.packet.node, index);
                slot.clear();
                self.node.device.clock().use_irq(false);
            }
        }
    }

    /// Pass responses heard while listening up to the host
    fn forward(&mut self, channel: u8, frame: Frame) {
        if is_response(&frame.packet) {
            self.emit(Reply::Packet {
                channel,
                ticks: frame.ticks,
                packet: frame.packet,
            });
        }
    }

    fn error(&self, code: ErrorCode) -> Reply {
        Reply::error(code, self.node.device.state())
    }

    fn emit(&mut self, reply: Reply) {
        if self.outbox.is_full() {
            log::warn!("serial outbox full, dropping oldest reply");
            self.outbox.pop_front();
        }
        let _ = self.outbox.push_back(reply);
    }
}

fn is_response(packet: &Packet) -> bool {
    matches!(
        packet.command(),
        Some(CommandId::StatusResponse | CommandId::EepromResponse)
    )
}
