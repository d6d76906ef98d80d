//! RX/TX engine
//!
//! Moves whole frames between the chip FIFOs and the codec. Failures are
//! counted and logged; callers only see whether a packet moved.

use crate::config::radio::FRAME_SIZE;
use crate::device::context::{Device, OperationalState};
use crate::packet::{codec, Frame, Packet};
use crate::radio::chip::{ChipState, FifoClear, Si4463};
use crate::radio::traits::ChipBus;
use crate::radio::transaction::{Transceiver, TransactionError};

/// Reasons a send was not attempted or did not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// Chip could not be powered up
    PowerFailure,
    /// Chip busy in another state (raw state nibble)
    NotReady(u8),
    /// Not enough TX FIFO space for a frame
    FifoFull(u8),
    Transaction(TransactionError),
}

impl From<TransactionError> for SendError {
    fn from(e: TransactionError) -> Self {
        SendError::Transaction(e)
    }
}

/// The radio: chip commands plus power bookkeeping
pub struct Radio<B: ChipBus> {
    chip: Si4463<B>,
    powered: bool,
}

impl<B: ChipBus> Radio<B> {
    pub fn new(bus: B) -> Self {
        Self {
            chip: Si4463::new(Transceiver::new(bus)),
            powered: false,
        }
    }

    pub fn chip(&mut self) -> &mut Si4463<B> {
        &mut self.chip
    }

    pub fn bus(&self) -> &B {
        self.chip.transceiver().bus()
    }

    pub fn bus_mut(&mut self) -> &mut B {
        self.chip.transceiver_mut().bus_mut()
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Power the chip up on first use. Failure puts the device into ERROR.
    pub fn ensure_powered(&mut self, device: &mut Device<'_>) -> bool {
        if self.powered {
            return true;
        }

        match self.chip.power_up(device.config.xtal_hz) {
            Ok(()) => {
                self.powered = true;
                if let Err(e) = self.chip.enable_rx_interrupt() {
                    log::warn!("interrupt setup: {}", e);
                    device.note_chip_error();
                }
                match self.chip.part_info() {
                    Ok(part) => {
                        log::info!("Si{:04x} rev {:#04x} powered up", part.part, part.chip_rev);
                        device.chip.part = Some(part);
                    }
                    Err(e) => {
                        log::warn!("part info: {}", e);
                        device.note_chip_error();
                    }
                }
                true
            }
            Err(e) => {
                log::warn!("power up failed: {}", e);
                device.note_chip_error();
                device.set_state(OperationalState::Error);
                false
            }
        }
    }

    /// Pull one frame if the RX FIFO holds one, then make sure the chip is
    /// listening on `channel`.
    pub fn receive(&mut self, device: &mut Device<'_>, channel: u8) -> Option<Frame> {
        if !self.ensure_powered(device) {
            return None;
        }

        let mut received = None;
        match self.chip.fifo_info(FifoClear::None) {
            Ok(fifo) => {
                device.chip.fifo = fifo;
                if fifo.rx_count as usize >= FRAME_SIZE {
                    received = self.pull_frame(device);
                }
            }
            Err(e) => {
                log::debug!("fifo info: {}", e);
                device.note_chip_error();
            }
        }

        if let Err(e) = self.ensure_rx(device, channel) {
            log::debug!("start rx on {}: {}", channel, e);
            device.note_chip_error();
        }

        received
    }

    fn pull_frame(&mut self, device: &mut Device<'_>) -> Option<Frame> {
        let raw = match self.chip.read_rx_fifo() {
            Ok(raw) => raw,
            Err(e) => {
                log::debug!("read rx fifo: {}", e);
                device.note_chip_error();
                return None;
            }
        };

        match codec::decode(&raw) {
            Ok(frame) => {
                device.counters.rx_packets = device.counters.rx_packets.wrapping_add(1);
                device.saw_rx = true;
                if let Some(ticks) = frame.trusted_ticks() {
                    device.clock().set_ms_ticks(ticks);
                }
                device.clock().rearm_irq();
                log::debug!(
                    "rx node {} cmd {} len {}",
                    frame.packet.node,
                    frame.packet.cmd,
                    frame.packet.len()
                );
                Some(frame)
            }
            Err(e) => {
                device.counters.bad_frames = device.counters.bad_frames.wrapping_add(1);
                log::warn!("dropped frame: {}", e);
                // resynchronise on the next whole frame
                if self.chip.fifo_info(FifoClear::Rx).is_err() {
                    device.note_chip_error();
                }
                None
            }
        }
    }

    /// Retune to `channel` unless already receiving there or mid-transmit
    fn ensure_rx(&mut self, device: &mut Device<'_>, channel: u8) -> Result<(), TransactionError> {
        let current = self.chip.request_device_state()?;
        device.chip.state = current.state;
        device.chip.channel = current.channel;

        match current.chip_state() {
            Some(ChipState::Rx) if current.channel == channel => Ok(()),
            Some(state) if state.is_transmitting() => Ok(()),
            _ => {
                log::debug!("tune rx channel {}", channel);
                self.chip.start_rx(channel)?;
                device.chip.state = ChipState::Rx as u8;
                device.chip.channel = channel;
                Ok(())
            }
        }
    }

    /// Transmit `packet` on `channel`. Returns false, leaving the caller's
    /// queue untouched, on any precondition or transaction failure.
    pub fn send(&mut self, device: &mut Device<'_>, channel: u8, packet: &Packet) -> bool {
        match self.try_send(device, channel, packet) {
            Ok(()) => {
                device.counters.tx_packets = device.counters.tx_packets.wrapping_add(1);
                true
            }
            Err(e) => {
                if let SendError::Transaction(_) = e {
                    device.note_chip_error();
                }
                log::debug!("send on {} deferred: {:?}", channel, e);
                false
            }
        }
    }

    fn try_send(
        &mut self,
        device: &mut Device<'_>,
        channel: u8,
        packet: &Packet,
    ) -> Result<(), SendError> {
        if !self.ensure_powered(device) {
            return Err(SendError::PowerFailure);
        }

        let current = self.chip.request_device_state()?;
        device.chip.state = current.state;
        match current.chip_state() {
            Some(ChipState::Ready) | Some(ChipState::Rx) => {}
            _ => return Err(SendError::NotReady(current.state)),
        }

        let fifo = self.chip.fifo_info(FifoClear::None)?;
        device.chip.fifo = fifo;
        if (fifo.tx_space as usize) < FRAME_SIZE {
            return Err(SendError::FifoFull(fifo.tx_space));
        }

        let frame = codec::encode(device.clock().ms_ticks(), packet);
        self.chip.write_tx_fifo(&frame)?;

        let post_state = if packet.solicits_reply() {
            ChipState::Rx
        } else {
            ChipState::Ready
        };
        self.chip.start_tx(channel, post_state)?;
        device.chip.channel = channel;

        log::debug!("tx channel {} node {} cmd {}", channel, packet.node, packet.cmd);
        Ok(())
    }

    /// Refresh the interrupt and chip status snapshot
    pub fn refresh_status(&mut self, device: &mut Device<'_>) -> Result<(), TransactionError> {
        device.chip.interrupts = self.chip.interrupt_status()?;
        device.chip.status = self.chip.chip_status()?;
        Ok(())
    }
}
