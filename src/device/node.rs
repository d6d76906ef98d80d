//! One node on the link: radio, device context and collaborators
//!
//! `run_pass` is the body of the cooperative main loop. It runs once each
//! time the clock raises "pass due".

use crate::device::context::{Device, OperationalState};
use crate::dispatcher::handler::{CommandDispatcher, Origin};
use crate::dispatcher::traits::{Application, Eeprom};
use crate::packet::{Frame, BROADCAST_NODE};
use crate::radio::link::Radio;
use crate::radio::traits::ChipBus;

pub struct Node<'a, B: ChipBus, A: Application, E: Eeprom> {
    pub radio: Radio<B>,
    pub device: Device<'a>,
    pub app: A,
    pub eeprom: E,
}

impl<'a, B: ChipBus, A: Application, E: Eeprom> Node<'a, B, A, E> {
    pub fn new(radio: Radio<B>, device: Device<'a>, app: A, eeprom: E) -> Self {
        Self {
            radio,
            device,
            app,
            eeprom,
        }
    }

    /// One pass of the operational state machine.
    ///
    /// Returns the frame heard this pass, if any, after it has been
    /// dispatched when addressed to this node.
    pub fn run_pass(&mut self) -> Option<Frame> {
        self.step(true)
    }

    /// A pass that advances the state timers without listening
    pub fn run_timers(&mut self) {
        self.step(false);
    }

    fn step(&mut self, listen: bool) -> Option<Frame> {
        match self.device.state() {
            OperationalState::Error => {
                self.device.set_state(OperationalState::Warm);
                None
            }
            OperationalState::Startup | OperationalState::Cold | OperationalState::Warm => {
                self.device.set_state(OperationalState::Listen);
                None
            }
            OperationalState::LowBattery => {
                if self.app.battery_ok() {
                    self.device.set_state(OperationalState::Warm);
                } else {
                    let wait = Device::ticks(
                        self.device.config.warm_sleep_ms,
                        self.device.config.slow_period_ms,
                    );
                    self.device.clock().arm_pass(wait);
                }
                None
            }
            OperationalState::Listen | OperationalState::Active => {
                let frame = if listen {
                    let channel = self.device.my_channel;
                    let frame = self.radio.receive(&mut self.device, channel);
                    if let Some(frame) = &frame {
                        self.accept(frame);
                    }
                    frame
                } else {
                    None
                };
                self.device.tick_window();
                frame
            }
        }
    }

    /// Take a frame signalled by the chip notification line between passes
    pub fn service_irq(&mut self) -> Option<Frame> {
        if !self.device.clock().take_irq_fired() || !self.device.state().is_awake() {
            return None;
        }
        let channel = self.device.my_channel;
        let frame = self.radio.receive(&mut self.device, channel)?;
        self.accept(&frame);
        Some(frame)
    }

    /// Once-a-second application housekeeping and chip status snapshot
    pub fn housekeeping(&mut self) {
        if !self.device.clock().take_second_elapsed() {
            return;
        }
        self.app.on_second();
        if self.radio.is_powered() && self.device.state().is_awake() {
            if let Err(e) = self.radio.refresh_status(&mut self.device) {
                log::warn!("chip status refresh: {}", e);
                self.device.note_chip_error();
            }
        }
    }

    /// Application request to drop into LOW_BATTERY
    pub fn request_low_battery(&mut self) {
        log::warn!("low battery");
        self.device.set_state(OperationalState::LowBattery);
    }

    fn accept(&mut self, frame: &Frame) {
        let node = frame.packet.node;
        if node == BROADCAST_NODE || node == self.device.my_node_id {
            CommandDispatcher::new().dispatch(self, &frame.packet, Origin::Radio);
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! Node wired to simulated collaborators

    use super::*;
    use crate::device::clock::Clock;
    use crate::device::context::{Identity, LinkConfig};
    use crate::dispatcher::traits::mock::RecordingApp;
    use crate::dispatcher::traits::MemoryEeprom;
    use crate::radio::traits::mock::MockChip;

    pub type TestNode<'a> = Node<'a, MockChip, RecordingApp, MemoryEeprom<64>>;

    pub const IDENTITY: Identity = Identity {
        cat1: 0x10,
        cat2: 0x20,
        num1: 0x30,
        num2: 0x40,
    };

    pub fn node(clock: &Clock) -> TestNode<'_> {
        node_with(clock, LinkConfig::default())
    }

    pub fn node_with(clock: &Clock, config: LinkConfig) -> TestNode<'_> {
        Node::new(
            Radio::new(MockChip::new()),
            Device::new(clock, IDENTITY, config),
            RecordingApp::new(),
            MemoryEeprom::new(),
        )
    }

    /// Node already ACTIVE on `channel` as `node_id`
    pub fn active_node(clock: &Clock, channel: u8, node_id: u8) -> TestNode<'_> {
        let mut n = node(clock);
        n.device.set_state(OperationalState::Active);
        n.device.my_channel = channel;
        n.device.my_node_id = node_id;
        n
    }
}
