//! Link task: the cooperative main loop
//!
//! Owns the controller. Wakes on every timer tick, on an armed nIRQ edge and
//! on host input, then runs whatever is due: host bytes, a pending chip
//! frame, the main pass and the once-a-second housekeeping.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use crate::dispatcher::{Application, Eeprom};
use crate::radio::ChipBus;
use crate::scheduler::Controller;

use super::admin::{AdminCommand, ADMIN_CHANNEL};
use super::serial::{REPLY_CHANNEL, SERIAL_RX_CHANNEL};

/// Raised by the timer and nIRQ tasks
pub static LINK_WAKE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

pub async fn link_task<B: ChipBus, A: Application, E: Eeprom>(
    mut controller: Controller<'static, B, A, E>,
) {
    let clock = controller.node.device.clock();
    log::info!("link up, node {}", controller.node.device.my_node_id);

    loop {
        if let Either::Second(chunk) = select(LINK_WAKE.wait(), SERIAL_RX_CHANNEL.receive()).await {
            for &byte in chunk.iter() {
                controller.feed_serial(byte);
            }
        }

        controller.service_irq();
        if clock.take_pass_due() {
            controller.pass();
        }
        controller.node.housekeeping();

        while let Some(reply) = controller.take_reply() {
            if REPLY_CHANNEL.try_send(reply).is_err() {
                log::warn!("serial writer behind, reply dropped");
            }
        }

        if controller.take_reset_request() {
            ADMIN_CHANNEL.send(AdminCommand::Reboot).await;
        }
    }
}
