//! Chip notification line (nIRQ)

use esp_hal::gpio::Input;

use crate::device::clock::Clock;

use super::link::LINK_WAKE;

/// Wait for nIRQ edges and wake the link task when the line is armed
pub async fn irq_task(clock: &'static Clock, mut nirq: Input<'static>) {
    loop {
        nirq.wait_for_falling_edge().await;
        if clock.on_chip_irq() {
            LINK_WAKE.signal(());
        }
    }
}
