//! Periodic tick for the logical clock
//!
//! The period is re-read every tick, so a power mode change takes effect on
//! the next one.

use embassy_time::{Duration, Timer};

use crate::device::clock::Clock;

use super::led::LedSender;
use super::link::LINK_WAKE;

pub async fn timer_task(clock: &'static Clock, led_sender: LedSender) {
    loop {
        Timer::after(Duration::from_millis(clock.period_ms() as u64)).await;

        if let Some(level) = clock.on_timer_tick() {
            let _ = led_sender.try_send(level);
        }
        LINK_WAKE.signal(());
    }
}
