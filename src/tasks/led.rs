//! Heartbeat LED task
//!
//! The timer task sends the pattern bit for each heartbeat step; this task
//! drives the pin so the tick path never touches GPIO.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use esp_hal::gpio::Output;

/// Type alias for the LED level channel sender
pub type LedSender = Sender<'static, CriticalSectionRawMutex, bool, 4>;

/// Type alias for the LED level channel receiver
pub type LedReceiver = Receiver<'static, CriticalSectionRawMutex, bool, 4>;

/// Heartbeat levels, true = lit
pub static LED_CHANNEL: Channel<CriticalSectionRawMutex, bool, 4> = Channel::new();

pub async fn led_task(mut led: Output<'static>, receiver: LedReceiver) {
    loop {
        // active low
        if receiver.receive().await {
            led.set_low();
        } else {
            led.set_high();
        }
    }
}
