//! Admin task for system commands
//!
//! Handles `>R` from the host line, after the acknowledgement has gone out.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use embassy_time::{Duration, Timer};

/// Admin command types
#[derive(Clone, Copy, Debug)]
pub enum AdminCommand {
    /// Restart the firmware
    Reboot,
}

/// Channel for admin commands
pub static ADMIN_CHANNEL: Channel<CriticalSectionRawMutex, AdminCommand, 4> = Channel::new();

/// Type alias for the admin command receiver
pub type AdminReceiver = Receiver<'static, CriticalSectionRawMutex, AdminCommand, 4>;

fn reboot() -> ! {
    esp_hal::system::software_reset()
}

pub async fn admin_task(receiver: AdminReceiver) {
    loop {
        match receiver.receive().await {
            AdminCommand::Reboot => {
                log::warn!("rebooting");
                // let the writer drain the acknowledgement
                Timer::after(Duration::from_millis(500)).await;
                reboot();
            }
        }
    }
}
