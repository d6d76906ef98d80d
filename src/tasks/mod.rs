//! Embassy tasks module
//!
//! One task per concern. The link task owns the controller; the others feed
//! it through the signals and channels declared here.

pub mod admin;
pub mod irq;
pub mod led;
pub mod link;
pub mod serial;
pub mod timer;

pub use admin::{admin_task, AdminCommand, AdminReceiver, ADMIN_CHANNEL};
pub use irq::irq_task;
pub use led::{led_task, LedReceiver, LedSender, LED_CHANNEL};
pub use link::{link_task, LINK_WAKE};
pub use serial::{serial_task, REPLY_CHANNEL, SERIAL_RX_CHANNEL};
pub use timer::timer_task;
