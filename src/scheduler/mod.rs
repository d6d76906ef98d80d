pub mod channel;
pub mod controller;

pub use channel::{Channel, ChannelState, ChannelTable};
pub use controller::{Controller, CMD_SET_CHANNEL};
