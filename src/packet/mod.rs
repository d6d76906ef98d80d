pub mod codec;
pub mod types;

pub use codec::{decode, encode, Frame, FrameError};
pub use types::{CommandId, Packet, PacketError, StatusKind, APPLICATION_BASE, BROADCAST_NODE};
