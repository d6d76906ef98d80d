pub mod ingress;
pub mod reader;
pub mod reply;
pub mod traits;

pub use ingress::{Ingress, IngressParser};
pub use reader::{ReplyWriter, SerialReader};
pub use reply::{ErrorCode, Reply, ReplySerialiser};
#[cfg(feature = "embedded")]
pub use traits::IoSerial;
pub use traits::{SerialError, SerialPort};
