pub mod chip;
#[cfg(feature = "embedded")]
pub mod driver;
pub mod link;
pub mod traits;
pub mod transaction;

pub use chip::{ChipState, FifoClear, Si4463};
#[cfg(feature = "embedded")]
pub use driver::{Si4463Pins, SpiChipBus};
pub use link::Radio;
pub use traits::{BusError, ChipBus};
pub use transaction::{Transceiver, TransactionError};
