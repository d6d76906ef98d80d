pub mod handler;
pub mod traits;

pub use handler::{CommandDispatcher, Origin, Outcome};
pub use traits::{Application, Eeprom, EepromError, Handling, MemoryEeprom, NullApplication};
