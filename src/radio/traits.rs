//! Transceiver bus trait for abstraction and testability
//!
//! This trait defines the byte-level interface to the Si4463,
//! allowing the SPI driver to be swapped with a simulated chip for testing.

/// Errors that can occur exchanging bytes with the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// SPI transfer failed
    SpiError,
    /// Chip-select line could not be driven
    SelectError,
}

/// Abstract chip bus interface
///
/// One `select`/`deselect` pair brackets one chip session. The transaction
/// layer is the only caller.
pub trait ChipBus {
    /// Assert chip select (start of a session)
    fn select(&mut self) -> Result<(), BusError>;

    /// Release chip select (end of a session)
    fn deselect(&mut self) -> Result<(), BusError>;

    /// Clock one byte out and return the byte clocked in
    fn transfer(&mut self, byte: u8) -> Result<u8, BusError>;
}
