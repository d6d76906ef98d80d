//! Si4463 SPI bus adapter
//!
//! Implements [`ChipBus`] over a blocking embedded-hal SPI bus with a
//! manually driven nSEL line. The SDN pin is held low to keep the chip out of
//! shutdown.

use crate::radio::traits::{BusError, ChipBus};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

/// Chip select and shutdown pins
pub struct Si4463Pins<Nsel, Sdn> {
    pub nsel: Nsel,
    pub sdn: Sdn,
}

/// Byte-level bus to a Si4463
pub struct SpiChipBus<Spi, Nsel, Sdn>
where
    Spi: SpiBus,
    Nsel: OutputPin,
    Sdn: OutputPin,
{
    spi: Spi,
    nsel: Nsel,
    sdn: Sdn,
}

impl<Spi, Nsel, Sdn> SpiChipBus<Spi, Nsel, Sdn>
where
    Spi: SpiBus,
    Nsel: OutputPin,
    Sdn: OutputPin,
{
    pub fn new(spi: Spi, pins: Si4463Pins<Nsel, Sdn>) -> Self {
        Self {
            spi,
            nsel: pins.nsel,
            sdn: pins.sdn,
        }
    }

    /// Pulse SDN to cold-reset the chip. POWER_UP must follow.
    pub fn reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), BusError> {
        self.nsel.set_high().map_err(|_| BusError::SelectError)?;
        self.sdn.set_high().map_err(|_| BusError::SelectError)?;
        delay.delay_us(100);
        self.sdn.set_low().map_err(|_| BusError::SelectError)?;
        // POR settles within 6 ms
        delay.delay_ms(10);
        Ok(())
    }
}

impl<Spi, Nsel, Sdn> ChipBus for SpiChipBus<Spi, Nsel, Sdn>
where
    Spi: SpiBus,
    Nsel: OutputPin,
    Sdn: OutputPin,
{
    fn select(&mut self) -> Result<(), BusError> {
        self.nsel.set_low().map_err(|_| BusError::SelectError)
    }

    fn deselect(&mut self) -> Result<(), BusError> {
        self.spi.flush().map_err(|_| BusError::SpiError)?;
        self.nsel.set_high().map_err(|_| BusError::SelectError)
    }

    fn transfer(&mut self, byte: u8) -> Result<u8, BusError> {
        let mut buf = [byte];
        self.spi
            .transfer_in_place(&mut buf)
            .map_err(|_| BusError::SpiError)?;
        Ok(buf[0])
    }
}
