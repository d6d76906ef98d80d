//! Bounded-retry request/response transactions with the transceiver
//!
//! Every chip command is one transaction: write the request in a single
//! chip-select session, then poll READ_CMD_BUFF until the chip reports
//! clear-to-send and clock out the response in that same probe session.
//! Blocking; call only from the main loop, never from an interrupt.

use crate::config::radio::{CTS_PROBE_LIMIT, MAX_RESPONSE};
use crate::radio::chip::{cmd, CTS_BUSY, CTS_READY};
use crate::radio::traits::{BusError, ChipBus};
use heapless::Vec;

/// Response bytes returned by a transaction
pub type Response = Vec<u8, MAX_RESPONSE>;

/// Errors that can occur during a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionError {
    /// Bus failure while writing the request
    Write,
    /// Bus failure while probing for clear-to-send
    StatusProbe,
    /// Probe answered with neither CTS nor busy
    Ack,
    /// Bus failure while reading the response
    Read,
    /// Probe limit reached without clear-to-send
    Timeout,
    /// Request or response longer than the command allows; nothing was sent
    TooLong,
}

impl core::fmt::Display for TransactionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            TransactionError::Write => "write failed",
            TransactionError::StatusProbe => "status probe failed",
            TransactionError::Ack => "bad CTS acknowledgement",
            TransactionError::Read => "response read failed",
            TransactionError::Timeout => "timed out waiting for CTS",
            TransactionError::TooLong => "request too long for the command",
        };
        f.write_str(text)
    }
}

/// Owns the bus and runs one transaction at a time
pub struct Transceiver<B: ChipBus> {
    bus: B,
    probe_limit: u16,
}

impl<B: ChipBus> Transceiver<B> {
    /// Create a transceiver with the default probe limit
    pub fn new(bus: B) -> Self {
        Self::with_probe_limit(bus, CTS_PROBE_LIMIT)
    }

    pub fn with_probe_limit(bus: B, probe_limit: u16) -> Self {
        Self { bus, probe_limit }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Send `request` and collect `response_len` bytes once the chip is ready
    pub fn transact(
        &mut self,
        request: &[u8],
        response_len: usize,
    ) -> Result<Response, TransactionError> {
        if response_len > MAX_RESPONSE {
            return Err(TransactionError::Read);
        }

        self.write(request)?;

        for _ in 0..self.probe_limit {
            if let Some(response) = self.probe(response_len)? {
                return Ok(response);
            }
        }

        log::warn!(
            "chip command {:#04x}: no CTS after {} probes",
            request.first().copied().unwrap_or(0),
            self.probe_limit
        );
        Err(TransactionError::Timeout)
    }

    fn write(&mut self, request: &[u8]) -> Result<(), TransactionError> {
        self.session(TransactionError::Write, |bus| {
            for &byte in request {
                bus.transfer(byte).map_err(|_| TransactionError::Write)?;
            }
            Ok(())
        })
    }

    /// One READ_CMD_BUFF probe; `None` when the chip is still busy
    fn probe(&mut self, response_len: usize) -> Result<Option<Response>, TransactionError> {
        self.session(TransactionError::StatusProbe, |bus| {
            bus.transfer(cmd::READ_CMD_BUFF)
                .map_err(|_| TransactionError::StatusProbe)?;
            let cts = bus.transfer(0xFF).map_err(|_| TransactionError::StatusProbe)?;

            match cts {
                CTS_READY => {
                    let mut response = Response::new();
                    for _ in 0..response_len {
                        let byte = bus.transfer(0xFF).map_err(|_| TransactionError::Read)?;
                        // bounded by the MAX_RESPONSE check in transact
                        let _ = response.push(byte);
                    }
                    Ok(Some(response))
                }
                CTS_BUSY => Ok(None),
                _ => Err(TransactionError::Ack),
            }
        })
    }

    /// Run `f` with chip select asserted, releasing it on every path
    fn session<T>(
        &mut self,
        select_error: TransactionError,
        f: impl FnOnce(&mut B) -> Result<T, TransactionError>,
    ) -> Result<T, TransactionError> {
        self.bus.select().map_err(|_: BusError| select_error)?;
        let result = f(&mut self.bus);
        let released = self.bus.deselect();
        let value = result?;
        released.map_err(|_| select_error)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::chip::ChipState;
    use crate::radio::traits::mock::MockChip;

    #[test]
    fn test_transact_returns_response() {
        let mut xcvr = Transceiver::new(MockChip::new());
        xcvr.transact(&[cmd::POWER_UP, 0x01, 0x00], 0).unwrap();

        let response = xcvr.transact(&[cmd::REQUEST_DEVICE_STATE], 2).unwrap();
        assert_eq!(response.as_slice(), &[ChipState::Ready as u8, 0]);
    }

    #[test]
    fn test_transact_retries_until_cts() {
        let mut chip = MockChip::new();
        chip.cts_delay = 25;
        let mut xcvr = Transceiver::new(chip);

        let response = xcvr.transact(&[cmd::FIFO_INFO, 0], 2).unwrap();
        assert_eq!(response.len(), 2);
    }

    #[test]
    fn test_transact_times_out() {
        let mut chip = MockChip::new();
        chip.never_cts = true;
        let mut xcvr = Transceiver::with_probe_limit(chip, 10);

        assert_eq!(
            xcvr.transact(&[cmd::REQUEST_DEVICE_STATE], 2),
            Err(TransactionError::Timeout)
        );
    }

    #[test]
    fn test_delay_longer_than_limit_times_out() {
        let mut chip = MockChip::new();
        chip.cts_delay = 10;
        let mut xcvr = Transceiver::with_probe_limit(chip, 10);

        assert_eq!(
            xcvr.transact(&[cmd::FIFO_INFO, 0], 2),
            Err(TransactionError::Timeout)
        );
    }

    #[test]
    fn test_write_failure() {
        let mut chip = MockChip::new();
        chip.fail_transfer_after(1);
        let mut xcvr = Transceiver::new(chip);

        assert_eq!(
            xcvr.transact(&[cmd::FIFO_INFO, 0], 2),
            Err(TransactionError::Write)
        );
    }

    #[test]
    fn test_probe_failure() {
        let mut chip = MockChip::new();
        // two request bytes, then the READ_CMD_BUFF byte fails
        chip.fail_transfer_after(2);
        let mut xcvr = Transceiver::new(chip);

        assert_eq!(
            xcvr.transact(&[cmd::FIFO_INFO, 0], 2),
            Err(TransactionError::StatusProbe)
        );
    }

    #[test]
    fn test_read_failure() {
        let mut chip = MockChip::new();
        // request(2) + probe opcode + CTS byte, then the first response byte fails
        chip.fail_transfer_after(4);
        let mut xcvr = Transceiver::new(chip);

        assert_eq!(
            xcvr.transact(&[cmd::FIFO_INFO, 0], 2),
            Err(TransactionError::Read)
        );
    }

    #[test]
    fn test_unexpected_cts_byte() {
        let mut chip = MockChip::new();
        chip.garbage_cts = Some(0x5A);
        let mut xcvr = Transceiver::new(chip);

        assert_eq!(
            xcvr.transact(&[cmd::REQUEST_DEVICE_STATE], 2),
            Err(TransactionError::Ack)
        );
    }

    #[test]
    fn test_oversized_response_rejected() {
        let mut xcvr = Transceiver::new(MockChip::new());
        assert_eq!(
            xcvr.transact(&[cmd::READ_RX_FIFO], MAX_RESPONSE + 1),
            Err(TransactionError::Read)
        );
        assert!(xcvr.bus().executed.is_empty());
    }
}
