//! Collaborator traits for the command dispatcher
//!
//! The application and the persistence store sit behind these traits so the
//! dispatcher can run against in-memory versions in tests.

use crate::packet::Packet;

/// Whether the application recognised a forwarded command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    Handled,
    Unrecognised,
}

/// Application running on top of the link
pub trait Application {
    /// Handle a command outside the built-in vocabulary
    fn operate(&mut self, packet: &Packet) -> Handling;

    /// Fill `buf` with an application status block of type `kind`.
    ///
    /// Returns the number of bytes written, 0 if the type is unknown.
    fn fetch_status(&mut self, kind: u8, buf: &mut [u8]) -> usize;

    /// Whether the supply has recovered enough to leave LOW_BATTERY
    fn battery_ok(&mut self) -> bool {
        true
    }

    /// Battery reading reported in the dynamic status block
    fn battery_voltage(&mut self) -> u16 {
        0
    }

    /// Called once a second while the node is running
    fn on_second(&mut self) {}
}

/// Errors from the persistence store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EepromError {
    /// Address range outside the device
    OutOfRange,
    /// Device did not acknowledge
    Io,
}

/// Byte-addressed persistent store
pub trait Eeprom {
    fn read(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), EepromError>;

    fn write(&mut self, addr: u16, data: &[u8]) -> Result<(), EepromError>;
}

/// RAM-backed store, erased to 0xFF
pub struct MemoryEeprom<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> MemoryEeprom<N> {
    pub fn new() -> Self {
        Self { bytes: [0xFF; N] }
    }

    fn range(addr: u16, len: usize) -> Result<core::ops::Range<usize>, EepromError> {
        let start = addr as usize;
        let end = start + len;
        if end > N {
            return Err(EepromError::OutOfRange);
        }
        Ok(start..end)
    }
}

impl<const N: usize> Default for MemoryEeprom<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Eeprom for MemoryEeprom<N> {
    fn read(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), EepromError> {
        let range = Self::range(addr, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, addr: u16, data: &[u8]) -> Result<(), EepromError> {
        let range = Self::range(addr, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }
}

/// Application with no commands of its own
pub struct NullApplication;

impl Application for NullApplication {
    fn operate(&mut self, _packet: &Packet) -> Handling {
        Handling::Unrecognised
    }

    fn fetch_status(&mut self, _kind: u8, _buf: &mut [u8]) -> usize {
        0
    }
}

#[cfg(test)]
pub mod mock {
    //! Recording application for testing

    use super::*;
    use heapless::Vec;

    /// Application that records what it was asked to do
    pub struct RecordingApp {
        /// Packets passed to `operate`
        pub operated: Vec<Packet, 8>,
        /// Commands (from APPLICATION_BASE up) this app accepts
        pub known_cmd: Option<u8>,
        /// Status block returned for kind 2
        pub status_block: Vec<u8, 8>,
        pub battery_ok: bool,
        pub voltage: u16,
        pub seconds: u32,
    }

    impl RecordingApp {
        pub fn new() -> Self {
            Self {
                operated: Vec::new(),
                known_cmd: None,
                status_block: Vec::new(),
                battery_ok: true,
                voltage: 0,
                seconds: 0,
            }
        }
    }

    impl Default for RecordingApp {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Application for RecordingApp {
        fn operate(&mut self, packet: &Packet) -> Handling {
            let _ = self.operated.push(packet.clone());
            if self.known_cmd == Some(packet.cmd) {
                Handling::Handled
            } else {
                Handling::Unrecognised
            }
        }

        fn fetch_status(&mut self, kind: u8, buf: &mut [u8]) -> usize {
            if kind != 2 || self.status_block.is_empty() {
                return 0;
            }
            let n = self.status_block.len().min(buf.len());
            buf[..n].copy_from_slice(&self.status_block[..n]);
            n
        }

        fn battery_ok(&mut self) -> bool {
            self.battery_ok
        }

        fn battery_voltage(&mut self) -> u16 {
            self.voltage
        }

        fn on_second(&mut self) {
            self.seconds += 1;
        }
    }
}
