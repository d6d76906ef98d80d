//! Serial port trait for abstraction and testability
//!
//! The host line is driven through this trait so the reader and writer can
//! run against the UART or a mock.

use core::future::Future;

/// Errors that can occur during serial operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    /// Framing or parity error in received data
    FramingError,
    /// Receive buffer overflow
    OverflowError,
    /// Write error
    WriteError,
}

/// Abstract serial port interface
pub trait SerialPort {
    /// Read whatever bytes are available into `buf`
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, SerialError>>;

    /// Write all of `data`
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<(), SerialError>>;

    /// Flush the write buffer
    fn flush(&mut self) -> impl Future<Output = Result<(), SerialError>>;
}

/// [`SerialPort`] over any `embedded-io-async` stream
#[cfg(feature = "embedded")]
pub struct IoSerial<T> {
    inner: T,
}

#[cfg(feature = "embedded")]
impl<T> IoSerial<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[cfg(feature = "embedded")]
impl<T: embedded_io_async::Read + embedded_io_async::Write> SerialPort for IoSerial<T> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        embedded_io_async::Read::read(&mut self.inner, buf)
            .await
            .map_err(|e| match embedded_io::Error::kind(&e) {
                embedded_io::ErrorKind::OutOfMemory => SerialError::OverflowError,
                _ => SerialError::FramingError,
            })
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), SerialError> {
        embedded_io_async::Write::write_all(&mut self.inner, data)
            .await
            .map_err(|_| SerialError::WriteError)
    }

    async fn flush(&mut self) -> Result<(), SerialError> {
        embedded_io_async::Write::flush(&mut self.inner)
            .await
            .map_err(|_| SerialError::WriteError)
    }
}

#[cfg(test)]
pub mod mock {
    //! Scripted host line

    use super::*;
    use crate::config::serial::MAX_REPLY_LEN;
    use heapless::{Deque, String, Vec};

    const LINE_BUFFER: usize = MAX_REPLY_LEN * 4;

    /// Serial port fed from a script, capturing everything written
    pub struct MockSerialPort {
        incoming: Deque<u8, LINE_BUFFER>,
        written: Vec<u8, LINE_BUFFER>,
        read_failure: Option<SerialError>,
        write_failure: Option<SerialError>,
        pub flushes: usize,
    }

    impl MockSerialPort {
        pub fn new() -> Self {
            Self {
                incoming: Deque::new(),
                written: Vec::new(),
                read_failure: None,
                write_failure: None,
                flushes: 0,
            }
        }

        /// Bytes the host will send
        pub fn queue_rx_data(&mut self, data: &[u8]) {
            for &byte in data {
                let _ = self.incoming.push_back(byte);
            }
        }

        /// Everything written so far, as text
        pub fn tx_text(&self) -> String<LINE_BUFFER> {
            String::from_utf8(self.written.clone()).unwrap_or_default()
        }

        /// Fail the next read with `error`
        pub fn set_next_read_error(&mut self, error: SerialError) {
            self.read_failure = Some(error);
        }

        /// Fail the next write with `error`
        pub fn set_next_write_error(&mut self, error: SerialError) {
            self.write_failure = Some(error);
        }
    }

    impl Default for MockSerialPort {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SerialPort for MockSerialPort {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
            if let Some(error) = self.read_failure.take() {
                return Err(error);
            }
            let mut count = 0;
            while count < buf.len() {
                match self.incoming.pop_front() {
                    Some(byte) => {
                        buf[count] = byte;
                        count += 1;
                    }
                    None => break,
                }
            }
            Ok(count)
        }

        async fn write(&mut self, data: &[u8]) -> Result<(), SerialError> {
            if let Some(error) = self.write_failure.take() {
                return Err(error);
            }
            self.written
                .extend_from_slice(data)
                .map_err(|_| SerialError::OverflowError)
        }

        async fn flush(&mut self) -> Result<(), SerialError> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use futures::executor::block_on;

        #[test]
        fn test_reads_in_chunks() {
            let mut port = MockSerialPort::new();
            port.queue_rx_data(b">A1:2.");

            let mut buf = [0u8; 4];
            assert_eq!(block_on(port.read(&mut buf)), Ok(4));
            assert_eq!(&buf, b">A1:");

            let mut buf = [0u8; 10];
            assert_eq!(block_on(port.read(&mut buf)), Ok(2));
            assert_eq!(&buf[..2], b"2.");
            assert_eq!(block_on(port.read(&mut buf)), Ok(0));
        }

        #[test]
        fn test_failures_are_one_shot() {
            let mut port = MockSerialPort::new();

            port.set_next_write_error(SerialError::WriteError);
            assert_eq!(block_on(port.write(b"<+\n")), Err(SerialError::WriteError));
            assert_eq!(block_on(port.write(b"<+\n")), Ok(()));
            assert_eq!(port.tx_text().as_str(), "<+\n");

            port.set_next_read_error(SerialError::FramingError);
            let mut buf = [0u8; 4];
            assert_eq!(block_on(port.read(&mut buf)), Err(SerialError::FramingError));
            assert_eq!(block_on(port.read(&mut buf)), Ok(0));
        }
    }
}
