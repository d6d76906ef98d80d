//! `log` sink over esp-println
//!
//! Each record is formatted into a fixed buffer and printed as one line on
//! the USB serial JTAG port, leaving the UART to the host protocol.

use core::fmt::Write;

use heapless::String;
use log::{LevelFilter, Log, Metadata, Record};

/// Maximum length of a single log line; longer lines are truncated
const MAX_LOG_MSG_LEN: usize = 256;

struct EspLogger;

static LOGGER: EspLogger = EspLogger;

impl Log for EspLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut line: String<MAX_LOG_MSG_LEN> = String::new();
        let _ = write!(line, "[{}] {}: {}", record.level(), record.target(), record.args());
        esp_println::println!("{}", line);
    }

    fn flush(&self) {}
}

/// Install the logger. Must be called once during startup.
pub fn init(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
