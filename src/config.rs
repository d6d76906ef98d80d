//! Hardware and link configuration constants for the ESP32-S3 with an Si4463 transceiver

/// LED pin (heartbeat)
pub mod led {
    pub const PIN: u8 = 48;
}

/// SPI pins for the transceiver
pub mod spi {
    pub const SCLK: u8 = 7;
    pub const MISO: u8 = 8;
    pub const MOSI: u8 = 9;
}

/// Transceiver control pins
pub mod radio_pins {
    /// Chip select (nSEL), active low
    pub const NSEL: u8 = 41;
    /// Interrupt line (nIRQ), active low
    pub const NIRQ: u8 = 39;
    /// Shutdown (SDN), high holds the chip in reset
    pub const SDN: u8 = 42;
}

/// Host serial line (UART0)
pub mod uart {
    pub const TX: u8 = 43;
    pub const RX: u8 = 44;
}

/// Radio frame and transaction constants
pub mod radio {
    /// Fixed on-air frame size in bytes
    pub const FRAME_SIZE: usize = 32;

    /// ticks(2) + node + cmd + len + checksum
    pub const HEADER_LEN: usize = 6;

    /// Largest payload that fits in one frame
    pub const MAX_PAYLOAD_SIZE: usize = FRAME_SIZE - HEADER_LEN;

    /// Padding byte written after the payload
    pub const FILLER: u8 = 0xFF;

    /// Value the XOR over a valid frame must reduce to
    pub const CHECKSUM_SENTINEL: u8 = 0x00;

    /// Hardware FIFO depth (shared RX/TX mode off)
    pub const FIFO_SIZE: u8 = 64;

    /// Status probes attempted before a transaction times out
    pub const CTS_PROBE_LIMIT: u16 = 1000;

    /// Largest response any chip command returns
    pub const MAX_RESPONSE: usize = FRAME_SIZE;

    /// Crystal frequency handed to POWER_UP
    pub const XTAL_HZ: u32 = 30_000_000;
}

/// Clock and state machine timing
pub mod timing {
    /// Timer period while listening or active
    pub const FAST_PERIOD_MS: u16 = 10;
    /// Timer period while sleeping
    pub const SLOW_PERIOD_MS: u16 = 160;

    /// Milliseconds in one wrap of the network clock
    pub const MS_PER_MINUTE: u16 = 60_000;
    /// Tens of minutes in a day
    pub const TENS_OF_MINUTES_PER_DAY: u8 = 144;
    /// Marks time of day as unknown
    pub const TIME_UNKNOWN: u8 = 0xFF;

    /// LISTEN window after a WARM sleep
    pub const LISTEN_MS: u32 = 120_000;
    /// LISTEN window after a COLD sleep
    pub const LISTEN_AFTER_COLD_MS: u32 = 60_000;
    /// ACTIVE inactivity window
    pub const ACTIVE_MS: u32 = 60_000;
    /// Time held in ERROR before recovering
    pub const ERROR_HOLD_MS: u32 = 10 * 60 * 1000;
    /// WARM sleep duration
    pub const WARM_SLEEP_MS: u32 = 15 * 60 * 1000;
    /// COLD sleep duration
    pub const COLD_SLEEP_MS: u32 = 60 * 60 * 1000;

    /// Heartbeat pattern advances one bit per this many milliseconds
    pub const HEARTBEAT_STEP_MS: u16 = 100;

    /// Passes a pinned channel waits for its reply
    pub const REPLY_WAIT_PASSES: u16 = 200;
}

/// Controller scheduler constants
pub mod scheduler {
    /// Logical radio channels owned by the controller
    pub const MAX_RADIO_CHANNELS: usize = 6;
    /// Channel letters accepted on the serial line (A..H)
    pub const CHANNEL_LETTERS: u8 = 8;
    /// Rank base is (MAX_RADIO_CHANNELS - index) << PRIORITY_SHIFT
    pub const PRIORITY_SHIFT: u8 = 3;
    /// Queued priorities saturate here
    pub const PRIORITY_CEILING: u8 = 0xFC;
    /// Added to every passed-over channel per tick
    pub const AGING_STEP: u8 = 2;
    /// Priority forced onto the time broadcast
    pub const BROADCAST_PRIORITY: u8 = 0xFF;
    /// Time broadcast fires when ms_ticks wraps this modulus
    pub const TIME_BROADCAST_MODULO_MS: u16 = 5000;
    /// Channel carrying the time broadcast
    pub const BROADCAST_CHANNEL: usize = 0;
    /// Channels enabled at boot; the rest wait for SET_CHANNEL
    pub const INITIAL_CHANNELS: usize = 1;
}

/// Serial configuration
pub mod serial {
    pub const BAUD_RATE: u32 = 38400;
    pub const RX_BUFFER_SIZE: usize = 64;
    /// Longest reply line ("<A255:65535:255:" plus 26 values)
    pub const MAX_REPLY_LEN: usize = 128;
    /// Replies buffered between serial flushes
    pub const OUTBOX_SIZE: usize = 8;
}

/// Persistent storage limits
pub mod eeprom {
    /// RAM-backed parameter store on the controller board
    pub const SIZE: usize = 1024;
    /// Largest READ_EEPROM block
    pub const MAX_READ: usize = 16;
    /// Largest WRITE_EEPROM block
    pub const MAX_WRITE: usize = 22;
}

/// Firmware identification
pub mod firmware {
    pub const VERSION_MAJOR: u8 = 3;
    pub const VERSION_MINOR: u8 = 1;
}
