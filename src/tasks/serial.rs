//! Serial task for the host line
//!
//! Reads raw bytes for the link task and writes the replies it produces.
//! Generic over [`SerialPort`], so any `embedded-io-async` stream wrapped in
//! [`IoSerial`](crate::serial::IoSerial) will do.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};
use heapless::Vec;

use crate::config::serial::{OUTBOX_SIZE, RX_BUFFER_SIZE};
use crate::serial::{Reply, ReplyWriter, SerialPort, SerialReader};

/// Bytes read in one go
pub type SerialChunk = Vec<u8, RX_BUFFER_SIZE>;

/// Host input on its way to the link task
pub static SERIAL_RX_CHANNEL: Channel<CriticalSectionRawMutex, SerialChunk, 4> = Channel::new();

/// Replies on their way to the host
pub static REPLY_CHANNEL: Channel<CriticalSectionRawMutex, Reply, OUTBOX_SIZE> = Channel::new();

pub async fn serial_task<S: SerialPort>(mut port: S) {
    let mut reader = SerialReader::new();
    let writer = ReplyWriter::new();

    loop {
        match select(reader.read_chunk(&mut port), REPLY_CHANNEL.receive()).await {
            Either::First(Ok(bytes)) => {
                if bytes.is_empty() {
                    continue;
                }
                if let Ok(chunk) = SerialChunk::from_slice(bytes) {
                    SERIAL_RX_CHANNEL.send(chunk).await;
                }
            }
            Either::First(Err(e)) => {
                log::warn!("serial read failed: {:?}", e);
                Timer::after(Duration::from_millis(10)).await;
            }
            Either::Second(reply) => {
                if let Err(e) = writer.write_reply(&mut port, &reply).await {
                    log::warn!("serial write failed: {:?}", e);
                }
            }
        }
    }
}
