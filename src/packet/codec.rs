//! Fixed-size frame codec
//!
//! # Frame layout
//!
//! ```text
//! [ticks: u16 LE][node][cmd][len][checksum][data: len bytes][0xFF padding]
//! ```
//!
//! Every frame is exactly [`FRAME_SIZE`] bytes. The checksum byte is chosen so
//! that the XOR of the ticks, header and payload bytes equals
//! [`CHECKSUM_SENTINEL`]. Padding is not covered by the XOR but must be all
//! [`FILLER`], which keeps every single-byte corruption detectable.

use crate::config::radio::{CHECKSUM_SENTINEL, FILLER, FRAME_SIZE, HEADER_LEN, MAX_PAYLOAD_SIZE};
use crate::packet::types::{CommandId, Packet};

/// Errors decoding a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer than FRAME_SIZE bytes
    Short,
    /// Declared length exceeds MAX_PAYLOAD_SIZE
    TooBig,
    /// XOR over the frame did not reduce to the sentinel
    BadChecksum,
    /// Non-filler byte after the payload
    BadPadding,
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FrameError::Short => write!(f, "short frame"),
            FrameError::TooBig => write!(f, "length exceeds payload limit"),
            FrameError::BadChecksum => write!(f, "bad checksum"),
            FrameError::BadPadding => write!(f, "bad padding"),
        }
    }
}

/// A decoded frame: the packet plus the sender's clock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub ticks: u16,
    pub packet: Packet,
}

impl Frame {
    /// Sender clock, if it may be adopted locally
    ///
    /// Only requests carry a fresh clock. Responses may have sat in a
    /// client's buffer and are not trusted.
    pub fn trusted_ticks(&self) -> Option<u16> {
        if self.packet.cmd < CommandId::StatusResponse as u8 {
            Some(self.ticks)
        } else {
            None
        }
    }
}

fn xor(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Checksum byte for `packet` sent at `ticks`
pub fn checksum(ticks: u16, packet: &Packet) -> u8 {
    let [lo, hi] = ticks.to_le_bytes();
    CHECKSUM_SENTINEL ^ lo ^ hi ^ packet.node ^ packet.cmd ^ packet.len() ^ xor(&packet.data)
}

/// Encode a packet into a padded frame
pub fn encode(ticks: u16, packet: &Packet) -> [u8; FRAME_SIZE] {
    let mut frame = [FILLER; FRAME_SIZE];
    frame[..2].copy_from_slice(&ticks.to_le_bytes());
    frame[2] = packet.node;
    frame[3] = packet.cmd;
    frame[4] = packet.len();
    frame[5] = checksum(ticks, packet);
    frame[HEADER_LEN..HEADER_LEN + packet.data.len()].copy_from_slice(&packet.data);
    frame
}

/// Decode and validate a frame
pub fn decode(bytes: &[u8]) -> Result<Frame, FrameError> {
    if bytes.len() < FRAME_SIZE {
        return Err(FrameError::Short);
    }

    let len = bytes[4] as usize;
    if len > MAX_PAYLOAD_SIZE {
        return Err(FrameError::TooBig);
    }

    let end = HEADER_LEN + len;
    if xor(&bytes[..end]) != CHECKSUM_SENTINEL {
        return Err(FrameError::BadChecksum);
    }
    if bytes[end..FRAME_SIZE].iter().any(|&b| b != FILLER) {
        return Err(FrameError::BadPadding);
    }

    let mut packet = Packet::new(bytes[2], bytes[3]);
    // len was bounded above, so this cannot overflow
    let _ = packet.data.extend_from_slice(&bytes[HEADER_LEN..end]);

    Ok(Frame {
        ticks: u16::from_le_bytes([bytes[0], bytes[1]]),
        packet,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Packet {
        Packet::with_data(7, CommandId::SetTime as u8, &[0x12, 0x34, 0x56]).unwrap()
    }

    #[test]
    fn test_encode_layout() {
        let frame = encode(0x1234, &sample());

        assert_eq!(frame.len(), FRAME_SIZE);
        assert_eq!(&frame[..2], &[0x34, 0x12]);
        assert_eq!(frame[2], 7);
        assert_eq!(frame[3], CommandId::SetTime as u8);
        assert_eq!(frame[4], 3);
        assert_eq!(&frame[6..9], &[0x12, 0x34, 0x56]);
        assert!(frame[9..].iter().all(|&b| b == FILLER));
    }

    #[test]
    fn test_checksum_reduces_to_sentinel() {
        let frame = encode(0xBEEF, &sample());
        assert_eq!(xor(&frame[..HEADER_LEN + 3]), CHECKSUM_SENTINEL);
    }

    #[test]
    fn test_round_trip() {
        let packets = [
            Packet::new(0, CommandId::Noop as u8),
            sample(),
            Packet::with_data(255, 200, &[0xAA; MAX_PAYLOAD_SIZE]).unwrap(),
        ];

        for packet in packets {
            let decoded = decode(&encode(4321, &packet)).unwrap();
            assert_eq!(decoded.packet, packet);
            assert_eq!(decoded.ticks, 4321);
        }
    }

    #[test]
    fn test_any_single_byte_corruption_rejected() {
        let frame = encode(0x0102, &sample());

        for index in 0..FRAME_SIZE {
            for flip in [0x01u8, 0x80, 0xFF] {
                let mut corrupted = frame;
                corrupted[index] ^= flip;
                assert!(
                    decode(&corrupted).is_err(),
                    "corruption at {} (^{:#x}) was accepted",
                    index,
                    flip
                );
            }
        }
    }

    #[test]
    fn test_decode_rejects_short_frame() {
        let frame = encode(0, &sample());
        assert_eq!(decode(&frame[..FRAME_SIZE - 1]), Err(FrameError::Short));
    }

    #[test]
    fn test_decode_rejects_oversized_length() {
        let mut frame = encode(0, &sample());
        frame[4] = MAX_PAYLOAD_SIZE as u8 + 1;
        assert_eq!(decode(&frame), Err(FrameError::TooBig));
    }

    #[test]
    fn test_trusted_ticks_only_for_requests() {
        let request = decode(&encode(999, &sample())).unwrap();
        assert_eq!(request.trusted_ticks(), Some(999));

        let reply = Packet::with_data(3, CommandId::StatusResponse as u8, &[0, 6]).unwrap();
        let reply = decode(&encode(999, &reply)).unwrap();
        assert_eq!(reply.trusted_ticks(), None);

        let app = decode(&encode(999, &Packet::new(3, 20))).unwrap();
        assert_eq!(app.trusted_ticks(), None);
    }
}
