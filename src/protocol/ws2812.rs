//! Self-clocked LED waveform over a byte-oriented bus.
//!
//! Every data bit becomes three bus bytes, each either all-high (`0xFF`) or
//! all-low (`0x00`). A set bit is sent as pattern `110` (long high), a clear
//! bit as `100` (short high). Channels are sent MSB first in g, r, b order.

use std::time::Duration;

use super::EncodedFrame;
use crate::color::Pixel;

pub const BYTES_PER_BIT: usize = 3;
pub const BYTES_PER_CHANNEL: usize = 8 * BYTES_PER_BIT;
pub const BYTES_PER_LED: usize = 3 * BYTES_PER_CHANNEL;

/// Idle-low time after a frame before the strip latches it.
pub const RESET_LATCH: Duration = Duration::from_micros(80);

const PATTERN_ONE: u8 = 0b110;
const PATTERN_ZERO: u8 = 0b100;

/// Expand one channel byte into its 24 waveform bytes.
pub fn encode_byte(byte: u8) -> [u8; BYTES_PER_CHANNEL] {
    let mut out = [0u8; BYTES_PER_CHANNEL];
    for bit in 0..8 {
        let pattern = if byte & (0x80 >> bit) != 0 {
            PATTERN_ONE
        } else {
            PATTERN_ZERO
        };
        for slot in 0..BYTES_PER_BIT {
            let high = pattern & (0b100 >> slot) != 0;
            out[bit * BYTES_PER_BIT + slot] = if high { 0xFF } else { 0x00 };
        }
    }
    out
}

/// Encode every channel of every pixel, in pixel order. Always
/// `pixels.len() * BYTES_PER_LED` long.
pub fn encode_frame(pixels: &[Pixel]) -> EncodedFrame {
    let mut buf = Vec::with_capacity(pixels.len() * BYTES_PER_LED);
    for pixel in pixels {
        for channel in pixel.channels() {
            buf.extend_from_slice(&encode_byte(channel));
        }
    }
    EncodedFrame(buf.into_boxed_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_byte(encoded: &[u8]) -> u8 {
        encoded.chunks(BYTES_PER_BIT).fold(0u8, |acc, group| {
            // Long-high pulses carry a 1: the middle slot is high.
            (acc << 1) | u8::from(group[1] == 0xFF)
        })
    }

    #[test]
    fn encode_known_bytes() {
        let zero = encode_byte(0x00);
        for group in zero.chunks(3) {
            assert_eq!(group, &[0xFF, 0x00, 0x00]);
        }

        let one = encode_byte(0xFF);
        for group in one.chunks(3) {
            assert_eq!(group, &[0xFF, 0xFF, 0x00]);
        }

        // 0b1000_0001: first and last bit long, the rest short
        let edge = encode_byte(0x81);
        assert_eq!(&edge[..3], &[0xFF, 0xFF, 0x00]);
        assert_eq!(&edge[3..6], &[0xFF, 0x00, 0x00]);
        assert_eq!(&edge[21..], &[0xFF, 0xFF, 0x00]);
    }

    #[test]
    fn every_byte_decodes_back() {
        for b in 0..=255u8 {
            let encoded = encode_byte(b);
            assert_eq!(encoded.len(), 24);
            assert_eq!(decode_byte(&encoded), b);
            // Only the middle slot of each bit varies.
            for group in encoded.chunks(3) {
                assert_eq!(group[0], 0xFF);
                assert_eq!(group[2], 0x00);
            }
        }
    }

    #[test]
    fn frame_length_and_channel_order() {
        let pixels = vec![Pixel { g: 1, r: 2, b: 3 }; 30];
        let frame = encode_frame(&pixels);
        assert_eq!(frame.len(), 30 * 72);

        let led = &frame.as_bytes()[72 * 7..72 * 8];
        assert_eq!(decode_byte(&led[..24]), 1);
        assert_eq!(decode_byte(&led[24..48]), 2);
        assert_eq!(decode_byte(&led[48..]), 3);
    }

    #[test]
    fn encoding_is_deterministic() {
        let pixels: Vec<Pixel> = (0..12u8)
            .map(|i| Pixel { g: i, r: i.wrapping_mul(17), b: 255 - i })
            .collect();
        assert_eq!(encode_frame(&pixels), encode_frame(&pixels));
    }
}
