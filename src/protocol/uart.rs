//! Same waveform from a UART running 7N1 with its TX line inverted.
//!
//! One character is nine line slots: start, seven data bits (LSB first) and
//! stop. Inverted, the start bit is high and the stop bit low, so each
//! character holds exactly three `1x0` pulses:
//!
//! ```text
//! slot:  start d0 d1 | d2 d3 d4 | d5 d6 stop
//! line:    H   x  L  |  H  x  L |  H  x  L
//! ```
//!
//! At a baud rate equal to the SPI clock the slot width matches one SPI byte
//! of the `ws2812` encoding.

use super::EncodedFrame;
use crate::color::Pixel;

/// 24 data bits per LED, three per character.
pub const UART_BYTES_PER_LED: usize = 8;

// d1 and d4 set: after inversion they drive the trailing low slot of the
// first two pulses. d2 and d5 clear drive the leading high of the next two.
const TRIPLET_FRAME: u8 = 0b001_0010;
const DATA_SLOTS: [u8; 3] = [0, 3, 6];

/// Encode three data bits, first in time first.
pub fn encode_triplet(bits: [bool; 3]) -> u8 {
    bits.iter()
        .zip(DATA_SLOTS)
        .fold(TRIPLET_FRAME, |acc, (&bit, slot)| {
            // A long pulse needs the middle slot high, so the data bit is clear.
            if bit {
                acc
            } else {
                acc | (1 << slot)
            }
        })
}

pub(super) fn encode_frame(pixels: &[Pixel]) -> EncodedFrame {
    let mut buf = Vec::with_capacity(pixels.len() * UART_BYTES_PER_LED);
    for pixel in pixels {
        let bits: Vec<bool> = pixel
            .channels()
            .iter()
            .flat_map(|&channel| (0..8).map(move |i| channel & (0x80 >> i) != 0))
            .collect();
        for triplet in bits.chunks(3) {
            buf.push(encode_triplet([triplet[0], triplet[1], triplet[2]]));
        }
    }
    EncodedFrame(buf.into_boxed_slice())
}
