//! Encoders for the strip's self-clocked waveform.
//!
//! `ws2812` expands every data bit into three whole bus bytes for an SPI MOSI
//! line. `uart` packs three data bits into one 7N1 character for a UART whose
//! TX line is inverted.

mod uart;
mod ws2812;

use crate::color::Pixel;

pub use uart::{encode_triplet, UART_BYTES_PER_LED};
pub use ws2812::{
    encode_byte, encode_frame, BYTES_PER_BIT, BYTES_PER_CHANNEL, BYTES_PER_LED, RESET_LATCH,
};

/// A frame ready for one bus transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame(Box<[u8]>);

impl EncodedFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Line coding used by a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    /// Three bytes per bit, `BYTES_PER_LED` per pixel
    Spi,
    /// Three bits per 7N1 character, `UART_BYTES_PER_LED` per pixel
    Uart,
}

impl Waveform {
    pub fn bytes_per_led(self) -> usize {
        match self {
            Waveform::Spi => BYTES_PER_LED,
            Waveform::Uart => UART_BYTES_PER_LED,
        }
    }

    pub fn encode(self, pixels: &[Pixel]) -> EncodedFrame {
        match self {
            Waveform::Spi => ws2812::encode_frame(pixels),
            Waveform::Uart => uart::encode_frame(pixels),
        }
    }
}
