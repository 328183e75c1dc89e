//! Ambient lighting for a vehicle cabin LED strip.
//!
//! Commands arrive over a named pipe or a polled character device and update a
//! shared animation state. A transmit loop renders that state once per frame
//! period, encodes it into the strip's self-clocked waveform and writes it to
//! an SPI or UART bus.

pub mod animation;
pub mod color;
pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod output;
pub mod protocol;
pub mod renderer;
pub mod transmit_loop;

pub use error::{AmbientError, Result};
