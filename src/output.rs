use std::fs::File;
use std::io::{self, Write};
use std::os::unix::io::{FromRawFd, IntoRawFd};
use tracing::debug;

use crate::config::{BusConfig, Transport};
use crate::error::{AmbientError, Result};
use crate::protocol::Waveform;

/// Byte transport to the LED strip. Exclusively owned by the transmit loop.
pub trait Bus: Send {
    fn name(&self) -> &str;

    /// Line encoding this transport needs.
    fn waveform(&self) -> Waveform {
        Waveform::Spi
    }

    /// Send one encoded frame as a single transfer and return how many bytes
    /// the transport accepted.
    fn transmit(&mut self, frame: &[u8]) -> io::Result<usize>;
}

/// Open the transport named by the config and apply its clock rate.
pub fn open_bus(config: &BusConfig) -> Result<Box<dyn Bus>> {
    let bus: Box<dyn Bus> = match config.transport {
        Transport::Spi => Box::new(SpiBus::open(config)?),
        Transport::Serial => Box::new(SerialBus::open(config)?),
    };
    debug!("opened {} ({:?} @ {} Hz)", config.device, config.transport, config.clock_hz);
    Ok(bus)
}

/// UART transport running 7N1 with an inverted TX line, so start and stop
/// bits become part of the waveform (see `protocol::uart`). The inversion is
/// a property of the board or its pin setup, not something set here.
///
/// Writes block until the driver takes the frame; there is no timeout.
pub struct SerialBus {
    device: String,
    tty: File,
}

impl SerialBus {
    pub fn open(config: &BusConfig) -> Result<Self> {
        let port = serialport::new(&config.device, config.clock_hz)
            .data_bits(serialport::DataBits::Seven)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open_native()
            .map_err(|e| AmbientError::BusOpen {
                device: config.device.clone(),
                source: e.into(),
            })?;

        // SAFETY: `into_raw_fd` hands over sole ownership of an open descriptor.
        let tty = unsafe { File::from_raw_fd(port.into_raw_fd()) };

        Ok(SerialBus {
            device: config.device.clone(),
            tty,
        })
    }
}

impl Bus for SerialBus {
    fn name(&self) -> &str {
        &self.device
    }

    fn waveform(&self) -> Waveform {
        Waveform::Uart
    }

    fn transmit(&mut self, frame: &[u8]) -> io::Result<usize> {
        self.tty.write(frame)
    }
}

/// Linux spidev transport, 8 bits per word, SPI mode 0.
pub struct SpiBus {
    device: String,
    #[cfg(target_os = "linux")]
    spi: spidev::Spidev,
}

impl SpiBus {
    #[cfg(target_os = "linux")]
    pub fn open(config: &BusConfig) -> Result<Self> {
        use spidev::{SpiModeFlags, Spidev, SpidevOptions};

        let mut spi = Spidev::open(&config.device).map_err(|source| AmbientError::BusOpen {
            device: config.device.clone(),
            source,
        })?;

        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(config.clock_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)
            .map_err(|source| AmbientError::BusConfigure {
                device: config.device.clone(),
                source,
            })?;

        Ok(SpiBus {
            device: config.device.clone(),
            spi,
        })
    }

    #[cfg(not(target_os = "linux"))]
    pub fn open(config: &BusConfig) -> Result<Self> {
        Err(AmbientError::BusOpen {
            device: config.device.clone(),
            source: io::Error::new(io::ErrorKind::Unsupported, "spidev is only available on Linux"),
        })
    }
}

impl Bus for SpiBus {
    fn name(&self) -> &str {
        &self.device
    }

    #[cfg(target_os = "linux")]
    fn transmit(&mut self, frame: &[u8]) -> io::Result<usize> {
        self.spi.write(frame)
    }

    #[cfg(not(target_os = "linux"))]
    fn transmit(&mut self, _frame: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "spidev is only available on Linux"))
    }
}
