//! Error types for the ambient lighting daemon.
//!
//! Startup failures are fatal and surface through `main`. Transmission
//! failures are logged by the transmit loop and never stop it.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmbientError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid JSON for `Config`.
    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A configuration value is out of its accepted range.
    #[error("invalid config value: {0}")]
    ConfigValue(String),

    #[error("failed to open bus {device}: {source}")]
    BusOpen {
        device: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to configure bus {device}: {source}")]
    BusConfigure {
        device: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to open command channel {path}: {source}")]
    CommandChannel {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The bus accepted fewer bytes than one encoded frame.
    #[error("short write: expected {expected} bytes, bus accepted {actual}")]
    ShortWrite { expected: usize, actual: usize },

    #[error("bus write failed: {0}")]
    Transmit(#[from] io::Error),
}

impl AmbientError {
    /// True for failures that must stop the daemon before the loop starts.
    pub fn is_startup_fault(&self) -> bool {
        !matches!(self, Self::ShortWrite { .. } | Self::Transmit(_))
    }
}

pub type Result<T> = std::result::Result<T, AmbientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_write_names_both_counts() {
        let e = AmbientError::ShortWrite {
            expected: 2160,
            actual: 512,
        };
        assert!(e.to_string().contains("2160"));
        assert!(e.to_string().contains("512"));
        assert!(!e.is_startup_fault());
    }

    #[test]
    fn open_failures_are_startup_faults() {
        let e = AmbientError::BusOpen {
            device: "/dev/spidev1.0".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(e.is_startup_fault());
        assert!(e.to_string().contains("/dev/spidev1.0"));
    }

    #[test]
    fn io_error_converts_to_transmit() {
        let e: AmbientError = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(e, AmbientError::Transmit(_)));
    }
}
