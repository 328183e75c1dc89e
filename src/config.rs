use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{AmbientError, Result};

pub const MAX_FPS: u32 = 120;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub bus: BusConfig,
    pub command: CommandConfig,
    pub animation: AnimationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Linux spidev character device
    Spi,
    /// UART driven at `clock_hz` baud
    Serial,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BusConfig {
    pub transport: Transport,
    pub device: String,
    /// SPI clock in Hz, or baud rate for the serial transport
    pub clock_hz: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfig {
            transport: Transport::Spi,
            device: "/dev/spidev1.0".to_string(),
            clock_hz: 2_500_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// JSON messages written to a named pipe
    Fifo,
    /// Character device answering get-mode/get-brightness ioctls, polled
    Device,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandConfig {
    pub source: SourceKind,
    /// FIFO path, or the device node
    pub path: String,
    pub poll_interval_ms: u64,
}

impl CommandConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        CommandConfig {
            source: SourceKind::Fifo,
            path: "/tmp/spi_fifo".to_string(),
            poll_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BrightnessLevels {
    pub low: u8,
    pub mid: u8,
    pub high: u8,
}

impl Default for BrightnessLevels {
    fn default() -> Self {
        BrightnessLevels {
            low: 10,
            mid: 40,
            high: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub led_count: usize,
    pub fps: u32,
    /// Hue phase advance per rendered rainbow frame
    pub hue_step: u8,
    /// Hue offset between neighbouring LEDs
    pub hue_spread: u8,
    pub default_brightness: u8,
    pub brightness_levels: BrightnessLevels,
}

impl AnimationConfig {
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        AnimationConfig {
            led_count: 30,
            fps: 10,
            hue_step: 3,
            hue_spread: 10,
            default_brightness: 40,
            brightness_levels: BrightnessLevels::default(),
        }
    }
}

impl Config {
    /// Load the config from a JSON file, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            None => Config::default(),
            Some(path) => {
                let data = fs::read_to_string(path).map_err(|source| AmbientError::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                })?;
                serde_json::from_str(&data).map_err(|source| AmbientError::ConfigParse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let anim = &self.animation;
        if anim.led_count == 0 {
            return Err(AmbientError::ConfigValue("animation.led_count must be at least 1".into()));
        }
        if anim.fps == 0 || anim.fps > MAX_FPS {
            return Err(AmbientError::ConfigValue(format!(
                "animation.fps must be in 1..={MAX_FPS}, got {}",
                anim.fps
            )));
        }
        if self.bus.clock_hz == 0 {
            return Err(AmbientError::ConfigValue("bus.clock_hz must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_strip_hardware() {
        let config = Config::default();
        assert_eq!(config.animation.led_count, 30);
        assert_eq!(config.animation.fps, 10);
        assert_eq!(config.animation.frame_period(), Duration::from_millis(100));
        assert_eq!(config.bus.transport, Transport::Spi);
        assert_eq!(config.command.source, SourceKind::Fifo);
        assert_eq!(config.command.path, "/tmp/spi_fifo");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{"bus": {"transport": "serial", "device": "/dev/ttyUSB0"},
                       "animation": {"fps": 15, "brightness_levels": {"mid": 50}}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.bus.transport, Transport::Serial);
        assert_eq!(config.bus.device, "/dev/ttyUSB0");
        assert_eq!(config.bus.clock_hz, 2_500_000);
        assert_eq!(config.animation.fps, 15);
        assert_eq!(config.animation.led_count, 30);
        assert_eq!(config.animation.brightness_levels.mid, 50);
        assert_eq!(config.animation.brightness_levels.high, 100);
    }

    #[test]
    fn rejects_zero_leds_and_bad_fps() {
        let mut config = Config::default();
        config.animation.led_count = 0;
        assert!(matches!(config.validate(), Err(AmbientError::ConfigValue(_))));

        let mut config = Config::default();
        config.animation.fps = MAX_FPS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let path = std::env::temp_dir().join("ambient-light-no-such-config.json");
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, AmbientError::ConfigRead { .. }));
        assert!(err.is_startup_fault());
    }
}
