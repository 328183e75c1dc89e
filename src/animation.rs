//! Live animation state shared between the command ingestor and the render loop.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::color::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationMode {
    #[default]
    Off,
    Solid(Rgb),
    Rainbow,
}

impl AnimationMode {
    pub const NAMES: [&'static str; 9] = [
        "red", "green", "blue", "yellow", "cyan", "magenta", "white", "rainbow", "off",
    ];

    /// Resolve a mode name. Unknown names turn the strip off.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        match name.to_ascii_lowercase().as_str() {
            "red" => AnimationMode::Solid(Rgb::new(255, 0, 0)),
            "green" => AnimationMode::Solid(Rgb::new(0, 255, 0)),
            "blue" => AnimationMode::Solid(Rgb::new(0, 0, 255)),
            "yellow" => AnimationMode::Solid(Rgb::new(255, 255, 0)),
            "cyan" => AnimationMode::Solid(Rgb::new(0, 255, 255)),
            "magenta" => AnimationMode::Solid(Rgb::new(255, 0, 255)),
            "white" => AnimationMode::Solid(Rgb::new(255, 255, 255)),
            "rainbow" => AnimationMode::Rainbow,
            _ => AnimationMode::Off,
        }
    }
}

/// A single state mutation from the command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetMode(AnimationMode),
    /// Clamped to 0..=100 when applied.
    SetBrightness(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationState {
    pub mode: AnimationMode,
    brightness: u8,
    pub hue_phase: u8,
}

impl AnimationState {
    pub fn new(brightness: u8) -> Self {
        let mut state = AnimationState {
            mode: AnimationMode::Off,
            brightness: 0,
            hue_phase: 0,
        };
        state.set_brightness(i64::from(brightness));
        state
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn set_brightness(&mut self, value: i64) {
        self.brightness = value.clamp(0, 100) as u8;
    }

    pub fn apply(&mut self, command: Command) {
        match command {
            Command::SetMode(mode) => self.mode = mode,
            Command::SetBrightness(value) => self.set_brightness(value),
        }
    }
}

/// Handle to the one `AnimationState` of the process.
///
/// The lock is held only to copy or assign fields, never across bus I/O.
#[derive(Debug, Clone)]
pub struct SharedAnimation {
    inner: Arc<Mutex<AnimationState>>,
}

impl SharedAnimation {
    pub fn new(initial: AnimationState) -> Self {
        SharedAnimation {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    // Every write leaves the state valid, so a panic elsewhere can't corrupt it.
    fn lock(&self) -> MutexGuard<'_, AnimationState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn apply(&self, command: Command) {
        self.lock().apply(command);
    }

    pub fn snapshot(&self) -> AnimationState {
        *self.lock()
    }

    /// Copy the state for rendering and, in rainbow mode, advance the hue phase.
    ///
    /// The returned copy carries the phase before the advance.
    pub fn take_frame_snapshot(&self, hue_step: u8) -> AnimationState {
        let mut state = self.lock();
        let snapshot = *state;
        if state.mode == AnimationMode::Rainbow {
            state.hue_phase = state.hue_phase.wrapping_add(hue_step);
        }
        snapshot
    }

    pub fn force_off(&self) {
        self.lock().mode = AnimationMode::Off;
    }
}
