use crate::animation::{AnimationMode, AnimationState};
use crate::color::{rainbow_color, solid_color, Pixel};
use crate::config::AnimationConfig;

/// Turns a state snapshot into one pixel per LED.
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    led_count: usize,
    hue_spread: u8,
}

impl FrameRenderer {
    pub fn new(led_count: usize, hue_spread: u8) -> Self {
        FrameRenderer { led_count, hue_spread }
    }

    pub fn from_config(config: &AnimationConfig) -> Self {
        Self::new(config.led_count, config.hue_spread)
    }

    pub fn led_count(&self) -> usize {
        self.led_count
    }

    pub fn render(&self, state: &AnimationState) -> Vec<Pixel> {
        let brightness = state.brightness();
        match state.mode {
            AnimationMode::Off => vec![Pixel::OFF; self.led_count],
            AnimationMode::Solid(rgb) => vec![solid_color(rgb, brightness); self.led_count],
            AnimationMode::Rainbow => (0..self.led_count)
                .map(|i| rainbow_color(state.hue_phase, i, self.hue_spread, brightness))
                .collect(),
        }
    }
}
