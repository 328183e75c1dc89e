//! Color math: hue wheel, brightness scaling and wire-order pixels.

/// Color in conventional (r, g, b) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }
}

/// One LED's color in wire channel order: green, red, blue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pixel {
    pub g: u8,
    pub r: u8,
    pub b: u8,
}

impl Pixel {
    pub const OFF: Pixel = Pixel { g: 0, r: 0, b: 0 };

    /// Channels in the order they go out on the bus.
    pub fn channels(&self) -> [u8; 3] {
        [self.g, self.r, self.b]
    }
}

/// Map a cyclic hue onto the three-sector color wheel.
///
/// Each sector is 85 steps wide and cross-fades two channels linearly
/// (`3 * h` up, `255 - 3 * h` down), so `3 * h` never exceeds 255.
pub fn hue_to_rgb(hue: u8) -> Rgb {
    let h = hue;
    if h < 85 {
        Rgb::new(h * 3, 255 - h * 3, 0)
    } else if h < 170 {
        let h = h - 85;
        Rgb::new(255 - h * 3, 0, h * 3)
    } else {
        let h = h - 170;
        Rgb::new(0, h * 3, 255 - h * 3)
    }
}

/// `channel * brightness / 100`, truncated. Brightness above 100 is treated as 100.
pub fn scale_by_brightness(channel: u8, brightness: u8) -> u8 {
    let brightness = u16::from(brightness.min(100));
    (u16::from(channel) * brightness / 100) as u8
}

/// Fixed color scaled by brightness, in wire order.
pub fn solid_color(rgb: Rgb, brightness: u8) -> Pixel {
    Pixel {
        g: scale_by_brightness(rgb.g, brightness),
        r: scale_by_brightness(rgb.r, brightness),
        b: scale_by_brightness(rgb.b, brightness),
    }
}

/// Color of LED `index` in the rainbow: hue `phase + index * spread`, wrapping.
pub fn rainbow_color(hue_phase: u8, index: usize, spread: u8, brightness: u8) -> Pixel {
    // Only the low byte of the offset matters mod 256.
    let offset = (index as u8).wrapping_mul(spread);
    solid_color(hue_to_rgb(hue_phase.wrapping_add(offset)), brightness)
}
