/// An 8-bit RGBA color. Hex literals are read as `0xRRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Allows using hex values to build colors
    /// ```
    /// use weft::color::Color;
    /// assert_eq!(Color::hex(0x0088FFFF), Color::rgba(0x00, 0x88, 0xFF, 0xFF));
    /// ```
    pub const fn hex(rgba: u32) -> Self {
        Self {
            r: (rgba >> 24) as u8,
            g: (rgba >> 16) as u8,
            b: (rgba >> 8) as u8,
            a: rgba as u8,
        }
    }

    pub const fn to_hex(self) -> u32 {
        (self.r as u32) << 24 | (self.g as u32) << 16 | (self.b as u32) << 8 | self.a as u32
    }

    /// Channels scaled to `0.0..=1.0`, in vertex order.
    pub fn to_floats(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    /// Raises every channel, alpha included, to `power`.
    pub fn apply_gamma(self, power: f32) -> Self {
        if power == 1.0 {
            return self;
        }
        Self {
            r: gamma_channel(self.r, power),
            g: gamma_channel(self.g, power),
            b: gamma_channel(self.b, power),
            a: gamma_channel(self.a, power),
        }
    }
}

#[inline]
pub fn gamma_channel(value: u8, power: f32) -> u8 {
    if power == 1.0 {
        return value;
    }
    ((value as f32 / 255.0).powf(power) * 255.0) as u8
}

impl From<u32> for Color {
    fn from(rgba: u32) -> Self {
        Color::hex(rgba)
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from(value: (u8, u8, u8)) -> Self {
        Self::rgb(value.0, value.1, value.2)
    }
}
impl From<(u8, u8, u8, u8)> for Color {
    fn from(value: (u8, u8, u8, u8)) -> Self {
        Self::rgba(value.0, value.1, value.2, value.3)
    }
}
