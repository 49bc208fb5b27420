use crate::color::Color;
use crate::font::FontId;
use crate::glyph::GlyphId;
use crate::text::{TextAlign, WrapMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Draw {
    #[default]
    Normal,
    /// Lays the widget out but emits nothing for it or its children.
    None,
}

/// How a widget looks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub color_bg: Color,
    pub color_text: Color,
    pub color_outline: Color,
    pub outline_thickness: f32,
    /// Stretched over the background. [`GlyphId::WHITE`] gives a flat color.
    pub bg_glyph: GlyphId,
    /// `None` uses the context's active font.
    pub font: Option<FontId>,
    pub text_align: TextAlign,
    pub wrap: WrapMode,
    pub draw: Draw,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color_bg: Color::TRANSPARENT,
            color_text: Color::WHITE,
            color_outline: Color::TRANSPARENT,
            outline_thickness: 0.0,
            bg_glyph: GlyphId::WHITE,
            font: None,
            text_align: TextAlign::Left,
            wrap: WrapMode::Words,
            draw: Draw::Normal,
        }
    }
}

impl Style {
    #[inline]
    pub fn background(&mut self, color: impl Into<Color>) -> &mut Self {
        self.color_bg = color.into();
        self
    }

    /// Draws `glyph` tinted by `color` behind the widget.
    #[inline]
    pub fn background_glyph(&mut self, glyph: GlyphId, color: impl Into<Color>) -> &mut Self {
        self.bg_glyph = glyph;
        self.color_bg = color.into();
        self
    }

    #[inline]
    pub fn text_color(&mut self, color: impl Into<Color>) -> &mut Self {
        self.color_text = color.into();
        self
    }

    /// Draws a border `thickness` pixels wide just inside the widget's bounds.
    #[inline]
    pub fn outline(&mut self, color: impl Into<Color>, thickness: f32) -> &mut Self {
        self.color_outline = color.into();
        self.outline_thickness = thickness;
        self
    }

    #[inline]
    pub fn font(&mut self, font: FontId) -> &mut Self {
        self.font = Some(font);
        self
    }

    #[inline]
    pub fn align(&mut self, align: TextAlign) -> &mut Self {
        self.text_align = align;
        self
    }

    #[inline]
    pub fn wrap(&mut self, wrap: WrapMode) -> &mut Self {
        self.wrap = wrap;
        self
    }

    #[inline]
    pub fn draw(&mut self, draw: Draw) -> &mut Self {
        self.draw = draw;
        self
    }
}
