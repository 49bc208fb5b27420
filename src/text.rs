//! Text flow: places a widget's glyphs on lines, wraps them and aligns each line.

use crate::color::Color;
use crate::font::FontMetrics;
use crate::glyph::{GlyphId, GlyphInfo};
use crate::math::{clip_rect_and_uv, Rect, Vector2};

/// Horizontal alignment of each line within the text bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum WrapMode {
    /// Wraps on whitespaces not breaking words, or mid word if a word fills a line
    #[default]
    Words,
    /// Only wraps on new line characters, can overflow the widget
    Newline,
}

/// One glyph of a widget's text.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphLayout {
    pub glyph: GlyphId,
    pub info: GlyphInfo,
    /// Where the glyph sits, relative to the text origin until
    /// [`offset_and_clip`] moves it on screen.
    pub bounds: Rect,
    /// Clipped screen bounds and UVs. `None` when fully clipped or not drawable.
    pub draw: Option<(Rect, Rect)>,
    pub color: Color,
    pub selected: bool,
    /// First glyph on its line.
    pub line_start: bool,
}

impl GlyphLayout {
    pub fn new(glyph: GlyphId, color: Color) -> Self {
        Self {
            glyph,
            color,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_newline(&self) -> bool {
        self.glyph.is_char('\n')
    }

    #[inline]
    fn is_break(&self) -> bool {
        self.glyph.is_char(' ') || self.is_newline()
    }

    fn place(&mut self, at: Vector2) -> Vector2 {
        let (bounds, next) = self.info.place(at);
        self.bounds = bounds;
        next
    }
}

/// Lays `glyphs` out from the origin, wrapping lines wider than `max_width`.
///
/// `metrics` gives the line metrics for a glyph family; families without metrics
/// advance lines by the glyph height. Returns the extent of the laid out text.
pub fn layout_text(
    glyphs: &mut [GlyphLayout],
    max_width: f32,
    align: TextAlign,
    wrap: WrapMode,
    metrics: impl Fn(u8) -> Option<FontMetrics>,
) -> Vector2 {
    let Some(first) = glyphs.first() else {
        return Vector2::ZERO;
    };

    let mut at = Vector2::ZERO;
    let mut line_advance = match metrics(first.glyph.family()) {
        Some(m) => {
            at.y += m.to_baseline;
            m.line_height
        }
        None => first.info.glyph.dst_height as f32,
    };
    let mut lines = 1u32;
    let mut last_break = 0usize;

    for glyph in glyphs.iter_mut() {
        glyph.line_start = false;
    }
    glyphs[0].line_start = true;

    for i in 0..glyphs.len() {
        if glyphs[i].is_newline() {
            glyphs[i].bounds = Rect::from_min_dim(at, Vector2::ZERO);
            at = Vector2::new(0.0, at.y + line_advance);
            lines += 1;
            last_break = i + 1;
            if let Some(next) = glyphs.get_mut(i + 1) {
                next.line_start = true;
            }
            continue;
        }

        at = glyphs[i].place(at);
        let overflows = glyphs[i].bounds.max.x > max_width;
        if wrap == WrapMode::Newline || !overflows || i == last_break {
            continue;
        }

        // Break after the last space since the line started, or right here.
        let brk = (last_break + 1..=i)
            .rev()
            .find(|&j| glyphs[j].is_break())
            .map_or(i, |j| j + 1);

        at = Vector2::new(0.0, at.y + line_advance);
        lines += 1;
        if brk > i {
            // The overflowing glyph is a space; it hangs off the end of the line.
            if let Some(next) = glyphs.get_mut(i + 1) {
                next.line_start = true;
            }
        } else {
            glyphs[brk].line_start = true;
            let family = glyphs[brk].glyph.family();
            if family != glyphs[last_break].glyph.family() {
                if let Some(m) = metrics(family) {
                    line_advance = m.line_height;
                }
            }
            for glyph in &mut glyphs[brk..=i] {
                at = glyph.place(at);
            }
        }
        last_break = brk;
    }

    let width = glyphs
        .iter()
        .filter(|g| !g.is_newline())
        .map(|g| g.bounds.max.x)
        .fold(0.0f32, f32::max);

    let align_width = if max_width.is_finite() { max_width } else { width };
    align_lines(glyphs, align_width, align);

    Vector2::new(width, lines as f32 * line_advance)
}

/// Shifts every line right by its unused room, or half of it when centered.
fn align_lines(glyphs: &mut [GlyphLayout], width: f32, align: TextAlign) {
    if align == TextAlign::Left {
        return;
    }
    let mut start = 0;
    while start < glyphs.len() {
        let end = glyphs[start + 1..]
            .iter()
            .position(|g| g.line_start)
            .map_or(glyphs.len(), |p| start + 1 + p);

        let line = &mut glyphs[start..end];
        let drawn = || line.iter().filter(|g| !g.is_newline());
        let (Some(left), Some(right)) = (
            drawn().map(|g| g.bounds.min.x).reduce(f32::min),
            drawn().map(|g| g.bounds.max.x).reduce(f32::max),
        ) else {
            start = end;
            continue;
        };
        let room = width - (right - left.min(0.0));
        let shift = match align {
            TextAlign::Left => 0.0,
            TextAlign::Center => (room / 2.0).floor(),
            TextAlign::Right => room,
        };
        if shift > 0.0 {
            for glyph in line.iter_mut() {
                glyph.bounds = glyph.bounds.translate(Vector2::new(shift, 0.0));
            }
        }
        start = end;
    }
}

/// Moves laid out glyphs to `offset` and clips them against `clip`.
pub fn offset_and_clip(glyphs: &mut [GlyphLayout], offset: Vector2, clip: &Rect) {
    for glyph in glyphs {
        glyph.bounds = glyph.bounds.translate(offset);
        glyph.draw = if glyph.is_newline() {
            None
        } else {
            clip_rect_and_uv(clip, &glyph.bounds, &glyph.info.uv)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::Glyph;

    const ADVANCE: f32 = 10.0;

    /// Monospace glyphs 8x12, advancing 10px, sitting on a baseline 10px down.
    fn text(s: &str) -> Vec<GlyphLayout> {
        s.chars()
            .map(|c| {
                let mut g = GlyphLayout::new(GlyphId::new(1, c as u32), Color::WHITE);
                g.info = GlyphInfo {
                    glyph: Glyph {
                        src_width: 8,
                        src_height: 12,
                        dst_width: 8,
                        dst_height: 12,
                        x_advance: ADVANCE,
                        baseline_offset_y: -10.0,
                        ..Default::default()
                    },
                    uv: Rect::new(0.0, 0.0, 1.0, 1.0),
                };
                g
            })
            .collect()
    }

    fn metrics(_: u8) -> Option<FontMetrics> {
        Some(FontMetrics {
            pixel_height: 12.0,
            line_height: 16.0,
            to_baseline: 10.0,
        })
    }

    fn starts(glyphs: &[GlyphLayout]) -> Vec<usize> {
        glyphs
            .iter()
            .enumerate()
            .filter(|(_, g)| g.line_start)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn single_line_extent() {
        let mut glyphs = text("hello");
        let dim = layout_text(&mut glyphs, f32::INFINITY, TextAlign::Left, WrapMode::Words, metrics);
        assert_eq!(dim, Vector2::new(48.0, 16.0));
        assert_eq!(glyphs[0].bounds, Rect::new(0.0, 0.0, 8.0, 12.0));
        assert_eq!(glyphs[4].bounds.min.x, 40.0);
        assert_eq!(starts(&glyphs), vec![0]);
    }

    #[test]
    fn empty_text_has_no_extent() {
        let dim = layout_text(&mut [], 100.0, TextAlign::Left, WrapMode::Words, metrics);
        assert_eq!(dim, Vector2::ZERO);
    }

    #[test]
    fn newlines_always_break() {
        let mut glyphs = text("ab\ncd");
        let dim = layout_text(&mut glyphs, f32::INFINITY, TextAlign::Left, WrapMode::Newline, metrics);
        assert_eq!(dim, Vector2::new(18.0, 32.0));
        assert_eq!(starts(&glyphs), vec![0, 3]);
        assert_eq!(glyphs[3].bounds.min, Vector2::new(0.0, 16.0));
    }

    #[test]
    fn words_wrap_at_the_last_space() {
        // "hello wo" ends at 78, "r" would end at 88.
        let mut glyphs = text("hello world");
        let dim = layout_text(&mut glyphs, 80.0, TextAlign::Left, WrapMode::Words, metrics);
        assert_eq!(starts(&glyphs), vec![0, 6]);
        assert_eq!(glyphs[6].bounds.min, Vector2::new(0.0, 16.0));
        assert_eq!(glyphs[10].bounds.max.x, 48.0);
        assert_eq!(dim.y, 32.0);
    }

    #[test]
    fn long_words_break_mid_word() {
        let mut glyphs = text("abcdefgh");
        layout_text(&mut glyphs, 35.0, TextAlign::Left, WrapMode::Words, metrics);
        // 'd' ends at 38.
        assert_eq!(starts(&glyphs), vec![0, 3, 6]);
        assert_eq!(glyphs[3].bounds.min, Vector2::new(0.0, 16.0));
        assert_eq!(glyphs[7].bounds.min, Vector2::new(10.0, 32.0));
    }

    #[test]
    fn newline_mode_overflows() {
        let mut glyphs = text("hello world");
        let dim = layout_text(&mut glyphs, 30.0, TextAlign::Left, WrapMode::Newline, metrics);
        assert_eq!(starts(&glyphs), vec![0]);
        assert_eq!(dim, Vector2::new(108.0, 16.0));
    }

    #[test]
    fn lines_align_independently() {
        let mut glyphs = text("ab\nabcd");
        layout_text(&mut glyphs, 100.0, TextAlign::Right, WrapMode::Words, metrics);
        assert_eq!(glyphs[1].bounds.max.x, 100.0);
        assert_eq!(glyphs[6].bounds.max.x, 100.0);
        assert_eq!(glyphs[3].bounds.min.x, 62.0);

        let mut glyphs = text("ab");
        layout_text(&mut glyphs, 100.0, TextAlign::Center, WrapMode::Words, metrics);
        // 18px wide line, 82px room.
        assert_eq!(glyphs[0].bounds.min.x, 41.0);
    }

    #[test]
    fn unbounded_text_aligns_to_the_widest_line() {
        let mut glyphs = text("abcd\nab");
        let dim = layout_text(&mut glyphs, f32::INFINITY, TextAlign::Right, WrapMode::Words, metrics);
        assert_eq!(dim.x, 38.0);
        assert_eq!(glyphs[0].bounds.min.x, 0.0);
        assert_eq!(glyphs[6].bounds.max.x, 38.0);
    }

    #[test]
    fn clipping_against_widget_bounds() {
        let mut glyphs = text("abc");
        layout_text(&mut glyphs, f32::INFINITY, TextAlign::Left, WrapMode::Words, metrics);
        offset_and_clip(&mut glyphs, Vector2::new(100.0, 50.0), &Rect::new(100.0, 50.0, 124.0, 70.0));

        assert_eq!(glyphs[0].bounds, Rect::new(100.0, 50.0, 108.0, 62.0));
        assert!(glyphs[1].draw.is_some());
        let (bounds, uv) = glyphs[2].draw.unwrap();
        assert_eq!(bounds, Rect::new(120.0, 50.0, 124.0, 62.0));
        assert_eq!(uv.max.x, 0.5);

        offset_and_clip(&mut glyphs, Vector2::new(500.0, 0.0), &Rect::new(100.0, 50.0, 124.0, 70.0));
        assert!(glyphs.iter().all(|g| g.draw.is_none()));
    }
}
