//! Vertex and index buffers handed to the renderer, one per glyph family.

use crate::color::Color;
use crate::math::{Rect, Vector2};
use crate::text::GlyphLayout;

/// Floats per vertex: position xyz, uv, color rgba.
pub const VERTEX_STRIDE: usize = 9;

/// Interleaved vertices and triangle indices for one atlas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VIBuffer {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl VIBuffer {
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }

    pub fn quad_count(&self) -> usize {
        self.indices.len() / 6
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Two clockwise triangles over min/min, max/min, max/max, min/max.
    pub fn push_quad(&mut self, bounds: &Rect, uv: &Rect, z: f32, color: Color) {
        let base = self.vertex_count() as u32;
        let rgba = color.to_floats();
        let corners = [
            (bounds.min.x, bounds.min.y, uv.min.x, uv.min.y),
            (bounds.max.x, bounds.min.y, uv.max.x, uv.min.y),
            (bounds.max.x, bounds.max.y, uv.max.x, uv.max.y),
            (bounds.min.x, bounds.max.y, uv.min.x, uv.max.y),
        ];
        for (x, y, u, v) in corners {
            self.vertices.extend_from_slice(&[x, y, z, u, v]);
            self.vertices.extend_from_slice(&rgba);
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// A frame `thickness` pixels wide inside `bounds`: full-width top and bottom bars,
    /// with the sides fitted between them.
    pub fn push_outline(&mut self, bounds: &Rect, thickness: f32, uv: &Rect, z: f32, color: Color) {
        let (min, max, t) = (bounds.min, bounds.max, thickness);
        let sides = [
            Rect::new(min.x, min.y, max.x, min.y + t),
            Rect::new(min.x, max.y - t, max.x, max.y),
            Rect::new(min.x, min.y + t, min.x + t, max.y - t),
            Rect::new(max.x - t, min.y + t, max.x, max.y - t),
        ];
        for side in sides {
            self.push_quad(&side, uv, z, color);
        }
    }
}

/// Depth for each widget's layers, counting from `max` toward `min`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZSteps {
    at: f32,
    step: f32,
}

impl ZSteps {
    pub const LAYERS: f32 = 3.0;

    pub fn new(z_min: f32, z_max: f32, widget_count: usize) -> Self {
        let layers = (widget_count.max(1) as f32) * Self::LAYERS;
        Self {
            at: z_max,
            step: (z_min - z_max) / layers,
        }
    }

    /// Background, text and outline depths for the next widget.
    pub fn next(&mut self) -> [f32; 3] {
        let z = [self.at, self.at + self.step, self.at + 2.0 * self.step];
        self.at += Self::LAYERS * self.step;
        z
    }
}

/// Merges runs of selected glyphs on the same line into one quad, grown by `inset`.
pub fn push_selection(
    buffer: &mut VIBuffer,
    glyphs: &[GlyphLayout],
    uv: &Rect,
    z: f32,
    color: Color,
    inset: f32,
) {
    let mut pending: Option<Rect> = None;
    let flush = |rect: Option<Rect>, buffer: &mut VIBuffer| {
        if let Some(mut rect) = rect {
            rect.expand(inset, inset, inset, inset);
            buffer.push_quad(&rect, uv, z, color);
        }
    };

    for glyph in glyphs {
        // Undrawn glyphs keep the run going.
        let Some((bounds, _)) = glyph.draw else {
            if glyph.line_start {
                flush(pending.take(), buffer);
            }
            continue;
        };
        if !glyph.selected {
            flush(pending.take(), buffer);
            continue;
        }
        pending = match pending {
            Some(rect) if !glyph.line_start => Some(Rect {
                min: Vector2::new(rect.min.x.min(bounds.min.x), rect.min.y.min(bounds.min.y)),
                max: Vector2::new(rect.max.x.max(bounds.max.x), rect.max.y.max(bounds.max.y)),
            }),
            previous => {
                flush(previous, buffer);
                Some(bounds)
            }
        };
    }
    flush(pending, buffer);
}
