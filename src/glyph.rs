//! Glyph registry and the per-family texture atlases glyph bitmaps are packed into.
//!
//! Every glyph family (one per font weight, plus family 0 for engine sprites) owns one
//! square power-of-two RGBA atlas. Glyphs are packed left to right in rows with a one
//! pixel apron around each, and an atlas doubles in size when a glyph no longer fits.

use rustc_hash::FxHashMap;

use crate::color::gamma_channel;
use crate::errors::{Error, Result};
use crate::math::{is_pow2, round_to_pow2, Rect, Vector2};

/// Atlas slots are allocated at least this many at a time.
pub const MIN_ATLAS_SLOTS: usize = 4;

const APRON: u32 = 2;

/// A glyph's identity: a 24-bit id (a codepoint for font glyphs) and an 8-bit family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct GlyphId(u32);

impl GlyphId {
    /// A 4x4 opaque white glyph registered by every context. Backgrounds, outlines
    /// and selection highlights sample it.
    pub const WHITE: GlyphId = GlyphId::new(0, 1);

    pub const fn new(family: u8, id: u32) -> Self {
        Self((id & 0x00FF_FFFF) | (family as u32) << 24)
    }

    #[inline]
    pub const fn family(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline]
    pub const fn id(self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_char(self, c: char) -> bool {
        self.id() == c as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum GlyphFormat {
    #[default]
    Rgba8,
    /// Stored with an opaque alpha channel.
    Rgb8,
    /// Stored as white with the value in the alpha channel.
    Alpha8,
}

impl GlyphFormat {
    /// Bytes per source pixel.
    #[inline]
    pub fn stride(self) -> usize {
        match self {
            GlyphFormat::Rgba8 => 4,
            GlyphFormat::Rgb8 => 3,
            GlyphFormat::Alpha8 => 1,
        }
    }
}

/// A glyph as handed over for registration.
#[derive(Debug, Clone, Default)]
pub struct GlyphDesc {
    pub family: u8,
    pub id: u32,
    /// Source pixels, row-major. May be empty for glyphs that only carry metrics.
    pub data: Vec<u8>,
    pub format: GlyphFormat,
    /// Pixels this glyph occupies in the atlas.
    pub src_width: u32,
    pub src_height: u32,
    /// Pixels per source row. 0 means `src_width`.
    pub stride: u32,
    /// Pixels the glyph covers on screen. 0 means the matching `src_*` value.
    pub dst_width: u32,
    pub dst_height: u32,
    /// Cursor to left edge of the glyph.
    pub lsb: f32,
    /// Cursor to the next glyph's cursor.
    pub x_advance: f32,
    pub baseline_offset_y: f32,
    /// Applied to every channel while copying. 0 and 1 both mean "copy as is".
    pub gamma: f32,
}

/// A registered glyph's placement and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Glyph {
    pub src_width: u32,
    pub src_height: u32,
    pub dst_width: u32,
    pub dst_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub lsb: f32,
    pub x_advance: f32,
    pub baseline_offset_y: f32,
}

/// A glyph together with its current UV rect.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphInfo {
    pub glyph: Glyph,
    pub uv: Rect,
}

impl GlyphInfo {
    /// Screen bounds when the cursor is at `at`, and where the cursor goes next.
    pub fn place(&self, at: Vector2) -> (Rect, Vector2) {
        let min = Vector2::new(at.x + self.glyph.lsb, at.y + self.glyph.baseline_offset_y);
        let dim = Vector2::new(self.glyph.dst_width as f32, self.glyph.dst_height as f32);
        let next = Vector2::new((at.x + self.glyph.x_advance).floor(), at.y);
        (Rect::from_min_dim(min, dim), next)
    }
}

/// What changed in an atlas since the renderer last looked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum AtlasDirty {
    #[default]
    Clean,
    /// New pixels were written; the texture size is unchanged.
    UpdateData,
    /// The atlas was resized and must be re-uploaded whole.
    Grow,
}

/// One square RGBA8 texture.
#[derive(Debug, Clone)]
pub struct Atlas {
    family: u8,
    dim: u32,
    data: Vec<u8>,
    dirty: AtlasDirty,
    // x just past the last glyph's right apron
    pen_x: u32,
    row_y: u32,
    row_bottom: u32,
    glyph_count: u32,
}

impl Atlas {
    fn new(family: u8, dim: u32) -> Self {
        Self {
            family,
            dim,
            data: vec![0; (dim * dim * 4) as usize],
            dirty: AtlasDirty::Grow,
            pen_x: 0,
            row_y: APRON / 2,
            row_bottom: APRON / 2,
            glyph_count: 0,
        }
    }

    pub fn family(&self) -> u8 {
        self.family
    }

    /// Width and height in pixels.
    pub fn dim(&self) -> u32 {
        self.dim
    }

    /// RGBA8 pixels, `dim * dim * 4` bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn dirty(&self) -> AtlasDirty {
        self.dirty
    }

    pub fn glyph_count(&self) -> u32 {
        self.glyph_count
    }

    fn mark(&mut self, dirty: AtlasDirty) {
        self.dirty = self.dirty.max(dirty);
    }

    /// Finds room for a `w` x `h` glyph without committing to it.
    fn find_slot(&self, w: u32, h: u32) -> Option<(u32, u32)> {
        let (mut x, mut y) = (self.pen_x, self.row_y);
        if x + w + APRON > self.dim {
            x = 0;
            y = self.row_bottom + APRON / 2;
        }
        if x + w + APRON > self.dim || y + h + APRON / 2 >= self.dim {
            return None;
        }
        Some((x + 1, y))
    }

    fn commit_slot(&mut self, x: u32, y: u32, w: u32, h: u32) {
        if y != self.row_y {
            self.row_y = y;
            self.row_bottom = y;
        }
        self.pen_x = x + w + 1;
        self.row_bottom = self.row_bottom.max(y + h);
        self.glyph_count += 1;
    }

    fn grow(&mut self, new_dim: u32) {
        let old_dim = self.dim as usize;
        let mut data = vec![0u8; new_dim as usize * new_dim as usize * 4];
        for (row, src) in self.data.chunks_exact(old_dim * 4).enumerate() {
            let start = row * new_dim as usize * 4;
            data[start..start + src.len()].copy_from_slice(src);
        }
        self.data = data;
        self.dim = new_dim;
        self.mark(AtlasDirty::Grow);
    }

    fn blit(&mut self, x: u32, y: u32, desc: &GlyphDesc) {
        if desc.data.is_empty() {
            return;
        }
        let bpp = desc.format.stride();
        let row_pixels = if desc.stride == 0 { desc.src_width } else { desc.stride } as usize;
        let (w, dim) = (desc.src_width as usize, self.dim as usize);
        let gamma = if desc.gamma == 0.0 { 1.0 } else { desc.gamma };

        for row in 0..desc.src_height as usize {
            let src_start = row * row_pixels * bpp;
            let Some(src) = desc.data.get(src_start..src_start + w * bpp) else {
                tracing::warn!(
                    family = desc.family,
                    id = desc.id,
                    "glyph bitmap shorter than its declared size"
                );
                break;
            };
            let dst_start = ((y as usize + row) * dim + x as usize) * 4;
            let dst = &mut self.data[dst_start..dst_start + w * 4];
            for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(bpp)) {
                match desc.format {
                    GlyphFormat::Rgba8 => {
                        for (dc, sc) in d.iter_mut().zip(s) {
                            *dc = gamma_channel(*sc, gamma);
                        }
                    }
                    GlyphFormat::Rgb8 => {
                        for (dc, sc) in d.iter_mut().zip(s) {
                            *dc = gamma_channel(*sc, gamma);
                        }
                        d[3] = 0xFF;
                    }
                    GlyphFormat::Alpha8 => {
                        d[..3].fill(0xFF);
                        d[3] = gamma_channel(s[0], gamma);
                    }
                }
            }
        }
        self.mark(AtlasDirty::UpdateData);
    }
}

/// Every registered glyph and the atlases backing them.
#[derive(Debug)]
pub struct GlyphStore {
    glyphs: FxHashMap<GlyphId, Glyph>,
    atlases: Vec<Option<Atlas>>,
    start_dim: u32,
    max_dim: u32,
}

impl GlyphStore {
    pub fn new(start_dim: u32, max_dim: u32) -> Self {
        assert!(
            is_pow2(start_dim) && is_pow2(max_dim) && start_dim <= max_dim,
            "atlas dims must be powers of two with start <= max, got {start_dim} and {max_dim}"
        );
        Self {
            glyphs: FxHashMap::default(),
            atlases: Vec::new(),
            start_dim,
            max_dim,
        }
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn contains(&self, id: GlyphId) -> bool {
        self.glyphs.contains_key(&id)
    }

    /// Number of atlas slots, created or not. Render buffers are kept per slot.
    pub fn atlas_slots(&self) -> usize {
        self.atlases.len()
    }

    pub fn atlas(&self, family: u8) -> Option<&Atlas> {
        self.atlases.get(family as usize)?.as_ref()
    }

    pub fn atlases(&self) -> impl Iterator<Item = &Atlas> {
        self.atlases.iter().flatten()
    }

    /// Packs `desc` into its family's atlas. Registering a known id does nothing.
    pub fn register(&mut self, desc: &GlyphDesc) -> Result<GlyphId> {
        let id = GlyphId::new(desc.family, desc.id);
        if self.glyphs.contains_key(&id) {
            return Ok(id);
        }

        let (w, h) = (desc.src_width, desc.src_height);
        let max_dim = self.max_dim;
        let atlas = self.atlas_for(desc.family, w.max(h));
        let (x, y) = loop {
            if let Some(slot) = atlas.find_slot(w, h) {
                break slot;
            }
            let next = atlas.dim * 2;
            if next > max_dim {
                return Err(Error::AtlasFull {
                    family: desc.family,
                    dim: atlas.dim,
                });
            }
            tracing::debug!(family = desc.family, from = atlas.dim, to = next, "growing glyph atlas");
            atlas.grow(next);
        };
        atlas.commit_slot(x, y, w, h);
        atlas.blit(x, y, desc);

        self.glyphs.insert(
            id,
            Glyph {
                src_width: w,
                src_height: h,
                dst_width: if desc.dst_width == 0 { w } else { desc.dst_width },
                dst_height: if desc.dst_height == 0 { h } else { desc.dst_height },
                offset_x: x,
                offset_y: y,
                lsb: desc.lsb,
                x_advance: desc.x_advance,
                baseline_offset_y: desc.baseline_offset_y,
            },
        );
        Ok(id)
    }

    fn atlas_for(&mut self, family: u8, min_dim: u32) -> &mut Atlas {
        let index = family as usize;
        if index >= self.atlases.len() {
            self.atlases.resize_with((index + 1).max(MIN_ATLAS_SLOTS), || None);
        }
        let start_dim = self.start_dim.max(round_to_pow2(min_dim));
        self.atlases[index].get_or_insert_with(|| {
            tracing::debug!(family, dim = start_dim, "glyph atlas created");
            Atlas::new(family, start_dim)
        })
    }

    /// The glyph and its UVs against the current atlas size.
    pub fn lookup(&self, id: GlyphId) -> Option<GlyphInfo> {
        let glyph = *self.glyphs.get(&id)?;
        let dim = self.atlas(id.family())?.dim as f32;
        let uv = Rect::new(
            glyph.offset_x as f32 / dim,
            glyph.offset_y as f32 / dim,
            (glyph.offset_x + glyph.src_width) as f32 / dim,
            (glyph.offset_y + glyph.src_height) as f32 / dim,
        );
        Some(GlyphInfo { glyph, uv })
    }

    /// Calls `f` for every atlas that changed, then marks them clean.
    pub fn drain_dirty(&mut self, mut f: impl FnMut(u8, &Atlas, AtlasDirty)) {
        for atlas in self.atlases.iter_mut().flatten() {
            if atlas.dirty == AtlasDirty::Clean {
                continue;
            }
            f(atlas.family, atlas, atlas.dirty);
            atlas.dirty = AtlasDirty::Clean;
        }
    }
}
