//! Fonts as the core sees them: metrics plus a mapping from weights to glyph families.
//!
//! Rasterizing is left to a [`FontProvider`] installed on the context. The core asks it
//! for a glyph the first time a codepoint is used and packs the result into the atlas
//! of the font weight's family.

use crate::errors::{Error, Result};
use crate::glyph::GlyphDesc;

/// Weights a single font can map to glyph families.
pub const FONT_WEIGHTS_CAP: usize = 8;
/// The weight [`Fonts::add`] registers a new font under.
pub const DEFAULT_WEIGHT: u16 = 400;

/// A loaded font and one of its weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FontId {
    pub index: u16,
    pub weight: u16,
}

impl FontId {
    /// The same font at another weight.
    pub fn with_weight(self, weight: u16) -> Self {
        Self { weight, ..self }
    }
}

/// Vertical metrics for one font size, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FontMetrics {
    pub pixel_height: f32,
    /// Distance between two baselines.
    pub line_height: f32,
    /// Distance from the top of a line to its baseline.
    pub to_baseline: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightFamily {
    pub weight: u16,
    pub family: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub name: String,
    pub metrics: FontMetrics,
    pub weights: Vec<WeightFamily>,
}

/// Rasterizes glyphs on demand.
///
/// The `family` and `id` of returned descriptors are overwritten by the context, so
/// providers only fill in pixels and metrics.
pub trait FontProvider {
    /// Parses `data` and prepares it to produce glyphs `pixel_height` pixels tall.
    fn load_font(&mut self, font: FontId, data: &[u8], pixel_height: f32) -> Result<FontMetrics>;

    /// The glyph for `codepoint`, or `None` if the font has no such glyph.
    fn glyph(&mut self, font: FontId, codepoint: u32) -> Option<GlyphDesc>;
}

/// Every loaded font. Family 0 is never handed out; it holds the engine's own sprites.
#[derive(Debug)]
pub struct Fonts {
    fonts: Vec<Font>,
    next_family: u16,
    active: Option<FontId>,
}

impl Default for Fonts {
    fn default() -> Self {
        Self {
            fonts: Vec::new(),
            next_family: 1,
            active: None,
        }
    }
}

impl Fonts {
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn get(&self, index: u16) -> Option<&Font> {
        self.fonts.get(index as usize)
    }

    /// Adds a font under [`DEFAULT_WEIGHT`] with the next unused family. The first font
    /// added becomes the active one.
    pub fn add(&mut self, name: &str, metrics: FontMetrics) -> Result<FontId> {
        let family = self.alloc_family()?;
        let id = FontId {
            index: self.fonts.len() as u16,
            weight: DEFAULT_WEIGHT,
        };
        self.fonts.push(Font {
            name: name.to_owned(),
            metrics,
            weights: vec![WeightFamily {
                weight: DEFAULT_WEIGHT,
                family,
            }],
        });
        self.active.get_or_insert(id);
        Ok(id)
    }

    /// The index the next [`Fonts::add`] will use.
    pub fn next_id(&self) -> FontId {
        FontId {
            index: self.fonts.len() as u16,
            weight: DEFAULT_WEIGHT,
        }
    }

    fn alloc_family(&mut self) -> Result<u8> {
        let family = u8::try_from(self.next_family)
            .map_err(|_| Error::FontLoad("every glyph family is in use".into()))?;
        self.next_family += 1;
        Ok(family)
    }

    /// Maps `weight` of `font` to glyph family `family`, replacing an earlier mapping.
    ///
    /// # Panics
    ///
    /// If `font` is unknown or already has [`FONT_WEIGHTS_CAP`] weights.
    pub fn register_weight(&mut self, font: FontId, weight: u16, family: u8) -> FontId {
        let entry = self
            .fonts
            .get_mut(font.index as usize)
            .unwrap_or_else(|| panic!("unknown font {}", font.index));
        if let Some(existing) = entry.weights.iter_mut().find(|w| w.weight == weight) {
            existing.family = family;
        } else {
            assert!(
                entry.weights.len() < FONT_WEIGHTS_CAP,
                "font {:?} already has {FONT_WEIGHTS_CAP} weights",
                entry.name
            );
            entry.weights.push(WeightFamily { weight, family });
        }
        if u16::from(family) >= self.next_family {
            self.next_family = u16::from(family) + 1;
        }
        font.with_weight(weight)
    }

    /// The family glyphs of `font` live in. Unregistered weights use the font's first one.
    pub fn family_of(&self, font: FontId) -> Option<u8> {
        let entry = self.fonts.get(font.index as usize)?;
        entry
            .weights
            .iter()
            .find(|w| w.weight == font.weight)
            .or_else(|| entry.weights.first())
            .map(|w| w.family)
    }

    /// The font and weight that own `family`.
    pub fn font_for_family(&self, family: u8) -> Option<FontId> {
        self.fonts.iter().enumerate().find_map(|(index, font)| {
            font.weights
                .iter()
                .find(|w| w.family == family)
                .map(|w| FontId {
                    index: index as u16,
                    weight: w.weight,
                })
        })
    }

    pub fn metrics(&self, font: FontId) -> Option<FontMetrics> {
        self.get(font.index).map(|f| f.metrics)
    }

    pub fn metrics_for_family(&self, family: u8) -> Option<FontMetrics> {
        self.font_for_family(family).and_then(|f| self.metrics(f))
    }

    pub fn set_metrics(&mut self, font: FontId, metrics: FontMetrics) {
        if let Some(f) = self.fonts.get_mut(font.index as usize) {
            f.metrics = metrics;
        }
    }

    pub fn active(&self) -> Option<FontId> {
        self.active
    }

    pub fn set_active(&mut self, font: FontId) {
        self.active = Some(font);
    }

    /// `font` if given, else the active font.
    pub fn resolve(&self, font: Option<FontId>) -> Option<FontId> {
        font.or(self.active)
    }
}
