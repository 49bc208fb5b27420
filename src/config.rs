use crate::arena::DEFAULT_BUCKET_SIZE;
use crate::color::Color;
use crate::hashtable::DEFAULT_CAPACITY;
use crate::math::is_pow2;

/// Bytes of persistent state each widget identity can hold.
pub const PERSISTENT_VALUE_CAP: usize = 32;

/// Sizes and defaults a [`Context`](crate::Context) is created with.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    pub arena_bucket_size: usize,
    /// Initial slots of the identity table. Must be a power of two.
    pub cache_table_capacity: usize,
    /// Depth given to the last layer drawn.
    pub z_depth_min: f32,
    /// Depth given to the root's background.
    pub z_depth_max: f32,
    pub atlas_start_dim: u32,
    pub atlas_max_dim: u32,
    pub selection_color: Color,
    /// Pixels the selection highlight extends past the selected glyphs.
    pub selection_inset: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            arena_bucket_size: DEFAULT_BUCKET_SIZE,
            cache_table_capacity: DEFAULT_CAPACITY,
            z_depth_min: -1.0,
            z_depth_max: 20.0,
            atlas_start_dim: 1024,
            atlas_max_dim: 4096,
            selection_color: Color::hex(0x0088FFFF),
            selection_inset: 4.0,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn arena_bucket_size(&mut self, bytes: usize) -> &mut Self {
        self.arena_bucket_size = bytes;
        self
    }

    #[inline]
    pub fn cache_table_capacity(&mut self, slots: usize) -> &mut Self {
        self.cache_table_capacity = slots;
        self
    }

    #[inline]
    pub fn z_depth(&mut self, min: f32, max: f32) -> &mut Self {
        self.z_depth_min = min;
        self.z_depth_max = max;
        self
    }

    /// Atlases start at `start` pixels square and double until `max`.
    #[inline]
    pub fn atlas_dims(&mut self, start: u32, max: u32) -> &mut Self {
        self.atlas_start_dim = start;
        self.atlas_max_dim = max;
        self
    }

    #[inline]
    pub fn selection(&mut self, color: impl Into<Color>, inset: f32) -> &mut Self {
        self.selection_color = color.into();
        self.selection_inset = inset;
        self
    }

    pub(crate) fn validate(&self) {
        assert!(
            self.cache_table_capacity.is_power_of_two(),
            "cache table capacity must be a power of two, got {}",
            self.cache_table_capacity
        );
        assert!(
            is_pow2(self.atlas_start_dim) && is_pow2(self.atlas_max_dim),
            "atlas dims must be powers of two"
        );
        assert!(self.arena_bucket_size > 0, "arena buckets cannot be empty");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_setters() {
        let mut config = Config::new();
        config.atlas_dims(256, 512).z_depth(0.0, 1.0).selection(0xFF0000FF, 2.0);
        assert_eq!(config.atlas_start_dim, 256);
        assert_eq!(config.atlas_max_dim, 512);
        assert_eq!(config.z_depth_max, 1.0);
        assert_eq!(config.selection_color, Color::rgb(0xFF, 0, 0));
        config.validate();
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn table_capacity_is_checked() {
        Config::new().cache_table_capacity(1000).validate();
    }
}
