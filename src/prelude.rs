//! The weft prelude, a single import for declaring widgets.
//!
//! ```rust
//! use weft::prelude::*;
//! ```

// Core types
pub use crate::{Color, Config, Context, Error, Id, WidgetDesc};

// Frame input and results
pub use crate::input::{FrameDesc, InputFlags, MouseButton, WidgetInput};

// Layout and style
pub use crate::layout::{Direction, Layout, PositionKind, Size, SizeBox};
pub use crate::style::{Draw, Style};
pub use crate::text::{TextAlign, WrapMode};
pub use crate::math::{Rect, Vector2};

// Fonts, glyphs and output
pub use crate::font::{FontId, FontMetrics, FontProvider};
pub use crate::glyph::{Atlas, AtlasDirty, GlyphDesc, GlyphFormat, GlyphId};
pub use crate::render::VIBuffer;

// Macros
pub use crate::{pct, pct_self, px};
