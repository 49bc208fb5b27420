//! Immediate-mode UI core with a retained widget tree.
//!
//! Widgets are declared every frame between [`Context::prepare`] and
//! [`Context::advance`]. The context pairs them with last frame's widgets by id,
//! lays them out, and fills one vertex/index buffer per glyph atlas for the
//! renderer to draw.
//!
//! ```rust
//! use weft::prelude::*;
//!
//! let mut ctx = Context::default();
//! ctx.prepare(&FrameDesc::new((800.0, 600.0)));
//! ctx.push(WidgetDesc::new("root").size(px!(800), px!(600)));
//! let save = ctx.widget(WidgetDesc::labeled("Save##toolbar").size(px!(80), px!(24)));
//! if save.clicked {
//!     println!("saving");
//! }
//! ctx.pop();
//! ctx.advance();
//!
//! assert_eq!(ctx.bounds("root"), Some(Rect::new(0.0, 0.0, 800.0, 600.0)));
//! ```

pub mod arena;
pub mod color;
pub mod config;
pub mod engine;
pub mod errors;
pub mod font;
pub mod glyph;
pub mod hashtable;
pub mod id;
pub mod input;
pub mod layout;
pub mod math;
pub mod pool;
pub mod prelude;
pub mod render;
pub mod style;
pub mod text;
pub mod tree;

pub use color::Color;
pub use config::Config;
pub use engine::{Cached, Context, WidgetDesc};
pub use errors::{Error, Result};
pub use id::Id;
