use thiserror::Error;

use crate::math::Axis;

pub type Result<T> = std::result::Result<T, Error>;

/// Conditions the context reports instead of producing silently degenerate output.
///
/// Frame-scoped errors are collected in [`Context::diagnostics`](crate::Context::diagnostics)
/// and cleared on the next `prepare`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Thrown if two widgets in the same frame hash to the same id. Both share one
    /// cache record, so their persistent state and bounds will clobber each other.
    #[error("duplicate widget id {id:#010x} ({display:?})")]
    DuplicateId { id: u32, display: String },
    /// A widget sized as a percent of a parent that is itself sized by its children.
    /// The size is resolved against the parent's final size, which excludes this widget.
    #[error("unresolved {axis:?} size for widget {id:#010x}")]
    UnresolvedSize { id: u32, axis: Axis },
    /// The glyph atlas for `family` is already at its maximum dimension.
    #[error("glyph atlas {family} is full at {dim}x{dim}")]
    AtlasFull { family: u8, dim: u32 },
    #[error("font load failed: {0}")]
    FontLoad(String),
    #[error("no font provider installed")]
    NoFontProvider,
}
