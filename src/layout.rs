use crate::math::Axis;

/// How a widget's extent along one axis, or one margin edge, is derived.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Size {
    /// Unset. Widths and heights left unset become [`Size::ChildrenSum`].
    #[default]
    None,
    /// A fixed number of pixels.
    Pixels(f32),
    /// The extent of the widget's laid out text plus its margins.
    TextContent,
    /// A fraction of the widget's own extent. Only valid for margins.
    PercentOfSelf(f32),
    /// A fraction of the parent's extent, minus the parent's margins.
    PercentOfParent(f32),
    /// The children laid end to end along the parent's direction, or the widest child
    /// across it, plus the widget's margins.
    ChildrenSum,
}

impl Size {
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Size::None)
    }

    /// Whether this size may be used as a margin or position edge.
    #[inline]
    pub fn is_valid_margin(&self) -> bool {
        !matches!(self, Size::TextContent | Size::ChildrenSum)
    }
}

/// The two edges of a [`SizeBox`] along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SizeRange {
    pub min: Size,
    pub max: Size,
}

/// Four independent edges. `left`/`right` are the X range, `top`/`bottom` the Y range.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SizeBox {
    pub left: Size,
    pub right: Size,
    pub top: Size,
    pub bottom: Size,
}

impl SizeBox {
    pub fn new(left: Size, right: Size, top: Size, bottom: Size) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// Sets the same size on every edge.
    pub fn all(value: Size) -> Self {
        Self::new(value, value, value, value)
    }

    /// Sets left and right. Top and bottom stay unset.
    pub fn horizontal(value: Size) -> Self {
        Self::new(value, value, Size::None, Size::None)
    }

    /// Sets top and bottom. Left and right stay unset.
    pub fn vertical(value: Size) -> Self {
        Self::new(Size::None, Size::None, value, value)
    }

    #[inline]
    pub fn axis(&self, axis: Axis) -> SizeRange {
        match axis {
            Axis::X => SizeRange {
                min: self.left,
                max: self.right,
            },
            Axis::Y => SizeRange {
                min: self.top,
                max: self.bottom,
            },
        }
    }

    fn edges(&self) -> [Size; 4] {
        [self.left, self.right, self.top, self.bottom]
    }
}

impl From<Size> for SizeBox {
    fn from(value: Size) -> Self {
        Self::all(value)
    }
}

impl From<f32> for SizeBox {
    /// Same pixel margin on every edge.
    fn from(value: f32) -> Self {
        Self::all(Size::Pixels(value))
    }
}

/// The direction children are stacked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Direction {
    #[default]
    TopDown,
    BottomUp,
    LeftToRight,
    RightToLeft,
}

impl Direction {
    /// The axis children advance along.
    #[inline]
    pub fn main_axis(&self) -> Axis {
        match self {
            Direction::TopDown | Direction::BottomUp => Axis::Y,
            Direction::LeftToRight | Direction::RightToLeft => Axis::X,
        }
    }

    /// Whether children grow toward the origin on `axis`.
    #[inline]
    pub fn is_reversed_on(&self, axis: Axis) -> bool {
        matches!(
            (self, axis),
            (Direction::BottomUp, Axis::Y) | (Direction::RightToLeft, Axis::X)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PositionKind {
    /// Placed after the previous `ParentDecides` sibling in the parent's direction.
    #[default]
    ParentDecides,
    /// Offset from the parent's offset by the position box. Siblings skip it and it is
    /// never clipped.
    FixedInParent,
    /// Offset from the screen origin by the position box. Siblings skip it and it is
    /// never clipped.
    FixedOnScreen,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub kind: PositionKind,
    /// For fixed kinds, the min edge offsets from the near side. When the max edge is set
    /// it wins and anchors the widget from the far side of the parent.
    pub at: SizeBox,
    pub z: f32,
}

/// Everything the layout passes need to know about one widget.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Layout {
    pub width: Size,
    pub height: Size,
    pub margin: SizeBox,
    pub direction: Direction,
    pub position: Position,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn size(&self, axis: Axis) -> Size {
        match axis {
            Axis::X => self.width,
            Axis::Y => self.height,
        }
    }

    #[inline]
    pub fn set_size(&mut self, axis: Axis, size: Size) {
        match axis {
            Axis::X => self.width = size,
            Axis::Y => self.height = size,
        }
    }

    /// Sets the width.
    #[inline]
    pub fn width(&mut self, width: Size) -> &mut Self {
        self.width = width;
        self
    }

    /// Sets the height.
    #[inline]
    pub fn height(&mut self, height: Size) -> &mut Self {
        self.height = height;
        self
    }

    /// Sets the margins, the space between this widget's edges and its content.
    #[inline]
    pub fn margin(&mut self, margin: impl Into<SizeBox>) -> &mut Self {
        self.margin = margin.into();
        self
    }

    /// Sets the direction children are stacked in.
    #[inline]
    pub fn direction(&mut self, direction: Direction) -> &mut Self {
        self.direction = direction;
        self
    }

    /// Pins this widget relative to its parent, out of the parent's flow.
    #[inline]
    pub fn fixed_in_parent(&mut self, at: impl Into<SizeBox>) -> &mut Self {
        self.position.kind = PositionKind::FixedInParent;
        self.position.at = at.into();
        self
    }

    /// Pins this widget relative to the screen origin.
    #[inline]
    pub fn fixed_on_screen(&mut self, at: impl Into<SizeBox>) -> &mut Self {
        self.position.kind = PositionKind::FixedOnScreen;
        self.position.at = at.into();
        self
    }

    #[inline]
    pub fn z(&mut self, z: f32) -> &mut Self {
        self.position.z = z;
        self
    }

    /// Fills in unset widths and heights and checks the combination is usable.
    ///
    /// # Panics
    ///
    /// If a margin or position edge is sized by text or children, or if the width or
    /// height is a percent of self.
    pub(crate) fn with_defaults(mut self) -> Self {
        if self.width.is_none() {
            self.width = Size::ChildrenSum;
        }
        if self.height.is_none() {
            self.height = Size::ChildrenSum;
        }
        self.validate();
        self
    }

    pub(crate) fn validate(&self) {
        for edge in self.margin.edges() {
            assert!(
                edge.is_valid_margin(),
                "margins cannot be sized by {edge:?}"
            );
        }
        for edge in self.position.at.edges() {
            assert!(
                edge.is_valid_margin(),
                "position offsets cannot be sized by {edge:?}"
            );
        }
        for axis in Axis::BOTH {
            assert!(
                !matches!(self.size(axis), Size::PercentOfSelf(_)),
                "a widget's {axis:?} size cannot be a percent of itself"
            );
        }
    }
}

/// Shorthand macro for [`Size::Pixels`].
#[macro_export]
macro_rules! px {
    ($val:expr) => {
        $crate::layout::Size::Pixels($val as f32)
    };
}

/// Shorthand macro for [`Size::PercentOfParent`].
/// The value has to be in range `0.0..=1.0`.
#[macro_export]
macro_rules! pct {
    ($percent:expr) => {{
        const _: () = assert!(
            $percent >= 0.0 && $percent <= 1.0,
            "Percent value must be between 0.0 and 1.0 inclusive!"
        );
        $crate::layout::Size::PercentOfParent($percent)
    }};
}

/// Shorthand macro for [`Size::PercentOfSelf`], for margins.
#[macro_export]
macro_rules! pct_self {
    ($percent:expr) => {{
        const _: () = assert!(
            $percent >= 0.0 && $percent <= 1.0,
            "Percent value must be between 0.0 and 1.0 inclusive!"
        );
        $crate::layout::Size::PercentOfSelf($percent)
    }};
}
