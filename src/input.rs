use std::ops::Range;

use crate::math::{Rect, Vector2};

/// A button's state this frame and last frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseButton {
    pub is_down: bool,
    pub was_down: bool,
}

impl MouseButton {
    pub const UP: MouseButton = MouseButton::new(false, false);
    pub const PRESSED: MouseButton = MouseButton::new(true, false);
    pub const HELD: MouseButton = MouseButton::new(true, true);
    pub const RELEASED: MouseButton = MouseButton::new(false, true);

    pub const fn new(is_down: bool, was_down: bool) -> Self {
        Self { is_down, was_down }
    }

    /// Went down this frame.
    #[inline]
    pub fn transitioned_down(&self) -> bool {
        self.is_down && !self.was_down
    }

    /// Went up this frame.
    #[inline]
    pub fn transitioned_up(&self) -> bool {
        !self.is_down && self.was_down
    }

    /// Down this frame and the last.
    #[inline]
    pub fn held(&self) -> bool {
        self.is_down && self.was_down
    }

    /// This state followed by a frame where the button is `is_down`.
    #[inline]
    pub fn next(self, is_down: bool) -> Self {
        Self::new(is_down, self.is_down)
    }
}

/// What the host tells the context at the start of every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDesc {
    pub screen_dim: Vector2,
    pub mouse_pos: Vector2,
    pub mouse_left: MouseButton,
    pub mouse_right: MouseButton,
    /// Stored for render consumers. Layout is always in physical pixels.
    pub dpi: f32,
}

impl Default for FrameDesc {
    fn default() -> Self {
        Self {
            screen_dim: Vector2::ZERO,
            mouse_pos: Vector2::ZERO,
            mouse_left: MouseButton::UP,
            mouse_right: MouseButton::UP,
            dpi: 1.0,
        }
    }
}

impl FrameDesc {
    pub fn new(screen_dim: impl Into<Vector2>) -> Self {
        Self {
            screen_dim: screen_dim.into(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn mouse_pos(&mut self, pos: impl Into<Vector2>) -> &mut Self {
        self.mouse_pos = pos.into();
        self
    }

    #[inline]
    pub fn mouse_left(&mut self, state: MouseButton) -> &mut Self {
        self.mouse_left = state;
        self
    }

    #[inline]
    pub fn mouse_right(&mut self, state: MouseButton) -> &mut Self {
        self.mouse_right = state;
        self
    }

    #[inline]
    pub fn dpi(&mut self, dpi: f32) -> &mut Self {
        self.dpi = dpi;
        self
    }
}

bitflags::bitflags! {
    /// How a widget reacts to the mouse.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InputFlags: u8 {
        const NONE = 0;
        /// Never becomes hot or active. Widgets underneath get the mouse instead.
        const DO_NOT_CAPTURE_MOUSE = 1 << 0;
        /// Reports drag offsets while active.
        const DRAGGABLE = 1 << 1;
        /// Tracks which glyphs the mouse swept over while held.
        const TEXT_SELECTABLE = 1 << 2;
    }
}

/// Input results for one widget, computed when it is pushed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WidgetInput {
    /// The left button went down over this widget this frame.
    pub clicked: bool,
    /// The left button stayed down since it went down over this widget.
    pub held: bool,
    /// The left button went up after going down over this widget.
    pub released: bool,
    /// Mouse movement since the button went down.
    pub drag_offset_pixels: Vector2,
    /// `drag_offset_pixels` over the parent's size last frame.
    pub drag_offset_percent_parent: Vector2,
    /// Glyph indices swept over, first inclusive to last exclusive.
    pub selected_glyphs: Range<u32>,
}

impl WidgetInput {
    pub fn has_selection(&self) -> bool {
        !self.selected_glyphs.is_empty()
    }
}

/// Mouse ownership across frames, worked out from last frame's bounds.
#[derive(Debug, Clone, Default)]
pub(crate) struct InputState {
    pub frame: FrameDesc,
    pub mouse_down_pos: Vector2,
    /// Topmost widget under the mouse. 0 is none.
    pub hot: u32,
    /// Widget the left button went down on, while it is held.
    pub active: u32,
    pub last_active: u32,
    pub selection: Range<u32>,
    pending_selection: Option<(Option<u32>, Option<u32>)>,
}

impl InputState {
    /// Takes in a new frame's input and rotates the active widget.
    pub fn begin_frame(&mut self, frame: &FrameDesc) {
        self.frame = *frame;
        if frame.mouse_left.transitioned_down() {
            self.mouse_down_pos = frame.mouse_pos;
        }
        if self.active != 0 {
            self.last_active = self.active;
        }
        self.hot = 0;
        self.active = 0;
    }

    /// Called for every widget in last frame's tree, preorder, so later widgets win.
    pub fn hit_test(
        &mut self,
        id: u32,
        flags: InputFlags,
        bounds: &Rect,
        glyphs: impl Iterator<Item = Rect>,
    ) {
        if flags.contains(InputFlags::DO_NOT_CAPTURE_MOUSE) {
            return;
        }
        if self.frame.mouse_left.is_down && bounds.contains(self.mouse_down_pos) {
            self.active = id;
            self.pending_selection = None;
            if flags.contains(InputFlags::TEXT_SELECTABLE) {
                let mut anchor = None;
                let mut hover = None;
                for (i, glyph) in glyphs.enumerate() {
                    if glyph.contains(self.mouse_down_pos) {
                        anchor = Some(i as u32);
                    }
                    if glyph.contains(self.frame.mouse_pos) {
                        hover = Some(i as u32);
                    }
                }
                self.pending_selection = Some((anchor, hover));
            }
        }
        if bounds.contains(self.frame.mouse_pos) {
            self.hot = id;
        }
    }

    /// Settles the selection once every widget was hit tested.
    pub fn end_hit_test(&mut self) {
        if self.active != 0 && self.active != self.last_active {
            self.selection = 0..0;
        }
        let Some((Some(anchor), hover)) = self.pending_selection.take() else {
            return;
        };
        // Off-glyph mouse positions keep the previous end.
        let hover = hover.unwrap_or_else(|| match self.selection.end {
            0 => anchor,
            end if end - 1 == anchor => self.selection.start,
            end => end - 1,
        });
        self.selection = anchor.min(hover)..anchor.max(hover) + 1;
    }

    /// Results for widget `id`, whose parent measured `parent_dim` last frame.
    pub fn results(&self, id: u32, flags: InputFlags, parent_dim: Vector2) -> WidgetInput {
        let mut input = WidgetInput::default();
        let left = self.frame.mouse_left;
        let is_active = self.active == id;
        let was_active = !is_active && self.last_active == id;
        if is_active {
            input.clicked = left.transitioned_down();
            input.held = left.held();
        }
        if was_active {
            input.released = left.transitioned_up();
        }
        if (is_active || input.released) && flags.contains(InputFlags::DRAGGABLE) {
            let pixels = self.frame.mouse_pos - self.mouse_down_pos;
            input.drag_offset_pixels = pixels;
            input.drag_offset_percent_parent = Vector2::new(
                if parent_dim.x != 0.0 { pixels.x / parent_dim.x } else { 0.0 },
                if parent_dim.y != 0.0 { pixels.y / parent_dim.y } else { 0.0 },
            );
        }
        if (is_active || was_active) && flags.contains(InputFlags::TEXT_SELECTABLE) {
            input.selected_glyphs = self.selection.clone();
        }
        input
    }

    /// The widget whose selection is shown: the one being dragged over, or the last one.
    pub fn selection_owner(&self) -> u32 {
        if self.active != 0 {
            self.active
        } else {
            self.last_active
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_transitions() {
        assert!(MouseButton::PRESSED.transitioned_down());
        assert!(!MouseButton::PRESSED.held());
        assert!(MouseButton::HELD.held());
        assert!(MouseButton::RELEASED.transitioned_up());
        assert!(!MouseButton::UP.transitioned_up());

        let next = MouseButton::UP.next(true);
        assert_eq!(next, MouseButton::PRESSED);
        assert_eq!(next.next(true), MouseButton::HELD);
        assert_eq!(next.next(true).next(false), MouseButton::RELEASED);
    }

    fn frame(pos: (f32, f32), left: MouseButton) -> FrameDesc {
        let mut f = FrameDesc::new((800.0, 600.0));
        f.mouse_pos(pos).mouse_left(left);
        f
    }

    #[test]
    fn last_hit_wins_and_flags_opt_out() {
        let mut state = InputState::default();
        state.begin_frame(&frame((10.0, 10.0), MouseButton::PRESSED));

        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        let inner = Rect::new(5.0, 5.0, 50.0, 50.0);
        state.hit_test(1, InputFlags::NONE, &outer, std::iter::empty());
        state.hit_test(2, InputFlags::NONE, &inner, std::iter::empty());
        state.hit_test(3, InputFlags::DO_NOT_CAPTURE_MOUSE, &inner, std::iter::empty());
        state.end_hit_test();
        assert_eq!(state.hot, 2);
        assert_eq!(state.active, 2);

        let input = state.results(2, InputFlags::NONE, Vector2::ZERO);
        assert!(input.clicked && !input.held && !input.released);
        assert_eq!(state.results(1, InputFlags::NONE, Vector2::ZERO), WidgetInput::default());
    }

    #[test]
    fn drag_and_release() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut state = InputState::default();

        state.begin_frame(&frame((10.0, 10.0), MouseButton::PRESSED));
        state.hit_test(7, InputFlags::DRAGGABLE, &bounds, std::iter::empty());
        state.end_hit_test();

        state.begin_frame(&frame((30.0, 60.0), MouseButton::HELD));
        state.hit_test(7, InputFlags::DRAGGABLE, &bounds, std::iter::empty());
        state.end_hit_test();
        let input = state.results(7, InputFlags::DRAGGABLE, Vector2::new(200.0, 100.0));
        assert!(input.held);
        assert_eq!(input.drag_offset_pixels, Vector2::new(20.0, 50.0));
        assert_eq!(input.drag_offset_percent_parent, Vector2::new(0.1, 0.5));

        state.begin_frame(&frame((30.0, 60.0), MouseButton::RELEASED));
        state.hit_test(7, InputFlags::DRAGGABLE, &bounds, std::iter::empty());
        state.end_hit_test();
        assert_eq!(state.active, 0);
        let input = state.results(7, InputFlags::DRAGGABLE, Vector2::new(200.0, 100.0));
        assert!(input.released && !input.held);
    }

    #[test]
    fn selection_spans_swept_glyphs() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 20.0);
        let glyphs: Vec<Rect> = (0..5)
            .map(|i| Rect::new(i as f32 * 10.0, 0.0, i as f32 * 10.0 + 9.0, 20.0))
            .collect();
        let flags = InputFlags::TEXT_SELECTABLE;
        let mut state = InputState::default();

        state.begin_frame(&frame((12.0, 5.0), MouseButton::PRESSED));
        state.hit_test(4, flags, &bounds, glyphs.iter().copied());
        state.end_hit_test();
        state.begin_frame(&frame((35.0, 5.0), MouseButton::HELD));
        state.hit_test(4, flags, &bounds, glyphs.iter().copied());
        state.end_hit_test();

        assert_eq!(state.results(4, flags, Vector2::ZERO).selected_glyphs, 1..4);
        assert_eq!(state.results(4, InputFlags::NONE, Vector2::ZERO).selected_glyphs, 0..0);
        assert_eq!(state.selection_owner(), 4);

        // Sweeping back past the anchor selects toward the start.
        state.begin_frame(&frame((3.0, 5.0), MouseButton::HELD));
        state.hit_test(4, flags, &bounds, glyphs.iter().copied());
        state.end_hit_test();
        assert_eq!(state.selection, 0..2);

        // A new active widget drops the old selection.
        let other = Rect::new(0.0, 50.0, 100.0, 70.0);
        state.begin_frame(&frame((3.0, 60.0), MouseButton::RELEASED));
        state.end_hit_test();
        state.begin_frame(&frame((3.0, 60.0), MouseButton::PRESSED));
        state.hit_test(4, flags, &bounds, glyphs.iter().copied());
        state.hit_test(5, InputFlags::NONE, &other, std::iter::empty());
        state.end_hit_test();
        assert_eq!(state.active, 5);
        assert_eq!(state.selection, 0..0);
    }
}
