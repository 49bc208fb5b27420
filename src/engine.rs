//! The context: frame lifecycle, widget declaration and the passes run at `advance`.

use std::fmt::Write as _;

use rustc_hash::FxHashSet;

use crate::config::{Config, PERSISTENT_VALUE_CAP};
use crate::errors::{Error, Result};
use crate::font::{FontId, FontMetrics, FontProvider, Fonts};
use crate::glyph::{Atlas, AtlasDirty, GlyphDesc, GlyphFormat, GlyphId, GlyphStore};
use crate::hashtable::HashTable;
use crate::id::Id;
use crate::input::{FrameDesc, InputFlags, InputState, WidgetInput};
use crate::layout::{Direction, Layout, PositionKind, Size, SizeBox};
use crate::math::{clip_rect_and_uv, Axis, Rect, Vector2};
use crate::pool::Pool;
use crate::render::{push_selection, VIBuffer, ZSteps};
use crate::style::{Draw, Style};
use crate::text::{layout_text, offset_and_clip, GlyphLayout};
use crate::tree::{Order, ReconcileReport, Reconciler, Tree, Walk, Widget, WidgetHandle};

// ============================================================================
// Constants
// ============================================================================

/// Identity tables are grown once they are this full.
const CACHE_TABLE_MAX_LOAD: f32 = 0.75;
const WHITE_GLYPH_SIDE: u32 = 4;

// ============================================================================
// Declarations
// ============================================================================

/// Everything declared about a widget for one frame.
#[derive(Debug, Clone, Default)]
pub struct WidgetDesc<'a> {
    pub text: &'a str,
    pub id: Id,
    pub layout: Layout,
    pub style: Style,
    pub input: InputFlags,
}

impl<'a> WidgetDesc<'a> {
    /// A widget without text, identified by `label`.
    pub fn new(label: &str) -> Self {
        Self {
            id: Id::new(label),
            ..Default::default()
        }
    }

    /// A widget showing the display part of `label`, see [`Id::new`].
    pub fn labeled(label: &'a str) -> Self {
        let id = Id::new(label);
        Self {
            text: id.display(label),
            id,
            ..Default::default()
        }
    }

    /// A widget showing `text`, identified by `key` alone.
    pub fn keyed(text: &'a str, key: &str) -> Self {
        Self {
            text,
            id: Id::keyed(text, key),
            ..Default::default()
        }
    }

    #[inline]
    pub fn id(&mut self, id: impl Into<Id>) -> &mut Self {
        self.id = id.into();
        self
    }

    #[inline]
    pub fn text(&mut self, text: &'a str) -> &mut Self {
        self.text = text;
        self
    }

    /// Edits the layout in place.
    #[inline]
    pub fn layout(&mut self, f: impl FnOnce(&mut Layout) -> &mut Layout) -> &mut Self {
        f(&mut self.layout);
        self
    }

    /// Edits the style in place.
    #[inline]
    pub fn style(&mut self, f: impl FnOnce(&mut Style) -> &mut Style) -> &mut Self {
        f(&mut self.style);
        self
    }

    #[inline]
    pub fn width(&mut self, width: Size) -> &mut Self {
        self.layout.width = width;
        self
    }

    #[inline]
    pub fn height(&mut self, height: Size) -> &mut Self {
        self.layout.height = height;
        self
    }

    #[inline]
    pub fn size(&mut self, width: Size, height: Size) -> &mut Self {
        self.layout.width = width;
        self.layout.height = height;
        self
    }

    #[inline]
    pub fn margin(&mut self, margin: impl Into<SizeBox>) -> &mut Self {
        self.layout.margin = margin.into();
        self
    }

    #[inline]
    pub fn direction(&mut self, direction: Direction) -> &mut Self {
        self.layout.direction = direction;
        self
    }

    #[inline]
    pub fn input(&mut self, flags: InputFlags) -> &mut Self {
        self.input = flags;
        self
    }
}

/// State kept per widget identity across frames.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cached {
    pub id: u32,
    pub offset: Vector2,
    pub dim: Vector2,
    /// `offset`..`offset + dim`, clipped to the parent's content box.
    pub bounds: Rect,
    pub text_dim: Vector2,
    /// Flow children end to end along the direction, and the widest across it.
    pub children_dim: Vector2,
    /// Hull of every child's unclipped bounds.
    pub children_bounds: Rect,
    /// Shifts flow children by this fraction of `children_dim`.
    pub child_offset: Vector2,
    frame: u64,
    persistent: [u8; PERSISTENT_VALUE_CAP],
    persistent_len: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    Advanced,
    Building,
}

type AtlasListener = Box<dyn FnMut(u8, &Atlas, AtlasDirty)>;

// ============================================================================
// Context
// ============================================================================

/// Owns every widget, glyph and buffer. One per UI.
pub struct Context {
    config: Config,
    state: FrameState,
    frame: u64,

    current: Tree,
    retired: Tree,
    open: Option<u32>,
    depth: u32,
    depth_max: u32,
    reconciler: Reconciler,

    cache: Pool<Cached>,
    cache_table: HashTable<u32>,
    input: InputState,

    glyphs: GlyphStore,
    fonts: Fonts,
    provider: Option<Box<dyn FontProvider>>,
    glyph_misses: FxHashSet<GlyphId>,
    atlas_listener: Option<AtlasListener>,

    buffers: Vec<VIBuffer>,
    diagnostics: Vec<Error>,

    // Scratch space for walks, reused every frame.
    stack: Vec<u32>,
    preorder: Vec<u32>,
    postorder: Vec<u32>,
    subtree: Vec<u32>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("frame", &self.frame)
            .field("state", &self.state)
            .field("widgets", &self.current.len())
            .field("cached", &self.cache.live_count())
            .field("glyphs", &self.glyphs.len())
            .field("fonts", &self.fonts.len())
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(config: Config) -> Self {
        config.validate();
        let mut ctx = Self {
            state: FrameState::Advanced,
            frame: 0,
            current: Tree::new("widgets", config.arena_bucket_size),
            retired: Tree::new("retired widgets", config.arena_bucket_size),
            open: None,
            depth: 0,
            depth_max: 0,
            reconciler: Reconciler::default(),
            cache: Pool::new(),
            cache_table: HashTable::with_capacity(config.cache_table_capacity),
            input: InputState::default(),
            glyphs: GlyphStore::new(config.atlas_start_dim, config.atlas_max_dim),
            fonts: Fonts::default(),
            provider: None,
            glyph_misses: FxHashSet::default(),
            atlas_listener: None,
            buffers: Vec::new(),
            diagnostics: Vec::new(),
            stack: Vec::new(),
            preorder: Vec::new(),
            postorder: Vec::new(),
            subtree: Vec::new(),
            config,
        };

        let side = WHITE_GLYPH_SIDE;
        let white = GlyphDesc {
            family: GlyphId::WHITE.family(),
            id: GlyphId::WHITE.id(),
            data: vec![0xFF; (side * side * 4) as usize],
            format: GlyphFormat::Rgba8,
            src_width: side,
            src_height: side,
            ..Default::default()
        };
        if let Err(err) = ctx.glyphs.register(&white) {
            tracing::warn!(%err, "white glyph does not fit the glyph atlas");
        }
        ctx
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Frames prepared so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn frame_desc(&self) -> &FrameDesc {
        &self.input.frame
    }

    /// The tree built this frame, or the last complete one between `advance` and `prepare`.
    pub fn tree(&self) -> &Tree {
        &self.current
    }

    /// Deepest nesting reached this frame, the root being 1.
    pub fn depth_max(&self) -> u32 {
        self.depth_max
    }

    /// Errors reported since the last `prepare`.
    pub fn diagnostics(&self) -> &[Error] {
        &self.diagnostics
    }

    pub fn reconcile_report(&self) -> &ReconcileReport {
        &self.reconciler.report
    }

    /// One buffer per glyph family, filled by `advance`.
    pub fn buffers(&self) -> &[VIBuffer] {
        &self.buffers
    }

    pub fn glyph_store(&self) -> &GlyphStore {
        &self.glyphs
    }

    /// The widget under the mouse, 0 if none.
    pub fn hot(&self) -> u32 {
        self.input.hot
    }

    /// The widget the left button is held on, 0 if none.
    pub fn active(&self) -> u32 {
        self.input.active
    }

    fn report(&mut self, err: Error) {
        tracing::warn!(frame = self.frame, %err, "ui diagnostic");
        self.diagnostics.push(err);
    }

    // ========================================================================
    // Frame lifecycle
    // ========================================================================

    /// Starts a frame: hit tests last frame's tree and opens an empty one.
    ///
    /// # Panics
    ///
    /// If the previous frame was not finished with [`Context::advance`].
    pub fn prepare(&mut self, frame: &FrameDesc) {
        assert!(
            self.state == FrameState::Advanced,
            "prepare called twice without advance"
        );
        self.frame += 1;
        self.diagnostics.clear();
        for buffer in &mut self.buffers {
            buffer.clear();
        }

        self.input.begin_frame(frame);
        self.hit_test();

        std::mem::swap(&mut self.current, &mut self.retired);
        self.current.reset();
        self.reconciler.begin_frame();
        self.open = None;
        self.depth = 0;
        self.depth_max = 0;
        self.state = FrameState::Building;
        tracing::trace!(frame = self.frame, "frame prepared");
    }

    fn hit_test(&mut self) {
        let Self {
            current,
            cache,
            input,
            stack,
            ..
        } = self;
        current.walk(Order::Pre, stack, |tree, i| {
            let widget = tree.get(i);
            let bounds = cache[widget.cache].bounds;
            let glyphs = tree.glyphs(i).iter().map(|g| g.bounds);
            input.hit_test(widget.id.id, widget.input, &bounds, glyphs);
            Walk::Continue
        });
        input.end_hit_test();
    }

    /// Declares a widget under the currently open one and opens it.
    ///
    /// # Panics
    ///
    /// Outside `prepare`..`advance`, on a second root, or on an invalid layout.
    pub fn push(&mut self, desc: &WidgetDesc) -> (WidgetHandle, WidgetInput) {
        assert!(
            self.state == FrameState::Building,
            "push called outside prepare and advance"
        );
        let layout = desc.layout.with_defaults();
        let id = desc.id;
        let parent = self.open;
        assert!(
            parent.is_some() || self.current.root.is_none(),
            "a frame has a single root; close it before pushing {:?}",
            desc.text
        );

        let (counterpart, cursor) =
            self.reconciler
                .match_widget(&mut self.current, &self.retired, parent, id.id);

        let cache = self.cache_index(id.id);
        if self.cache[cache].frame == self.frame {
            self.report(Error::DuplicateId {
                id: id.id,
                display: desc.text.to_owned(),
            });
        }
        self.cache[cache].frame = self.frame;

        let text = self.current.text.push_bytes(desc.text.as_bytes());
        let glyph_start = self.current.glyphs.len() as u32;
        let glyph_len = self.append_glyphs(id.id, desc);

        let widget = Widget {
            id,
            layout,
            style: desc.style,
            input: desc.input,
            cache,
            text,
            glyph_start,
            glyph_len,
            counterpart,
            cursor,
            ..Default::default()
        };
        let node = self.current.append(parent, widget);
        self.open = Some(node.index());
        self.depth += 1;
        self.depth_max = self.depth_max.max(self.depth);

        let parent_dim = match parent {
            Some(p) => self.cache[self.current.get(p).cache].dim,
            None => self.input.frame.screen_dim,
        };
        let input = self.input.results(id.id, desc.input, parent_dim);
        let handle = WidgetHandle {
            node,
            frame: self.frame,
        };
        (handle, input)
    }

    /// Closes the open widget. Its children from last frame that were not pushed again
    /// are discarded.
    pub fn pop(&mut self) {
        assert!(
            self.state == FrameState::Building,
            "pop called outside prepare and advance"
        );
        let Some(open) = self.open else {
            panic!("pop called with no open widget");
        };
        self.reconciler.close(&mut self.current, &self.retired, open);
        self.open = self.current.get(open).parent();
        self.depth -= 1;
    }

    /// [`Context::pop`], checking that `handle` is the widget being closed.
    pub fn pop_safe(&mut self, handle: WidgetHandle) {
        let open = self.open.and_then(|o| self.current.nodes.handle(o));
        assert!(
            handle.frame == self.frame && open == Some(handle.node),
            "pop_safe closing {handle:?}, but the open widget is {open:?}"
        );
        self.pop();
    }

    /// Pushes and immediately pops a widget without children.
    pub fn widget(&mut self, desc: &WidgetDesc) -> WidgetInput {
        let (_, input) = self.push(desc);
        self.pop();
        input
    }

    /// Whether `handle` still refers to a widget of the tree being built.
    pub fn is_valid(&self, handle: WidgetHandle) -> bool {
        handle.frame == self.frame && self.current.nodes.is_valid(handle.node)
    }

    /// Finishes the frame: lays out every widget and fills the render buffers.
    ///
    /// # Panics
    ///
    /// If `prepare` was not called or a widget is still open.
    pub fn advance(&mut self) {
        assert!(
            self.state == FrameState::Building,
            "advance called without prepare"
        );
        assert!(
            self.open.is_none(),
            "advance called with {} widget(s) still open",
            self.depth
        );
        self.reconciler.close_root(&self.current, &self.retired);

        if let Some(listener) = self.atlas_listener.as_mut() {
            self.glyphs
                .drain_dirty(|family, atlas, dirty| listener(family, atlas, dirty));
        }
        for glyph in &mut self.current.glyphs {
            glyph.info = self.glyphs.lookup(glyph.glyph).unwrap_or_default();
        }

        self.current
            .collect(Order::Pre, &mut self.stack, &mut self.preorder);
        self.current
            .collect(Order::Post, &mut self.stack, &mut self.postorder);
        self.layout();
        self.render();

        self.state = FrameState::Advanced;
        let report = &self.reconciler.report;
        tracing::debug!(
            frame = self.frame,
            created = report.created,
            carried = report.carried,
            discarded = report.discarded,
            cache_created = report.cache_created,
            "tree reconciled"
        );
        tracing::trace!(
            frame = self.frame,
            widgets = self.current.len(),
            glyphs = self.current.glyphs.len(),
            "frame advanced"
        );
    }

    // ========================================================================
    // Persistent state
    // ========================================================================

    fn cache_index(&mut self, id: u32) -> u32 {
        if let Some(index) = self.cache_table.get(id) {
            return index;
        }
        if self.cache_table.load() > CACHE_TABLE_MAX_LOAD {
            let capacity = self.cache_table.capacity() * 2;
            tracing::debug!(capacity, "growing identity table");
            self.cache_table.grow(capacity);
        }
        let index = self.cache.take().index();
        self.cache[index].id = id;
        self.cache_table.insert(id, index);
        self.reconciler.report.cache_created += 1;
        index
    }

    /// Last frame's layout results for `id`.
    pub fn cached(&self, id: impl Into<Id>) -> Option<&Cached> {
        let index = self.cache_table.get(id.into().id)?;
        Some(&self.cache[index])
    }

    pub fn bounds(&self, id: impl Into<Id>) -> Option<Rect> {
        self.cached(id).map(|c| c.bounds)
    }

    /// Shifts the flow children of `id` by `offset` times their combined extent.
    pub fn set_child_offset(&mut self, id: impl Into<Id>, offset: Vector2) {
        let index = self.cache_index(id.into().id);
        self.cache[index].child_offset = offset;
    }

    /// Bytes stored for `id`, storing `fallback` first if nothing was stored yet.
    ///
    /// # Panics
    ///
    /// If `fallback` is larger than [`PERSISTENT_VALUE_CAP`].
    pub fn persistent(&mut self, id: impl Into<Id>, fallback: &[u8]) -> &[u8] {
        assert!(
            fallback.len() <= PERSISTENT_VALUE_CAP,
            "persistent values are limited to {PERSISTENT_VALUE_CAP} bytes, got {}",
            fallback.len()
        );
        let index = self.cache_index(id.into().id);
        let cached = &mut self.cache[index];
        if cached.persistent_len == 0 {
            cached.persistent[..fallback.len()].copy_from_slice(fallback);
            cached.persistent_len = fallback.len() as u8;
        }
        &cached.persistent[..cached.persistent_len as usize]
    }

    /// # Panics
    ///
    /// If `value` is larger than [`PERSISTENT_VALUE_CAP`].
    pub fn set_persistent(&mut self, id: impl Into<Id>, value: &[u8]) {
        assert!(
            value.len() <= PERSISTENT_VALUE_CAP,
            "persistent values are limited to {PERSISTENT_VALUE_CAP} bytes, got {}",
            value.len()
        );
        let index = self.cache_index(id.into().id);
        let cached = &mut self.cache[index];
        cached.persistent[..value.len()].copy_from_slice(value);
        cached.persistent_len = value.len() as u8;
    }

    pub fn persistent_f32(&mut self, id: impl Into<Id>, fallback: f32) -> f32 {
        let bytes = self.persistent(id, &fallback.to_le_bytes());
        <[u8; 4]>::try_from(bytes).map_or(fallback, f32::from_le_bytes)
    }

    pub fn set_persistent_f32(&mut self, id: impl Into<Id>, value: f32) {
        self.set_persistent(id, &value.to_le_bytes());
    }

    // ========================================================================
    // Fonts and glyphs
    // ========================================================================

    pub fn set_font_provider(&mut self, provider: impl FontProvider + 'static) {
        self.provider = Some(Box::new(provider));
        self.glyph_misses.clear();
    }

    /// Called at `advance` for every atlas that changed since the last call.
    pub fn set_atlas_listener(&mut self, listener: impl FnMut(u8, &Atlas, AtlasDirty) + 'static) {
        self.atlas_listener = Some(Box::new(listener));
    }

    /// Loads a font through the provider and gives its regular weight a glyph family.
    pub fn load_font(&mut self, name: &str, data: &[u8], pixel_height: f32) -> Result<FontId> {
        let provider = self.provider.as_mut().ok_or(Error::NoFontProvider)?;
        let metrics = provider.load_font(self.fonts.next_id(), data, pixel_height)?;
        let font = self.fonts.add(name, metrics)?;
        tracing::debug!(
            name,
            index = font.index,
            family = ?self.fonts.family_of(font),
            line_height = metrics.line_height,
            "font loaded"
        );
        Ok(font)
    }

    /// Draws `weight` of `font` from glyph family `family`.
    pub fn register_weight(&mut self, font: FontId, weight: u16, family: u8) -> FontId {
        self.fonts.register_weight(font, weight, family)
    }

    pub fn set_active_font(&mut self, font: FontId) {
        self.fonts.set_active(font);
    }

    pub fn active_font(&self) -> Option<FontId> {
        self.fonts.active()
    }

    pub fn font_metrics(&self, font: FontId) -> Option<FontMetrics> {
        self.fonts.metrics(font)
    }

    pub fn set_font_metrics(&mut self, font: FontId, metrics: FontMetrics) {
        self.fonts.set_metrics(font, metrics);
    }

    /// Adds a glyph by hand, for icons and other sprites.
    pub fn register_glyph(&mut self, desc: &GlyphDesc) -> Result<GlyphId> {
        self.glyphs.register(desc)
    }

    fn append_glyphs(&mut self, id: u32, desc: &WidgetDesc) -> u32 {
        let font = self.fonts.resolve(desc.style.font);
        let family = font.and_then(|f| self.fonts.family_of(f)).unwrap_or(0);
        let selection = (desc.input.contains(InputFlags::TEXT_SELECTABLE)
            && self.input.selection_owner() == id)
            .then(|| self.input.selection.clone());

        let mut count = 0;
        for (i, c) in desc.text.chars().enumerate() {
            let glyph = GlyphId::new(family, c as u32);
            if let Some(font) = font {
                self.request_glyph(font, glyph);
            }
            let mut layout = GlyphLayout::new(glyph, desc.style.color_text);
            layout.selected = selection
                .as_ref()
                .is_some_and(|range| range.contains(&(i as u32)));
            self.current.glyphs.push(layout);
            count += 1;
        }
        count
    }

    fn request_glyph(&mut self, font: FontId, glyph: GlyphId) {
        if self.glyphs.contains(glyph) || self.glyph_misses.contains(&glyph) {
            return;
        }
        let Some(provider) = self.provider.as_mut() else {
            return;
        };
        let Some(mut desc) = provider.glyph(font, glyph.id()) else {
            tracing::debug!(codepoint = glyph.id(), family = glyph.family(), "glyph missing from font");
            self.glyph_misses.insert(glyph);
            return;
        };
        desc.family = glyph.family();
        desc.id = glyph.id();
        if let Err(err) = self.glyphs.register(&desc) {
            self.glyph_misses.insert(glyph);
            self.report(err);
        }
    }

    /// UVs of the white glyph's inner texels, so filtering never reaches the apron.
    fn white_uv(&self) -> Rect {
        let Some(info) = self.glyphs.lookup(GlyphId::WHITE) else {
            return Rect::default();
        };
        let mut uv = info.uv;
        let quarter = uv.dim() * 0.25;
        uv.expand(-quarter.x, -quarter.y, -quarter.x, -quarter.y);
        uv
    }

    // ========================================================================
    // Layout helpers
    // ========================================================================

    #[inline]
    fn node(&self, i: u32) -> &Widget {
        self.current.get(i)
    }

    #[inline]
    fn cached_at(&self, i: u32) -> &Cached {
        &self.cache[self.current.get(i).cache]
    }

    #[inline]
    fn cached_at_mut(&mut self, i: u32) -> &mut Cached {
        let cache = self.current.get(i).cache;
        &mut self.cache[cache]
    }

    fn set_dim(&mut self, i: u32, axis: Axis, dim: f32) {
        self.cached_at_mut(i).dim.set(axis, dim.max(0.0));
    }

    fn parent_extent(&self, i: u32, axis: Axis) -> f32 {
        match self.node(i).parent() {
            Some(p) => self.cached_at(p).dim.get(axis),
            None => self.input.frame.screen_dim.get(axis),
        }
    }

    /// Pixels a margin edge of widget `i` stands for.
    fn edge(&self, i: u32, size: Size, axis: Axis) -> f32 {
        match size {
            Size::Pixels(v) => v,
            Size::PercentOfParent(v) => self.parent_extent(i, axis) * v,
            Size::PercentOfSelf(v) => self.cached_at(i).dim.get(axis) * v,
            Size::None | Size::TextContent | Size::ChildrenSum => 0.0,
        }
    }

    fn margins(&self, i: u32, axis: Axis) -> (f32, f32) {
        let range = self.node(i).layout.margin.axis(axis);
        (self.edge(i, range.min, axis), self.edge(i, range.max, axis))
    }

    fn margin_sum(&self, i: u32, axis: Axis) -> f32 {
        let (min, max) = self.margins(i, axis);
        min + max
    }

    fn flow_text(&mut self, i: u32, max_width: f32) {
        let node = self.current.get(i);
        let (range, align, wrap, cache) = (
            node.glyph_range(),
            node.style.text_align,
            node.style.wrap,
            node.cache,
        );
        let fonts = &self.fonts;
        let dim = layout_text(
            &mut self.current.glyphs[range],
            max_width.max(0.0),
            align,
            wrap,
            |family| fonts.metrics_for_family(family),
        );
        self.cache[cache].text_dim = dim;
    }

    /// Lays out text already known to be `TextContent` tall within the current width.
    fn flow_text_to_width(&mut self, i: u32) {
        let width = self.cached_at(i).dim.x - self.margin_sum(i, Axis::X);
        self.flow_text(i, width);
        let height = self.cached_at(i).text_dim.y + self.margin_sum(i, Axis::Y);
        self.set_dim(i, Axis::Y, height);
    }

    fn is_flow(widget: &Widget) -> bool {
        widget.layout.position.kind == PositionKind::ParentDecides
    }

    // ========================================================================
    // Layout passes
    // ========================================================================

    fn layout(&mut self) {
        let preorder = std::mem::take(&mut self.preorder);
        let postorder = std::mem::take(&mut self.postorder);

        for &i in &preorder {
            self.size_by_text_defaults(i);
        }
        for axis in Axis::BOTH {
            for &i in &preorder {
                self.size_fixed(i, axis);
            }
        }

        for &i in &preorder {
            self.size_percent(i, Axis::X);
        }
        for &i in &preorder {
            if self.is_percent_width_text(i) {
                self.flow_text_to_width(i);
            }
        }
        for &i in &preorder {
            self.size_percent(i, Axis::Y);
        }

        for &i in &postorder {
            self.size_children_sum(i, Axis::X);
        }
        for &i in &postorder {
            let layout = self.node(i).layout;
            if matches!(layout.width, Size::ChildrenSum)
                && matches!(layout.height, Size::TextContent)
                && self.node(i).has_text()
            {
                self.flow_text_to_width(i);
            }
        }
        for &i in &postorder {
            self.size_children_sum(i, Axis::Y);
        }

        for axis in Axis::BOTH {
            for &i in &preorder {
                self.size_violation(i, axis);
            }
        }

        for &i in &preorder {
            let node = self.node(i);
            let known = !matches!(node.layout.width, Size::TextContent)
                && !matches!(node.layout.height, Size::TextContent);
            if known && node.has_text() {
                let width = self.cached_at(i).dim.x - self.margin_sum(i, Axis::X);
                self.flow_text(i, width);
            }
        }

        for &i in &preorder {
            self.measure_children(i);
        }
        for axis in Axis::BOTH {
            for &i in &preorder {
                self.position(i, axis);
            }
        }
        for &i in &preorder {
            self.clip(i);
        }
        for &i in &preorder {
            self.place_text(i);
        }

        self.preorder = preorder;
        self.postorder = postorder;
    }

    /// Leaves with text and no set size are sized by their text. Text under a
    /// `TextContent` width flows unbounded.
    fn size_by_text_defaults(&mut self, i: u32) {
        let node = &mut self.current.nodes[i];
        if !node.has_text() {
            return;
        }
        if !node.has_children() {
            for axis in Axis::BOTH {
                if matches!(node.layout.size(axis), Size::ChildrenSum) {
                    node.layout.set_size(axis, Size::TextContent);
                }
            }
        }
        match (node.layout.width, node.layout.height) {
            (Size::TextContent, _) => self.flow_text(i, f32::INFINITY),
            (Size::Pixels(width), Size::TextContent) => {
                let width = width - self.margin_sum(i, Axis::X);
                self.flow_text(i, width);
            }
            _ => {}
        }
    }

    fn size_fixed(&mut self, i: u32, axis: Axis) {
        let dim = match self.node(i).layout.size(axis) {
            Size::Pixels(v) => v,
            Size::TextContent => self.cached_at(i).text_dim.get(axis) + self.margin_sum(i, axis),
            _ => return,
        };
        self.set_dim(i, axis, dim);
    }

    fn size_percent(&mut self, i: u32, axis: Axis) {
        let Size::PercentOfParent(v) = self.node(i).layout.size(axis) else {
            return;
        };
        let dim = match self.node(i).parent() {
            None => self.input.frame.screen_dim.get(axis) * v,
            // Left for the violation pass, and out of the parent's sum.
            Some(p) if matches!(self.node(p).layout.size(axis), Size::ChildrenSum) => 0.0,
            Some(p) => (self.cached_at(p).dim.get(axis) - self.margin_sum(p, axis)) * v,
        };
        self.set_dim(i, axis, dim);
    }

    fn is_percent_width_text(&self, i: u32) -> bool {
        let node = self.node(i);
        matches!(node.layout.width, Size::PercentOfParent(_))
            && matches!(node.layout.height, Size::TextContent)
            && node.has_text()
    }

    fn size_children_sum(&mut self, i: u32, axis: Axis) {
        let node = self.node(i);
        if !matches!(node.layout.size(axis), Size::ChildrenSum) {
            return;
        }
        let along = node.layout.direction.main_axis() == axis;
        let mut total = 0.0f32;
        for child in self.current.children(i) {
            if !Self::is_flow(self.node(child)) {
                continue;
            }
            let d = self.cached_at(child).dim.get(axis);
            total = if along { total + d } else { total.max(d) };
        }
        let dim = total + self.margin_sum(i, axis);
        self.set_dim(i, axis, dim);
    }

    /// A percent of a parent sized by its children: resolved against the parent's final
    /// size, which does not include this widget.
    fn size_violation(&mut self, i: u32, axis: Axis) {
        let node = self.node(i);
        let (Size::PercentOfParent(v), Some(p)) = (node.layout.size(axis), node.parent()) else {
            return;
        };
        if !matches!(self.node(p).layout.size(axis), Size::ChildrenSum) {
            return;
        }
        let id = node.id.id;
        let dim = (self.cached_at(p).dim.get(axis) - self.margin_sum(p, axis)) * v;
        self.set_dim(i, axis, dim);
        self.report(Error::UnresolvedSize { id, axis });

        // Percent descendants were sized against the 0 this widget had then.
        let mut subtree = std::mem::take(&mut self.subtree);
        subtree.clear();
        self.current.collect_from(i, Order::Pre, &mut self.stack, &mut subtree);
        for &d in &subtree {
            if d != i {
                self.size_percent(d, axis);
            }
            if axis == Axis::X && self.is_percent_width_text(d) {
                self.flow_text_to_width(d);
            }
        }
        self.subtree = subtree;
    }

    fn measure_children(&mut self, i: u32) {
        let along = self.node(i).layout.direction.main_axis();
        let mut dim = Vector2::ZERO;
        for child in self.current.children(i) {
            if !Self::is_flow(self.node(child)) {
                continue;
            }
            let child_dim = self.cached_at(child).dim;
            for axis in Axis::BOTH {
                let total = if axis == along {
                    dim.get(axis) + child_dim.get(axis)
                } else {
                    dim.get(axis).max(child_dim.get(axis))
                };
                dim.set(axis, total);
            }
        }
        let cached = self.cached_at_mut(i);
        cached.children_dim = dim;
        cached.children_bounds = Rect {
            min: Vector2::new(f32::MAX, f32::MAX),
            max: Vector2::new(f32::MIN, f32::MIN),
        };
    }

    fn position(&mut self, i: u32, axis: Axis) {
        let node = self.node(i);
        let (kind, parent) = (node.layout.position.kind, node.parent());
        let dim = self.cached_at(i).dim.get(axis);
        let offset = match (kind, parent) {
            (PositionKind::ParentDecides, None) => 0.0,
            (PositionKind::ParentDecides, Some(p)) => self.flow_offset(i, p, axis, dim),
            (kind, _) => self.fixed_offset(i, kind, axis, dim),
        };
        let cached = self.cached_at_mut(i);
        cached.offset.set(axis, offset);
        cached.bounds.min.set(axis, offset);
        cached.bounds.max.set(axis, offset + dim);
    }

    /// After the previous flow sibling, or at the start of the parent's content box.
    fn flow_offset(&self, i: u32, p: u32, axis: Axis, dim: f32) -> f32 {
        let direction = self.node(p).layout.direction;
        let reversed = direction.is_reversed_on(axis);
        let parent = self.cached_at(p);

        let (m_min, m_max) = self.margins(p, axis);
        let mut inner_min = parent.offset.get(axis) + m_min;
        let mut inner_max = parent.offset.get(axis) + parent.dim.get(axis) - m_max;
        if inner_max < inner_min {
            let mid = (inner_min + inner_max) / 2.0;
            (inner_min, inner_max) = (mid, mid);
        }
        let edge = if reversed { inner_max } else { inner_min };
        let start = edge + parent.children_dim.get(axis) * parent.child_offset.get(axis);

        let prev = self.current.prev_sibling_where(i, Self::is_flow);
        let base = match prev {
            Some(s) if direction.main_axis() == axis => {
                let sibling = self.cached_at(s);
                if reversed {
                    sibling.offset.get(axis)
                } else {
                    sibling.offset.get(axis) + sibling.dim.get(axis)
                }
            }
            _ => start,
        };
        if reversed {
            base - dim
        } else {
            base
        }
    }

    /// From the near edge of the parent or screen, or from the far edge when the
    /// position box sets it.
    fn fixed_offset(&self, i: u32, kind: PositionKind, axis: Axis, dim: f32) -> f32 {
        let at = self.node(i).layout.position.at.axis(axis);
        let (base, extent) = match (kind, self.node(i).parent()) {
            (PositionKind::FixedInParent, Some(p)) => {
                let parent = self.cached_at(p);
                (parent.offset.get(axis), parent.dim.get(axis))
            }
            _ => (0.0, self.input.frame.screen_dim.get(axis)),
        };
        let edge = |size: Size| match size {
            Size::Pixels(v) => v,
            Size::PercentOfParent(v) => extent * v,
            Size::PercentOfSelf(v) => dim * v,
            Size::None | Size::TextContent | Size::ChildrenSum => 0.0,
        };
        if at.max.is_none() {
            base + edge(at.min)
        } else {
            base + extent - (edge(at.max) + dim)
        }
    }

    /// Clamps flow widgets to their parent's content box. Dims stay as laid out.
    fn clip(&mut self, i: u32) {
        let node = self.node(i);
        let Some(p) = node.parent() else {
            return;
        };
        let is_flow = Self::is_flow(node);

        let own = *self.cached_at(i);
        let unclipped = Rect::from_min_dim(own.offset, own.dim);
        let hull = &mut self.cached_at_mut(p).children_bounds;
        hull.min = Vector2::new(hull.min.x.min(unclipped.min.x), hull.min.y.min(unclipped.min.y));
        hull.max = Vector2::new(hull.max.x.max(unclipped.max.x), hull.max.y.max(unclipped.max.y));

        if !is_flow {
            return;
        }
        let parent = *self.cached_at(p);
        let (left, right) = self.margins(p, Axis::X);
        let (top, bottom) = self.margins(p, Axis::Y);
        let content = Rect::new(
            parent.offset.x + left,
            parent.offset.y + top,
            parent.offset.x + parent.dim.x - right,
            parent.offset.y + parent.dim.y - bottom,
        )
        .collapse_inverted();
        let content = Rect {
            min: parent.bounds.closest_point(content.min),
            max: parent.bounds.closest_point(content.max),
        };

        let cached = self.cached_at_mut(i);
        cached.bounds = Rect {
            min: content.closest_point(cached.bounds.min),
            max: content.closest_point(cached.bounds.max),
        };
    }

    fn place_text(&mut self, i: u32) {
        let node = self.node(i);
        if !node.has_text() {
            return;
        }
        let range = node.glyph_range();
        let (left, _) = self.margins(i, Axis::X);
        let (top, _) = self.margins(i, Axis::Y);
        let cached = self.cached_at(i);
        let origin = cached.offset + Vector2::new(left, top);
        let clip = cached.bounds;
        offset_and_clip(&mut self.current.glyphs[range], origin, &clip);
    }

    // ========================================================================
    // Render
    // ========================================================================

    fn render(&mut self) {
        let slots = self.glyphs.atlas_slots();
        if self.buffers.len() < slots {
            self.buffers.resize_with(slots, VIBuffer::default);
        }
        let white = self.white_uv();
        let mut z = ZSteps::new(
            self.config.z_depth_min,
            self.config.z_depth_max,
            self.current.len(),
        );

        let Self {
            current,
            cache,
            glyphs,
            buffers,
            stack,
            config,
            ..
        } = self;
        current.walk(Order::Pre, stack, |tree, i| {
            let widget = tree.get(i);
            let style = &widget.style;
            if style.draw == Draw::None {
                return Walk::SkipChildren;
            }
            let cached = &cache[widget.cache];
            let [z_bg, z_text, z_outline] = z.next().map(|z| z + widget.layout.position.z);

            if style.color_bg.a > 0 {
                let full = Rect::from_min_dim(cached.offset, cached.dim);
                let quad = glyphs.lookup(style.bg_glyph).and_then(|info| {
                    let uv = if style.bg_glyph == GlyphId::WHITE { white } else { info.uv };
                    clip_rect_and_uv(&cached.bounds, &full, &uv)
                });
                let buffer = buffers.get_mut(style.bg_glyph.family() as usize);
                if let (Some((bounds, uv)), Some(buffer)) = (quad, buffer) {
                    buffer.push_quad(&bounds, &uv, z_bg, style.color_bg);
                }
            }

            let text = tree.glyphs(i);
            for glyph in text {
                let buffer = buffers.get_mut(glyph.glyph.family() as usize);
                if let (Some((bounds, uv)), Some(buffer)) = (glyph.draw, buffer) {
                    buffer.push_quad(&bounds, &uv, z_text, glyph.color);
                }
            }
            if text.iter().any(|g| g.selected) {
                if let Some(buffer) = buffers.first_mut() {
                    push_selection(
                        buffer,
                        text,
                        &white,
                        (z_bg + z_text) / 2.0,
                        config.selection_color,
                        config.selection_inset,
                    );
                }
            }

            if style.outline_thickness > 0.0 && style.color_outline.a > 0 {
                if let Some(buffer) = buffers.first_mut() {
                    buffer.push_outline(
                        &cached.bounds,
                        style.outline_thickness,
                        &white,
                        z_outline,
                        style.color_outline,
                    );
                }
            }
            Walk::Continue
        });
    }

    // ========================================================================
    // Debugging
    // ========================================================================

    /// The current tree, one widget per line, indented by depth.
    pub fn debug_tree(&self) -> String {
        let mut out = String::new();
        let mut depth = vec![0usize; self.current.nodes.len()];
        let mut stack = Vec::new();
        self.current.walk(Order::Pre, &mut stack, |tree, i| {
            let widget = tree.get(i);
            let d = widget.parent().map_or(0, |p| depth[p as usize] + 1);
            depth[i as usize] = d;
            let cached = &self.cache[widget.cache];
            let _ = writeln!(
                out,
                "{:indent$}{:?} {:#010x} offset=({}, {}) dim=({}, {})",
                "",
                tree.display_text(i),
                widget.id.id,
                cached.offset.x,
                cached.offset.y,
                cached.dim.x,
                cached.dim.y,
                indent = d * 2
            );
            Walk::Continue
        });
        out
    }
}
