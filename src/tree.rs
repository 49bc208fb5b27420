//! The per-frame widget tree and the bookkeeping that matches it against last frame's.
//!
//! Every frame builds a fresh [`Tree`]. The previous frame's tree is kept alongside it
//! until the next `prepare`, so each pushed widget can be paired with the widget that
//! held the same place last frame. Widgets left unpaired when their parent closes are
//! reported as discarded.

use std::ops::Range;

use crate::arena::{Arena, ArenaSlice};
use crate::id::Id;
use crate::input::InputFlags;
use crate::layout::Layout;
use crate::pool::{Handle, Pool};
use crate::style::Style;
use crate::text::GlyphLayout;

/// One declared widget. Lives until the end of the frame after the one it was pushed in.
#[derive(Debug, Clone, Default)]
pub struct Widget {
    pub id: Id,
    pub layout: Layout,
    pub style: Style,
    pub input: InputFlags,
    /// Index of the widget's persistent record.
    pub cache: u32,
    pub(crate) text: ArenaSlice,
    pub(crate) glyph_start: u32,
    pub(crate) glyph_len: u32,

    pub(crate) parent: Option<u32>,
    pub(crate) first_child: Option<u32>,
    pub(crate) last_child: Option<u32>,
    pub(crate) prev: Option<u32>,
    pub(crate) next: Option<u32>,

    /// The widget in last frame's tree this one was matched with.
    pub(crate) counterpart: Option<u32>,
    /// The next child of `counterpart` still waiting for a match.
    pub(crate) cursor: Option<u32>,
}

impl Widget {
    #[inline]
    pub fn glyph_range(&self) -> Range<usize> {
        let start = self.glyph_start as usize;
        start..start + self.glyph_len as usize
    }

    #[inline]
    pub fn has_text(&self) -> bool {
        self.glyph_len > 0
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    #[inline]
    pub fn parent(&self) -> Option<u32> {
        self.parent
    }
}

/// A pushed widget, valid until the next `prepare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetHandle {
    pub(crate) node: Handle,
    pub(crate) frame: u64,
}

impl WidgetHandle {
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// What a tree walk should do after visiting a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    /// Skips the visited widget's children. Only meaningful for preorder walks.
    SkipChildren,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Pre,
    /// The first child's subtree, then the widget, then the remaining children.
    In,
    Post,
}

/// How this frame's widgets relate to last frame's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Widgets with no counterpart last frame.
    pub created: u32,
    /// Widgets matched with last frame's widget of the same id under the same parent,
    /// reordered siblings included.
    pub carried: u32,
    /// Last frame's widgets nothing matched, subtrees included.
    pub discarded: u32,
    pub discarded_ids: Vec<u32>,
    /// Identities seen for the first time.
    pub cache_created: u32,
}

/// One frame's widgets, glyphs and display text.
#[derive(Debug)]
pub struct Tree {
    pub(crate) nodes: Pool<Widget>,
    pub(crate) glyphs: Vec<GlyphLayout>,
    pub(crate) text: Arena,
    pub(crate) root: Option<u32>,
}

impl Tree {
    pub fn new(name: &'static str, bucket_size: usize) -> Self {
        Self {
            nodes: Pool::new(),
            glyphs: Vec::new(),
            text: Arena::new(name, bucket_size),
            root: None,
        }
    }

    pub fn reset(&mut self) {
        self.nodes.reset();
        self.glyphs.clear();
        self.text.clear();
        self.root = None;
    }

    pub fn len(&self) -> usize {
        self.nodes.live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn root(&self) -> Option<u32> {
        self.root
    }

    pub fn get(&self, index: u32) -> &Widget {
        &self.nodes[index]
    }

    pub fn glyphs(&self, index: u32) -> &[GlyphLayout] {
        &self.glyphs[self.nodes[index].glyph_range()]
    }

    pub fn display_text(&self, index: u32) -> &str {
        self.text.get_str(self.nodes[index].text)
    }

    /// Links `widget` as the last child of `parent`, or as the root.
    ///
    /// # Panics
    ///
    /// If `parent` is `None` and the tree already has a root.
    pub fn append(&mut self, parent: Option<u32>, mut widget: Widget) -> Handle {
        let handle = self.nodes.take();
        let index = handle.index();
        widget.parent = parent;
        widget.first_child = None;
        widget.last_child = None;
        widget.next = None;
        widget.prev = None;

        match parent {
            None => {
                assert!(
                    self.root.is_none(),
                    "a frame has a single root; close it before pushing {:#010x}",
                    widget.id.id
                );
                self.root = Some(index);
            }
            Some(p) => {
                let prev = self.nodes[p].last_child;
                widget.prev = prev;
                match prev {
                    Some(prev) => self.nodes[prev].next = Some(index),
                    None => self.nodes[p].first_child = Some(index),
                }
                self.nodes[p].last_child = Some(index);
            }
        }
        self.nodes[index] = widget;
        handle
    }

    pub fn children(&self, index: u32) -> Children<'_> {
        Children {
            tree: self,
            next: self.nodes[index].first_child,
        }
    }

    /// The closest earlier sibling matching `filter`.
    pub fn prev_sibling_where(&self, index: u32, filter: impl Fn(&Widget) -> bool) -> Option<u32> {
        let mut at = self.nodes[index].prev;
        while let Some(i) = at {
            if filter(&self.nodes[i]) {
                return Some(i);
            }
            at = self.nodes[i].prev;
        }
        None
    }

    /// Ids of the widget at `index` and every widget under it.
    pub fn subtree_ids(&self, index: u32, stack: &mut Vec<u32>, out: &mut Vec<u32>) {
        self.walk_from(index, Order::Pre, stack, |tree, i| {
            out.push(tree.nodes[i].id.id);
            Walk::Continue
        });
    }

    /// Visits the whole tree without recursion. `stack` is scratch space kept by the
    /// caller so repeated walks do not allocate.
    pub fn walk(&self, order: Order, stack: &mut Vec<u32>, visit: impl FnMut(&Tree, u32) -> Walk) {
        if let Some(root) = self.root {
            self.walk_from(root, order, stack, visit);
        }
    }

    pub fn walk_from(
        &self,
        start: u32,
        order: Order,
        stack: &mut Vec<u32>,
        mut visit: impl FnMut(&Tree, u32) -> Walk,
    ) {
        stack.clear();
        stack.reserve(self.len());
        match order {
            Order::Pre => {
                stack.push(start);
                while let Some(i) = stack.pop() {
                    match visit(self, i) {
                        Walk::Stop => return,
                        Walk::SkipChildren => continue,
                        Walk::Continue => {}
                    }
                    // Pushed last to first so the first child pops first.
                    let mut child = self.nodes[i].last_child;
                    while let Some(c) = child {
                        stack.push(c);
                        child = self.nodes[c].prev;
                    }
                }
            }
            Order::Post => {
                // Descend to the deepest first child, then climb through siblings.
                let mut at = Some(start);
                while let Some(i) = at {
                    stack.push(i);
                    at = self.nodes[i].first_child;
                }
                while let Some(i) = stack.pop() {
                    if visit(self, i) == Walk::Stop {
                        return;
                    }
                    if i == start {
                        return;
                    }
                    let mut at = self.nodes[i].next;
                    while let Some(n) = at {
                        stack.push(n);
                        at = self.nodes[n].first_child;
                    }
                }
            }
            Order::In => {
                // The high bit marks a widget whose first subtree was already visited.
                const FIRST_DONE: u32 = 1 << 31;
                stack.push(start);
                while let Some(entry) = stack.pop() {
                    let i = entry & !FIRST_DONE;
                    let node = &self.nodes[i];
                    if entry & FIRST_DONE == 0 {
                        stack.push(i | FIRST_DONE);
                        if let Some(first) = node.first_child {
                            stack.push(first);
                        }
                        continue;
                    }
                    if visit(self, i) == Walk::Stop {
                        return;
                    }
                    let first = node.first_child;
                    let mut child = node.last_child;
                    while let Some(c) = child.filter(|c| Some(*c) != first) {
                        stack.push(c);
                        child = self.nodes[c].prev;
                    }
                }
            }
        }
    }

    /// Writes the widget indices in `order` into `out`.
    pub fn collect(&self, order: Order, stack: &mut Vec<u32>, out: &mut Vec<u32>) {
        out.clear();
        self.walk(order, stack, |_, i| {
            out.push(i);
            Walk::Continue
        });
    }

    /// Like `collect`, for the subtree under `start`. Appends to `out`.
    pub fn collect_from(&self, start: u32, order: Order, stack: &mut Vec<u32>, out: &mut Vec<u32>) {
        self.walk_from(start, order, stack, |_, i| {
            out.push(i);
            Walk::Continue
        });
    }
}

pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<u32>,
}

impl Iterator for Children<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let at = self.next?;
        self.next = self.tree.nodes[at].next;
        Some(at)
    }
}

/// Pairs widgets pushed this frame with last frame's widgets.
///
/// A pushed widget is matched against its parent's counterpart's children, starting at
/// the parent's cursor. Skipped-over children were removed this frame; children after
/// the cursor when the parent closes were removed from the end. A skipped child pushed
/// again later in the same parent was reordered, and is taken back out of the discards.
#[derive(Debug, Default)]
pub(crate) struct Reconciler {
    pub report: ReconcileReport,
    stack: Vec<u32>,
    skipped: Vec<u32>,
    ids: Vec<u32>,
}

impl Reconciler {
    pub fn begin_frame(&mut self) {
        self.report.created = 0;
        self.report.carried = 0;
        self.report.discarded = 0;
        self.report.discarded_ids.clear();
        self.report.cache_created = 0;
        self.skipped.clear();
    }

    /// Finds last frame's widget for `id` pushed under `parent`, and returns it along with
    /// the cursor its own children start matching from.
    pub fn match_widget(
        &mut self,
        tree: &mut Tree,
        retired: &Tree,
        parent: Option<u32>,
        id: u32,
    ) -> (Option<u32>, Option<u32>) {
        let found = match parent {
            None => retired.root.filter(|&r| retired.nodes[r].id.id == id),
            Some(p) => {
                let cursor = tree.nodes[p].cursor;
                let mut at = cursor;
                while let Some(i) = at {
                    if retired.nodes[i].id.id == id {
                        break;
                    }
                    at = retired.nodes[i].next;
                }
                if let Some(found) = at {
                    // Everything between the cursor and the match was removed.
                    let mut skipped = cursor;
                    while let Some(s) = skipped.filter(|&s| s != found) {
                        self.discard(retired, s);
                        self.skipped.push(s);
                        skipped = retired.nodes[s].next;
                    }
                    tree.nodes[p].cursor = retired.nodes[found].next;
                    at
                } else {
                    self.reclaim(tree, retired, p, id)
                }
            }
        };

        match found {
            Some(f) => {
                self.report.carried += 1;
                (Some(f), retired.nodes[f].first_child)
            }
            None => {
                self.report.created += 1;
                (None, None)
            }
        }
    }

    /// Discards last frame's children of `index` that nothing matched.
    pub fn close(&mut self, tree: &mut Tree, retired: &Tree, index: u32) {
        let mut at = tree.nodes[index].cursor.take();
        while let Some(i) = at {
            self.discard(retired, i);
            at = retired.nodes[i].next;
        }
    }

    /// Discards last frame's root if this frame's root did not match it.
    pub fn close_root(&mut self, tree: &Tree, retired: &Tree) {
        let matched = tree.root.and_then(|r| tree.nodes[r].counterpart);
        if let (Some(old), None) = (retired.root, matched) {
            self.discard(retired, old);
        }
    }

    /// Takes back a sibling an earlier push skipped over under the same parent.
    fn reclaim(&mut self, tree: &Tree, retired: &Tree, p: u32, id: u32) -> Option<u32> {
        let counterpart = tree.nodes[p].counterpart?;
        let pos = self.skipped.iter().position(|&s| {
            retired.nodes[s].parent == Some(counterpart) && retired.nodes[s].id.id == id
        })?;
        let found = self.skipped.swap_remove(pos);

        self.ids.clear();
        retired.subtree_ids(found, &mut self.stack, &mut self.ids);
        for gone in &self.ids {
            if let Some(at) = self.report.discarded_ids.iter().position(|d| d == gone) {
                self.report.discarded_ids.remove(at);
                self.report.discarded -= 1;
            }
        }
        Some(found)
    }

    fn discard(&mut self, retired: &Tree, index: u32) {
        let before = self.report.discarded_ids.len();
        retired.subtree_ids(index, &mut self.stack, &mut self.report.discarded_ids);
        self.report.discarded += (self.report.discarded_ids.len() - before) as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(label: &str) -> Widget {
        Widget {
            id: Id::new(label),
            ..Default::default()
        }
    }

    /// Root[W1[W11, W12], W2, W3[W31]]
    fn sample() -> (Tree, Vec<u32>) {
        let mut tree = Tree::new("test", 1024);
        let root = tree.append(None, widget("Root")).index();
        let w1 = tree.append(Some(root), widget("W1")).index();
        let w11 = tree.append(Some(w1), widget("W11")).index();
        let w12 = tree.append(Some(w1), widget("W12")).index();
        let w2 = tree.append(Some(root), widget("W2")).index();
        let w3 = tree.append(Some(root), widget("W3")).index();
        let w31 = tree.append(Some(w3), widget("W31")).index();
        (tree, vec![root, w1, w11, w12, w2, w3, w31])
    }

    fn names(tree: &Tree, order: Order) -> Vec<u32> {
        let (mut stack, mut out) = (Vec::new(), Vec::new());
        tree.collect(order, &mut stack, &mut out);
        out
    }

    #[test]
    fn walk_orders() {
        let (tree, n) = sample();
        let [root, w1, w11, w12, w2, w3, w31] = n[..] else {
            unreachable!()
        };
        assert_eq!(names(&tree, Order::Pre), vec![root, w1, w11, w12, w2, w3, w31]);
        assert_eq!(names(&tree, Order::Post), vec![w11, w12, w1, w2, w31, w3, root]);
        assert_eq!(names(&tree, Order::In), vec![w11, w1, w12, root, w2, w31, w3]);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![w1, w2, w3]);
    }

    #[test]
    fn skip_and_stop() {
        let (tree, n) = sample();
        let mut seen = Vec::new();
        tree.walk(Order::Pre, &mut Vec::new(), |_, i| {
            seen.push(i);
            if i == n[1] {
                Walk::SkipChildren
            } else if i == n[5] {
                Walk::Stop
            } else {
                Walk::Continue
            }
        });
        assert_eq!(seen, vec![n[0], n[1], n[4], n[5]]);
    }

    #[test]
    fn collect_from_stays_in_the_subtree() {
        let (tree, n) = sample();
        let mut out = vec![n[0]];
        tree.collect_from(n[1], Order::Pre, &mut Vec::new(), &mut out);
        assert_eq!(out, vec![n[0], n[1], n[2], n[3]]);

        out.clear();
        tree.collect_from(n[5], Order::Post, &mut Vec::new(), &mut out);
        assert_eq!(out, vec![n[6], n[5]]);
    }

    #[test]
    fn links_are_consistent() {
        let (tree, n) = sample();
        let root = tree.get(n[0]);
        assert_eq!(root.first_child, Some(n[1]));
        assert_eq!(root.last_child, Some(n[5]));
        assert_eq!(tree.get(n[4]).prev, Some(n[1]));
        assert_eq!(tree.get(n[4]).next, Some(n[5]));
        assert_eq!(tree.get(n[6]).parent, Some(n[5]));
        assert_eq!(tree.prev_sibling_where(n[5], |w| w.id == Id::new("W1")), Some(n[1]));
    }

    #[test]
    #[should_panic(expected = "a frame has a single root")]
    fn second_root_is_rejected() {
        let mut tree = Tree::new("test", 1024);
        tree.append(None, widget("a"));
        tree.append(None, widget("b"));
    }

    #[test]
    fn subtree_walks_stay_inside() {
        let (tree, n) = sample();
        let (mut stack, mut ids) = (Vec::new(), Vec::new());
        tree.subtree_ids(n[1], &mut stack, &mut ids);
        assert_eq!(ids, vec![Id::new("W1").id, Id::new("W11").id, Id::new("W12").id]);

        let mut post = Vec::new();
        tree.walk_from(n[5], Order::Post, &mut stack, |_, i| {
            post.push(i);
            Walk::Continue
        });
        assert_eq!(post, vec![n[6], n[5]]);
    }
}
