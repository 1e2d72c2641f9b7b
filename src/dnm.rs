//! The Document-Node-Mapping: a flat string projected from a markup tree,
//! with per-character backreferences into the tree.
//!
//! A [`Dnm`] is built once per document. Callers read the flat string (or
//! [`DnmStr`] views of it), map offsets back to tree positions, queue new
//! nodes at string offsets with [`Dnm::add_node`], and apply the whole batch
//! with [`Dnm::flush`].
//!
//! ```text
//! <a>abc<b>hgj</b>nope<c/></a>
//!
//! abchgjnope
//! ╰─╯<a>.text
//!    ╰─╯<b>.text
//!       ╰──╯<b>.tail
//! ```

mod display;
mod insertion;
mod token;

pub use display::DnmDisplay;
pub use insertion::PendingInsertion;
pub use token::{Side, TextSlot, Token};

use crate::address::{DnmPoint, DnmRange, PointOffset};
use crate::dnm_str::DnmStr;
use crate::error::{DnmError, DnmResult};
use crate::policy::{Decision, ProjectionPolicy};
use crate::tree::{NodeId, Tree};
use std::collections::HashMap;
use std::ops::{Bound, RangeBounds};

/// Whether the tree still matches the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionState {
    /// Nothing was flushed into the tree yet
    Fresh,
    /// A flush mutated the tree; offsets may no longer line up with it
    Dirty,
}

/// How an operation treats a [`ProjectionState::Dirty`] projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    /// Fail with [`DnmError::StaleProjection`]
    #[default]
    Reject,
    /// Proceed, acknowledging that offsets may be invalid
    Accept,
}

pub struct Dnm {
    tree: Tree,
    tokens: Vec<Token>,
    flat_string: String,
    /// Flat string char index -> token index
    backref_token: Vec<usize>,
    /// Flat string char index -> char index within the token
    backref_offset: Vec<usize>,
    /// Node -> token index range (end exclusive) of its pre-order span
    node_ranges: HashMap<NodeId, (usize, usize)>,
    /// Text tokens by the text slot they were taken from
    text_tokens: HashMap<(NodeId, TextSlot), usize>,
    pending: Vec<PendingInsertion>,
    next_seq: usize,
    state: ProjectionState,
}

impl std::fmt::Debug for Dnm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dnm")
            .field("token_count", &self.tokens.len())
            .field("flat_string_len", &self.backref_token.len())
            .field("pending", &self.pending.len())
            .field("state", &self.state)
            .finish()
    }
}

struct Builder<'t> {
    tree: &'t Tree,
    policy: &'t ProjectionPolicy,
    tokens: Vec<Token>,
    node_ranges: HashMap<NodeId, (usize, usize)>,
}

impl<'t> Builder<'t> {
    fn push_text(&mut self, node: NodeId, slot: TextSlot, content: &str) {
        // zero-width tokens would make offset ownership ambiguous
        if content.is_empty() {
            return;
        }
        self.tokens.push(Token::Text {
            content: content.to_string(),
            node,
            slot,
            start_pos: 0,
        });
    }

    fn visit(&mut self, node: NodeId) {
        let (tree, policy) = (self.tree, self.policy);
        let start = self.tokens.len();
        match policy.decide(tree, node) {
            Decision::Skip => return,
            Decision::Replace(placeholder) => {
                if !placeholder.is_empty() {
                    self.tokens.push(Token::Node {
                        node,
                        placeholder: placeholder.to_string(),
                        start_pos: 0,
                    });
                }
            }
            Decision::Descend => {
                self.push_text(node, TextSlot::Leading, tree.text(node));
                for child in tree.children(node) {
                    self.visit(child);
                    self.push_text(child, TextSlot::Trailing, tree.tail(child));
                }
            }
        }
        self.node_ranges.insert(node, (start, self.tokens.len()));
    }
}

impl Dnm {
    /// Project `tree` under `policy`.
    pub fn new(tree: Tree, policy: &ProjectionPolicy) -> Self {
        let mut builder = Builder {
            tree: &tree,
            policy,
            tokens: Vec::new(),
            node_ranges: HashMap::new(),
        };
        builder.visit(tree.root());
        let Builder {
            mut tokens,
            node_ranges,
            ..
        } = builder;

        let mut flat_string = String::new();
        let mut backref_token = Vec::new();
        let mut backref_offset = Vec::new();
        let mut text_tokens = HashMap::new();

        for (idx, token) in tokens.iter_mut().enumerate() {
            token.set_start_pos(backref_token.len());
            flat_string.push_str(token.content());
            for local in 0..token.content().chars().count() {
                backref_token.push(idx);
                backref_offset.push(local);
            }
            if let Token::Text { node, slot, .. } = token {
                text_tokens.insert((*node, *slot), idx);
            }
        }

        tracing::debug!(
            "Built projection with {} tokens, flat string of {} chars",
            tokens.len(),
            backref_token.len()
        );

        Dnm {
            tree,
            tokens,
            flat_string,
            backref_token,
            backref_offset,
            node_ranges,
            text_tokens,
            pending: Vec::new(),
            next_seq: 0,
            state: ProjectionState::Fresh,
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    /// Parse a detached fragment into the projected tree's arena, ready to be
    /// queued with [`Dnm::add_node`]. This does not touch the document itself.
    pub fn new_fragment(&mut self, markup: &str) -> DnmResult<NodeId> {
        self.tree.parse_fragment(markup)
    }

    /// Create a detached element, ready to be queued with [`Dnm::add_node`].
    pub fn new_element(&mut self, tag: &str) -> NodeId {
        self.tree.new_element(tag)
    }

    /// Set an attribute on a detached node, before it is queued.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl Into<String>) -> DnmResult<()> {
        self.require_detached(node)?;
        self.tree.set_attr(node, name, value);
        Ok(())
    }

    /// Set the leading text of a detached node, before it is queued.
    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) -> DnmResult<()> {
        self.require_detached(node)?;
        self.tree.set_text(node, text);
        Ok(())
    }

    fn require_detached(&self, node: NodeId) -> DnmResult<()> {
        if !self.tree.contains(node) {
            return Err(DnmError::invalid_node(
                "node does not belong to the projected tree",
            ));
        }
        if node == self.tree.root() || self.tree.parent(node).is_some() {
            return Err(DnmError::invalid_node(format!(
                "<{}> is not a detached node",
                self.tree.tag(node)
            )));
        }
        Ok(())
    }

    pub fn flat_string(&self) -> &str {
        &self.flat_string
    }

    /// Length of the flat string in chars.
    pub fn len(&self) -> usize {
        self.backref_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backref_token.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn state(&self) -> ProjectionState {
        self.state
    }

    pub fn is_clean(&self) -> bool {
        self.state == ProjectionState::Fresh
    }

    /// Token index range (end exclusive) covered by `node`, if it was projected.
    pub fn node_range(&self, node: NodeId) -> Option<(usize, usize)> {
        self.node_ranges.get(&node).copied()
    }

    /// The token owning the character at `pos`.
    pub fn token_at(&self, pos: usize) -> Option<&Token> {
        self.backref_token.get(pos).map(|&idx| &self.tokens[idx])
    }

    /// The element whose content the character at `pos` is part of.
    pub fn surrounding_node(&self, pos: usize) -> Option<NodeId> {
        self.token_at(pos)
            .map(|token| token.surrounding_node(&self.tree))
    }

    pub(crate) fn check_fresh(&self, stale: StalePolicy) -> DnmResult<()> {
        match (self.state, stale) {
            (ProjectionState::Fresh, _) => Ok(()),
            (ProjectionState::Dirty, StalePolicy::Accept) => {
                tracing::warn!("Using a projection that was already flushed into its tree");
                Ok(())
            }
            (ProjectionState::Dirty, StalePolicy::Reject) => Err(DnmError::StaleProjection),
        }
    }

    fn check_pos(&self, pos: usize) -> DnmResult<()> {
        if pos < self.len() {
            Ok(())
        } else {
            Err(DnmError::OutOfRange {
                offset: pos,
                len: self.len(),
            })
        }
    }

    /// Flat string offset of the token at `idx`; the flat string length past
    /// the last token.
    fn token_start(&self, idx: usize) -> usize {
        self.tokens.get(idx).map_or(self.len(), Token::start_pos)
    }

    /// Offsets `(start, end)` spanned by the nearest projected ancestor-or-self
    /// of `node`.
    fn node_span(&self, node: NodeId) -> DnmResult<(usize, usize)> {
        if !self.tree.contains(node) {
            return Err(DnmError::malformed(
                &format!("{:?}", node),
                "node does not belong to the projected tree",
            ));
        }
        self.tree
            .ancestors(node)
            .find_map(|candidate| self.node_ranges.get(&candidate))
            .map(|&(first, last)| (self.token_start(first), self.token_start(last)))
            .ok_or_else(|| {
                DnmError::malformed(
                    &self.tree.path(node).unwrap_or_default(),
                    "neither the node nor any ancestor is part of the projection",
                )
            })
    }

    pub fn point_to_offset(&self, point: &DnmPoint) -> DnmResult<(usize, Option<usize>)> {
        self.point_to_offset_with(point, StalePolicy::Reject)
    }

    /// Resolve a point to a flat string offset.
    ///
    /// A point into leading/trailing text yields `(offset, None)`. A whole-node
    /// point, or a text point whose text produced no token, yields the full
    /// span `(start, Some(end))` of the node. Nodes that were not projected
    /// themselves resolve to their nearest projected ancestor.
    pub fn point_to_offset_with(
        &self,
        point: &DnmPoint,
        stale: StalePolicy,
    ) -> DnmResult<(usize, Option<usize>)> {
        self.check_fresh(stale)?;
        if let Some(offset) = point.offset {
            if let Some(&idx) = self.text_tokens.get(&(point.node, offset.slot())) {
                let len = self.token_start(idx + 1) - self.token_start(idx);
                if offset.offset() >= len {
                    return Err(DnmError::OutOfRange {
                        offset: offset.offset(),
                        len,
                    });
                }
                return Ok((self.token_start(idx) + offset.offset(), None));
            }
        }
        let (start, end) = self.node_span(point.node)?;
        Ok((start, Some(end)))
    }

    pub fn offset_to_point(&self, pos: usize) -> DnmResult<DnmPoint> {
        self.offset_to_point_with(pos, StalePolicy::Reject)
    }

    pub fn offset_to_point_with(&self, pos: usize, stale: StalePolicy) -> DnmResult<DnmPoint> {
        self.check_fresh(stale)?;
        self.check_pos(pos)?;
        Ok(self.point_of(pos))
    }

    /// Unchecked: `pos` must be in range.
    pub(crate) fn point_of(&self, pos: usize) -> DnmPoint {
        let local = self.backref_offset[pos];
        match &self.tokens[self.backref_token[pos]] {
            Token::Text {
                node,
                slot: TextSlot::Leading,
                ..
            } => DnmPoint::leading(*node, local),
            Token::Text {
                node,
                slot: TextSlot::Trailing,
                ..
            } => DnmPoint::trailing(*node, local),
            Token::Node { node, .. } => DnmPoint::whole(*node),
        }
    }

    pub fn range_to_offsets(&self, range: &DnmRange) -> DnmResult<(usize, usize)> {
        self.range_to_offsets_with(range, StalePolicy::Reject)
    }

    /// Resolve a range to flat string offsets `(start, end)`, end exclusive.
    pub fn range_to_offsets_with(
        &self,
        range: &DnmRange,
        stale: StalePolicy,
    ) -> DnmResult<(usize, usize)> {
        let (start, _) = self.point_to_offset_with(&range.start, stale)?;
        let (end_start, end_span) = self.point_to_offset_with(&range.end, stale)?;
        let end = if range.end_inclusive {
            end_span.unwrap_or(end_start + 1)
        } else {
            end_start
        };
        Ok((start, end.max(start)))
    }

    /// A view of the whole flat string.
    pub fn full_dnm_str(&self) -> DnmResult<DnmStr<'_>> {
        self.dnm_str(..)
    }

    /// A view of part of the flat string, in char offsets.
    pub fn dnm_str<R: RangeBounds<usize>>(&self, range: R) -> DnmResult<DnmStr<'_>> {
        self.check_fresh(StalePolicy::Reject)?;
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => self.len(),
        };
        if end > self.len() || start > end {
            return Err(DnmError::OutOfRange {
                offset: end.max(start),
                len: self.len(),
            });
        }
        let begin = crate::tree::char_to_byte(&self.flat_string, start);
        let finish = crate::tree::char_to_byte(&self.flat_string, end);
        Ok(DnmStr::new(
            self,
            self.flat_string[begin..finish].to_string(),
            (start..end).collect(),
        ))
    }
}

impl PointOffset {
    pub(crate) fn slot(&self) -> TextSlot {
        match self {
            PointOffset::Leading(_) => TextSlot::Leading,
            PointOffset::Trailing(_) => TextSlot::Trailing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple() -> Dnm {
        let tree = Tree::parse("<a>abc<b>hgj</b>nope<c></c></a>").unwrap();
        Dnm::new(tree, &ProjectionPolicy::empty())
    }

    fn child(dnm: &Dnm, n: usize) -> NodeId {
        dnm.tree().children(dnm.tree().root()).nth(n).unwrap()
    }

    #[test]
    fn test_flat_string_and_tokens() {
        let dnm = simple();
        assert_eq!(dnm.flat_string(), "abchgjnope");
        assert_eq!(dnm.len(), 10);
        assert_eq!(
            dnm.tokens().iter().map(Token::content).collect::<Vec<_>>(),
            vec!["abc", "hgj", "nope"]
        );
        assert_eq!(
            dnm.tokens().iter().map(Token::start_pos).collect::<Vec<_>>(),
            vec![0, 3, 6]
        );
        assert!(dnm.is_clean());
    }

    #[test]
    fn test_backreferences_point_into_token_contents() {
        let dnm = simple();
        for (pos, c) in dnm.flat_string().chars().enumerate() {
            let token = &dnm.tokens()[dnm.backref_token[pos]];
            let local = dnm.backref_offset[pos];
            assert_eq!(token.content().chars().nth(local), Some(c));
        }
    }

    #[test]
    fn test_node_ranges() {
        let dnm = simple();
        let root = dnm.tree().root();
        assert_eq!(dnm.node_range(root), Some((0, 3)));
        // <b>'s own text only; its tail belongs to the parent
        assert_eq!(dnm.node_range(child(&dnm, 0)), Some((1, 2)));
        assert_eq!(dnm.node_range(child(&dnm, 1)), Some((3, 3)));
    }

    #[test]
    fn test_skipped_subtree_keeps_its_tail() {
        let tree = Tree::parse("<a>x<head>title<b>y</b></head>z</a>").unwrap();
        let dnm = Dnm::new(tree, &ProjectionPolicy::empty().skip_tag("head"));
        assert_eq!(dnm.flat_string(), "xz");
        assert_eq!(dnm.node_range(child(&dnm, 0)), None);
    }

    #[test]
    fn test_multibyte_offsets_are_chars() {
        let tree = Tree::parse("<a>äb<i>ç</i>ü</a>").unwrap();
        let dnm = Dnm::new(tree, &ProjectionPolicy::empty());
        assert_eq!(dnm.len(), 4);
        let i = child(&dnm, 0);
        assert_eq!(dnm.offset_to_point(2).unwrap(), DnmPoint::leading(i, 0));
        assert_eq!(dnm.offset_to_point(3).unwrap(), DnmPoint::trailing(i, 0));
        assert_eq!(dnm.dnm_str(1..3).unwrap().as_str(), "bç");
    }

    #[test]
    fn test_point_to_offset() {
        let dnm = simple();
        let root = dnm.tree().root();
        let b = child(&dnm, 0);
        let c = child(&dnm, 1);

        assert_eq!(dnm.point_to_offset(&DnmPoint::leading(root, 1)).unwrap(), (1, None));
        assert_eq!(dnm.point_to_offset(&DnmPoint::leading(b, 2)).unwrap(), (5, None));
        assert_eq!(dnm.point_to_offset(&DnmPoint::trailing(b, 3)).unwrap(), (9, None));
        assert_eq!(dnm.point_to_offset(&DnmPoint::whole(b)).unwrap(), (3, Some(6)));
        assert_eq!(dnm.point_to_offset(&DnmPoint::whole(root)).unwrap(), (0, Some(10)));
        assert_eq!(dnm.point_to_offset(&DnmPoint::whole(c)).unwrap(), (10, Some(10)));
        // <c> has no tail, so the point degrades to the whole node
        assert_eq!(
            dnm.point_to_offset(&DnmPoint::trailing(c, 0)).unwrap(),
            (10, Some(10))
        );
        assert_eq!(
            dnm.point_to_offset(&DnmPoint::trailing(b, 4)),
            Err(DnmError::OutOfRange { offset: 4, len: 4 })
        );
    }

    #[test]
    fn test_point_to_offset_falls_back_to_enclosing_node() {
        let tree = Tree::parse("<a>x<p>y<head>t<b>u</b></head>z</p></a>").unwrap();
        let dnm = Dnm::new(tree, &ProjectionPolicy::empty().skip_tag("head"));
        assert_eq!(dnm.flat_string(), "xyz");

        let p = child(&dnm, 0);
        let head = dnm.tree().children(p).next().unwrap();
        let bold = dnm.tree().children(head).next().unwrap();
        assert_eq!(dnm.point_to_offset(&DnmPoint::whole(head)).unwrap(), (1, Some(3)));
        assert_eq!(dnm.point_to_offset(&DnmPoint::leading(bold, 0)).unwrap(), (1, Some(3)));
    }

    #[test]
    fn test_offset_to_point() {
        let dnm = simple();
        let root = dnm.tree().root();
        let b = child(&dnm, 0);

        assert_eq!(dnm.offset_to_point(0).unwrap(), DnmPoint::leading(root, 0));
        assert_eq!(dnm.offset_to_point(4).unwrap(), DnmPoint::leading(b, 1));
        assert_eq!(dnm.offset_to_point(8).unwrap(), DnmPoint::trailing(b, 2));
        assert_eq!(
            dnm.offset_to_point(10),
            Err(DnmError::OutOfRange { offset: 10, len: 10 })
        );
    }

    #[test]
    fn test_placeholder_points() {
        let tree = Tree::parse("<a>abc <math>this is math string</math> nope</a>").unwrap();
        let dnm = Dnm::new(tree, &ProjectionPolicy::empty().replace_tag("math", "MathNode"));
        let math = child(&dnm, 0);

        assert_eq!(dnm.offset_to_point(7).unwrap(), DnmPoint::whole(math));
        assert_eq!(dnm.point_to_offset(&DnmPoint::whole(math)).unwrap(), (4, Some(12)));
        assert_eq!(dnm.surrounding_node(7), Some(math));
        assert_eq!(dnm.surrounding_node(12), Some(dnm.tree().root()));
    }

    #[test]
    fn test_range_to_offsets() {
        let dnm = simple();
        let root = dnm.tree().root();
        let b = child(&dnm, 0);

        let range = DnmRange::new(DnmPoint::leading(root, 1), DnmPoint::trailing(b, 1), true);
        assert_eq!(dnm.range_to_offsets(&range).unwrap(), (1, 8));
        let range = DnmRange::new(DnmPoint::leading(root, 1), DnmPoint::trailing(b, 1), false);
        assert_eq!(dnm.range_to_offsets(&range).unwrap(), (1, 7));
        let range = DnmRange::new(DnmPoint::whole(b), DnmPoint::whole(b), true);
        assert_eq!(dnm.range_to_offsets(&range).unwrap(), (3, 6));
    }

    #[test]
    fn test_range_to_offsets_on_dirty_projection() {
        let mut dnm = simple();
        let root = dnm.tree().root();
        let b = child(&dnm, 0);
        let range = DnmRange::new(DnmPoint::leading(root, 1), DnmPoint::trailing(b, 1), true);

        let mark = dnm.new_element("mark");
        dnm.add_node(mark, 9, Side::After);
        dnm.flush().unwrap();

        assert_eq!(dnm.range_to_offsets(&range), Err(DnmError::StaleProjection));
        assert_eq!(
            dnm.range_to_offsets_with(&range, StalePolicy::Accept),
            Ok((1, 8))
        );
    }

    #[test]
    fn test_dnm_str_bounds() {
        let dnm = simple();
        assert_eq!(dnm.dnm_str(2..=4).unwrap().as_str(), "chg");
        assert_eq!(dnm.dnm_str(8..).unwrap().as_str(), "pe");
        assert!(matches!(dnm.dnm_str(5..11), Err(DnmError::OutOfRange { .. })));
        assert!(matches!(dnm.dnm_str(..=usize::MAX), Err(DnmError::OutOfRange { .. })));
        assert!(matches!(
            dnm.dnm_str((Bound::Excluded(usize::MAX), Bound::Unbounded)),
            Err(DnmError::OutOfRange { .. })
        ));
        assert_eq!(
            dnm.dnm_str((Bound::Excluded(7), Bound::Unbounded)).unwrap().as_str(),
            "pe"
        );
    }

    #[test]
    fn test_only_detached_nodes_are_editable() {
        let mut dnm = simple();
        let mark = dnm.new_element("mark");
        dnm.set_text(mark, "[").unwrap();
        dnm.set_attr(mark, "class", "hl").unwrap();
        assert_eq!(dnm.tree().serialize(mark), r#"<mark class="hl">[</mark>"#);

        let b = child(&dnm, 0);
        assert!(matches!(
            dnm.set_text(b, "changed"),
            Err(DnmError::InvalidNode { .. })
        ));
        let root = dnm.tree().root();
        assert!(dnm.set_attr(root, "id", "x").is_err());
        assert_eq!(dnm.tree().text(b), "hgj");
    }

    #[test]
    fn test_foreign_node_is_rejected() {
        let dnm = simple();
        let mut other = Tree::parse("<x><y/><z/><w/><v/><u/></x>").unwrap();
        let foreign = other.new_element("q");
        assert!(matches!(
            dnm.point_to_offset(&DnmPoint::whole(foreign)),
            Err(DnmError::MalformedAddress { .. })
        ));
    }
}
