//! Arena-backed markup tree.
//!
//! Every element owns its leading text (`text`, before the first child) and
//! its trailing text (`tail`, between the element and its next sibling).
//! Nodes are addressed by stable [`NodeId`] handles, so projections can hold
//! on to them while the tree is mutated.

use crate::error::{DnmError, DnmResult};
use indextree::Arena;
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt::Write;

pub use indextree::NodeId;

/// Stand-in read for handles that do not belong to a tree.
static UNKNOWN: Element = Element {
    tag: String::new(),
    attrs: Vec::new(),
    text: String::new(),
    tail: String::new(),
};

/// A single element of a [`Tree`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    /// Attributes in document order
    pub attrs: Vec<(String, String)>,
    /// Text before the first child
    pub text: String,
    /// Text after the element, up to the next sibling or the end of the parent
    pub tail: String,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// An ordered, mutable element tree.
#[derive(Debug, Clone)]
pub struct Tree {
    arena: Arena<Element>,
    root: NodeId,
}

impl Tree {
    /// Create a tree consisting of a single root element.
    pub fn new(root: Element) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(root);
        Tree { arena, root }
    }

    /// Parse well-formed markup. Whitespace is kept verbatim; comments,
    /// declarations and processing instructions are dropped.
    pub fn parse(markup: &str) -> DnmResult<Self> {
        let mut arena = Arena::new();
        let root = parse_into(&mut arena, markup)?;
        Ok(Tree { arena, root })
    }

    /// Parse a fragment into this tree's arena as a detached node.
    pub fn parse_fragment(&mut self, markup: &str) -> DnmResult<NodeId> {
        parse_into(&mut self.arena, markup)
    }

    /// Create a detached, empty element.
    pub fn new_element(&mut self, tag: &str) -> NodeId {
        self.arena.new_node(Element::new(tag))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.arena.get(node).map_or(false, |n| !n.is_removed())
    }

    /// The element behind `node`; an empty element for handles this tree
    /// does not contain.
    pub fn element(&self, node: NodeId) -> &Element {
        match self.arena.get(node) {
            Some(n) if !n.is_removed() => n.get(),
            _ => &UNKNOWN,
        }
    }

    pub fn tag(&self, node: NodeId) -> &str {
        &self.element(node).tag
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).attr(name)
    }

    /// The whitespace separated entries of the `class` attribute.
    pub fn classes(&self, node: NodeId) -> impl Iterator<Item = &str> + '_ {
        self.attr(node, "class")
            .into_iter()
            .flat_map(|value| value.split_whitespace())
    }

    pub fn text(&self, node: NodeId) -> &str {
        &self.element(node).text
    }

    pub fn tail(&self, node: NodeId) -> &str {
        &self.element(node).tail
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.arena.get(node)?.parent()
    }

    fn known(&self, node: NodeId) -> Option<NodeId> {
        self.contains(node).then_some(node)
    }

    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.known(node)
            .into_iter()
            .flat_map(move |node| node.children(&self.arena))
    }

    /// The node itself followed by its ancestors up to the root.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.known(node)
            .into_iter()
            .flat_map(move |node| node.ancestors(&self.arena))
    }

    /// The node itself followed by its descendants in pre-order.
    pub fn descendants(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.known(node)
            .into_iter()
            .flat_map(move |node| node.descendants(&self.arena))
    }

    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) {
        self.arena[node].get_mut().text = text.into();
    }

    pub fn set_tail(&mut self, node: NodeId, tail: impl Into<String>) {
        self.arena[node].get_mut().tail = tail.into();
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let attrs = &mut self.arena[node].get_mut().attrs;
        match attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => attrs.push((name.to_string(), value)),
        }
    }

    /// Cut the leading text of `node` at `char_idx`, returning the remainder.
    pub fn split_text(&mut self, node: NodeId, char_idx: usize) -> String {
        let text = &mut self.arena[node].get_mut().text;
        let at = char_to_byte(text, char_idx);
        text.split_off(at)
    }

    /// Cut the trailing text of `node` at `char_idx`, returning the remainder.
    pub fn split_tail(&mut self, node: NodeId, char_idx: usize) -> String {
        let tail = &mut self.arena[node].get_mut().tail;
        let at = char_to_byte(tail, char_idx);
        tail.split_off(at)
    }

    pub fn insert_first_child(&mut self, parent: NodeId, new: NodeId) -> DnmResult<()> {
        parent
            .checked_prepend(new, &mut self.arena)
            .map_err(|err| unsupported(format!("cannot prepend child: {}", err)))
    }

    pub fn insert_next_sibling(&mut self, sibling: NodeId, new: NodeId) -> DnmResult<()> {
        self.require_parent(sibling)?;
        sibling
            .checked_insert_after(new, &mut self.arena)
            .map_err(|err| unsupported(format!("cannot insert sibling: {}", err)))
    }

    pub fn insert_previous_sibling(&mut self, sibling: NodeId, new: NodeId) -> DnmResult<()> {
        self.require_parent(sibling)?;
        sibling
            .checked_insert_before(new, &mut self.arena)
            .map_err(|err| unsupported(format!("cannot insert sibling: {}", err)))
    }

    fn require_parent(&self, node: NodeId) -> DnmResult<()> {
        match self.parent(node) {
            Some(_) => Ok(()),
            None => Err(unsupported(format!(
                "<{}> has no parent to hold a sibling",
                self.tag(node)
            ))),
        }
    }

    /// Serialize the whole document.
    pub fn to_markup(&self) -> String {
        self.serialize(self.root)
    }

    /// Serialize `node` and its subtree, without its own trailing text.
    pub fn serialize(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    fn write_node(&self, node: NodeId, out: &mut String) {
        let element = self.element(node);
        out.push('<');
        out.push_str(&element.tag);
        for (key, value) in &element.attrs {
            let _ = write!(out, " {}=\"{}\"", key, escape(value.as_str()));
        }
        if element.text.is_empty() && self.children(node).next().is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        out.push_str(&partial_escape(element.text.as_str()));
        for child in self.children(node) {
            self.write_node(child, out);
            out.push_str(&partial_escape(self.tail(child)));
        }
        let _ = write!(out, "</{}>", element.tag);
    }

    /// Structural path of `node`, e.g. `/html/body/div[2]/p`.
    ///
    /// A `[k]` index (1-based) is only emitted when the parent has more than
    /// one child with the same tag. `None` for a node of another tree.
    pub fn path(&self, node: NodeId) -> Option<String> {
        if !self.contains(node) {
            return None;
        }
        let mut steps = Vec::new();
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            let tag = self.tag(current);
            let same_tag: Vec<NodeId> = self
                .children(parent)
                .filter(|&child| self.tag(child) == tag)
                .collect();
            if same_tag.len() > 1 {
                let idx = same_tag
                    .iter()
                    .position(|&child| child == current)
                    .map_or(1, |i| i + 1);
                steps.push(format!("{}[{}]", tag, idx));
            } else {
                steps.push(tag.to_string());
            }
            current = parent;
        }
        steps.push(self.tag(current).to_string());
        steps.reverse();

        let mut path = String::new();
        for step in steps {
            path.push('/');
            path.push_str(&step);
        }
        Some(path)
    }

    /// Resolve a path produced by [`Tree::path`].
    pub fn resolve_path(&self, path: &str) -> Option<NodeId> {
        let mut steps = path.strip_prefix('/')?.split('/');
        let (tag, idx) = parse_step(steps.next()?)?;
        if tag != self.tag(self.root) || idx != 1 {
            return None;
        }
        let mut current = self.root;
        for step in steps {
            let (tag, idx) = parse_step(step)?;
            current = self
                .children(current)
                .filter(|&child| self.tag(child) == tag)
                .nth(idx - 1)?;
        }
        Some(current)
    }
}

impl std::fmt::Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_markup())
    }
}

/// A plain decimal: ASCII digits only, no sign, no leading zeros.
pub(crate) fn parse_decimal(digits: &str) -> Option<usize> {
    let plain = !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'));
    if plain {
        digits.parse().ok()
    } else {
        None
    }
}

/// Byte index of the `char_idx`-th character, or `s.len()` past the end.
pub(crate) fn char_to_byte(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map_or(s.len(), |(byte, _)| byte)
}

fn unsupported(reason: String) -> DnmError {
    DnmError::UnsupportedAnchor { reason }
}

/// `tag` or `tag[k]`
fn parse_step(step: &str) -> Option<(&str, usize)> {
    match step.find('[') {
        Some(open) => {
            let idx = parse_decimal(step[open + 1..].strip_suffix(']')?)?;
            if idx == 0 || open == 0 {
                return None;
            }
            Some((&step[..open], idx))
        }
        None if !step.is_empty() => Some((step, 1)),
        None => None,
    }
}

fn start_element(start: &BytesStart<'_>) -> DnmResult<Element> {
    let tag = std::str::from_utf8(start.name().as_ref())
        .map_err(DnmError::markup)?
        .to_string();
    let mut element = Element::new(tag);
    for attr in start.attributes() {
        let attr = attr.map_err(DnmError::markup)?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(DnmError::markup)?
            .to_string();
        let value = attr.unescape_value().map_err(DnmError::markup)?;
        element.attrs.push((key, value.into_owned()));
    }
    Ok(element)
}

/// Append text at the current insertion point of `open`: its leading text if
/// it has no children yet, otherwise the trailing text of its last child.
fn push_text(arena: &mut Arena<Element>, open: NodeId, text: &str) {
    match arena[open].last_child() {
        Some(last) => arena[last].get_mut().tail.push_str(text),
        None => arena[open].get_mut().text.push_str(text),
    }
}

fn parse_into(arena: &mut Arena<Element>, markup: &str) -> DnmResult<NodeId> {
    let mut reader = Reader::from_str(markup);
    let mut stack: Vec<NodeId> = Vec::new();
    let mut root: Option<NodeId> = None;

    loop {
        let event = reader.read_event().map_err(DnmError::markup)?;
        let text = match event {
            Event::Start(start) | Event::Empty(start)
                if stack.is_empty() && root.is_some() =>
            {
                return Err(DnmError::markup(format!(
                    "second root element <{}>",
                    String::from_utf8_lossy(start.name().as_ref())
                )));
            }
            Event::Start(start) => {
                let node = arena.new_node(start_element(&start)?);
                match stack.last() {
                    Some(&parent) => parent
                        .checked_append(node, arena)
                        .map_err(DnmError::markup)?,
                    None => root = Some(node),
                }
                stack.push(node);
                continue;
            }
            Event::Empty(start) => {
                let node = arena.new_node(start_element(&start)?);
                match stack.last() {
                    Some(&parent) => parent
                        .checked_append(node, arena)
                        .map_err(DnmError::markup)?,
                    None => root = Some(node),
                }
                continue;
            }
            Event::End(_) => {
                stack.pop();
                continue;
            }
            Event::Text(text) => text.unescape().map_err(DnmError::markup)?.into_owned(),
            Event::CData(data) => std::str::from_utf8(&data)
                .map_err(DnmError::markup)?
                .to_string(),
            Event::Eof => break,
            _ => continue,
        };

        match stack.last() {
            Some(&open) => push_text(arena, open, &text),
            None if text.trim().is_empty() => {}
            None => {
                return Err(DnmError::markup(format!(
                    "text outside of the root element: {:?}",
                    text.trim()
                )))
            }
        }
    }

    if !stack.is_empty() {
        return Err(DnmError::markup("unexpected end of input: unclosed element"));
    }
    root.ok_or_else(|| DnmError::markup("no root element"))
}
