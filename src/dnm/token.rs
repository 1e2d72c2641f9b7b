//! The atomic units of a projection.

use crate::error::DnmResult;
use crate::tree::{NodeId, Tree};

/// Which text of a node a [`Token::Text`] was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextSlot {
    /// The node's own text, before its first child
    Leading,
    /// The text between the node and its next sibling
    Trailing,
}

/// Where a queued node goes relative to the character at its offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Before,
    After,
}

/// A contiguous piece of the flat string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text, copied from the leading or trailing text of `node`.
    Text {
        content: String,
        node: NodeId,
        slot: TextSlot,
        start_pos: usize,
    },
    /// A placeholder standing in for the whole of `node`.
    Node {
        node: NodeId,
        placeholder: String,
        start_pos: usize,
    },
}

impl Token {
    pub fn content(&self) -> &str {
        match self {
            Token::Text { content, .. } => content,
            Token::Node { placeholder, .. } => placeholder,
        }
    }

    /// Offset of the first character in the flat string.
    pub fn start_pos(&self) -> usize {
        match self {
            Token::Text { start_pos, .. } | Token::Node { start_pos, .. } => *start_pos,
        }
    }

    pub(crate) fn set_start_pos(&mut self, pos: usize) {
        match self {
            Token::Text { start_pos, .. } | Token::Node { start_pos, .. } => *start_pos = pos,
        }
    }

    /// The node this token is anchored at.
    pub fn node(&self) -> NodeId {
        match self {
            Token::Text { node, .. } | Token::Node { node, .. } => *node,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Token::Text { .. })
    }

    /// The element whose content this token is part of.
    ///
    /// Trailing text belongs to the parent of the node it follows.
    pub fn surrounding_node(&self, tree: &Tree) -> NodeId {
        match self {
            Token::Text {
                node,
                slot: TextSlot::Trailing,
                ..
            } => tree.parent(*node).unwrap_or(*node),
            Token::Text { node, .. } | Token::Node { node, .. } => *node,
        }
    }

    /// Insert `new` into `tree` next to the character at `local` (relative to
    /// this token).
    ///
    /// Text is split at the insertion point and the remainder is re-homed as
    /// the trailing text of `new`. Only valid against the text the token was
    /// built from, or a prefix of it left by insertions further right.
    pub(crate) fn insert(
        &self,
        tree: &mut Tree,
        new: NodeId,
        local: usize,
        side: Side,
    ) -> DnmResult<()> {
        match self {
            Token::Text { node, slot, .. } => {
                let at = match side {
                    Side::Before => local,
                    Side::After => local + 1,
                };
                let rest = match slot {
                    TextSlot::Leading => {
                        tree.insert_first_child(*node, new)?;
                        tree.split_text(*node, at)
                    }
                    TextSlot::Trailing => {
                        tree.insert_next_sibling(*node, new)?;
                        tree.split_tail(*node, at)
                    }
                };
                tree.set_tail(new, rest);
            }
            Token::Node { node, .. } => match side {
                Side::Before => tree.insert_previous_sibling(*node, new)?,
                Side::After => {
                    tree.insert_next_sibling(*node, new)?;
                    let rest = tree.split_tail(*node, 0);
                    tree.set_tail(new, rest);
                }
            },
        }
        Ok(())
    }
}
