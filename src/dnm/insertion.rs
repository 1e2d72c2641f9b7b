//! Deferred node insertion.
//!
//! Insertions are queued against flat string offsets and applied in one
//! [`Dnm::flush`], right to left, so that splitting a text never moves an
//! anchor that is still waiting to be applied.

use super::{Dnm, ProjectionState, Side, StalePolicy};
use crate::error::{DnmError, DnmResult};
use crate::tree::NodeId;
use std::cmp::Ordering;
use std::collections::HashSet;

/// A node waiting to be inserted at a flat string offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingInsertion {
    pub node: NodeId,
    pub pos: usize,
    pub side: Side,
    /// Registration order
    seq: usize,
}

impl PendingInsertion {
    pub fn seq(&self) -> usize {
        self.seq
    }
}

fn side_rank(side: Side) -> u8 {
    match side {
        Side::After => 0,
        Side::Before => 1,
    }
}

impl Dnm {
    /// Queue `node` for insertion before or after the character at `pos`.
    ///
    /// Nothing is validated until [`Dnm::flush`]. `node` must be a detached
    /// node of this tree (see [`Dnm::new_element`]), queued at most once.
    pub fn add_node(&mut self, node: NodeId, pos: usize, side: Side) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(PendingInsertion {
            node,
            pos,
            side,
            seq,
        });
    }

    /// Queued insertions, in registration order.
    pub fn pending(&self) -> &[PendingInsertion] {
        &self.pending
    }

    /// Apply every queued insertion to the tree. Returns how many were applied.
    pub fn flush(&mut self) -> DnmResult<usize> {
        self.flush_with(StalePolicy::Reject)
    }

    /// [`Dnm::flush`], optionally acknowledging that an earlier flush already
    /// changed the tree under this projection.
    ///
    /// The whole queue is checked before anything is applied. A bad offset
    /// or node fails the flush with the tree and the queue untouched.
    pub fn flush_with(&mut self, stale: StalePolicy) -> DnmResult<usize> {
        self.check_fresh(stale)?;
        if let Some(bad) = self.pending.iter().find(|p| p.pos >= self.len()) {
            return Err(DnmError::OutOfRange {
                offset: bad.pos,
                len: self.len(),
            });
        }
        self.check_pending_nodes()?;
        self.apply_pending()
    }

    fn check_pending_nodes(&self) -> DnmResult<()> {
        let tree = &self.tree;
        let mut seen = HashSet::new();
        for insertion in &self.pending {
            let node = insertion.node;
            let reason = if !tree.contains(node) {
                Some("node does not belong to the projected tree".to_string())
            } else if node == tree.root() {
                Some(format!("the root <{}> cannot be inserted", tree.tag(node)))
            } else if tree.parent(node).is_some() {
                Some(format!("<{}> is already attached", tree.tag(node)))
            } else if !seen.insert(node) {
                Some(format!("<{}> is queued more than once", tree.tag(node)))
            } else {
                let anchor = &self.tokens[self.backref_token[insertion.pos]];
                (!anchor.is_text() && tree.parent(anchor.node()).is_none()).then(|| {
                    format!(
                        "offset {} is inside the root <{}>, which cannot have siblings",
                        insertion.pos,
                        tree.tag(anchor.node())
                    )
                })
            };
            if let Some(reason) = reason {
                tracing::debug!("Rejected insertion #{}: {}", insertion.seq, reason);
                return Err(DnmError::invalid_node(reason));
            }
        }
        Ok(())
    }

    /// Apply the queue, which must have passed validation. A failure here is a
    /// broken invariant: it panics in debug builds once the queue is restored.
    fn apply_pending(&mut self) -> DnmResult<usize> {
        let mut queue = std::mem::take(&mut self.pending);
        queue.sort_by(|a, b| self.flush_order(a, b));

        let mut applied = 0;
        let mut queue = queue.into_iter();
        while let Some(insertion) = queue.next() {
            let token = &self.tokens[self.backref_token[insertion.pos]];
            let local = self.backref_offset[insertion.pos];

            if let Err(err) = token.insert(&mut self.tree, insertion.node, local, insertion.side) {
                tracing::error!(
                    "Insertion #{} at offset {} failed after {} applied: {}",
                    insertion.seq,
                    insertion.pos,
                    applied,
                    err
                );
                self.pending = std::iter::once(insertion).chain(queue).collect();
                self.pending.sort_by_key(|p| p.seq);
                if applied > 0 {
                    self.state = ProjectionState::Dirty;
                }
                if cfg!(debug_assertions) {
                    panic!("unsupported insertion anchor: {}", err);
                }
                return Err(err);
            }

            tracing::trace!(
                "Inserted <{}> {:?} offset {} ({} within token)",
                self.tree.tag(insertion.node),
                insertion.side,
                insertion.pos,
                local
            );
            applied += 1;
        }

        if applied > 0 {
            self.state = ProjectionState::Dirty;
        }
        tracing::debug!("Flushed {} insertions", applied);
        Ok(applied)
    }

    /// Rightmost first, "after" before "before", then registration order:
    /// reversed for "before" on a text anchor, so later insertions end up
    /// nearer the anchor character in every case.
    fn flush_order(&self, a: &PendingInsertion, b: &PendingInsertion) -> Ordering {
        b.pos
            .cmp(&a.pos)
            .then_with(|| side_rank(a.side).cmp(&side_rank(b.side)))
            .then_with(|| {
                let text_anchor = self.tokens[self.backref_token[a.pos]].is_text();
                if text_anchor && a.side == Side::Before {
                    b.seq.cmp(&a.seq)
                } else {
                    a.seq.cmp(&b.seq)
                }
            })
    }
}
