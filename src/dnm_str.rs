//! Immutable views over a projection's flat string.
//!
//! Every character of a [`DnmStr`] carries the flat string offset it came
//! from, so slices, stripped and whitespace-normalized views can still be
//! anchored back into the tree.

use crate::address::{DnmPoint, DnmRange};
use crate::dnm::Dnm;
use crate::error::{DnmError, DnmResult};
use crate::tree::NodeId;
use std::ops::{Bound, RangeBounds};

#[derive(Clone)]
pub struct DnmStr<'a> {
    dnm: &'a Dnm,
    text: String,
    /// One flat string offset per char of `text`
    backrefs: Vec<usize>,
}

impl<'a> DnmStr<'a> {
    pub(crate) fn new(dnm: &'a Dnm, text: String, backrefs: Vec<usize>) -> Self {
        debug_assert_eq!(text.chars().count(), backrefs.len());
        DnmStr {
            dnm,
            text,
            backrefs,
        }
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.backrefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backrefs.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Flat string offset of every char.
    pub fn backrefs(&self) -> &[usize] {
        &self.backrefs
    }

    pub fn dnm(&self) -> &'a Dnm {
        self.dnm
    }

    pub fn char_at(&self, i: usize) -> Option<char> {
        self.text.chars().nth(i)
    }

    /// Sub view in local char offsets. Bounds are clamped to the view.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> DnmStr<'a> {
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
        let end = end.min(self.len());
        let start = start.min(end);

        let text = self.text.chars().skip(start).take(end - start).collect();
        DnmStr::new(self.dnm, text, self.backrefs[start..end].to_vec())
    }

    /// Drop leading and trailing whitespace.
    pub fn strip(&self) -> DnmStr<'a> {
        let chars: Vec<char> = self.text.chars().collect();
        match chars.iter().position(|c| !c.is_whitespace()) {
            None => self.slice(0..0),
            Some(first) => {
                let last = chars
                    .iter()
                    .rposition(|c| !c.is_whitespace())
                    .unwrap_or(first);
                self.slice(first..=last)
            }
        }
    }

    /// Collapse every whitespace run into a single space, which keeps the
    /// backref of the first character of the run.
    pub fn normalize_spaces(&self) -> DnmStr<'a> {
        let mut text = String::with_capacity(self.text.len());
        let mut backrefs = Vec::with_capacity(self.len());
        let mut in_space = false;
        for (c, &backref) in self.text.chars().zip(&self.backrefs) {
            if c.is_whitespace() {
                if !in_space {
                    text.push(' ');
                    backrefs.push(backref);
                }
                in_space = true;
            } else {
                text.push(c);
                backrefs.push(backref);
                in_space = false;
            }
        }
        DnmStr::new(self.dnm, text, backrefs)
    }

    /// The element containing the char at `i`. For a placeholder char, the
    /// replaced element itself.
    pub fn node_at(&self, i: usize) -> Option<NodeId> {
        self.backrefs
            .get(i)
            .and_then(|&pos| self.dnm.surrounding_node(pos))
    }

    pub fn point_at(&self, i: usize) -> Option<DnmPoint> {
        self.backrefs.get(i).map(|&pos| self.dnm.point_of(pos))
    }

    /// A durable range for the local chars `start..end`, ending inclusively at
    /// the last char.
    pub fn dnm_range(&self, start: usize, end: usize) -> DnmResult<DnmRange> {
        if start >= end || end > self.len() {
            return Err(DnmError::OutOfRange {
                offset: end.max(start),
                len: self.len(),
            });
        }
        Ok(DnmRange::new(
            self.dnm.point_of(self.backrefs[start]),
            self.dnm.point_of(self.backrefs[end - 1]),
            true,
        ))
    }
}

impl PartialEq for DnmStr<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.backrefs == other.backrefs
    }
}

impl Eq for DnmStr<'_> {}

impl std::fmt::Display for DnmStr<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl std::fmt::Debug for DnmStr<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnmStr")
            .field("text", &self.text)
            .field("backrefs", &self.backrefs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProjectionPolicy, Tree};

    fn build(markup: &str) -> Dnm {
        Dnm::new(Tree::parse(markup).unwrap(), &ProjectionPolicy::empty())
    }

    #[test]
    fn test_slice() {
        let dnm = build("<a>abc<b>hgj</b>nope</a>");
        let full = dnm.full_dnm_str().unwrap();
        assert_eq!(full.len(), 10);

        let mid = full.slice(2..5);
        assert_eq!(mid.as_str(), "chg");
        assert_eq!(mid.backrefs(), &[2, 3, 4]);

        let inner = mid.slice(1..);
        assert_eq!(inner.as_str(), "hg");
        assert_eq!(inner.backrefs(), &[3, 4]);

        assert_eq!(full.slice(8..100).as_str(), "pe");
        assert!(full.slice(7..3).is_empty());
        assert_eq!(full.char_at(3), Some('h'));
        assert_eq!(full.char_at(10), None);
    }

    #[test]
    fn test_strip() {
        let dnm = build("<a>  abc <b>d</b>  </a>");
        let full = dnm.full_dnm_str().unwrap();
        let stripped = full.strip();
        assert_eq!(stripped.as_str(), "abc d");
        assert_eq!(stripped.backrefs(), &[2, 3, 4, 5, 6]);

        let blank = build("<a> \n\t </a>");
        assert!(blank.full_dnm_str().unwrap().strip().is_empty());
    }

    #[test]
    fn test_normalize_spaces() {
        let dnm = build("<a>a \n b<i>\t</i> c</a>");
        let full = dnm.full_dnm_str().unwrap();
        let normalized = full.normalize_spaces();
        assert_eq!(normalized.as_str(), "a b c");
        assert_eq!(normalized.backrefs(), &[0, 1, 4, 5, 7]);
    }

    #[test]
    fn test_node_and_point_lookup() {
        let dnm = build("<a>abc<b>hgj</b>nope</a>");
        let full = dnm.full_dnm_str().unwrap();
        let root = dnm.tree().root();
        let b = dnm.tree().children(root).next().unwrap();

        assert_eq!(full.node_at(0), Some(root));
        assert_eq!(full.node_at(4), Some(b));
        assert_eq!(full.node_at(7), Some(root));
        assert_eq!(full.node_at(10), None);

        let tail = full.slice(6..);
        assert_eq!(tail.point_at(1), Some(DnmPoint::trailing(b, 1)));
        assert_eq!(
            tail.dnm_range(0, 4).unwrap(),
            DnmRange::new(DnmPoint::trailing(b, 0), DnmPoint::trailing(b, 3), true)
        );
        assert!(tail.dnm_range(2, 2).is_err());
        assert!(tail.dnm_range(0, 5).is_err());
    }

    #[test]
    fn test_formatting() {
        let dnm = build("<a>ab</a>");
        let full = dnm.full_dnm_str().unwrap();
        assert_eq!(full.to_string(), "ab");
        insta::assert_snapshot!(format!("{:?}", full), @r###"DnmStr { text: "ab", backrefs: [0, 1] }"###);
    }
}
