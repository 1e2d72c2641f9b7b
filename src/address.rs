//! Durable tree addresses, independent of any particular projection.
//!
//! A point is written as the structural path of its node, optionally
//! followed by `+text<N>` or `+tail<N>`:
//!
//! ```text
//! /html/body/p[2]+tail4
//! /html/body/p[2]/math
//! /html/body/p[1]+text0&/html/body/p[1]+text9&true
//! ```

use crate::error::{DnmError, DnmResult};
use crate::tree::{parse_decimal, NodeId, Tree};

/// A char offset into one of the two text slots of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointOffset {
    Leading(usize),
    Trailing(usize),
}

impl PointOffset {
    pub fn offset(&self) -> usize {
        match self {
            PointOffset::Leading(n) | PointOffset::Trailing(n) => *n,
        }
    }
}

/// A node, optionally narrowed down to one character of its leading or
/// trailing text. Without an offset the point denotes the whole node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DnmPoint {
    pub node: NodeId,
    pub offset: Option<PointOffset>,
}

impl DnmPoint {
    pub fn whole(node: NodeId) -> Self {
        DnmPoint { node, offset: None }
    }

    pub fn leading(node: NodeId, offset: usize) -> Self {
        DnmPoint {
            node,
            offset: Some(PointOffset::Leading(offset)),
        }
    }

    pub fn trailing(node: NodeId, offset: usize) -> Self {
        DnmPoint {
            node,
            offset: Some(PointOffset::Trailing(offset)),
        }
    }

    pub fn is_whole(&self) -> bool {
        self.offset.is_none()
    }

    /// Fails with [`DnmError::InvalidNode`] when the node is not part of `tree`.
    pub fn to_address(&self, tree: &Tree) -> DnmResult<String> {
        let path = tree
            .path(self.node)
            .ok_or_else(|| DnmError::invalid_node("node does not belong to this tree"))?;
        Ok(match self.offset {
            None => path,
            Some(PointOffset::Leading(n)) => format!("{}+text{}", path, n),
            Some(PointOffset::Trailing(n)) => format!("{}+tail{}", path, n),
        })
    }

    pub fn from_address(address: &str, tree: &Tree) -> DnmResult<Self> {
        let (path, suffix) = match address.split_once('+') {
            Some((path, suffix)) => (path, Some(suffix)),
            None => (address, None),
        };
        let node = tree
            .resolve_path(path)
            .ok_or_else(|| DnmError::malformed(address, "path does not resolve in this tree"))?;

        let offset = match suffix {
            None => None,
            Some(suffix) => {
                let (make, digits): (fn(usize) -> PointOffset, &str) =
                    if let Some(digits) = suffix.strip_prefix("text") {
                        (PointOffset::Leading, digits)
                    } else if let Some(digits) = suffix.strip_prefix("tail") {
                        (PointOffset::Trailing, digits)
                    } else {
                        return Err(DnmError::malformed(
                            address,
                            "offset must be +text<N> or +tail<N>",
                        ));
                    };
                let n = parse_decimal(digits).ok_or_else(|| {
                    DnmError::malformed(
                        address,
                        format!("'{}' is not a plain decimal offset", digits),
                    )
                })?;
                Some(make(n))
            }
        };
        Ok(DnmPoint { node, offset })
    }
}

/// An ordered pair of points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DnmRange {
    pub start: DnmPoint,
    pub end: DnmPoint,
    /// Whether the character at `end` is part of the range
    pub end_inclusive: bool,
}

impl DnmRange {
    pub fn new(start: DnmPoint, end: DnmPoint, end_inclusive: bool) -> Self {
        DnmRange {
            start,
            end,
            end_inclusive,
        }
    }

    pub fn to_address(&self, tree: &Tree) -> DnmResult<String> {
        Ok(format!(
            "{}&{}&{}",
            self.start.to_address(tree)?,
            self.end.to_address(tree)?,
            self.end_inclusive
        ))
    }

    pub fn from_address(address: &str, tree: &Tree) -> DnmResult<Self> {
        let mut parts = address.split('&');
        let (start, end, flag) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(start), Some(end), Some(flag), None) => (start, end, flag),
            _ => {
                return Err(DnmError::malformed(
                    address,
                    "expected <point>&<point>&<bool>",
                ))
            }
        };
        let end_inclusive = if flag.eq_ignore_ascii_case("true") {
            true
        } else if flag.eq_ignore_ascii_case("false") {
            false
        } else {
            return Err(DnmError::malformed(
                address,
                format!("'{}' is not a boolean", flag),
            ));
        };
        Ok(DnmRange {
            start: DnmPoint::from_address(start, tree)?,
            end: DnmPoint::from_address(end, tree)?,
            end_inclusive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Tree {
        Tree::parse("<html><body><p>one<b>x</b>nope</p><p>two</p></body></html>").unwrap()
    }

    fn bold(tree: &Tree) -> NodeId {
        tree.descendants(tree.root())
            .find(|&n| tree.tag(n) == "b")
            .unwrap()
    }

    #[test]
    fn test_point_addresses() {
        let tree = fixture();
        let b = bold(&tree);

        assert_eq!(
            DnmPoint::whole(b).to_address(&tree).unwrap(),
            "/html/body/p[1]/b"
        );
        assert_eq!(
            DnmPoint::leading(b, 0).to_address(&tree).unwrap(),
            "/html/body/p[1]/b+text0"
        );
        assert_eq!(
            DnmPoint::trailing(b, 2).to_address(&tree).unwrap(),
            "/html/body/p[1]/b+tail2"
        );
        assert_eq!(
            DnmPoint::from_address("/html/body/p[1]/b+tail2", &tree).unwrap(),
            DnmPoint::trailing(b, 2)
        );
        assert!(DnmPoint::from_address("/html/body/p[1]/b", &tree)
            .unwrap()
            .is_whole());
    }

    #[test]
    fn test_range_address() {
        let tree = fixture();
        let b = bold(&tree);
        let range = DnmRange::new(DnmPoint::leading(b, 0), DnmPoint::trailing(b, 3), false);

        let address = range.to_address(&tree).unwrap();
        assert_eq!(address, "/html/body/p[1]/b+text0&/html/body/p[1]/b+tail3&false");
        assert_eq!(DnmRange::from_address(&address, &tree).unwrap(), range);

        let legacy = DnmRange::from_address(
            "/html/body/p[1]/b+text0&/html/body/p[1]/b+tail3&True",
            &tree,
        )
        .unwrap();
        assert!(legacy.end_inclusive);
    }

    #[test]
    fn test_malformed_addresses() {
        let tree = fixture();
        for address in [
            "",
            "/html/body/p[3]",
            "/html/body/p[1]/b+tial2",
            "/html/body/p[1]/b+text",
            "/html/body/p[1]/b+text-1",
            "/html/body/p[1]/b+text+5",
            "/html/body/p[1]/b+text05",
            "/html/body/p[1]/b+tail 3",
            "/html/body/p[01]",
            "html/body",
        ] {
            assert!(
                matches!(
                    DnmPoint::from_address(address, &tree),
                    Err(DnmError::MalformedAddress { .. })
                ),
                "{}",
                address
            );
        }

        for address in [
            "/html&/html",
            "/html&/html&yes",
            "/html&/html&true&false",
            "/html&/nope&true",
        ] {
            assert!(
                matches!(
                    DnmRange::from_address(address, &tree),
                    Err(DnmError::MalformedAddress { .. })
                ),
                "{}",
                address
            );
        }
    }

    #[test]
    fn test_zero_offset_is_plain() {
        let tree = fixture();
        let b = bold(&tree);
        assert_eq!(
            DnmPoint::from_address("/html/body/p[1]/b+tail0", &tree).unwrap(),
            DnmPoint::trailing(b, 0)
        );
    }

    #[test]
    fn test_address_of_foreign_node() {
        let tree = fixture();
        let mut other = Tree::parse("<x><y/><z/><w/><v/><u/><t/><s/></x>").unwrap();
        let foreign = other.new_element("q");

        assert!(matches!(
            DnmPoint::whole(foreign).to_address(&tree),
            Err(DnmError::InvalidNode { .. })
        ));
        let range = DnmRange::new(DnmPoint::whole(bold(&tree)), DnmPoint::leading(foreign, 0), true);
        assert!(matches!(
            range.to_address(&tree),
            Err(DnmError::InvalidNode { .. })
        ));
    }
}
