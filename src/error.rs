//! Error types for projections, addresses and policy loading.

use thiserror::Error;

/// Errors that can occur while building, querying or flushing a projection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnmError {
    /// The projection was already flushed into its tree, so offsets computed
    /// from it may no longer line up with the tree.
    #[error("stale projection: the tree was modified by a previous flush")]
    StaleProjection,

    /// An insertion was requested against an anchor that cannot host it.
    ///
    /// This indicates a broken internal invariant, not bad user input.
    #[error("unsupported anchor: {reason}")]
    UnsupportedAnchor { reason: String },

    /// A node handle that cannot be used here: it belongs to another tree,
    /// is the root, is already attached, or is queued twice.
    #[error("invalid node: {reason}")]
    InvalidNode { reason: String },

    /// An offset outside of `[0, len)`.
    #[error("offset {offset} is out of range (length {len})")]
    OutOfRange { offset: usize, len: usize },

    /// A serialized point or range that could not be parsed or resolved.
    #[error("malformed address '{address}': {reason}")]
    MalformedAddress { address: String, reason: String },

    /// Markup that could not be parsed into a tree.
    #[error("markup error: {message}")]
    Markup { message: String },

    /// A policy configuration that could not be read or parsed.
    #[error("failed to load policy config: {path}: {message}")]
    Config { path: String, message: String },
}

impl DnmError {
    pub(crate) fn malformed(address: &str, reason: impl Into<String>) -> Self {
        DnmError::MalformedAddress {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_node(reason: impl Into<String>) -> Self {
        DnmError::InvalidNode {
            reason: reason.into(),
        }
    }

    pub(crate) fn markup(message: impl std::fmt::Display) -> Self {
        DnmError::Markup {
            message: message.to_string(),
        }
    }
}

/// Result type for projection operations.
pub type DnmResult<T> = Result<T, DnmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DnmError::OutOfRange { offset: 12, len: 10 };
        assert_eq!(err.to_string(), "offset 12 is out of range (length 10)");

        let err = DnmError::malformed("/a/b+txt1", "unknown suffix 'txt1'");
        assert_eq!(
            err.to_string(),
            "malformed address '/a/b+txt1': unknown suffix 'txt1'"
        );

        let err = DnmError::invalid_node("<b> is already attached");
        assert_eq!(err.to_string(), "invalid node: <b> is already attached");
    }
}
