#![doc(
    html_logo_url = "https://raw.githubusercontent.com/storyscript/layered-nlp/main/assets/layered-nlp.svg",
    issue_tracker_base_url = "https://github.com/storyscript/layered-nlp/issues/"
)]

//! Flat-string projections of markup trees.
//!
//! A [`Dnm`] walks a [`Tree`] once and produces a plain string of its text
//! content, in which selected elements are skipped or stood in for by a
//! placeholder (see [`ProjectionPolicy`]). Every character of that string
//! points back to the text slot or element it came from, so results found by
//! string processing can be mapped back into the tree, persisted as
//! [`DnmPoint`]/[`DnmRange`] addresses, or marked up by inserting new nodes.
//!
//! ```
//! use layered_dnm::{Dnm, ProjectionPolicy, Side, Tree};
//!
//! let tree = Tree::parse("<a>abc<b>hgj</b>nope<c/></a>").unwrap();
//! let mut dnm = Dnm::new(tree, &ProjectionPolicy::empty());
//! assert_eq!(dnm.flat_string(), "abchgjnope");
//!
//! let d = dnm.new_element("d");
//! let e = dnm.new_element("e");
//! dnm.add_node(d, 2, Side::Before);
//! dnm.add_node(e, 8, Side::Before);
//! dnm.flush().unwrap();
//!
//! assert_eq!(
//!     dnm.tree().to_markup(),
//!     "<a>ab<d/>c<b>hgj</b>no<e/>pe<c/></a>"
//! );
//! ```
//!
//! ## Modules
//!
//! - [`tree`] - Arena-backed element tree with leading and trailing text
//! - [`policy`] - Which elements are skipped or replaced
//! - [`dnm`] - The projection, address translation and deferred insertion
//! - [`dnm_str`] - Views over the flat string with backreferences
//! - [`address`] - Durable point and range addresses
//! - [`error`] - Error types

pub mod address;
pub mod dnm;
pub mod dnm_str;
pub mod error;
pub mod policy;
pub mod tree;

pub use address::{DnmPoint, DnmRange, PointOffset};
pub use dnm::{
    Dnm, DnmDisplay, PendingInsertion, ProjectionState, Side, StalePolicy, TextSlot, Token,
};
pub use dnm_str::DnmStr;
pub use error::{DnmError, DnmResult};
pub use policy::{
    Decision, PolicySet, ProjectionPolicy, DEFAULT_POLICY, DEFAULT_POLICY_NAME, EMPTY_POLICY_NAME,
};
pub use tree::{Element, NodeId, Tree};

#[cfg(test)]
mod tests {
    mod properties;
    mod scenarios;
}
