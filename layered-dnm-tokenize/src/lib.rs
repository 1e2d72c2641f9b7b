#![doc(
    html_logo_url = "https://raw.githubusercontent.com/storyscript/layered-nlp/main/assets/layered-nlp.svg",
    issue_tracker_base_url = "https://github.com/storyscript/layered-nlp/issues/"
)]

//! Tokenization for layered-dnm projections.
//!
//! Sentences and words are returned as [`DnmStr`](layered_dnm::DnmStr)
//! views, so every token can still be traced back to the markup it came
//! from, and marked up in place with a [`Highlighter`].
//!
//! ## Usage
//!
//! ```
//! use layered_dnm::{Dnm, Tree, DEFAULT_POLICY};
//! use layered_dnm_tokenize::{sentence_tokenize, word_tokenize, Highlighter, Span};
//!
//! let tree = Tree::parse("<p>Let <math>x</math> be small. It is.</p>").unwrap();
//! let mut dnm = Dnm::new(tree, &DEFAULT_POLICY);
//!
//! let spans: Vec<Span> = {
//!     let full = dnm.full_dnm_str().unwrap();
//!     let sentences = sentence_tokenize(&full);
//!     assert_eq!(sentences[0].as_str(), "Let MathNode be small.");
//!     assert_eq!(word_tokenize(&sentences[1]).len(), 3);
//!     sentences.iter().filter_map(Span::of).collect()
//! };
//!
//! let marker = Highlighter::new("red").with_font_size(150);
//! for span in spans {
//!     marker.highlight(&mut dnm, span).unwrap();
//! }
//! assert_eq!(dnm.flush().unwrap(), 4);
//! ```

mod highlight;
mod sentence;
mod word;

pub use highlight::{highlight, Highlighter, Span};
pub use sentence::{sentence_tokenize, SentenceTokenizer};
pub use word::{word_tokenize, PUNCTUATION};
