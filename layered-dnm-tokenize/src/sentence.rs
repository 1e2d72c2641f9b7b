//! Sentence splitting over a [`DnmStr`].
//!
//! Boundaries come from end punctuation (`.`, `!`, `?`), refined by the
//! markup behind each character:
//! - a period followed by a lowercase letter, or between two digits, is not a boundary
//! - punctuation followed by a no-break space or by `,` `.` `:` `;` is not a boundary
//! - punctuation followed by a space and a reference/citation is not a boundary
//! - header content always forms its own sentence
//! - a display equation followed by a space and an uppercase letter ends a sentence

use layered_dnm::{DnmStr, NodeId, Tree};
use std::collections::HashSet;

const NO_BREAK_SPACE: char = '\u{a0}';

pub struct SentenceTokenizer {
    header_tags: HashSet<String>,
    reference_classes: HashSet<String>,
    equation_classes: HashSet<String>,
}

impl Default for SentenceTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceTokenizer {
    pub fn new() -> Self {
        SentenceTokenizer {
            header_tags: ["h1", "h2", "h3", "h4", "h5", "h6"]
                .iter()
                .map(|tag| tag.to_string())
                .collect(),
            reference_classes: ["ltx_ref", "ltx_cite"]
                .iter()
                .map(|class| class.to_string())
                .collect(),
            equation_classes: std::iter::once("ltx_equation".to_string()).collect(),
        }
    }

    pub fn with_header_tag(mut self, tag: &str) -> Self {
        self.header_tags.insert(tag.to_string());
        self
    }

    pub fn with_reference_class(mut self, class: &str) -> Self {
        self.reference_classes.insert(class.to_string());
        self
    }

    pub fn with_equation_class(mut self, class: &str) -> Self {
        self.equation_classes.insert(class.to_string());
        self
    }

    /// Split `text` into stripped, space-normalized sentences. Empty
    /// sentences are dropped; text after the last boundary is kept.
    pub fn tokenize<'a>(&self, text: &DnmStr<'a>) -> Vec<DnmStr<'a>> {
        let chars: Vec<char> = text.as_str().chars().collect();
        let tree = text.dnm().tree();
        let in_header = |i: usize| {
            text.node_at(i)
                .map_or(false, |node| self.is_header(tree, node))
        };

        let mut sentences = Vec::new();
        let mut push = |piece: DnmStr<'a>| {
            let sentence = piece.strip().normalize_spaces();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
        };

        let mut start = 0;
        let mut header = false;
        for i in 0..chars.len() {
            let mut boundary = None;
            if self.ends_sentence(text, &chars, i) {
                boundary = Some(i + 1);
            }
            if in_header(i) != header {
                header = !header;
                boundary = Some(i);
            }
            if self.ends_display_equation(text, &chars, i) {
                boundary = Some(i + 1);
            }

            if let Some(boundary) = boundary {
                push(text.slice(start..boundary));
                start = boundary;
            }
        }
        push(text.slice(start..));

        tracing::trace!("Split {} chars into {} sentences", chars.len(), sentences.len());
        sentences
    }

    fn ends_sentence(&self, text: &DnmStr<'_>, chars: &[char], i: usize) -> bool {
        let c = chars[i];
        if !matches!(c, '.' | '!' | '?') {
            return false;
        }
        let next = chars.get(i + 1).copied();
        if c == '.' {
            if next.map_or(false, char::is_lowercase) {
                return false;
            }
            let prev_digit = i > 0 && chars[i - 1].is_ascii_digit();
            if prev_digit && next.map_or(false, |n| n.is_ascii_digit()) {
                return false;
            }
        }
        match next {
            Some(NO_BREAK_SPACE) | Some(',') | Some('.') | Some(':') | Some(';') => false,
            Some(n) if n.is_whitespace() => !self.is_reference_at(text, i + 2),
            _ => true,
        }
    }

    fn ends_display_equation(&self, text: &DnmStr<'_>, chars: &[char], i: usize) -> bool {
        let (Some(&space), Some(&upper)) = (chars.get(i + 1), chars.get(i + 2)) else {
            return false;
        };
        space.is_whitespace()
            && upper.is_uppercase()
            && self.is_equation_at(text, i)
            && !self.is_equation_at(text, i + 1)
    }

    fn is_header(&self, tree: &Tree, node: NodeId) -> bool {
        tree.ancestors(node)
            .any(|n| self.header_tags.contains(tree.tag(n)))
    }

    fn has_class_in(&self, text: &DnmStr<'_>, i: usize, classes: &HashSet<String>) -> bool {
        let tree = text.dnm().tree();
        text.node_at(i).map_or(false, |node| {
            tree.ancestors(node)
                .any(|n| tree.classes(n).any(|class| classes.contains(class)))
        })
    }

    fn is_reference_at(&self, text: &DnmStr<'_>, i: usize) -> bool {
        self.has_class_in(text, i, &self.reference_classes)
    }

    fn is_equation_at(&self, text: &DnmStr<'_>, i: usize) -> bool {
        self.has_class_in(text, i, &self.equation_classes)
    }
}

/// Split `text` into sentences with the default rules.
pub fn sentence_tokenize<'a>(text: &DnmStr<'a>) -> Vec<DnmStr<'a>> {
    SentenceTokenizer::new().tokenize(text)
}
