//! Visual markers for tokenizer output, written back into the document.
//!
//! A highlighted piece of text is wrapped in bracket markers
//! (`<span style="color:..;font-size:..%">[</span>` ... `]`), optionally
//! followed by a superscript label. Markers for nested pieces nest
//! correctly as long as outer pieces are highlighted before inner ones.

use layered_dnm::{Dnm, DnmResult, DnmStr, NodeId, Side};

/// First and last flat string offsets covered by a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub first: usize,
    pub last: usize,
}

impl Span {
    /// `None` for an empty view.
    pub fn of(text: &DnmStr<'_>) -> Option<Span> {
        Some(Span {
            first: *text.backrefs().first()?,
            last: *text.backrefs().last()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Highlighter {
    color: String,
    /// Percent
    font_size: u32,
    label: Option<String>,
}

impl Highlighter {
    pub fn new(color: impl Into<String>) -> Self {
        Highlighter {
            color: color.into(),
            font_size: 100,
            label: None,
        }
    }

    pub fn with_font_size(mut self, percent: u32) -> Self {
        self.font_size = percent;
        self
    }

    /// Add a superscript label after the closing bracket.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Queue the markers for `span` on `dnm`. Nothing changes in the tree
    /// until the next flush.
    pub fn highlight(&self, dnm: &mut Dnm, span: Span) -> DnmResult<()> {
        // same-offset "after" insertions registered later sit nearer the
        // text, so the label goes first
        if let Some(label) = &self.label {
            let sup = dnm.new_element("sup");
            dnm.set_attr(sup, "style", format!("color:{}", self.color))?;
            dnm.set_text(sup, label.as_str())?;
            dnm.add_node(sup, span.last, Side::After);
        }

        let open = self.bracket(dnm, "[")?;
        dnm.add_node(open, span.first, Side::Before);
        let close = self.bracket(dnm, "]")?;
        dnm.add_node(close, span.last, Side::After);
        Ok(())
    }

    fn bracket(&self, dnm: &mut Dnm, text: &str) -> DnmResult<NodeId> {
        let node = dnm.new_element("span");
        dnm.set_attr(
            node,
            "style",
            format!("color:{};font-size:{}%", self.color, self.font_size),
        )?;
        dnm.set_text(node, text)?;
        Ok(node)
    }
}

/// Queue plain bracket markers in `color` around `span`.
pub fn highlight(dnm: &mut Dnm, span: Span, color: &str) -> DnmResult<()> {
    Highlighter::new(color).highlight(dnm, span)
}
