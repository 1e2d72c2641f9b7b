use super::{Dnm, Side, TextSlot, Token};
use std::fmt::Write;
use unicode_width::UnicodeWidthChar;

/// Visible stand-ins for characters that would break the layout.
fn display_char(c: char) -> char {
    match c {
        '\n' => '↵',
        '\t' => '→',
        '\r' => '␍',
        c => c,
    }
}

/// Internal representation of a marker line below the flat string.
struct Marker {
    start_col: usize,
    end_col: usize,
    label: String,
}

/// Renders a projection as its flat string followed by one marker line per
/// token, naming the text slot or node the token is anchored at.
pub struct DnmDisplay<'a> {
    dnm: &'a Dnm,
    show_pending: bool,
}

// abc MathNode nope
// ╰──╯<a>.text
//     ╰──────╯<math> => MathNode
//             ╰───╯<math>.tail
//       ╰Before(<d>Inserted</d>)
impl<'a> std::fmt::Display for DnmDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // char index -> display column
        let mut columns = Vec::with_capacity(self.dnm.len() + 1);
        let mut opening_line = String::new();
        let mut width = 0;
        for c in self.dnm.flat_string().chars() {
            columns.push(width);
            let shown = display_char(c);
            opening_line.push(shown);
            width += UnicodeWidthChar::width(shown).unwrap_or(0);
        }
        columns.push(width);

        f.write_str(&opening_line)?;

        for marker in self.markers(&columns) {
            f.write_char('\n')?;

            for _ in 0..marker.start_col {
                f.write_char(' ')?;
            }

            f.write_char('╰')?;

            let char_len = marker.end_col - marker.start_col;
            for _ in (marker.start_col + 1)..marker.end_col.saturating_sub(1) {
                f.write_char('─')?;
            }

            if char_len > 1 {
                f.write_char('╯')?;
            }

            f.write_str(&marker.label)?;
        }

        Ok(())
    }
}

impl<'a> DnmDisplay<'a> {
    pub fn new(dnm: &'a Dnm) -> Self {
        DnmDisplay {
            dnm,
            show_pending: false,
        }
    }

    /// Also render queued insertions, in registration order.
    pub fn include_pending(&mut self) {
        self.show_pending = true;
    }

    /// Takes self
    pub fn with_pending(mut self) -> Self {
        self.include_pending();
        self
    }

    fn markers(&self, columns: &[usize]) -> Vec<Marker> {
        let tree = self.dnm.tree();
        let column = |pos: usize| columns.get(pos).copied().unwrap_or(0);
        let mut markers = Vec::new();

        for token in self.dnm.tokens() {
            let start = token.start_pos();
            let end = start + token.content().chars().count();
            let label = match token {
                Token::Text {
                    node,
                    slot: TextSlot::Leading,
                    ..
                } => format!("<{}>.text", tree.tag(*node)),
                Token::Text {
                    node,
                    slot: TextSlot::Trailing,
                    ..
                } => format!("<{}>.tail", tree.tag(*node)),
                Token::Node {
                    node, placeholder, ..
                } => format!("<{}> => {}", tree.tag(*node), placeholder),
            };
            markers.push(Marker {
                start_col: column(start),
                end_col: column(end),
                label,
            });
        }

        if self.show_pending {
            for insertion in self.dnm.pending() {
                let side = match insertion.side {
                    Side::Before => "Before",
                    Side::After => "After",
                };
                let mut label = String::new();
                let _ = write!(label, "{}({})", side, tree.serialize(insertion.node));
                markers.push(Marker {
                    start_col: column(insertion.pos),
                    end_col: column(insertion.pos + 1),
                    label,
                });
            }
        }

        markers
    }
}
