//! Terminal colors with compact SGR encoding.
//!
//! Standard colors use the short SGR codes (30-37 for the first eight,
//! 90-97 for the bright variants), palette indexes 16-255 use the extended
//! `38;5;N` form, and 24-bit color uses `38;2;R;G;B`. Shorter sequences
//! matter here: every styled span in every patch carries them.

use std::fmt::Write;

/// A foreground color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    /// The terminal's default foreground.
    #[default]
    Default,
    /// An entry of the 256-color palette. 0-15 map to the user's base
    /// palette so themes adapt to the terminal.
    Ansi256(u8),
    /// 24-bit true color.
    Rgb(u8, u8, u8),
}

impl Color {
    /// Whether this is the terminal default (no sequence needed).
    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }

    /// Append the SGR parameter(s) selecting this color as foreground.
    ///
    /// Appends nothing for [`Color::Default`]; callers emit a reset
    /// instead of selecting the default explicitly.
    pub fn push_fg_params(self, out: &mut String) {
        match self {
            Self::Default => {}
            Self::Ansi256(idx) => {
                if idx < 8 {
                    let _ = write!(out, "{}", 30 + u16::from(idx));
                } else if idx < 16 {
                    let _ = write!(out, "{}", 82 + u16::from(idx));
                } else {
                    let _ = write!(out, "38;5;{idx}");
                }
            }
            Self::Rgb(r, g, b) => {
                let _ = write!(out, "38;2;{r};{g};{b}");
            }
        }
    }

    /// The complete escape sequence selecting this color, or an empty
    /// string for the default.
    #[must_use]
    pub fn fg_sequence(self) -> String {
        if self.is_default() {
            return String::new();
        }
        let mut out = String::from("\x1b[");
        self.push_fg_params(&mut out);
        out.push('m');
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
