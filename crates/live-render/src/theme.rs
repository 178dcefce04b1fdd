//! Styles and the render theme.
//!
//! A [`Style`] is a foreground color plus an attribute bitfield; a
//! [`Theme`] assigns one style per markdown node kind. The default theme
//! sticks to the 16 base ANSI colors so output adapts to the user's
//! terminal palette, and only semantically important pieces get color to
//! avoid visual noise.
//!
//! Styling is always applied per line: [`push_styled`] closes the SGR run
//! before every `\n` and reopens it after. The surface relies on this when
//! it truncates lines with erase-to-end-of-line, and it keeps every
//! emitted newline outside on/off pairs.

use bitflags::bitflags;
use live_term::ansi;

use crate::color::Color;

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

bitflags! {
    /// Text attributes as a compact bitfield, mapping directly to SGR
    /// parameters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1 — increased intensity.
        const BOLD          = 1 << 0;
        /// SGR 2 — decreased intensity (faint).
        const DIM           = 1 << 1;
        /// SGR 3 — italic or oblique.
        const ITALIC        = 1 << 2;
        /// SGR 4 — underline.
        const UNDERLINE     = 1 << 3;
        /// SGR 7 — swap foreground and background.
        const INVERSE       = 1 << 4;
        /// SGR 9 — crossed-out text.
        const STRIKETHROUGH = 1 << 5;
    }
}

/// SGR codes in bit order.
const ATTR_CODES: [(Attr, &str); 6] = [
    (Attr::BOLD, "1"),
    (Attr::DIM, "2"),
    (Attr::ITALIC, "3"),
    (Attr::UNDERLINE, "4"),
    (Attr::INVERSE, "7"),
    (Attr::STRIKETHROUGH, "9"),
];

// ---------------------------------------------------------------------------
// Style
// ---------------------------------------------------------------------------

/// A foreground color plus attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub fg: Color,
    pub attrs: Attr,
}

impl Style {
    /// A style with no color and no attributes.
    pub const PLAIN: Self = Self {
        fg: Color::Default,
        attrs: Attr::empty(),
    };

    #[must_use]
    pub const fn fg(color: Color) -> Self {
        Self {
            fg: color,
            attrs: Attr::empty(),
        }
    }

    #[must_use]
    pub const fn attrs(attrs: Attr) -> Self {
        Self {
            fg: Color::Default,
            attrs,
        }
    }

    #[must_use]
    pub const fn with_attrs(self, attrs: Attr) -> Self {
        Self {
            fg: self.fg,
            attrs: self.attrs.union(attrs),
        }
    }

    /// Whether applying this style emits no escape at all.
    #[inline]
    #[must_use]
    pub const fn is_plain(self) -> bool {
        self.fg.is_default() && self.attrs.is_empty()
    }

    /// Layer `over` on top of this style: attributes accumulate, a set
    /// foreground wins over an inherited one.
    #[must_use]
    pub fn merge(self, over: Self) -> Self {
        Self {
            fg: if over.fg.is_default() { self.fg } else { over.fg },
            attrs: self.attrs | over.attrs,
        }
    }

    /// The single combined SGR sequence turning this style on.
    #[must_use]
    pub fn on_sequence(self) -> String {
        if self.is_plain() {
            return String::new();
        }
        let mut out = String::from("\x1b[");
        let mut first = true;
        for (flag, code) in ATTR_CODES {
            if self.attrs.contains(flag) {
                if !first {
                    out.push(';');
                }
                out.push_str(code);
                first = false;
            }
        }
        if !self.fg.is_default() {
            if !first {
                out.push(';');
            }
            self.fg.push_fg_params(&mut out);
        }
        out.push('m');
        out
    }
}

/// Append `text` under `style`, opening and closing the style per line so
/// every `\n` stays outside SGR pairs. With `color` off (or a plain style)
/// the text passes through untouched.
pub fn push_styled(out: &mut String, text: &str, style: Style, color: bool) {
    if !color || style.is_plain() || text.is_empty() {
        out.push_str(text);
        return;
    }
    let on = style.on_sequence();
    for (i, segment) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if segment.is_empty() {
            continue;
        }
        out.push_str(&on);
        out.push_str(segment);
        out.push_str(ansi::SGR_RESET);
    }
}

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

/// One style per markdown node kind.
#[derive(Debug, Clone)]
pub struct Theme {
    pub heading: Style,
    pub strong: Style,
    pub emphasis: Style,
    pub strikethrough: Style,
    pub highlight: Style,
    pub inline_code: Style,
    pub link: Style,
    pub link_url: Style,
    pub image: Style,
    pub code_fence: Style,
    pub quote_marker: Style,
    pub list_marker: Style,
    pub table_border: Style,
    pub table_header: Style,
    pub rule: Style,
    pub html: Style,
    pub diff_add: Style,
    pub diff_remove: Style,
    pub diff_hunk: Style,
    pub diff_meta: Style,
}

impl Theme {
    /// The terminal-native theme: base ANSI colors only.
    #[must_use]
    pub fn terminal() -> Self {
        use Color::Ansi256;
        Self {
            heading: Style::fg(Ansi256(6)).with_attrs(Attr::BOLD),
            strong: Style::attrs(Attr::BOLD),
            emphasis: Style::attrs(Attr::ITALIC),
            strikethrough: Style::attrs(Attr::STRIKETHROUGH),
            highlight: Style::attrs(Attr::INVERSE),
            inline_code: Style::fg(Ansi256(3)),
            link: Style::fg(Ansi256(4)).with_attrs(Attr::UNDERLINE),
            link_url: Style::attrs(Attr::DIM),
            image: Style::fg(Ansi256(5)),
            code_fence: Style::fg(Ansi256(8)),
            quote_marker: Style::fg(Ansi256(2)),
            list_marker: Style::fg(Ansi256(6)),
            table_border: Style::fg(Ansi256(8)),
            table_header: Style::attrs(Attr::BOLD),
            rule: Style::fg(Ansi256(8)),
            html: Style::fg(Ansi256(8)),
            // Diff colors are the conventional red/green pair.
            diff_add: Style::fg(Ansi256(2)),
            diff_remove: Style::fg(Ansi256(1)),
            diff_hunk: Style::fg(Ansi256(6)),
            diff_meta: Style::attrs(Attr::BOLD),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::terminal()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
