// SPDX-License-Identifier: MIT
//
// Anchored text surface — the in-memory mirror of what is on screen.
//
// The surface owns the text the terminal should currently display and turns
// every mutation into a *patch*: a string of text interleaved with ANSI
// control sequences that transitions the visible state from the previous
// text to the next. Callers write patches to their terminal verbatim, in
// order; the surface never touches an output stream itself.
//
// The trick that keeps patches cheap is the anchor. On first output the
// surface plants an origin (either the saved cursor position or absolute
// screen home) and every later patch starts by returning there. Rewriting
// from an edit point to the end of the text is almost always shorter than a
// character-level diff, and it is robust against wide glyphs because the
// terminal re-lays-out whatever we resend.
//
// Two decorations keep partial rewrites clean:
//
//   - Erase-to-end-of-line before every `\n`, so a shorter replacement
//     leaves no remnant of the longer line it overwrote.
//   - Erase-to-end-of-screen after a rewrite, clearing rows below the last
//     written line.

use crate::ansi;
use crate::scan::{self, Position, Range};

// ─── Anchor ──────────────────────────────────────────────────────────────────

/// Where the surface's origin lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    /// Save/restore the cursor position (DEC and CSI dialects in tandem).
    /// The stream composes wherever the cursor happened to be.
    #[default]
    Cursor,
    /// Absolute screen home. Required inside an alternate screen or when
    /// the emulator's save-point is unreliable.
    Home,
}

// ─── Surface ─────────────────────────────────────────────────────────────────

/// The anchored text surface.
///
/// Invariants: once anchored, every emitted patch begins by returning the
/// cursor to the origin; after applying all emitted patches in order, a
/// conforming terminal displays exactly [`text`](Self::text).
#[derive(Debug, Clone)]
pub struct Surface {
    text: String,
    anchor: Anchor,
    anchored: bool,
}

impl Surface {
    /// Create an empty, not-yet-anchored surface.
    #[must_use]
    pub fn new(anchor: Anchor) -> Self {
        Self {
            text: String::new(),
            anchor,
            anchored: false,
        }
    }

    /// The text the terminal should currently display.
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the origin has been planted.
    #[inline]
    #[must_use]
    pub const fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Plant the origin without writing any text.
    ///
    /// For [`Anchor::Cursor`] the patch returns to column 1 first so the
    /// saved origin is a line start regardless of where the prompt left
    /// the cursor.
    pub fn begin(&mut self) -> String {
        self.anchored = true;
        self.begin_patch()
    }

    /// Replace the whole text.
    pub fn set_text(&mut self, next: &str) -> String {
        let mut patch = String::with_capacity(next.len() + 16);
        if self.anchored {
            self.push_origin_return(&mut patch);
            push_decorated(&mut patch, next);
            patch.push_str(ansi::ERASE_DOWN);
        } else {
            self.anchored = true;
            patch.push_str(&self.begin_patch());
            push_decorated(&mut patch, next);
        }
        self.text.clear();
        self.text.push_str(next);
        patch
    }

    /// Append to the tail. Assumes the cursor currently rests at the tail,
    /// which holds whenever the caller applies patches in order.
    pub fn append(&mut self, delta: &str) -> String {
        let mut patch = String::with_capacity(delta.len() + 8);
        if !self.anchored {
            self.anchored = true;
            patch.push_str(&self.begin_patch());
        }
        patch.push_str(delta);
        self.text.push_str(delta);
        patch
    }

    /// Insert text at a position, rewriting from the insertion point.
    pub fn insert(&mut self, at: Position, insertion: &str) -> String {
        let i = scan::pos_to_index(&self.text, at);
        let mut next = String::with_capacity(self.text.len() + insertion.len());
        next.push_str(&self.text[..i]);
        next.push_str(insertion);
        next.push_str(&self.text[i..]);

        if !self.anchored {
            return self.set_text(&next);
        }
        let mut patch = String::new();
        self.push_move_to(&mut patch, at);
        push_decorated(&mut patch, &next[i..]);
        patch.push_str(ansi::ERASE_DOWN);
        self.text = next;
        patch
    }

    /// Replace an inclusive position range, rewriting from the start of the
    /// replaced span.
    pub fn replace(&mut self, range: Range, replacement: &str) -> String {
        let (s, e) = self.byte_span(range);
        let mut next = String::with_capacity(self.text.len() + replacement.len());
        next.push_str(&self.text[..s]);
        next.push_str(replacement);
        next.push_str(&self.text[e..]);

        if !self.anchored {
            return self.set_text(&next);
        }
        let at = scan::index_to_pos(&next, s);
        let mut patch = String::new();
        self.push_move_to(&mut patch, at);
        push_decorated(&mut patch, &next[s..]);
        patch.push_str(ansi::ERASE_DOWN);
        self.text = next;
        patch
    }

    /// Delete an inclusive position range.
    pub fn delete(&mut self, range: Range) -> String {
        self.replace(range, "")
    }

    /// Replace the whole text when only the part at or after `from`
    /// differs. The caller guarantees `next` agrees with the current text
    /// on every byte before `from`; the patch rewrites just the tail.
    ///
    /// Falls back to a full [`set_text`](Self::set_text) when the surface
    /// is not yet anchored or the split point is not a char boundary in
    /// `next` (a broken precondition).
    pub fn set_text_from(&mut self, next: &str, from: Position) -> String {
        if !self.anchored {
            return self.set_text(next);
        }
        let i = scan::pos_to_index(&self.text, from);
        let Some(tail) = next.get(i..) else {
            return self.set_text(next);
        };
        let mut patch = String::with_capacity(tail.len() + 16);
        self.push_move_to(&mut patch, from);
        push_decorated(&mut patch, tail);
        patch.push_str(ansi::ERASE_DOWN);
        self.text.clear();
        self.text.push_str(next);
        patch
    }

    /// Forget everything: empty text, anchor not planted. Emits nothing.
    pub fn reset(&mut self) {
        self.text.clear();
        self.anchored = false;
    }

    // ── Patch fragments ─────────────────────────────────────────────

    /// The prologue that plants the origin.
    fn begin_patch(&self) -> String {
        match self.anchor {
            Anchor::Cursor => format!("\r{}", ansi::SAVE_CURSOR),
            Anchor::Home => ansi::CURSOR_HOME.to_string(),
        }
    }

    /// Return the cursor to the origin.
    fn push_origin_return(&self, patch: &mut String) {
        match self.anchor {
            Anchor::Cursor => patch.push_str(ansi::RESTORE_CURSOR),
            Anchor::Home => patch.push_str(ansi::CURSOR_HOME),
        }
    }

    /// Origin return plus relative movement to `p`.
    fn push_move_to(&self, patch: &mut String, p: Position) {
        self.push_origin_return(patch);
        if p.line > 1 {
            ansi::cursor_down(patch, p.line - 1);
            patch.push('\r');
        }
        if p.column > 1 {
            ansi::cursor_forward(patch, p.column - 1);
        }
    }

    /// Normalise an inclusive range to a `[start, end)` byte interval.
    fn byte_span(&self, range: Range) -> (usize, usize) {
        let s = scan::pos_to_index(&self.text, range.start);
        // One past the character at the inclusive end position.
        let after_end = Position::new(range.end.line, range.end.column + 1);
        let e = scan::pos_to_index(&self.text, after_end).max(s);
        (s, e)
    }
}

/// Append `text` with erase-to-end-of-line inserted before every `\n`.
fn push_decorated(patch: &mut String, text: &str) {
    let mut rest = text;
    while let Some(nl) = rest.find('\n') {
        patch.push_str(&rest[..nl]);
        patch.push_str(ansi::ERASE_LINE);
        patch.push('\n');
        rest = &rest[nl + 1..];
    }
    patch.push_str(rest);
}

// ─── Tests ───────────────────────────────────────────────────────────────────
