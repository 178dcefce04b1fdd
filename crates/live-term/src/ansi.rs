// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure building blocks for patch strings. No state, no decisions about when
// to emit; the surface and session decide that. This module just knows the
// byte-level encoding of every terminal command we need.
//
// Everything is 7-bit (`\x1b` + byte(s)). Cursor save/restore deliberately
// emits both the DEC private sequences (`ESC 7` / `ESC 8`) and the CSI pair
// (`CSI s` / `CSI u`): some terminals recognise only one dialect, and the
// redundant form is harmless on the rest.
//
// Parameterised movement counts are clamped to >= 1, matching how terminals
// interpret a missing or zero parameter.

use std::fmt::Write;

// ─── Fixed sequences ─────────────────────────────────────────────────────────

/// Save the cursor position (DEC `ESC 7` + CSI `s`, in tandem).
pub const SAVE_CURSOR: &str = "\x1b7\x1b[s";

/// Restore the cursor position (DEC `ESC 8` + CSI `u`, in tandem).
pub const RESTORE_CURSOR: &str = "\x1b8\x1b[u";

/// Move the cursor to the top-left corner (CUP with no parameters).
pub const CURSOR_HOME: &str = "\x1b[H";

/// Erase from the cursor to the end of the screen (ED 0).
pub const ERASE_DOWN: &str = "\x1b[J";

/// Erase from the cursor to the end of the line (EL 0).
pub const ERASE_LINE: &str = "\x1b[K";

/// Clear the entire screen (ED 2). Cursor position is unchanged.
pub const CLEAR_SCREEN: &str = "\x1b[2J";

/// Erase the scrollback buffer (ED 3, xterm extension).
pub const ERASE_SCROLLBACK: &str = "\x1b[3J";

/// Hide the cursor (DECTCEM reset).
pub const CURSOR_HIDE: &str = "\x1b[?25l";

/// Show the cursor (DECTCEM set).
pub const CURSOR_SHOW: &str = "\x1b[?25h";

/// Switch to the alternate screen buffer.
pub const ALT_SCREEN_ENTER: &str = "\x1b[?1049h";

/// Return to the main screen buffer.
pub const ALT_SCREEN_EXIT: &str = "\x1b[?1049l";

/// Begin a synchronised update (DEC 2026). The terminal buffers output
/// until the matching end, preventing half-painted frames.
pub const SYNC_BEGIN: &str = "\x1b[?2026h";

/// End a synchronised update.
pub const SYNC_END: &str = "\x1b[?2026l";

/// Reset all SGR attributes to terminal defaults (SGR 0).
pub const SGR_RESET: &str = "\x1b[0m";

// ─── Parameterised movement ──────────────────────────────────────────────────

/// Append "move the cursor down `n` rows" (CUD) to `out`.
#[inline]
pub fn cursor_down(out: &mut String, n: usize) {
    let _ = write!(out, "\x1b[{}B", n.max(1));
}

/// Append "move the cursor right `n` columns" (CUF) to `out`.
#[inline]
pub fn cursor_forward(out: &mut String, n: usize) {
    let _ = write!(out, "\x1b[{}C", n.max(1));
}

/// Append "move the cursor to the start of the line `n` rows down" (CNL).
#[inline]
pub fn cursor_next_line(out: &mut String, n: usize) {
    let _ = write!(out, "\x1b[{}E", n.max(1));
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_restore_carry_both_dialects() {
        assert!(SAVE_CURSOR.contains('\x1b'));
        assert!(SAVE_CURSOR.starts_with("\x1b7"));
        assert!(SAVE_CURSOR.ends_with("\x1b[s"));
        assert!(RESTORE_CURSOR.starts_with("\x1b8"));
        assert!(RESTORE_CURSOR.ends_with("\x1b[u"));
    }

    #[test]
    fn movement_emits_count() {
        let mut s = String::new();
        cursor_down(&mut s, 3);
        assert_eq!(s, "\x1b[3B");

        s.clear();
        cursor_forward(&mut s, 12);
        assert_eq!(s, "\x1b[12C");

        s.clear();
        cursor_next_line(&mut s, 2);
        assert_eq!(s, "\x1b[2E");
    }

    #[test]
    fn movement_clamps_zero_to_one() {
        let mut s = String::new();
        cursor_down(&mut s, 0);
        assert_eq!(s, "\x1b[1B");

        s.clear();
        cursor_forward(&mut s, 0);
        assert_eq!(s, "\x1b[1C");
    }

    #[test]
    fn sync_pair_matches() {
        assert_eq!(SYNC_BEGIN, "\x1b[?2026h");
        assert_eq!(SYNC_END, "\x1b[?2026l");
    }
}
