// SPDX-License-Identifier: MIT
//
// Viewport clipping — keep only the trailing lines of a render.
//
// During streaming the full render grows without bound, but the patch only
// needs to cover what fits on screen. Clipping to the trailing N lines
// bounds the screen footprint; the unclipped render is retained elsewhere
// so the final state can be printed in full after the stream ends.

/// The trailing `height` lines of `text`, rejoined with a final newline.
///
/// A trailing empty segment (from the final `\n`) does not count as a
/// line. `None` or a non-positive height yields the text unclipped.
#[must_use]
pub fn clip_tail(text: &str, height: Option<usize>) -> String {
    let Some(height) = height.filter(|&h| h > 0) else {
        return text.to_string();
    };
    let mut lines: Vec<&str> = text.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    let start = lines.len().saturating_sub(height);
    let mut out = lines[start..].join("\n");
    out.push('\n');
    out
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_height_is_identity() {
        assert_eq!(clip_tail("a\nb\nc\n", None), "a\nb\nc\n");
        assert_eq!(clip_tail("a\nb\nc\n", Some(0)), "a\nb\nc\n");
    }

    #[test]
    fn clips_to_trailing_lines() {
        assert_eq!(clip_tail("a\nb\nc\nd\n", Some(2)), "c\nd\n");
    }

    #[test]
    fn short_text_passes_through() {
        assert_eq!(clip_tail("a\nb\n", Some(5)), "a\nb\n");
    }

    #[test]
    fn trailing_newline_does_not_count_as_a_line() {
        // Three lines, not four.
        assert_eq!(clip_tail("a\nb\nc\n", Some(3)), "a\nb\nc\n");
    }

    #[test]
    fn missing_final_newline_gains_one() {
        assert_eq!(clip_tail("a\nb", Some(1)), "b\n");
    }

    #[test]
    fn empty_input_yields_single_newline() {
        assert_eq!(clip_tail("", Some(3)), "\n");
    }

    #[test]
    fn blank_interior_lines_count() {
        assert_eq!(clip_tail("a\n\nb\n", Some(2)), "\nb\n");
    }
}
