//! Input normalisation applied before every parse.
//!
//! A stream that contains a line-leading `<!--` would open an HTML block
//! that swallows the rest of the input until a closing `-->` arrives, which
//! in a live stream may be never. Escaping the comment opener with a
//! backslash turns it into plain paragraph text; the inline parser later
//! unescapes `\<` so the reader still sees the comment verbatim.
//!
//! The escape applies when `<!--` is the first content of a line, allowing
//! leading spaces and tabs. It is applied to the whole input, fenced code
//! included, mirroring the line-anchored rewrite this renderer has always
//! shipped with.

/// Escape line-leading `<!--` sequences with a backslash.
#[must_use]
pub fn normalize(input: &str) -> String {
    if !input.contains("<!--") {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len() + 8);
    for line in input.split_inclusive('\n') {
        let content = line.trim_start_matches([' ', '\t']);
        if content.starts_with("<!--") {
            let indent = line.len() - content.len();
            out.push_str(&line[..indent]);
            out.push('\\');
            out.push_str(content);
        } else {
            out.push_str(line);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
