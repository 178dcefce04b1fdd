//! Inline parsing: the content of headings, paragraphs and table cells.
//!
//! A single left-to-right scan with literal fallback. Every construct needs
//! its closing delimiter within the same span; when the closer is missing
//! the opener stays plain text. That fallback is what keeps a half-arrived
//! stream readable: `**bo` renders literally until the closing `**` shows
//! up, at which point the re-parse upgrades it to strong emphasis.
//!
//! Supported: backslash escapes of ASCII punctuation, backtick code spans
//! (matched run lengths), `**strong**` / `__strong__`, `*emphasis*` /
//! `_emphasis_`, `~~strikethrough~~`, `==highlight==`, `[text](url)`,
//! `![alt](url)`, hard breaks (two trailing spaces or a trailing
//! backslash). Soft breaks stay as newlines in the text.

use crate::node::Node;

/// Parse inline markdown into a node list.
#[must_use]
pub fn parse(text: &str) -> Vec<Node> {
    let mut out = Vec::new();
    let mut plain = String::new();
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];
        let Some(c) = rest.chars().next() else { break };

        match c {
            '\\' => {
                let mut tail = rest[1..].chars();
                match tail.next() {
                    Some('\n') => {
                        flush(&mut out, &mut plain);
                        out.push(Node::HardBreak);
                        i += 2;
                    }
                    Some(esc) if esc.is_ascii_punctuation() => {
                        plain.push(esc);
                        i += 1 + esc.len_utf8();
                    }
                    _ => {
                        plain.push('\\');
                        i += 1;
                    }
                }
            }
            '`' => {
                let run = rest.chars().take_while(|&ch| ch == '`').count();
                if let Some((code, len)) = code_span(rest, run) {
                    flush(&mut out, &mut plain);
                    out.push(Node::InlineCode { code });
                    i += len;
                } else {
                    plain.push_str(&rest[..run]);
                    i += run;
                }
            }
            '*' | '_' => {
                i += emphasis(rest, c, &mut out, &mut plain);
            }
            '~' => {
                let n = paired(rest, "~~", &mut out, &mut plain, |children| {
                    Node::Strikethrough { children }
                });
                if n > 0 {
                    i += n;
                } else {
                    plain.push('~');
                    i += 1;
                }
            }
            '=' => {
                let n = paired(rest, "==", &mut out, &mut plain, |children| {
                    Node::Highlight { children }
                });
                if n > 0 {
                    i += n;
                } else {
                    plain.push('=');
                    i += 1;
                }
            }
            '[' => {
                if let Some((node, len)) = link(rest) {
                    flush(&mut out, &mut plain);
                    out.push(node);
                    i += len;
                } else {
                    plain.push('[');
                    i += 1;
                }
            }
            '!' => {
                if let Some((node, len)) = image(rest) {
                    flush(&mut out, &mut plain);
                    out.push(node);
                    i += len;
                } else {
                    plain.push('!');
                    i += 1;
                }
            }
            '\n' => {
                if plain.ends_with("  ") {
                    while plain.ends_with(' ') {
                        plain.pop();
                    }
                    flush(&mut out, &mut plain);
                    out.push(Node::HardBreak);
                } else {
                    plain.push('\n');
                }
                i += 1;
            }
            '\r' => i += 1,
            _ => {
                plain.push(c);
                i += c.len_utf8();
            }
        }
    }

    flush(&mut out, &mut plain);
    out
}

/// Move accumulated plain text into the output as a `Text` node.
fn flush(out: &mut Vec<Node>, plain: &mut String) {
    if !plain.is_empty() {
        out.push(Node::Text {
            text: std::mem::take(plain),
        });
    }
}

/// A backtick code span starting at the head of `rest` with an opening run
/// of `run` backticks. Returns the code and consumed length.
fn code_span(rest: &str, run: usize) -> Option<(String, usize)> {
    let fence = &rest[..run];
    let body = &rest[run..];
    let mut search = 0;
    while let Some(found) = body[search..].find(fence) {
        let at = search + found;
        // The closing run must be exactly `run` long, not part of a longer one.
        let after = body[at + run..].starts_with('`');
        let before = at > 0 && body[..at].ends_with('`');
        if !after && !before {
            let code = body[..at].to_string();
            if code.contains('\n') {
                return None; // spans don't cross lines here
            }
            return Some((code, run + at + run));
        }
        search = at + 1;
    }
    None
}

/// Strong (`**`/`__`) or emphasis (`*`/`_`) at the head of `rest`.
/// Returns the number of bytes consumed (at least 1).
fn emphasis(rest: &str, marker: char, out: &mut Vec<Node>, plain: &mut String) -> usize {
    let double: String = [marker, marker].iter().collect();
    if rest.starts_with(&double) {
        let n = paired(rest, &double, out, plain, |children| Node::Strong { children });
        if n > 0 {
            return n;
        }
        // No closer: both marker chars stay literal.
        plain.push(marker);
        plain.push(marker);
        return 2;
    }
    let single = marker.to_string();
    let n = paired(rest, &single, out, plain, |children| Node::Emphasis { children });
    if n > 0 {
        return n;
    }
    plain.push(marker);
    1
}

/// A delimited span `<delim>content<delim>` at the head of `rest`.
///
/// On a match, flushes `plain`, pushes `build(inner nodes)` and returns the
/// consumed byte length. Returns 0 when the head is not a complete,
/// non-empty span; the caller emits the literal fallback.
fn paired(
    rest: &str,
    delim: &str,
    out: &mut Vec<Node>,
    plain: &mut String,
    build: impl FnOnce(Vec<Node>) -> Node,
) -> usize {
    if !rest.starts_with(delim) {
        return 0;
    }
    let body = &rest[delim.len()..];
    let close = match body.find(delim) {
        Some(c) if c > 0 => c,
        _ => return 0,
    };
    flush(out, plain);
    out.push(build(parse(&body[..close])));
    delim.len() + close + delim.len()
}

/// `[text](url)` at the head of `rest`.
fn link(rest: &str) -> Option<(Node, usize)> {
    let (inner, after_bracket) = bracketed(rest)?;
    let (href, len) = parenthesised(&rest[after_bracket..])?;
    Some((
        Node::Link {
            href,
            children: parse(inner),
        },
        after_bracket + len,
    ))
}

/// `![alt](url)` at the head of `rest`.
fn image(rest: &str) -> Option<(Node, usize)> {
    if !rest.starts_with("![") {
        return None;
    }
    let (inner, after_bracket) = bracketed(&rest[1..])?;
    let (href, len) = parenthesised(&rest[1 + after_bracket..])?;
    Some((
        Node::Image {
            alt: inner.to_string(),
            href,
        },
        1 + after_bracket + len,
    ))
}

/// The bracketed label at the head of `rest` (`rest` starts with `[`).
/// Returns the inner text and the byte index just past the `]`.
fn bracketed(rest: &str) -> Option<(&str, usize)> {
    let mut depth = 0usize;
    for (i, c) in rest.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some((&rest[1..i], i + 1));
                }
            }
            '\n' => return None,
            _ => {}
        }
    }
    None
}

/// The parenthesised destination at the head of `rest`.
fn parenthesised(rest: &str) -> Option<(String, usize)> {
    if !rest.starts_with('(') {
        return None;
    }
    let close = rest.find(')')?;
    let href = rest[1..close].trim().to_string();
    if href.contains('\n') {
        return None;
    }
    Some((href, close + 1))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
