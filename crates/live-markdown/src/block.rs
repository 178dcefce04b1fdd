//! Block parsing: the line-level structure of the document.
//!
//! The whole accumulated stream is re-parsed on every chunk, so the parser
//! is a straightforward single pass over lines with no incremental state.
//! Containers (quotes, list items) collect their inner lines, strip the
//! marker/indent, and recurse through [`blocks_of`].
//!
//! The one streaming-specific rule lives in fenced code handling: a fence
//! that never closes consumes the rest of the input and is reported as a
//! single code block with `loading = true`. By construction it is the last
//! block in the document.

use crate::inline;
use crate::node::{Alignment, Node};

/// Parse a (normalised) markdown string into a document node.
#[must_use]
pub fn parse(input: &str) -> Node {
    Node::Document {
        children: blocks_of(input),
    }
}

/// Parse a stretch of source into block nodes.
fn blocks_of(input: &str) -> Vec<Node> {
    let lines: Vec<&str> = input.split_inclusive('\n').collect();
    let mut nodes = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = content_of(lines[i]);
        if line.trim().is_empty() {
            i += 1;
            continue;
        }
        if let Some((node, next)) = fenced_code(&lines, i) {
            nodes.push(node);
            i = next;
        } else if thematic_break(line) {
            nodes.push(Node::ThematicBreak);
            i += 1;
        } else if let Some(node) = heading(line) {
            nodes.push(node);
            i += 1;
        } else if quote_line(line).is_some() {
            let (node, next) = block_quote(&lines, i);
            nodes.push(node);
            i = next;
        } else if let Some((node, next)) = table(&lines, i) {
            nodes.push(node);
            i = next;
        } else if list_marker(line).is_some() {
            let (node, next) = list(&lines, i);
            nodes.push(node);
            i = next;
        } else if html_start(line) {
            let (node, next) = html_block(&lines, i);
            nodes.push(node);
            i = next;
        } else {
            let (node, next) = paragraph(&lines, i);
            nodes.push(node);
            i = next;
        }
    }
    nodes
}

/// The line without its trailing `\n` (and `\r`, for CRLF input).
fn content_of(raw: &str) -> &str {
    let s = raw.strip_suffix('\n').unwrap_or(raw);
    s.strip_suffix('\r').unwrap_or(s)
}

// ---------------------------------------------------------------------------
// Fenced code
// ---------------------------------------------------------------------------

/// An opening code fence: the fence char, run length, and info string.
fn fence_open(line: &str) -> Option<(char, usize, &str)> {
    let t = line.trim_start_matches(' ');
    if line.len() - t.len() > 3 {
        return None;
    }
    let c = t.chars().next()?;
    if c != '`' && c != '~' {
        return None;
    }
    let run = t.chars().take_while(|&x| x == c).count();
    if run < 3 {
        return None;
    }
    let info = t[run..].trim();
    if c == '`' && info.contains('`') {
        return None;
    }
    Some((c, run, info))
}

fn fenced_code(lines: &[&str], i: usize) -> Option<(Node, usize)> {
    let (fence, run, info) = fence_open(content_of(lines[i]))?;
    let language = info
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_string();

    let mut code = String::new();
    let mut j = i + 1;
    let mut closed = false;
    while j < lines.len() {
        let line = content_of(lines[j]);
        let t = line.trim_start();
        let close_run = t.chars().take_while(|&x| x == fence).count();
        if close_run >= run && t[close_run..].trim().is_empty() {
            closed = true;
            j += 1;
            break;
        }
        code.push_str(lines[j]);
        j += 1;
    }

    let diff = matches!(language.as_str(), "diff" | "patch");
    Some((
        Node::CodeBlock {
            language,
            code,
            loading: !closed,
            diff,
        },
        j,
    ))
}

// ---------------------------------------------------------------------------
// Leaf blocks
// ---------------------------------------------------------------------------

/// Three or more of the same `-`, `*` or `_`, nothing else but spaces.
fn thematic_break(line: &str) -> bool {
    let mut kind = None;
    let mut count = 0;
    for c in line.trim().chars() {
        if c == ' ' || c == '\t' {
            continue;
        }
        if !matches!(c, '-' | '*' | '_') {
            return false;
        }
        match kind {
            None => kind = Some(c),
            Some(k) if k == c => {}
            _ => return false,
        }
        count += 1;
    }
    count >= 3
}

/// An ATX heading: 1-6 `#` followed by a space (or end of line).
fn heading(line: &str) -> Option<Node> {
    let t = line.trim_start_matches(' ');
    if line.len() - t.len() > 3 {
        return None;
    }
    let level = t.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &t[level..];
    if !(rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t')) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)] // level <= 6
    let level = level as u8;
    Some(Node::Heading {
        level,
        children: inline::parse(rest.trim()),
    })
}

fn html_start(line: &str) -> bool {
    let t = line.trim_start();
    let mut chars = t.chars();
    if chars.next() != Some('<') {
        return false;
    }
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || matches!(c, '!' | '/' | '?'))
}

fn html_block(lines: &[&str], i: usize) -> (Node, usize) {
    let mut raw = String::new();
    let mut j = i;
    while j < lines.len() {
        if content_of(lines[j]).trim().is_empty() {
            break;
        }
        raw.push_str(lines[j]);
        j += 1;
    }
    while raw.ends_with('\n') {
        raw.pop();
    }
    (Node::HtmlBlock { raw }, j)
}

fn paragraph(lines: &[&str], i: usize) -> (Node, usize) {
    let mut text = String::new();
    let mut j = i;
    while j < lines.len() {
        let line = content_of(lines[j]);
        if line.trim().is_empty() {
            break;
        }
        if j > i && interrupts_paragraph(lines, j) {
            break;
        }
        text.push_str(lines[j]);
        j += 1;
    }
    let trimmed = text.strip_suffix('\n').unwrap_or(&text);
    (
        Node::Paragraph {
            children: inline::parse(trimmed),
        },
        j,
    )
}

/// Whether the line at `j` starts a construct that cuts a paragraph short.
fn interrupts_paragraph(lines: &[&str], j: usize) -> bool {
    let line = content_of(lines[j]);
    fence_open(line).is_some()
        || thematic_break(line)
        || heading(line).is_some()
        || quote_line(line).is_some()
        || list_marker(line).is_some()
        || html_start(line)
        || table_starts(lines, j)
}

// ---------------------------------------------------------------------------
// Block quotes
// ---------------------------------------------------------------------------

/// The content after a `>` marker, if the line carries one.
fn quote_line(line: &str) -> Option<&str> {
    let t = line.trim_start_matches(' ');
    if line.len() - t.len() > 3 {
        return None;
    }
    let rest = t.strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

fn block_quote(lines: &[&str], i: usize) -> (Node, usize) {
    let mut inner = String::new();
    let mut j = i;
    while j < lines.len() {
        let Some(rest) = quote_line(content_of(lines[j])) else {
            break;
        };
        inner.push_str(rest);
        inner.push('\n');
        j += 1;
    }
    (
        Node::BlockQuote {
            children: blocks_of(&inner),
        },
        j,
    )
}

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

struct Marker {
    indent: usize,
    ordered: bool,
    number: u64,
    /// Byte offset into the line where the item's content starts.
    content_start: usize,
}

fn list_marker(line: &str) -> Option<Marker> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    let rest = &line[indent..];
    let bytes = rest.as_bytes();
    let first = *bytes.first()?;

    if matches!(first, b'-' | b'*' | b'+') {
        return match bytes.get(1) {
            None => Some(Marker {
                indent,
                ordered: false,
                number: 1,
                content_start: line.len(),
            }),
            Some(b' ') => Some(Marker {
                indent,
                ordered: false,
                number: 1,
                content_start: indent + 2,
            }),
            _ => None,
        };
    }

    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if (1..=9).contains(&digits) {
        let number: u64 = rest[..digits].parse().unwrap_or(1);
        let after = &bytes[digits..];
        if matches!(after.first(), Some(b'.' | b')')) {
            return match after.get(1) {
                None => Some(Marker {
                    indent,
                    ordered: true,
                    number,
                    content_start: line.len(),
                }),
                Some(b' ') => Some(Marker {
                    indent,
                    ordered: true,
                    number,
                    content_start: indent + digits + 2,
                }),
                _ => None,
            };
        }
    }
    None
}

fn list(lines: &[&str], i: usize) -> (Node, usize) {
    let mut items = Vec::new();
    let mut ordered = false;
    let mut start = 1;
    let mut list_indent = 0;
    let mut j = i;

    while j < lines.len() {
        let line = content_of(lines[j]);
        let Some(m) = list_marker(line) else { break };
        if items.is_empty() {
            ordered = m.ordered;
            start = m.number;
            list_indent = m.indent;
        } else if m.ordered != ordered || m.indent != list_indent {
            break;
        }

        // First line of the item, then continuation lines indented to the
        // item's content column (blank lines pass through).
        let mut item_src = String::new();
        let begin = m.content_start.min(line.len());
        item_src.push_str(&line[begin..]);
        item_src.push('\n');
        j += 1;

        while j < lines.len() {
            let cont = content_of(lines[j]);
            if cont.trim().is_empty() {
                // A blank inside the item; the list ends at the next
                // non-continuation line either way.
                item_src.push('\n');
                j += 1;
                continue;
            }
            let lead = cont.len() - cont.trim_start_matches(' ').len();
            if lead >= m.content_start && m.content_start > 0 {
                item_src.push_str(&cont[m.content_start.min(lead)..]);
                item_src.push('\n');
                j += 1;
            } else {
                break;
            }
        }

        items.push(Node::ListItem {
            children: blocks_of(&item_src),
        });
    }

    (
        Node::List {
            ordered,
            start,
            items,
        },
        j,
    )
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

fn table_starts(lines: &[&str], i: usize) -> bool {
    content_of(lines[i]).contains('|')
        && lines
            .get(i + 1)
            .is_some_and(|l| delimiter_row(content_of(l)).is_some())
}

fn table(lines: &[&str], i: usize) -> Option<(Node, usize)> {
    let header_line = content_of(lines[i]);
    if !header_line.contains('|') {
        return None;
    }
    let alignments = delimiter_row(content_of(lines.get(i + 1)?))?;
    let header_cells = split_row(header_line);
    if header_cells.is_empty() {
        return None;
    }

    let mut rows = Vec::new();
    let mut j = i + 2;
    while j < lines.len() {
        let line = content_of(lines[j]);
        if line.trim().is_empty() || !line.contains('|') {
            break;
        }
        rows.push(make_row(split_row(line)));
        j += 1;
    }

    Some((
        Node::Table {
            alignments,
            header: Box::new(make_row(header_cells)),
            rows,
        },
        j,
    ))
}

/// Parse a delimiter row (`| :--- | :---: |`) into alignments.
fn delimiter_row(line: &str) -> Option<Vec<Alignment>> {
    let t = line.trim();
    if !t.contains('-') || !t.contains('|') {
        return None;
    }
    let cells = split_row(t);
    if cells.is_empty() {
        return None;
    }
    let mut alignments = Vec::with_capacity(cells.len());
    for cell in &cells {
        let c = cell.trim();
        let dashes = c.trim_start_matches(':').trim_end_matches(':');
        if dashes.is_empty() || dashes.chars().any(|x| x != '-') {
            return None;
        }
        alignments.push(match (c.starts_with(':'), c.ends_with(':')) {
            (true, true) => Alignment::Center,
            (false, true) => Alignment::Right,
            _ => Alignment::Left,
        });
    }
    Some(alignments)
}

/// Split a table line into trimmed cell strings, honouring `\|` escapes.
fn split_row(line: &str) -> Vec<String> {
    let t = line.trim();
    let t = t.strip_prefix('|').unwrap_or(t);
    let t = t.strip_suffix('|').unwrap_or(t);

    let mut cells = Vec::new();
    let mut cur = String::new();
    let mut chars = t.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('|') => cur.push('|'),
                Some(other) => {
                    cur.push('\\');
                    cur.push(other);
                }
                None => cur.push('\\'),
            },
            '|' => cells.push(std::mem::take(&mut cur)),
            _ => cur.push(c),
        }
    }
    cells.push(cur);
    cells.into_iter().map(|c| c.trim().to_string()).collect()
}

fn make_row(cells: Vec<String>) -> Node {
    Node::TableRow {
        cells: cells
            .into_iter()
            .map(|c| Node::TableCell {
                children: inline::parse(&c),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn children(doc: &Node) -> &[Node] {
        match doc {
            Node::Document { children } => children,
            _ => panic!("not a document"),
        }
    }

    #[test]
    fn empty_input_is_empty_document() {
        assert_eq!(children(&parse("")).len(), 0);
        assert_eq!(children(&parse("\n\n")).len(), 0);
    }

    #[test]
    fn paragraph_and_heading() {
        let doc = parse("# Title\n\nbody text\n");
        let c = children(&doc);
        assert_eq!(c.len(), 2);
        assert!(matches!(c[0], Node::Heading { level: 1, .. }));
        assert!(matches!(c[1], Node::Paragraph { .. }));
    }

    #[test]
    fn heading_levels() {
        let doc = parse("### three\n###### six\n");
        let c = children(&doc);
        assert!(matches!(c[0], Node::Heading { level: 3, .. }));
        assert!(matches!(c[1], Node::Heading { level: 6, .. }));
    }

    #[test]
    fn seven_hashes_is_a_paragraph() {
        let doc = parse("####### nope\n");
        assert!(matches!(children(&doc)[0], Node::Paragraph { .. }));
    }

    #[test]
    fn hash_without_space_is_a_paragraph() {
        let doc = parse("#tag\n");
        assert!(matches!(children(&doc)[0], Node::Paragraph { .. }));
    }

    #[test]
    fn multi_line_paragraph_keeps_soft_breaks() {
        let doc = parse("one\ntwo\n");
        let c = children(&doc);
        assert_eq!(c.len(), 1);
        assert_eq!(
            c[0],
            Node::Paragraph {
                children: vec![Node::Text {
                    text: "one\ntwo".to_string()
                }]
            }
        );
    }

    // ── Fenced code ─────────────────────────────────────────────────────

    #[test]
    fn closed_fence() {
        let doc = parse("```rust\nlet x = 1;\n```\n");
        let c = children(&doc);
        assert_eq!(
            c[0],
            Node::CodeBlock {
                language: "rust".to_string(),
                code: "let x = 1;\n".to_string(),
                loading: false,
                diff: false,
            }
        );
    }

    #[test]
    fn unclosed_fence_is_loading() {
        let doc = parse("```ts\nconst x = 1\n");
        let c = children(&doc);
        assert_eq!(
            c[0],
            Node::CodeBlock {
                language: "ts".to_string(),
                code: "const x = 1\n".to_string(),
                loading: true,
                diff: false,
            }
        );
    }

    #[test]
    fn bare_fence_line_is_loading_with_empty_code() {
        let doc = parse("```\n");
        assert_eq!(
            children(&doc)[0],
            Node::CodeBlock {
                language: String::new(),
                code: String::new(),
                loading: true,
                diff: false,
            }
        );
    }

    #[test]
    fn tilde_fence_closes_on_tildes_only() {
        let doc = parse("~~~\n```\n~~~\n");
        assert_eq!(
            children(&doc)[0],
            Node::CodeBlock {
                language: String::new(),
                code: "```\n".to_string(),
                loading: false,
                diff: false,
            }
        );
    }

    #[test]
    fn diff_language_sets_the_flag() {
        let doc = parse("```diff\n-a\n+b\n```\n");
        assert!(matches!(
            &children(&doc)[0],
            Node::CodeBlock { diff: true, .. }
        ));
        let doc = parse("```patch\n-a\n```\n");
        assert!(matches!(
            &children(&doc)[0],
            Node::CodeBlock { diff: true, .. }
        ));
    }

    #[test]
    fn info_string_first_word_is_the_language() {
        let doc = parse("```rust ignore\nx\n```\n");
        assert!(matches!(
            &children(&doc)[0],
            Node::CodeBlock { language, .. } if language == "rust"
        ));
    }

    #[test]
    fn longer_close_run_closes() {
        let doc = parse("```\ncode\n`````\n");
        assert!(matches!(
            &children(&doc)[0],
            Node::CodeBlock { loading: false, .. }
        ));
    }

    // ── Thematic break ──────────────────────────────────────────────────

    #[test]
    fn thematic_breaks() {
        for src in ["---\n", "***\n", "___\n", "- - -\n", "  ----------\n"] {
            let doc = parse(src);
            assert!(
                matches!(children(&doc)[0], Node::ThematicBreak),
                "source {src:?}"
            );
        }
    }

    #[test]
    fn two_dashes_is_not_a_break() {
        let doc = parse("--\n");
        assert!(matches!(children(&doc)[0], Node::Paragraph { .. }));
    }

    // ── Quotes ──────────────────────────────────────────────────────────

    #[test]
    fn block_quote_collects_marked_lines() {
        let doc = parse("> quoted\n> more\n\nafter\n");
        let c = children(&doc);
        assert_eq!(c.len(), 2);
        let Node::BlockQuote { children: inner } = &c[0] else {
            panic!("expected quote");
        };
        assert!(matches!(inner[0], Node::Paragraph { .. }));
    }

    #[test]
    fn nested_quote() {
        let doc = parse("> > deep\n");
        let Node::BlockQuote { children: outer } = &children(&doc)[0] else {
            panic!("expected quote");
        };
        assert!(matches!(outer[0], Node::BlockQuote { .. }));
    }

    #[test]
    fn quote_can_hold_a_code_fence() {
        let doc = parse("> ```\n> x\n> ```\n");
        let Node::BlockQuote { children: inner } = &children(&doc)[0] else {
            panic!("expected quote");
        };
        assert!(matches!(inner[0], Node::CodeBlock { loading: false, .. }));
    }

    // ── Lists ───────────────────────────────────────────────────────────

    #[test]
    fn unordered_list() {
        let doc = parse("- one\n- two\n- three\n");
        let Node::List {
            ordered, items, ..
        } = &children(&doc)[0]
        else {
            panic!("expected list");
        };
        assert!(!ordered);
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn ordered_list_keeps_start() {
        let doc = parse("3. c\n4. d\n");
        let Node::List {
            ordered,
            start,
            items,
        } = &children(&doc)[0]
        else {
            panic!("expected list");
        };
        assert!(ordered);
        assert_eq!(*start, 3);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn nested_list_lives_inside_the_item() {
        let doc = parse("- a\n  - b\n- c\n");
        let Node::List { items, .. } = &children(&doc)[0] else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 2);
        let Node::ListItem { children: first } = &items[0] else {
            panic!("expected item");
        };
        assert!(
            first.iter().any(|n| matches!(n, Node::List { .. })),
            "nested list should be a child of the first item"
        );
    }

    #[test]
    fn item_continuation_line_joins_the_item() {
        let doc = parse("- first\n  still first\n- second\n");
        let Node::List { items, .. } = &children(&doc)[0] else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn list_then_paragraph() {
        let doc = parse("- a\n\nafter\n");
        let c = children(&doc);
        assert!(matches!(c[0], Node::List { .. }));
        assert!(matches!(c[1], Node::Paragraph { .. }));
    }

    // ── Tables ──────────────────────────────────────────────────────────

    #[test]
    fn simple_table() {
        let doc = parse("| a | b |\n| --- | --- |\n| 1 | 2 |\n");
        let Node::Table {
            alignments,
            header,
            rows,
        } = &children(&doc)[0]
        else {
            panic!("expected table");
        };
        assert_eq!(alignments.len(), 2);
        assert_eq!(rows.len(), 1);
        let Node::TableRow { cells } = header.as_ref() else {
            panic!("expected row");
        };
        assert_eq!(cells.len(), 2);
    }

    #[test]
    fn table_alignments() {
        let doc = parse("| l | c | r |\n| :-- | :-: | --: |\n");
        let Node::Table { alignments, .. } = &children(&doc)[0] else {
            panic!("expected table");
        };
        assert_eq!(
            alignments,
            &vec![Alignment::Left, Alignment::Center, Alignment::Right]
        );
    }

    #[test]
    fn header_without_delimiter_is_a_paragraph() {
        let doc = parse("| a | b |\nplain\n");
        assert!(matches!(children(&doc)[0], Node::Paragraph { .. }));
    }

    #[test]
    fn escaped_pipe_stays_in_the_cell() {
        let cells = split_row("| a \\| b | c |");
        assert_eq!(cells, vec!["a | b".to_string(), "c".to_string()]);
    }

    // ── HTML ────────────────────────────────────────────────────────────

    #[test]
    fn html_block_runs_to_blank_line() {
        let doc = parse("<div>\n<span>x</span>\n</div>\n\nafter\n");
        let c = children(&doc);
        assert_eq!(
            c[0],
            Node::HtmlBlock {
                raw: "<div>\n<span>x</span>\n</div>".to_string()
            }
        );
        assert!(matches!(c[1], Node::Paragraph { .. }));
    }

    #[test]
    fn escaped_comment_is_a_paragraph() {
        // The normaliser turns a leading `<!--` into `\<!--` before parse.
        let doc = parse("\\<!-- hidden -->\n");
        assert!(matches!(children(&doc)[0], Node::Paragraph { .. }));
    }

    // ── Paragraph interruption ──────────────────────────────────────────

    #[test]
    fn fence_interrupts_paragraph() {
        let doc = parse("text\n```\ncode\n```\n");
        let c = children(&doc);
        assert!(matches!(c[0], Node::Paragraph { .. }));
        assert!(matches!(c[1], Node::CodeBlock { .. }));
    }

    #[test]
    fn heading_interrupts_paragraph() {
        let doc = parse("text\n# head\n");
        let c = children(&doc);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn list_interrupts_paragraph() {
        let doc = parse("text\n- item\n");
        let c = children(&doc);
        assert!(matches!(c[1], Node::List { .. }));
    }
}
