//! Node tree → styled text.
//!
//! A pure function from a parsed document to a string of styled lines,
//! ending in exactly one `\n` (for a non-empty document). The streaming
//! core diffs successive outputs of this function, so the renderer's other
//! contract is *prefix stability*: output for a prefix of the stream should
//! be a prefix of the output for the extended stream whenever the markdown
//! itself did not reinterpret anything. Markers are kept for headings and
//! fences, soft breaks stay where the source put them, and blocks are
//! separated by a single blank line.
//!
//! Code blocks take their body from the highlight hook when it returns
//! one; the document-order-last loading block (the streaming tail) is
//! rendered plain and without its closing fence so the arriving code
//! composes as an append.

use live_markdown::{trailing_loading_code_block, Alignment, Node};
use live_term::scan::visible_width;

use crate::highlight::{Highlight, Highlighter};
use crate::theme::{push_styled, Style, Theme};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Rendering knobs.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Emit SGR styling. Off produces plain text.
    pub color: bool,
    /// Layout width for thematic breaks. Tables size to their content.
    pub width: Option<usize>,
    /// Streaming mode: the trailing loading code block renders without its
    /// closing fence and without consulting the highlight hook.
    pub streaming: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            color: true,
            width: None,
            streaming: false,
        }
    }
}

/// The render-time highlight hook: `(code, language)` to styled code, or
/// `None` to keep the plain body. The streaming core passes a cache-backed
/// closure here; [`highlight_markdown`] passes a blocking one.
pub type HighlightHook<'h> = &'h mut dyn FnMut(&str, &str) -> Option<String>;

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Render a document tree to styled text.
#[must_use]
pub fn render_tree(
    root: &Node,
    theme: &Theme,
    opts: &RenderOptions,
    highlight: Option<HighlightHook<'_>>,
) -> String {
    let tail = if opts.streaming {
        trailing_loading_code_block(root).map(|n| n as *const Node)
    } else {
        None
    };
    let mut ctx = Ctx {
        theme,
        color: opts.color,
        width: opts.width,
        tail,
        highlight,
    };
    let mut out = String::new();
    render_blocks(&mut out, root.child_nodes(), &mut ctx);
    out
}

/// One-shot rendering of a complete markdown string: normalise, parse,
/// render, resolving deferred highlights by waiting for them.
#[must_use]
pub fn highlight_markdown(
    content: &str,
    theme: &Theme,
    opts: &RenderOptions,
    highlighter: Option<&mut dyn Highlighter>,
) -> String {
    let doc = live_markdown::parse(&live_markdown::normalize(content));
    match highlighter {
        None => render_tree(&doc, theme, opts, None),
        Some(h) => {
            let mut hook = |code: &str, language: &str| -> Option<String> {
                match h.highlight(code, language)? {
                    Highlight::Ready(text) => Some(text),
                    Highlight::Deferred(rx) => rx.recv().ok()?.ok(),
                }
            };
            render_tree(&doc, theme, opts, Some(&mut hook))
        }
    }
}

// ---------------------------------------------------------------------------
// Context and block dispatch
// ---------------------------------------------------------------------------

struct Ctx<'a, 'h> {
    theme: &'a Theme,
    color: bool,
    width: Option<usize>,
    /// The streaming-tail loading code block, by identity.
    tail: Option<*const Node>,
    highlight: Option<HighlightHook<'h>>,
}

fn render_blocks<'n>(
    out: &mut String,
    blocks: impl Iterator<Item = &'n Node>,
    ctx: &mut Ctx<'_, '_>,
) {
    let mut first = true;
    for block in blocks {
        if !first {
            out.push('\n');
        }
        render_block(out, block, ctx);
        first = false;
    }
}

fn render_block(out: &mut String, node: &Node, ctx: &mut Ctx<'_, '_>) {
    match node {
        Node::Heading { level, children } => {
            let marker = "#".repeat(usize::from(*level));
            let text = format!("{marker} {}", inline_plain(children));
            push_styled(out, text.trim_end(), ctx.theme.heading, ctx.color);
            out.push('\n');
        }
        Node::Paragraph { children } => {
            render_inlines(out, children, Style::PLAIN, ctx);
            out.push('\n');
        }
        Node::CodeBlock {
            language,
            code,
            diff,
            ..
        } => render_code_block(out, node, language, code, *diff, ctx),
        Node::BlockQuote { children } => {
            let mut inner = String::new();
            render_blocks(&mut inner, children.iter(), ctx);
            for line in lines_of(&inner) {
                push_styled(out, ">", ctx.theme.quote_marker, ctx.color);
                if !line.is_empty() {
                    out.push(' ');
                    out.push_str(line);
                }
                out.push('\n');
            }
        }
        Node::List {
            ordered,
            start,
            items,
        } => render_list(out, *ordered, *start, items, ctx),
        Node::Table {
            alignments,
            header,
            rows,
        } => render_table(out, alignments, header, rows, ctx),
        Node::ThematicBreak => {
            let width = ctx.width.unwrap_or(40).clamp(1, 200);
            push_styled(out, &"─".repeat(width), ctx.theme.rule, ctx.color);
            out.push('\n');
        }
        Node::HtmlBlock { raw } => {
            for line in raw.split('\n') {
                push_styled(out, line, ctx.theme.html, ctx.color);
                out.push('\n');
            }
        }
        // An inline at block position renders as its own line.
        inline => {
            render_inline(out, inline, Style::PLAIN, ctx);
            out.push('\n');
        }
    }
}

/// The lines of a rendered fragment, without the trailing empty segment
/// its final `\n` would produce.
fn lines_of(fragment: &str) -> impl Iterator<Item = &str> {
    let trimmed = fragment.strip_suffix('\n').unwrap_or(fragment);
    trimmed.split('\n')
}

// ---------------------------------------------------------------------------
// Code blocks
// ---------------------------------------------------------------------------

fn render_code_block(
    out: &mut String,
    node: &Node,
    language: &str,
    code: &str,
    diff: bool,
    ctx: &mut Ctx<'_, '_>,
) {
    let is_tail = ctx.tail.is_some_and(|p| std::ptr::eq(p, node));

    push_styled(
        out,
        &format!("```{language}"),
        ctx.theme.code_fence,
        ctx.color,
    );
    out.push('\n');

    if !code.is_empty() {
        let body = code.strip_suffix('\n').unwrap_or(code);
        let highlighted = if is_tail {
            None
        } else {
            ctx.highlight.as_mut().and_then(|h| h(body, language))
        };
        match highlighted {
            Some(styled) => {
                let styled = styled.strip_suffix('\n').unwrap_or(&styled);
                for line in styled.split('\n') {
                    out.push_str(line);
                    out.push('\n');
                }
            }
            None if diff => {
                for line in body.split('\n') {
                    push_styled(out, line, diff_line_style(line, ctx.theme), ctx.color);
                    out.push('\n');
                }
            }
            None => {
                for line in body.split('\n') {
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
    }

    if !is_tail {
        push_styled(out, "```", ctx.theme.code_fence, ctx.color);
        out.push('\n');
    }
}

/// Per-line styling for diff/patch blocks without a highlighter.
fn diff_line_style(line: &str, theme: &Theme) -> Style {
    if line.starts_with("+++")
        || line.starts_with("---")
        || line.starts_with("diff ")
        || line.starts_with("index ")
    {
        theme.diff_meta
    } else if line.starts_with("@@") {
        theme.diff_hunk
    } else if line.starts_with('+') {
        theme.diff_add
    } else if line.starts_with('-') {
        theme.diff_remove
    } else {
        Style::PLAIN
    }
}

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

fn render_list(out: &mut String, ordered: bool, start: u64, items: &[Node], ctx: &mut Ctx<'_, '_>) {
    for (idx, item) in items.iter().enumerate() {
        let marker = if ordered {
            format!("{}.", start + idx as u64)
        } else {
            "-".to_string()
        };
        let indent = " ".repeat(marker.len() + 1);

        // Items render tight: no blank line between an item's paragraph
        // and its nested blocks.
        let mut inner = String::new();
        for child in item.child_nodes() {
            render_block(&mut inner, child, ctx);
        }

        let mut emitted = false;
        for line in lines_of(&inner) {
            if emitted {
                if !line.is_empty() {
                    out.push_str(&indent);
                    out.push_str(line);
                }
            } else {
                push_styled(out, &marker, ctx.theme.list_marker, ctx.color);
                out.push(' ');
                out.push_str(line);
            }
            out.push('\n');
            emitted = true;
        }
        if !emitted {
            push_styled(out, &marker, ctx.theme.list_marker, ctx.color);
            out.push('\n');
        }
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

struct CellRender {
    styled: String,
    width: usize,
}

fn render_table(
    out: &mut String,
    alignments: &[Alignment],
    header: &Node,
    rows: &[Node],
    ctx: &mut Ctx<'_, '_>,
) {
    let header_cells = row_cells(header, ctx.theme.table_header, ctx);
    let body: Vec<Vec<CellRender>> = rows
        .iter()
        .map(|row| row_cells(row, Style::PLAIN, ctx))
        .collect();

    let ncols = header_cells.len().max(alignments.len()).max(1);
    let mut widths = vec![3usize; ncols];
    for (i, cell) in header_cells.iter().enumerate() {
        widths[i] = widths[i].max(cell.width);
    }
    for row in &body {
        for (i, cell) in row.iter().enumerate().take(ncols) {
            widths[i] = widths[i].max(cell.width);
        }
    }

    push_row(out, &header_cells, &widths, alignments, ctx);
    push_separator(out, &widths, ctx);
    for row in &body {
        push_row(out, row, &widths, alignments, ctx);
    }
}

fn row_cells(row: &Node, base: Style, ctx: &mut Ctx<'_, '_>) -> Vec<CellRender> {
    let Node::TableRow { cells } = row else {
        return Vec::new();
    };
    cells
        .iter()
        .map(|cell| {
            let mut styled = String::new();
            if let Node::TableCell { children } = cell {
                render_inlines(&mut styled, children, base, ctx);
            }
            CellRender {
                width: visible_width(&styled),
                styled,
            }
        })
        .collect()
}

fn push_row(
    out: &mut String,
    cells: &[CellRender],
    widths: &[usize],
    alignments: &[Alignment],
    ctx: &mut Ctx<'_, '_>,
) {
    static EMPTY: CellRender = CellRender {
        styled: String::new(),
        width: 0,
    };
    for (i, &width) in widths.iter().enumerate() {
        push_styled(out, "|", ctx.theme.table_border, ctx.color);
        out.push(' ');
        let cell = cells.get(i).unwrap_or(&EMPTY);
        let pad = width.saturating_sub(cell.width);
        let align = alignments.get(i).copied().unwrap_or_default();
        let (left, right) = match align {
            Alignment::Left => (0, pad),
            Alignment::Right => (pad, 0),
            Alignment::Center => (pad / 2, pad - pad / 2),
        };
        for _ in 0..left {
            out.push(' ');
        }
        out.push_str(&cell.styled);
        for _ in 0..right {
            out.push(' ');
        }
        out.push(' ');
    }
    push_styled(out, "|", ctx.theme.table_border, ctx.color);
    out.push('\n');
}

fn push_separator(out: &mut String, widths: &[usize], ctx: &mut Ctx<'_, '_>) {
    let mut line = String::new();
    for &width in widths {
        line.push_str("| ");
        line.push_str(&"-".repeat(width));
        line.push(' ');
    }
    line.push('|');
    push_styled(out, &line, ctx.theme.table_border, ctx.color);
    out.push('\n');
}

// ---------------------------------------------------------------------------
// Inlines
// ---------------------------------------------------------------------------

fn render_inlines(out: &mut String, children: &[Node], base: Style, ctx: &mut Ctx<'_, '_>) {
    for child in children {
        render_inline(out, child, base, ctx);
    }
}

fn render_inline(out: &mut String, node: &Node, base: Style, ctx: &mut Ctx<'_, '_>) {
    match node {
        Node::Text { text } => push_styled(out, text, base, ctx.color),
        Node::Strong { children } => {
            render_inlines(out, children, base.merge(ctx.theme.strong), ctx);
        }
        Node::Emphasis { children } => {
            render_inlines(out, children, base.merge(ctx.theme.emphasis), ctx);
        }
        Node::Strikethrough { children } => {
            render_inlines(out, children, base.merge(ctx.theme.strikethrough), ctx);
        }
        Node::Highlight { children } => {
            render_inlines(out, children, base.merge(ctx.theme.highlight), ctx);
        }
        Node::InlineCode { code } => {
            push_styled(out, code, base.merge(ctx.theme.inline_code), ctx.color);
        }
        Node::Link { href, children } => {
            render_inlines(out, children, base.merge(ctx.theme.link), ctx);
            let label = inline_plain(children);
            if !href.is_empty() && label != *href {
                out.push(' ');
                push_styled(out, &format!("({href})"), ctx.theme.link_url, ctx.color);
            }
        }
        Node::Image { alt, href } => {
            let label = if alt.is_empty() { "image" } else { alt };
            push_styled(out, &format!("[{label}]"), ctx.theme.image, ctx.color);
            if !href.is_empty() {
                out.push(' ');
                push_styled(out, &format!("({href})"), ctx.theme.link_url, ctx.color);
            }
        }
        Node::HardBreak => out.push('\n'),
        _ => {}
    }
}

/// The unstyled text content of an inline run.
fn inline_plain(children: &[Node]) -> String {
    let mut s = String::new();
    for child in children {
        plain_of(child, &mut s);
    }
    s
}

fn plain_of(node: &Node, out: &mut String) {
    match node {
        Node::Text { text } => out.push_str(text),
        Node::InlineCode { code } => out.push_str(code),
        Node::Image { alt, .. } => {
            out.push('[');
            out.push_str(alt);
            out.push(']');
        }
        Node::HardBreak => out.push(' '),
        Node::Strong { children }
        | Node::Emphasis { children }
        | Node::Strikethrough { children }
        | Node::Highlight { children }
        | Node::Link { children, .. } => {
            for child in children {
                plain_of(child, out);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use live_term::scan::strip_ansi;

    fn plain(src: &str) -> String {
        let doc = live_markdown::parse(src);
        render_tree(
            &doc,
            &Theme::default(),
            &RenderOptions {
                color: false,
                width: None,
                streaming: false,
            },
            None,
        )
    }

    fn streaming_plain(src: &str) -> String {
        let doc = live_markdown::parse(src);
        render_tree(
            &doc,
            &Theme::default(),
            &RenderOptions {
                color: false,
                width: None,
                streaming: true,
            },
            None,
        )
    }

    fn colored(src: &str) -> String {
        let doc = live_markdown::parse(src);
        render_tree(&doc, &Theme::default(), &RenderOptions::default(), None)
    }

    // ── Shape ───────────────────────────────────────────────────────────

    #[test]
    fn empty_document_renders_empty() {
        assert_eq!(plain(""), "");
    }

    #[test]
    fn output_ends_with_exactly_one_newline() {
        for src in ["text\n", "# h\n\np\n", "- a\n- b\n", "> q\n"] {
            let out = plain(src);
            assert!(out.ends_with('\n'), "{src:?} -> {out:?}");
            assert!(!out.ends_with("\n\n"), "{src:?} -> {out:?}");
        }
    }

    #[test]
    fn blocks_are_separated_by_a_blank_line() {
        assert_eq!(plain("# A\n\nB\n"), "# A\n\nB\n");
    }

    #[test]
    fn heading_keeps_its_marker() {
        assert_eq!(plain("## Two\n"), "## Two\n");
    }

    #[test]
    fn paragraph_keeps_soft_breaks() {
        assert_eq!(plain("one\ntwo\n"), "one\ntwo\n");
    }

    // ── Code blocks ─────────────────────────────────────────────────────

    #[test]
    fn streaming_tail_omits_closing_fence() {
        assert_eq!(streaming_plain("```ts\nconst x = 1\n"), "```ts\nconst x = 1\n");
    }

    #[test]
    fn closed_block_has_both_fences() {
        assert_eq!(
            streaming_plain("```ts\nconst x = 1\n```\n"),
            "```ts\nconst x = 1\n```\n"
        );
    }

    #[test]
    fn non_streaming_render_closes_a_loading_block() {
        assert_eq!(plain("```ts\nconst x = 1\n"), "```ts\nconst x = 1\n```\n");
    }

    #[test]
    fn empty_fence_streaming() {
        assert_eq!(streaming_plain("```\n"), "```\n");
    }

    #[test]
    fn hook_output_replaces_the_body() {
        let doc = live_markdown::parse("```ts\nconst x = 1\n```\n");
        let mut hook = |code: &str, _lang: &str| Some(format!("<<{}>>", code.to_uppercase()));
        let out = render_tree(
            &doc,
            &Theme::default(),
            &RenderOptions {
                color: false,
                width: None,
                streaming: true,
            },
            Some(&mut hook),
        );
        assert_eq!(out, "```ts\n<<CONST X = 1>>\n```\n");
    }

    #[test]
    fn hook_is_not_consulted_for_the_streaming_tail() {
        let doc = live_markdown::parse("```ts\nconst x = 1\n");
        let mut called = false;
        let mut hook = |_c: &str, _l: &str| {
            called = true;
            None
        };
        let out = render_tree(
            &doc,
            &Theme::default(),
            &RenderOptions {
                color: false,
                width: None,
                streaming: true,
            },
            Some(&mut hook),
        );
        assert!(!called);
        assert_eq!(out, "```ts\nconst x = 1\n");
    }

    // ── Diff blocks ─────────────────────────────────────────────────────

    #[test]
    fn diff_lines_use_red_and_green() {
        let out = colored("```diff\n-old\n+new\n unchanged\n@@ -1 +1 @@\n```\n");
        assert!(out.contains("\x1b[31m-old"), "got {out:?}");
        assert!(out.contains("\x1b[32m+new"), "got {out:?}");
        assert!(strip_ansi(&out).contains("@@ -1 +1 @@"));
    }

    #[test]
    fn diff_meta_lines_are_distinct() {
        let out = colored("```diff\n--- a/x\n+++ b/x\n-gone\n```\n");
        // Meta lines are bold, not red/green.
        assert!(out.contains("\x1b[1m--- a/x"), "got {out:?}");
        assert!(out.contains("\x1b[1m+++ b/x"), "got {out:?}");
        assert!(out.contains("\x1b[31m-gone"), "got {out:?}");
    }

    #[test]
    fn diff_without_color_is_plain() {
        let out = plain("```diff\n-a\n+b\n```\n");
        assert_eq!(out, "```diff\n-a\n+b\n```\n");
    }

    // ── Containers ──────────────────────────────────────────────────────

    #[test]
    fn quote_prefixes_every_line() {
        assert_eq!(plain("> a\n> b\n"), "> a\n> b\n");
    }

    #[test]
    fn unordered_list_markers() {
        assert_eq!(plain("- a\n- b\n"), "- a\n- b\n");
    }

    #[test]
    fn ordered_list_numbers_from_start() {
        assert_eq!(plain("3. c\n4. d\n"), "3. c\n4. d\n");
    }

    #[test]
    fn nested_list_is_indented() {
        assert_eq!(plain("- a\n  - b\n"), "- a\n  - b\n");
    }

    // ── Tables ──────────────────────────────────────────────────────────

    #[test]
    fn table_pads_to_the_widest_cell() {
        let out = plain("| a | long |\n| --- | --- |\n| bb | c |\n");
        assert_eq!(out, "| a   | long |\n| --- | ---- |\n| bb  | c    |\n");
    }

    #[test]
    fn table_pads_by_cell_width_not_chars() {
        // "日本" is two chars but four cells wide.
        let out = plain("| h | x |\n| --- | --- |\n| 日本 | y |\n");
        let lines: Vec<&str> = out.lines().collect();
        // Every row has the same visible width.
        let w: Vec<usize> = lines.iter().map(|l| visible_width(l)).collect();
        assert!(w.windows(2).all(|p| p[0] == p[1]), "ragged table: {out}");
    }

    #[test]
    fn right_alignment_pads_on_the_left() {
        let out = plain("| n |\n| --: |\n| 7 |\n");
        assert!(out.contains("|   7 |"), "got {out}");
    }

    // ── Inlines ─────────────────────────────────────────────────────────

    #[test]
    fn strong_is_bold_without_markers() {
        assert_eq!(colored("**b**\n"), "\x1b[1mb\x1b[0m\n");
    }

    #[test]
    fn nested_emphasis_accumulates() {
        assert_eq!(
            colored("**a *b* c**\n"),
            "\x1b[1ma \x1b[0m\x1b[1;3mb\x1b[0m\x1b[1m c\x1b[0m\n"
        );
    }

    #[test]
    fn inline_markers_drop_when_color_is_off() {
        assert_eq!(plain("**b** and *i*\n"), "b and i\n");
    }

    #[test]
    fn link_shows_target() {
        assert_eq!(plain("[docs](https://e.com)\n"), "docs (https://e.com)\n");
    }

    #[test]
    fn link_with_same_label_skips_target() {
        assert_eq!(plain("[https://e.com](https://e.com)\n"), "https://e.com\n");
    }

    #[test]
    fn image_renders_alt_and_target() {
        assert_eq!(plain("![logo](a.png)\n"), "[logo] (a.png)\n");
    }

    #[test]
    fn hard_break_splits_the_line() {
        assert_eq!(plain("a  \nb\n"), "a\nb\n");
    }

    // ── Thematic break ──────────────────────────────────────────────────

    #[test]
    fn rule_uses_the_width_option() {
        let doc = live_markdown::parse("---\n");
        let out = render_tree(
            &doc,
            &Theme::default(),
            &RenderOptions {
                color: false,
                width: Some(10),
                streaming: false,
            },
            None,
        );
        assert_eq!(out, format!("{}\n", "─".repeat(10)));
    }

    // ── One-shot ────────────────────────────────────────────────────────

    #[test]
    fn highlight_markdown_normalises_first() {
        let out = highlight_markdown(
            "<!-- note\ntext\n",
            &Theme::default(),
            &RenderOptions {
                color: false,
                width: None,
                streaming: false,
            },
            None,
        );
        assert_eq!(out, "<!-- note\ntext\n");
    }
}
