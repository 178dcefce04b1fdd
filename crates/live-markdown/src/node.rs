//! The markdown node tree.
//!
//! A parse produces a [`Node::Document`] whose children are block nodes;
//! inline content lives under headings, paragraphs, table cells and so on.
//! The tree is rebuilt from scratch on every re-parse of the accumulating
//! stream, so nodes are plain owned data with no interior bookkeeping.
//!
//! Two walks matter to the streaming renderer and both live here:
//!
//! - [`trailing_loading_code_block`] finds the code block that is still
//!   waiting for its closing fence. Only the *document-order-last* block
//!   node is stream-authoritative; a `loading` flag anywhere else is
//!   ignored. The walk therefore tracks "last block visited", descending
//!   into inline nodes without ever treating one as the last block.
//! - [`last_code_block`] finds the last code block in source order, used to
//!   identify the block whose fence just arrived.

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

/// Column alignment of a table, taken from the delimiter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A node in the markdown tree.
///
/// Container variants own their children directly; [`Node::child_nodes`]
/// yields them in source order regardless of which field they live in
/// (for tables: the header row first, then the body rows).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    // ── Blocks ──────────────────────────────────────────────────────
    Document {
        children: Vec<Node>,
    },
    Heading {
        level: u8,
        children: Vec<Node>,
    },
    Paragraph {
        children: Vec<Node>,
    },
    BlockQuote {
        children: Vec<Node>,
    },
    List {
        ordered: bool,
        start: u64,
        items: Vec<Node>,
    },
    ListItem {
        children: Vec<Node>,
    },
    Table {
        alignments: Vec<Alignment>,
        header: Box<Node>,
        rows: Vec<Node>,
    },
    TableRow {
        cells: Vec<Node>,
    },
    TableCell {
        children: Vec<Node>,
    },
    /// A fenced code block. `loading` marks a fence whose closing line has
    /// not arrived yet; `diff` marks `diff`/`patch` languages for the
    /// fallback colouring.
    CodeBlock {
        language: String,
        code: String,
        loading: bool,
        diff: bool,
    },
    ThematicBreak,
    HtmlBlock {
        raw: String,
    },

    // ── Inlines ─────────────────────────────────────────────────────
    Text {
        text: String,
    },
    Strong {
        children: Vec<Node>,
    },
    Emphasis {
        children: Vec<Node>,
    },
    Strikethrough {
        children: Vec<Node>,
    },
    Highlight {
        children: Vec<Node>,
    },
    InlineCode {
        code: String,
    },
    Link {
        href: String,
        children: Vec<Node>,
    },
    Image {
        alt: String,
        href: String,
    },
    HardBreak,
}

impl Node {
    /// Whether this node is inline content (vs a block).
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        matches!(
            self,
            Self::Text { .. }
                | Self::Strong { .. }
                | Self::Emphasis { .. }
                | Self::Strikethrough { .. }
                | Self::Highlight { .. }
                | Self::InlineCode { .. }
                | Self::Link { .. }
                | Self::Image { .. }
                | Self::HardBreak
        )
    }

    /// The node's children in source order. Leaf nodes yield nothing.
    pub fn child_nodes(&self) -> ChildNodes<'_> {
        match self {
            Self::Document { children }
            | Self::Heading { children, .. }
            | Self::Paragraph { children }
            | Self::BlockQuote { children }
            | Self::ListItem { children }
            | Self::TableCell { children }
            | Self::Strong { children }
            | Self::Emphasis { children }
            | Self::Strikethrough { children }
            | Self::Highlight { children }
            | Self::Link { children, .. } => ChildNodes::Slice(children.iter()),
            Self::List { items, .. } => ChildNodes::Slice(items.iter()),
            Self::TableRow { cells } => ChildNodes::Slice(cells.iter()),
            Self::Table { header, rows, .. } => {
                ChildNodes::HeaderThenRows(Some(header), rows.iter())
            }
            Self::CodeBlock { .. }
            | Self::ThematicBreak
            | Self::HtmlBlock { .. }
            | Self::Text { .. }
            | Self::InlineCode { .. }
            | Self::Image { .. }
            | Self::HardBreak => ChildNodes::Empty,
        }
    }
}

/// Iterator over a node's children, abstracting over which field holds them.
pub enum ChildNodes<'a> {
    Empty,
    Slice(std::slice::Iter<'a, Node>),
    HeaderThenRows(Option<&'a Node>, std::slice::Iter<'a, Node>),
}

impl<'a> Iterator for ChildNodes<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        match self {
            Self::Empty => None,
            Self::Slice(iter) => iter.next(),
            Self::HeaderThenRows(header, rows) => header.take().or_else(|| rows.next()),
        }
    }
}

// ---------------------------------------------------------------------------
// Walks
// ---------------------------------------------------------------------------

/// The code block still waiting for its closing fence, if the last block
/// node in document order is one.
#[must_use]
pub fn trailing_loading_code_block(root: &Node) -> Option<&Node> {
    let mut last_block: Option<&Node> = None;
    track_last_block(root, &mut last_block);
    match last_block {
        Some(node @ Node::CodeBlock { loading: true, .. }) => Some(node),
        _ => None,
    }
}

fn track_last_block<'a>(node: &'a Node, last: &mut Option<&'a Node>) {
    for child in node.child_nodes() {
        if !child.is_inline() {
            *last = Some(child);
        }
        track_last_block(child, last);
    }
}

/// The last code block in document order, loading or not.
#[must_use]
pub fn last_code_block(root: &Node) -> Option<&Node> {
    let mut found: Option<&Node> = None;
    find_last_code_block(root, &mut found);
    found
}

fn find_last_code_block<'a>(node: &'a Node, found: &mut Option<&'a Node>) {
    for child in node.child_nodes() {
        if matches!(child, Node::CodeBlock { .. }) {
            *found = Some(child);
        }
        find_last_code_block(child, found);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
