//! Code block highlighting.
//!
//! The renderer takes any [`Highlighter`]: a function from `(code,
//! language)` to ANSI-styled code. Results come back either immediately
//! ([`Highlight::Ready`]) or on a channel ([`Highlight::Deferred`]) when
//! the implementation chose to do the work elsewhere. The streaming core
//! never blocks on a deferred result inside a push; it renders the plain
//! code and patches the block in place once the channel delivers.
//!
//! Two implementations ship here:
//!
//! - [`TreeSitterHighlighter`]: Rust sources via tree-sitter with the
//!   bundled highlight query. Captures are painted into a per-character
//!   color array (later captures win, being more specific) and serialised
//!   with SGR runs that close before every newline.
//! - [`ThreadedHighlighter`]: wraps any `Send` highlighter and runs each
//!   request on its own worker thread, answering with a deferred channel.
//!   This is the async path, useful when highlighting is slower than the
//!   chunk cadence.

use std::error::Error;
use std::fmt;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;

use live_term::ansi;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Parser, Query, QueryCursor};

use crate::color::Color;

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// A highlight result: styled code now, or styled code later.
pub enum Highlight {
    /// The highlighted code, available immediately. May contain ANSI
    /// escapes; a trailing newline is tolerated and stripped by the
    /// caller before caching.
    Ready(String),
    /// The result will arrive on this channel. An `Err` (or a dropped
    /// sender) means the plain rendering stays.
    Deferred(Receiver<Result<String, HighlightError>>),
}

/// Anything that can style code for a language.
pub trait Highlighter {
    /// Highlight `code` (no trailing newline) for `language`. `None`
    /// means the language is not supported and plain rendering applies.
    fn highlight(&mut self, code: &str, language: &str) -> Option<Highlight>;
}

/// A failed highlight. The renderer swallows these; the error text exists
/// for the implementation's own diagnostics.
#[derive(Debug, Clone)]
pub struct HighlightError {
    message: String,
}

impl HighlightError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for HighlightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "highlight failed: {}", self.message)
    }
}

impl Error for HighlightError {}

// ---------------------------------------------------------------------------
// Tree-sitter highlighter
// ---------------------------------------------------------------------------

/// Syntax highlighting for Rust code blocks via tree-sitter.
///
/// The grammar machinery is built lazily on the first `rust` request so a
/// stream without Rust code never pays for it.
pub struct TreeSitterHighlighter {
    rust: Option<Engine>,
    rust_failed: bool,
}

struct Engine {
    parser: Parser,
    query: Query,
    /// Color per capture index. `Color::Default` = leave unstyled.
    capture_colors: Vec<Color>,
}

impl TreeSitterHighlighter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rust: None,
            rust_failed: false,
        }
    }
}

impl Default for TreeSitterHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter for TreeSitterHighlighter {
    fn highlight(&mut self, code: &str, language: &str) -> Option<Highlight> {
        if !matches!(language, "rust" | "rs") || self.rust_failed {
            return None;
        }
        if self.rust.is_none() {
            match Engine::rust() {
                Some(engine) => self.rust = Some(engine),
                None => {
                    self.rust_failed = true;
                    return None;
                }
            }
        }
        let engine = self.rust.as_mut()?;
        engine.colorize(code).map(Highlight::Ready)
    }
}

impl Engine {
    /// Build the Rust engine: grammar, bundled highlight query, and the
    /// capture-to-color table.
    fn rust() -> Option<Self> {
        let language: tree_sitter::Language = tree_sitter_rust::LANGUAGE.into();
        let mut parser = Parser::new();
        parser.set_language(&language).ok()?;
        let query = Query::new(&language, tree_sitter_rust::HIGHLIGHTS_QUERY).ok()?;
        let capture_colors = query
            .capture_names()
            .iter()
            .map(|name| capture_color(name))
            .collect();
        Some(Self {
            parser,
            query,
            capture_colors,
        })
    }

    /// Paint `code` with per-character colors from the highlight query and
    /// serialise to an ANSI string.
    fn colorize(&mut self, code: &str) -> Option<String> {
        let tree = self.parser.parse(code, None)?;

        // char index for every byte offset (continuation bytes map to
        // their char), plus one-past-the-end.
        let mut char_of_byte = vec![0usize; code.len() + 1];
        let mut count = 0;
        for (ci, (bi, c)) in code.char_indices().enumerate() {
            for b in bi..bi + c.len_utf8() {
                char_of_byte[b] = ci;
            }
            count = ci + 1;
        }
        char_of_byte[code.len()] = count;

        let mut colors = vec![Color::Default; count];
        let mut cursor = QueryCursor::new();
        let mut captures = cursor.captures(&self.query, tree.root_node(), code.as_bytes());
        while let Some((m, _)) = captures.next() {
            for capture in m.captures {
                let color = self.capture_colors[capture.index as usize];
                if color.is_default() {
                    continue;
                }
                let start = char_of_byte[capture.node.start_byte().min(code.len())];
                let end = char_of_byte[capture.node.end_byte().min(code.len())];
                for slot in colors.iter_mut().take(end).skip(start) {
                    *slot = color;
                }
            }
        }

        Some(serialize(code, &colors))
    }
}

/// Emit the code with SGR runs, grouping consecutive same-color chars and
/// closing any open run before a newline.
fn serialize(code: &str, colors: &[Color]) -> String {
    let mut out = String::with_capacity(code.len() + colors.len() / 4);
    let mut current = Color::Default;
    for (ci, c) in code.chars().enumerate() {
        if c == '\n' {
            if !current.is_default() {
                out.push_str(ansi::SGR_RESET);
                current = Color::Default;
            }
            out.push('\n');
            continue;
        }
        let want = colors.get(ci).copied().unwrap_or_default();
        if want != current {
            if !current.is_default() {
                out.push_str(ansi::SGR_RESET);
            }
            if !want.is_default() {
                out.push_str(&want.fg_sequence());
            }
            current = want;
        }
        out.push(c);
    }
    if !current.is_default() {
        out.push_str(ansi::SGR_RESET);
    }
    out
}

/// ANSI colors for capture names, standard 16-color palette only.
///
/// Only semantically important tokens get color; punctuation and plain
/// variables stay default to avoid visual noise.
fn capture_color(name: &str) -> Color {
    use Color::Ansi256;
    match name {
        // Keywords — magenta
        "keyword" => Ansi256(5),

        // Strings — green
        "string" | "escape" => Ansi256(2),

        // Comments — bright black (gray)
        "comment" | "comment.documentation" => Ansi256(8),

        // Functions — blue
        "function" | "function.method" => Ansi256(4),

        // Macros / constants / numbers — cyan
        "function.macro" | "constant" | "constant.builtin" => Ansi256(6),

        // Types — yellow
        "type" | "type.builtin" | "constructor" => Ansi256(3),

        // self — red
        "variable.builtin" => Ansi256(1),

        // Attributes and labels — yellow
        "attribute" | "label" => Ansi256(3),

        // Properties — cyan
        "property" => Ansi256(6),

        // Everything else: default terminal foreground.
        _ => Color::Default,
    }
}

// ---------------------------------------------------------------------------
// Threaded wrapper
// ---------------------------------------------------------------------------

/// Runs an inner highlighter on a worker thread per request, turning every
/// result into [`Highlight::Deferred`].
pub struct ThreadedHighlighter<H> {
    inner: Arc<Mutex<H>>,
}

impl<H> ThreadedHighlighter<H> {
    #[must_use]
    pub fn new(inner: H) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }
}

impl<H: Highlighter + Send + 'static> Highlighter for ThreadedHighlighter<H> {
    fn highlight(&mut self, code: &str, language: &str) -> Option<Highlight> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let code = code.to_string();
        let language = language.to_string();

        let spawned = thread::Builder::new()
            .name("highlight".into())
            .spawn(move || {
                let result = match inner.lock() {
                    Ok(mut guard) => match guard.highlight(&code, &language) {
                        Some(Highlight::Ready(text)) => Ok(text),
                        Some(Highlight::Deferred(nested)) => nested
                            .recv()
                            .unwrap_or_else(|_| Err(HighlightError::new("sender dropped"))),
                        None => Err(HighlightError::new("language not supported")),
                    },
                    Err(_) => Err(HighlightError::new("highlighter poisoned")),
                };
                let _ = tx.send(result);
            });

        spawned.ok()?;
        Some(Highlight::Deferred(rx))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
