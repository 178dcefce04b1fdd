//! # live-render — Markdown tree to styled terminal text
//!
//! The pure half of the pipeline: given a parsed document, a theme and a
//! highlight hook, produce one string of ANSI-styled lines. No terminal
//! state, no I/O; the streaming core diffs successive outputs of
//! [`render_tree`] and turns the difference into patches.
//!
//! - **[`color`]** — foreground colors with compact SGR encoding
//! - **[`theme`]** — [`Style`]/[`Theme`], per-line styling that keeps every
//!   `\n` outside SGR pairs
//! - **[`render`]** — the tree renderer and the one-shot
//!   [`highlight_markdown`]
//! - **[`highlight`]** — the [`Highlighter`] contract plus the built-in
//!   tree-sitter (Rust) and worker-thread implementations

pub mod color;
pub mod highlight;
pub mod render;
pub mod theme;

pub use color::Color;
pub use highlight::{Highlight, HighlightError, Highlighter, ThreadedHighlighter, TreeSitterHighlighter};
pub use render::{highlight_markdown, render_tree, HighlightHook, RenderOptions};
pub use theme::{push_styled, Attr, Style, Theme};
