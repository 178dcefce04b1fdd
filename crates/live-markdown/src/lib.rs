//! # live-markdown — Markdown tree for md-live
//!
//! A small markdown parser built for streaming: the whole input is
//! re-parsed on every chunk, and a fenced code block whose closing line has
//! not arrived yet is reported as a single `CodeBlock` with
//! `loading = true` so the renderer can treat it specially.
//!
//! - **[`node`]** — the [`Node`] tree, inline/block classification, and the
//!   trailing-loading-block walk
//! - **[`normalize`]** — the pre-parse rewrite that defuses line-leading
//!   HTML comments
//! - **[`block`]** — line-level parsing (headings, fences, quotes, lists,
//!   tables, breaks, HTML blocks, paragraphs)
//! - **[`inline`]** — span-level parsing (emphasis, code spans, links,
//!   images, escapes, hard breaks)

pub mod block;
pub mod inline;
pub mod node;
pub mod normalize;

pub use block::parse;
pub use node::{last_code_block, trailing_loading_code_block, Alignment, Node};
pub use normalize::normalize;
