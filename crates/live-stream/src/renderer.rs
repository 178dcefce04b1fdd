// SPDX-License-Identifier: MIT
//
// The stream renderer — re-parse, classify, patch.
//
// Every pushed chunk appends to the accumulated markdown, which is
// re-parsed and re-rendered in full. The renderer then classifies the
// transition against what the surface currently shows and asks it for the
// cheapest patch that realises the new state:
//
//   - Plain growth renders as a *pure append* (the common case while a
//     paragraph or code block streams in).
//   - A code block whose closing fence just arrived is rewritten *in
//     place* from the fence's recorded start position, so the arriving
//     syntax highlight replaces the plain code without disturbing
//     anything above it.
//   - Anything else falls back to a full rewrite from the anchor.
//
// Highlights may resolve asynchronously. The push path never waits: the
// plain code stays on screen, the pending result is tracked per cache key
// (at most one in-flight task per key), and completed results are applied
// as in-place rewrites at the start of the next push, or by `flush`, which
// blocks until every outstanding task has answered. Everything, cache and
// task map included, is mutated only on the caller's thread; worker
// threads just deliver strings over channels.

use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{Receiver, TryRecvError};

use live_markdown as md;
use live_markdown::Node;
use live_render::highlight::HighlightError;
use live_render::{render_tree, Highlight, Highlighter, RenderOptions, Theme};
use live_term::scan::{self, Position};
use live_term::surface::{Anchor, Surface};
use live_term::terminal;

use crate::error::StreamError;
use crate::stats::StreamStats;
use crate::viewport;

// ─── Options ─────────────────────────────────────────────────────────────────

/// How updates are patched onto the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Append when the new render extends the old one; rewrite closed code
    /// blocks in place from the fence; otherwise fall back per
    /// [`StreamOptions::full_redraw_on_mismatch`].
    #[default]
    Smart,
    /// Always rewrite the whole surface from the anchor.
    Redraw,
}

/// Whether rendered output carries SGR styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// `NO_COLOR` wins, then `FORCE_COLOR`, then stdout's TTY status.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    /// Resolve to a concrete on/off given stdout's TTY status.
    #[must_use]
    pub fn resolve(self, tty: bool) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => {
                if std::env::var("NO_COLOR").is_ok_and(|v| !v.is_empty()) {
                    false
                } else if std::env::var("FORCE_COLOR").is_ok_and(|v| !v.is_empty()) {
                    true
                } else {
                    tty
                }
            }
        }
    }
}

/// Streaming renderer configuration.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Where the surface anchors its origin.
    pub anchor: Anchor,
    /// Patch strategy.
    pub strategy: Strategy,
    /// Clip the on-screen view to this many trailing lines. `None` shows
    /// everything.
    pub viewport_height: Option<usize>,
    /// When a narrow patch is impossible, rewrite everything instead of
    /// returning an error.
    pub full_redraw_on_mismatch: bool,
    /// Layout width for thematic breaks.
    pub width: Option<usize>,
    /// Color output.
    pub color: ColorChoice,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            anchor: Anchor::Cursor,
            strategy: Strategy::Smart,
            viewport_height: None,
            full_redraw_on_mismatch: true,
            width: None,
            color: ColorChoice::Auto,
        }
    }
}

// ─── Renderer ────────────────────────────────────────────────────────────────

/// A pending highlight task, keyed by cache key in the in-flight map.
struct PendingTask {
    rx: Receiver<Result<String, HighlightError>>,
    /// The fence start recorded when this task's block was the streaming
    /// tail; a late result tries the narrow rewrite from here.
    start_pos: Option<Position>,
}

type PatchCallback = Box<dyn FnMut(&str)>;

/// The streaming markdown renderer.
///
/// Feed chunks with [`push`](Self::push); each call returns the patch to
/// write to the terminal. Patches produced by late highlight results are
/// delivered through the `on_patch` callback and queued for
/// [`flush`](Self::flush).
pub struct StreamRenderer {
    options: StreamOptions,
    color: bool,
    theme: Theme,
    surface: Surface,
    content: String,
    highlighter: Option<Box<dyn Highlighter>>,
    cache: HashMap<String, String>,
    in_flight: HashMap<String, PendingTask>,
    pending_patches: VecDeque<String>,
    on_patch: Option<PatchCallback>,
    was_loading: bool,
    start_pos: Option<Position>,
    last_full: String,
    stats: StreamStats,
}

impl StreamRenderer {
    /// Create a renderer. Color choice resolves against stdout once, here.
    #[must_use]
    pub fn new(options: StreamOptions) -> Self {
        let color = options.color.resolve(terminal::is_tty());
        Self {
            surface: Surface::new(options.anchor),
            options,
            color,
            theme: Theme::default(),
            content: String::new(),
            highlighter: None,
            cache: HashMap::new(),
            in_flight: HashMap::new(),
            pending_patches: VecDeque::new(),
            on_patch: None,
            was_loading: false,
            start_pos: None,
            last_full: String::new(),
            stats: StreamStats::default(),
        }
    }

    /// Install a code highlighter.
    pub fn set_highlighter(&mut self, highlighter: impl Highlighter + 'static) {
        self.highlighter = Some(Box::new(highlighter));
    }

    /// Replace the theme.
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    /// Install a callback receiving every patch produced by an
    /// asynchronously resolved highlight. The surface is updated before
    /// the callback runs, so reading [`rendered_text`](Self::rendered_text)
    /// from inside it observes the post-patch state. Do not call `push`
    /// re-entrantly from the callback.
    pub fn set_on_patch(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_patch = Some(Box::new(callback));
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// The accumulated markdown source.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The text currently on screen (viewport-clipped).
    #[must_use]
    pub fn rendered_text(&self) -> &str {
        self.surface.text()
    }

    /// The last full render, unclipped by the viewport.
    #[must_use]
    pub fn full_rendered_text(&self) -> &str {
        &self.last_full
    }

    /// Whether any highlight tasks are still outstanding.
    #[must_use]
    pub fn has_pending_highlights(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Patch statistics since creation (or the last [`reset`](Self::reset)).
    #[must_use]
    pub const fn stats(&self) -> &StreamStats {
        &self.stats
    }

    // ── Streaming ───────────────────────────────────────────────────

    /// Append a chunk and return the patch realising the new state.
    ///
    /// Completed highlight tasks are applied first; their patches go to
    /// the `on_patch` callback and the pending queue, never into the
    /// return value.
    ///
    /// # Errors
    ///
    /// Only with `full_redraw_on_mismatch` disabled: see [`StreamError`].
    pub fn push(&mut self, chunk: &str) -> Result<String, StreamError> {
        self.drain_completed();

        self.content.push_str(chunk);
        self.stats.pushes += 1;

        let doc = md::parse(&md::normalize(&self.content));
        let rendered = self.render_views(&doc);

        let loading_now = md::trailing_loading_code_block(&doc).is_some();
        let was_loading = self.was_loading;

        let patch = if loading_now {
            // The tail code block is still streaming in.
            self.was_loading = true;
            match self.options.strategy {
                Strategy::Redraw => self.start_pos = None,
                Strategy::Smart => {
                    if !was_loading {
                        self.start_pos = fence_start(&rendered);
                    }
                }
            }
            self.default_patch(&rendered)?
        } else if was_loading {
            // The tail code block just closed.
            self.was_loading = false;
            let start = self.start_pos.take();
            let key = md::last_code_block(&doc).and_then(node_key);
            match key {
                Some(key) if self.in_flight.contains_key(&key) => {
                    // Highlight still pending: show the plain form now and
                    // let the task rewrite from the fence when it lands.
                    if let Some(task) = self.in_flight.get_mut(&key) {
                        task.start_pos = start;
                    }
                    self.default_patch(&rendered)?
                }
                _ => self.rewrite_patch(&rendered, start)?,
            }
        } else {
            self.start_pos = None;
            self.default_patch(&rendered)?
        };

        self.stats.bytes_emitted += patch.len();
        Ok(patch)
    }

    /// Wait for every outstanding highlight task, apply each result, and
    /// return the accumulated async patches in emission order.
    pub fn flush(&mut self) -> Vec<String> {
        while let Some(key) = self.in_flight.keys().next().cloned() {
            let Some(task) = self.in_flight.remove(&key) else {
                break;
            };
            if let Ok(Ok(text)) = task.rx.recv() {
                self.apply_highlight(&key, text, task.start_pos);
            }
            // A rejected or dropped task keeps the plain rendering.
        }
        self.pending_patches.drain(..).collect()
    }

    /// Drain queued async patches without waiting for outstanding tasks.
    pub fn take_pending_patches(&mut self) -> Vec<String> {
        self.pending_patches.drain(..).collect()
    }

    /// Forget the stream: content, cache, queue, surface, tail state.
    /// In-flight tasks are not cancelled; their completions are simply no
    /// longer observable through this renderer.
    pub fn reset(&mut self) {
        self.content.clear();
        self.cache.clear();
        self.in_flight.clear();
        self.pending_patches.clear();
        self.was_loading = false;
        self.start_pos = None;
        self.last_full.clear();
        self.surface.reset();
        self.stats = StreamStats::default();
    }

    // ── Rendering ───────────────────────────────────────────────────

    /// Render the document with the cache-backed highlight hook, remember
    /// the full form, and return the viewport-clipped view.
    ///
    /// The hook serves cached results, invokes the highlighter on misses,
    /// caches synchronous results, and registers deferred ones in the
    /// in-flight map (one task per key). The streaming-tail loading block
    /// is excluded by the renderer itself.
    fn render_views(&mut self, doc: &Node) -> String {
        let Self {
            options,
            color,
            theme,
            highlighter,
            cache,
            in_flight,
            stats,
            ..
        } = self;
        let render_opts = RenderOptions {
            color: *color,
            width: options.width,
            streaming: true,
        };

        let full = match highlighter {
            None => render_tree(doc, theme, &render_opts, None),
            Some(h) => {
                let mut hook = |code: &str, language: &str| -> Option<String> {
                    let key = cache_key(language, code);
                    if let Some(hit) = cache.get(&key) {
                        stats.cache_hits += 1;
                        return Some(hit.clone());
                    }
                    if in_flight.contains_key(&key) {
                        return None;
                    }
                    stats.cache_misses += 1;
                    match h.highlight(code, language)? {
                        Highlight::Ready(text) => {
                            let text = strip_trailing_newline(text);
                            cache.insert(key, text.clone());
                            Some(text)
                        }
                        Highlight::Deferred(rx) => {
                            in_flight.insert(
                                key,
                                PendingTask {
                                    rx,
                                    start_pos: None,
                                },
                            );
                            None
                        }
                    }
                };
                render_tree(doc, theme, &render_opts, Some(&mut hook))
            }
        };

        self.last_full = full;
        viewport::clip_tail(&self.last_full, self.options.viewport_height)
    }

    // ── Patch shapes ────────────────────────────────────────────────

    /// Append when possible (smart) or rewrite everything (redraw).
    fn default_patch(&mut self, rendered: &str) -> Result<String, StreamError> {
        match self.options.strategy {
            Strategy::Redraw => {
                self.stats.full_redraws += 1;
                Ok(self.surface.set_text(rendered))
            }
            Strategy::Smart => {
                if let Some(delta) = rendered.strip_prefix(self.surface.text()) {
                    let delta = delta.to_string();
                    self.stats.appends += 1;
                    Ok(self.surface.append(&delta))
                } else if self.options.full_redraw_on_mismatch {
                    self.stats.full_redraws += 1;
                    Ok(self.surface.set_text(rendered))
                } else {
                    Err(StreamError::NonAppendUpdate)
                }
            }
        }
    }

    /// The in-place rewrite for a just-closed code block, falling back to
    /// a full rewrite per configuration.
    fn rewrite_patch(
        &mut self,
        rendered: &str,
        start: Option<Position>,
    ) -> Result<String, StreamError> {
        if self.options.strategy == Strategy::Redraw {
            self.stats.full_redraws += 1;
            return Ok(self.surface.set_text(rendered));
        }
        let Some(pos) = start else {
            if self.options.full_redraw_on_mismatch {
                self.stats.full_redraws += 1;
                return Ok(self.surface.set_text(rendered));
            }
            return Err(StreamError::RewriteStartMissing);
        };
        if prefix_matches(self.surface.text(), rendered, pos) {
            self.stats.narrow_rewrites += 1;
            Ok(self.surface.set_text_from(rendered, pos))
        } else if self.options.full_redraw_on_mismatch {
            self.stats.full_redraws += 1;
            Ok(self.surface.set_text(rendered))
        } else {
            Err(StreamError::RewritePrefixChanged)
        }
    }

    // ── Late highlights ─────────────────────────────────────────────

    /// Apply completed highlight tasks without blocking.
    fn drain_completed(&mut self) {
        let keys: Vec<String> = self.in_flight.keys().cloned().collect();
        for key in keys {
            let outcome = match self.in_flight.get(&key) {
                Some(task) => match task.rx.try_recv() {
                    Err(TryRecvError::Empty) => continue,
                    Ok(result) => Some(result),
                    Err(TryRecvError::Disconnected) => None,
                },
                None => continue,
            };
            let Some(task) = self.in_flight.remove(&key) else {
                continue;
            };
            if let Some(Ok(text)) = outcome {
                self.apply_highlight(&key, text, task.start_pos);
            }
        }
    }

    /// Cache a late highlight result, re-render, and patch the surface:
    /// narrowly from the recorded fence when the prefix still holds, with
    /// a full rewrite otherwise. The patch goes to the callback and the
    /// pending queue.
    fn apply_highlight(&mut self, key: &str, text: String, start: Option<Position>) {
        let text = strip_trailing_newline(text);
        self.cache.insert(key.to_string(), text);

        let doc = md::parse(&md::normalize(&self.content));
        let rendered = self.render_views(&doc);

        let patch = match start {
            Some(pos) if prefix_matches(self.surface.text(), &rendered, pos) => {
                self.stats.narrow_rewrites += 1;
                self.surface.set_text_from(&rendered, pos)
            }
            _ => {
                self.stats.full_redraws += 1;
                self.surface.set_text(&rendered)
            }
        };

        self.stats.async_patches += 1;
        self.stats.bytes_emitted += patch.len();
        if let Some(callback) = self.on_patch.as_mut() {
            callback(&patch);
        }
        self.pending_patches.push_back(patch);
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Cache key: language and code (no trailing newline) separated by NUL.
/// The language participates because highlight output depends on it.
fn cache_key(language: &str, code: &str) -> String {
    format!("{language}\0{code}")
}

fn node_key(node: &Node) -> Option<String> {
    if let Node::CodeBlock { language, code, .. } = node {
        let body = code.strip_suffix('\n').unwrap_or(code);
        Some(cache_key(language, body))
    } else {
        None
    }
}

fn strip_trailing_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
    }
    text
}

/// Position of the line start of the last ``` fence in the rendered view.
fn fence_start(rendered: &str) -> Option<Position> {
    let at = rendered.rfind("```")?;
    let line_start = rendered[..at].rfind('\n').map_or(0, |i| i + 1);
    Some(scan::index_to_pos(rendered, line_start))
}

/// Whether `prev` and `next` agree on every byte before `pos` (resolved
/// against `prev`).
fn prefix_matches(prev: &str, next: &str, pos: Position) -> bool {
    let idx = scan::pos_to_index(prev, pos);
    match (prev.get(..idx), next.get(..idx)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use live_term::scan::strip_ansi;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::{self, Sender};
    use std::sync::{Arc, Mutex};

    fn options(strategy: Strategy) -> StreamOptions {
        StreamOptions {
            strategy,
            color: ColorChoice::Never,
            ..StreamOptions::default()
        }
    }

    /// `h(code) = "<<" + uppercase(code) + ">>"`, synchronously.
    struct Upper;
    impl Highlighter for Upper {
        fn highlight(&mut self, code: &str, _language: &str) -> Option<Highlight> {
            Some(Highlight::Ready(format!("<<{}>>", code.to_uppercase())))
        }
    }

    /// Hands out deferred results; the test resolves them via `senders`.
    #[derive(Clone)]
    struct Manual {
        senders: Arc<Mutex<Vec<Sender<Result<String, HighlightError>>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl Manual {
        fn new() -> Self {
            Self {
                senders: Arc::new(Mutex::new(Vec::new())),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn resolve(&self, index: usize, text: &str) {
            let senders = self.senders.lock().unwrap();
            senders[index].send(Ok(text.to_string())).unwrap();
        }

        fn fail(&self, index: usize) {
            let senders = self.senders.lock().unwrap();
            senders[index]
                .send(Err(HighlightError::new("boom")))
                .unwrap();
        }
    }

    impl Highlighter for Manual {
        fn highlight(&mut self, _code: &str, _language: &str) -> Option<Highlight> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::channel();
            self.senders.lock().unwrap().push(tx);
            Some(Highlight::Deferred(rx))
        }
    }

    const S1_SECOND: &str =
        "\x1b8\x1b[u```ts\x1b[K\n<<CONST X = 1>>\x1b[K\n```\x1b[K\n\x1b[J";

    // ── Scenario S1: smart strategy, synchronous highlight ─────────────

    #[test]
    fn s1_smart_sync_highlight() {
        let mut r = StreamRenderer::new(options(Strategy::Smart));
        r.set_highlighter(Upper);

        let first = r.push("```ts\nconst x = 1\n").unwrap();
        assert_eq!(first, "\r\x1b7\x1b[s```ts\nconst x = 1\n");

        let second = r.push("```").unwrap();
        assert_eq!(second, S1_SECOND);
        assert_eq!(r.rendered_text(), "```ts\n<<CONST X = 1>>\n```\n");
    }

    // ── Scenario S2: redraw strategy, synchronous highlight ────────────

    #[test]
    fn s2_redraw_sync_highlight() {
        let mut r = StreamRenderer::new(options(Strategy::Redraw));
        r.set_highlighter(Upper);

        let first = r.push("```ts\nconst x = 1\n").unwrap();
        assert_eq!(first, "\r\x1b7\x1b[s```ts\x1b[K\nconst x = 1\x1b[K\n");

        let second = r.push("```").unwrap();
        assert_eq!(second, S1_SECOND);
    }

    // ── Scenario S3: smart strategy, asynchronous highlight ────────────

    #[test]
    fn s3_smart_async_highlight() {
        let manual = Manual::new();
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));

        let mut r = StreamRenderer::new(options(Strategy::Smart));
        r.set_highlighter(manual.clone());
        let sink = Arc::clone(&seen);
        r.set_on_patch(move |patch| sink.lock().unwrap().push(patch.to_string()));

        let first = r.push("```ts\nconst x = 1\n").unwrap();
        assert_eq!(first, "\r\x1b7\x1b[s```ts\nconst x = 1\n");

        // The closing fence arrives while the highlight is pending: the
        // plain form appends.
        let second = r.push("```").unwrap();
        assert_eq!(second, "```\n");
        assert!(r.has_pending_highlights());

        manual.resolve(0, "<<CONST X = 1>>");
        let patches = r.flush();
        assert_eq!(patches, vec![S1_SECOND.to_string()]);
        assert_eq!(seen.lock().unwrap().as_slice(), &[S1_SECOND.to_string()]);
        assert!(!r.has_pending_highlights());
        assert_eq!(r.rendered_text(), "```ts\n<<CONST X = 1>>\n```\n");
    }

    #[test]
    fn late_result_lands_between_pushes() {
        let manual = Manual::new();
        let mut r = StreamRenderer::new(options(Strategy::Smart));
        r.set_highlighter(manual.clone());

        r.push("```ts\nconst x = 1\n").unwrap();
        r.push("```\n").unwrap();
        manual.resolve(0, "<<CONST X = 1>>");

        // The next push drains the completion first; its own patch then
        // extends the rewritten surface.
        let patch = r.push("\ntail\n").unwrap();
        assert_eq!(r.take_pending_patches().len(), 1);
        assert_eq!(
            r.rendered_text(),
            "```ts\n<<CONST X = 1>>\n```\n\ntail\n"
        );
        assert_eq!(patch, "\ntail\n");
    }

    #[test]
    fn failed_highlight_keeps_the_plain_form() {
        let manual = Manual::new();
        let mut r = StreamRenderer::new(options(Strategy::Smart));
        r.set_highlighter(manual.clone());

        r.push("```ts\nconst x = 1\n```\n").unwrap();
        manual.fail(0);
        let patches = r.flush();
        assert!(patches.is_empty());
        assert_eq!(r.rendered_text(), "```ts\nconst x = 1\n```\n");
    }

    // ── Scenario S4: viewport clipping ─────────────────────────────────

    #[test]
    fn s4_viewport_clipping() {
        let mut r = StreamRenderer::new(StreamOptions {
            viewport_height: Some(3),
            color: ColorChoice::Never,
            ..StreamOptions::default()
        });
        r.push("# A\n\nB\n\nC\n\nD\n\nE\n").unwrap();

        let clipped = r.rendered_text();
        assert!(clipped.lines().count() <= 3, "clipped: {clipped:?}");
        assert!(
            r.full_rendered_text().lines().count() > clipped.lines().count(),
            "full render must keep everything"
        );
    }

    // ── Scenario S5: home anchor ───────────────────────────────────────

    #[test]
    fn s5_home_anchor() {
        let mut r = StreamRenderer::new(StreamOptions {
            anchor: Anchor::Home,
            color: ColorChoice::Never,
            ..StreamOptions::default()
        });
        let patch = r.push("# A\n\nB\n").unwrap();
        assert!(patch.contains("\x1b[H"));
        assert!(!patch.contains("\x1b7"));
        assert!(!patch.contains("\x1b8"));
    }

    // ── Scenario S6: diff block, color on ──────────────────────────────

    #[test]
    fn s6_diff_block_colors() {
        let mut r = StreamRenderer::new(StreamOptions {
            color: ColorChoice::Always,
            ..StreamOptions::default()
        });
        r.push("```diff\n-old\n+new\n unchanged\n@@ -1 +1 @@\n```\n")
            .unwrap();
        let out = r.full_rendered_text();
        assert!(out.contains("\x1b[31m-old"), "got {out:?}");
        assert!(out.contains("\x1b[32m+new"), "got {out:?}");
        assert!(strip_ansi(out).contains("@@ -1 +1 @@"));
    }

    // ── Append-only streams ────────────────────────────────────────────

    #[test]
    fn append_only_pushes_never_reposition() {
        let mut r = StreamRenderer::new(options(Strategy::Smart));
        let first = r.push("# Title\n").unwrap();
        assert!(first.starts_with("\r\x1b7\x1b[s"));

        for chunk in ["\nline one\n", "\nline two\n", "\n- a\n", "- b\n"] {
            let patch = r.push(chunk).unwrap();
            assert!(
                !patch.contains('\x1b'),
                "append patch must carry no control sequences: {patch:?}"
            );
        }
        assert_eq!(r.stats().appends, 5);
        assert_eq!(r.stats().full_redraws, 0);
    }

    #[test]
    fn mid_word_growth_falls_back_to_full_redraw() {
        let mut r = StreamRenderer::new(options(Strategy::Smart));
        r.push("hel").unwrap();
        let patch = r.push("lo").unwrap();
        // "hel\n" is not a prefix of "hello\n".
        assert!(patch.starts_with("\x1b8\x1b[u"));
        assert_eq!(r.rendered_text(), "hello\n");
    }

    #[test]
    fn mismatch_without_fallback_is_an_error() {
        let mut r = StreamRenderer::new(StreamOptions {
            full_redraw_on_mismatch: false,
            color: ColorChoice::Never,
            ..StreamOptions::default()
        });
        r.push("hel").unwrap();
        assert_eq!(r.push("lo"), Err(StreamError::NonAppendUpdate));
    }

    // ── Cache and coordinator ──────────────────────────────────────────

    #[test]
    fn identical_blocks_highlight_once() {
        let manual = Manual::new();
        let mut r = StreamRenderer::new(options(Strategy::Smart));
        r.set_highlighter(manual.clone());

        r.push("```ts\nsame\n```\n\n```ts\nsame\n```\n").unwrap();
        // Two identical blocks, one key, one in-flight task.
        assert_eq!(manual.calls.load(Ordering::SeqCst), 1);

        manual.resolve(0, "SAME");
        r.flush();
        assert_eq!(r.rendered_text(), "```ts\nSAME\n```\n\n```ts\nSAME\n```\n");
    }

    #[test]
    fn language_participates_in_the_key() {
        let manual = Manual::new();
        let mut r = StreamRenderer::new(options(Strategy::Smart));
        r.set_highlighter(manual.clone());

        r.push("```a\nsame\n```\n\n```b\nsame\n```\n").unwrap();
        assert_eq!(manual.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn sync_results_are_cached_across_pushes() {
        let calls = Arc::new(AtomicUsize::new(0));
        struct Counting(Arc<AtomicUsize>);
        impl Highlighter for Counting {
            fn highlight(&mut self, code: &str, _l: &str) -> Option<Highlight> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Some(Highlight::Ready(code.to_uppercase()))
            }
        }

        let mut r = StreamRenderer::new(options(Strategy::Smart));
        r.set_highlighter(Counting(Arc::clone(&calls)));
        r.push("```x\nab\n```\n").unwrap();
        r.push("\nmore text\n").unwrap();
        r.push("\neven more\n").unwrap();
        // The closed block re-renders on every push but hits the cache.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(r.stats().cache_hits >= 2);
    }

    // ── Full render invariant ──────────────────────────────────────────

    #[test]
    fn full_render_matches_one_shot_after_flush() {
        let mut r = StreamRenderer::new(options(Strategy::Smart));
        r.set_highlighter(Upper);
        for chunk in ["# T\n\n```ts\nlet a", " = 2\n```\n\ndone\n"] {
            r.push(chunk).unwrap();
        }
        r.flush();

        let mut one_shot = Upper;
        let expected = live_render::highlight_markdown(
            r.content(),
            &Theme::default(),
            &RenderOptions {
                color: false,
                width: None,
                streaming: true,
            },
            Some(&mut one_shot),
        );
        assert_eq!(r.full_rendered_text(), expected);
    }

    // ── Reset ──────────────────────────────────────────────────────────

    #[test]
    fn reset_clears_everything() {
        let mut r = StreamRenderer::new(options(Strategy::Smart));
        r.set_highlighter(Upper);
        r.push("```ts\nx\n```\n").unwrap();
        r.reset();

        assert_eq!(r.content(), "");
        assert_eq!(r.rendered_text(), "");
        assert_eq!(r.full_rendered_text(), "");
        assert_eq!(r.stats().pushes, 0);

        // The next stream starts from a fresh anchor.
        let patch = r.push("hi\n").unwrap();
        assert_eq!(patch, "\r\x1b7\x1b[shi\n");
    }

    #[test]
    fn reset_detaches_in_flight_tasks() {
        let manual = Manual::new();
        let mut r = StreamRenderer::new(options(Strategy::Smart));
        r.set_highlighter(manual.clone());
        r.push("```ts\nx\n```\n").unwrap();
        assert!(r.has_pending_highlights());

        r.reset();
        assert!(!r.has_pending_highlights());
        assert!(r.flush().is_empty());
    }

    // ── Color choice ───────────────────────────────────────────────────

    #[test]
    fn color_choice_explicit_settings() {
        assert!(ColorChoice::Always.resolve(false));
        assert!(!ColorChoice::Never.resolve(true));
    }

    // ── Fence start location ───────────────────────────────────────────

    #[test]
    fn fence_start_is_the_line_start() {
        assert_eq!(
            fence_start("intro\n```rs\ncode\n"),
            Some(Position::new(2, 1))
        );
        assert_eq!(fence_start("```\n"), Some(Position::new(1, 1)));
        assert_eq!(fence_start("no fence here\n"), None);
    }

    #[test]
    fn fence_start_skips_escapes_in_earlier_lines() {
        let rendered = "\x1b[1mtitle\x1b[0m\n```rs\ncode\n";
        assert_eq!(fence_start(rendered), Some(Position::new(2, 1)));
    }
}
