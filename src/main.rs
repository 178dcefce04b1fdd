// SPDX-License-Identifier: MIT
//
// md-live — stream markdown into a terminal, composed in place.
//
// This is the binary that wires the crates together:
//
//   live-markdown → re-parse the accumulating source per chunk
//   live-render   → node tree to styled text, tree-sitter highlighting
//   live-term     → anchored surface, minimal ANSI patches, session modes
//   live-stream   → push classification, highlight coordination
//
// The demo reads a markdown file (or stdin), then replays it through a
// stream session in small chunks with a delay, simulating a token stream.
// Pass --plain to skip the simulation and print the rendered document
// once.

use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::process;
use std::thread;
use std::time::Duration;

use live_render::{
    highlight_markdown, RenderOptions, Theme, ThreadedHighlighter, TreeSitterHighlighter,
};
use live_stream::renderer::{ColorChoice, Strategy, StreamOptions};
use live_stream::session::{SessionOptions, StreamSession};
use live_term::surface::Anchor;
use live_term::terminal;

// ─── Arguments ──────────────────────────────────────────────────────────────

struct Args {
    file: Option<String>,
    strategy: Strategy,
    anchor: Anchor,
    viewport: Option<usize>,
    width: Option<usize>,
    chunk: usize,
    delay_ms: u64,
    color: ColorChoice,
    alt_screen: bool,
    async_highlight: bool,
    plain: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            file: None,
            strategy: Strategy::Smart,
            anchor: Anchor::Cursor,
            viewport: None,
            width: None,
            chunk: 24,
            delay_ms: 8,
            color: ColorChoice::Auto,
            alt_screen: false,
            async_highlight: false,
            plain: false,
        }
    }
}

fn usage() -> ! {
    eprintln!(
        "usage: md-live [FILE] [options]\n\
         \n\
         Streams FILE (or stdin) as markdown into the terminal.\n\
         \n\
         options:\n\
           --redraw           rewrite from the anchor on every chunk\n\
           --home             anchor at screen home instead of the cursor\n\
           --viewport N       clip the live view to the trailing N lines\n\
           --width N          layout width for thematic breaks\n\
           --chunk N          bytes per simulated chunk (default 24)\n\
           --delay MS         delay between chunks (default 8)\n\
           --color MODE       on, off, or auto (default auto)\n\
           --alt-screen       stream inside the alternate screen\n\
           --async-highlight  run syntax highlighting on worker threads\n\
           --plain            render once, no streaming simulation"
    );
    process::exit(2);
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = env::args().skip(1);

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--redraw" => args.strategy = Strategy::Redraw,
            "--home" => args.anchor = Anchor::Home,
            "--viewport" => args.viewport = Some(numeric(it.next(), "--viewport")),
            "--width" => args.width = Some(numeric(it.next(), "--width")),
            "--chunk" => args.chunk = numeric(it.next(), "--chunk").max(1),
            "--delay" => args.delay_ms = numeric(it.next(), "--delay") as u64,
            "--color" => {
                args.color = match it.next().as_deref() {
                    Some("on" | "always") => ColorChoice::Always,
                    Some("off" | "never") => ColorChoice::Never,
                    Some("auto") => ColorChoice::Auto,
                    _ => usage(),
                }
            }
            "--alt-screen" => args.alt_screen = true,
            "--async-highlight" => args.async_highlight = true,
            "--plain" => args.plain = true,
            "-h" | "--help" => usage(),
            other if other.starts_with('-') => usage(),
            other => {
                if args.file.is_some() {
                    usage();
                }
                args.file = Some(other.to_string());
            }
        }
    }
    args
}

fn numeric(value: Option<String>, flag: &str) -> usize {
    match value.and_then(|v| v.parse().ok()) {
        Some(n) => n,
        None => {
            eprintln!("md-live: {flag} needs a number");
            process::exit(2);
        }
    }
}

// ─── Input ──────────────────────────────────────────────────────────────────

fn read_input(file: Option<&str>) -> String {
    match file {
        Some(path) => fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("md-live: {path}: {e}");
            process::exit(1);
        }),
        None => {
            let mut content = String::new();
            if io::stdin().read_to_string(&mut content).is_err() {
                eprintln!("md-live: stdin is not valid UTF-8");
                process::exit(1);
            }
            content
        }
    }
}

/// Split at char boundaries near the requested chunk size.
fn chunks_of(content: &str, size: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = content;
    while !rest.is_empty() {
        let mut cut = size.min(rest.len());
        while !rest.is_char_boundary(cut) {
            cut += 1;
        }
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    chunks
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn main() {
    let args = parse_args();
    let content = read_input(args.file.as_deref());

    // Default the layout width to the terminal's.
    let width = args
        .width
        .or_else(|| terminal::get_size().map(|s| usize::from(s.cols)));

    if args.plain {
        let opts = RenderOptions {
            color: args.color.resolve(terminal::is_tty()),
            width,
            streaming: false,
        };
        let mut highlighter = TreeSitterHighlighter::new();
        let out = highlight_markdown(&content, &Theme::default(), &opts, Some(&mut highlighter));
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        let _ = lock.write_all(out.as_bytes());
        let _ = lock.flush();
        return;
    }

    let stream_options = StreamOptions {
        anchor: args.anchor,
        strategy: args.strategy,
        viewport_height: args.viewport,
        full_redraw_on_mismatch: true,
        width,
        color: args.color,
    };
    let session_options = SessionOptions {
        alt_screen: args.alt_screen,
        sync_updates: true,
        require_tty: false,
    };

    let mut session = StreamSession::new(stream_options, session_options).unwrap_or_else(|e| {
        eprintln!("md-live: {e}");
        process::exit(1);
    });

    if args.async_highlight {
        session
            .renderer_mut()
            .set_highlighter(ThreadedHighlighter::new(TreeSitterHighlighter::new()));
    } else {
        session
            .renderer_mut()
            .set_highlighter(TreeSitterHighlighter::new());
    }

    let delay = Duration::from_millis(args.delay_ms);
    for chunk in chunks_of(&content, args.chunk) {
        if let Err(e) = session.push(chunk) {
            eprintln!("md-live: {e}");
            process::exit(1);
        }
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    if let Err(e) = session.finish() {
        eprintln!("md-live: {e}");
        process::exit(1);
    }
}
