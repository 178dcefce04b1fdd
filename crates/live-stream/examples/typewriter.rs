// SPDX-License-Identifier: MIT
//
// Typewriter demo: stream a markdown document into the terminal a few
// bytes at a time, the way a language model would deliver it.
//
//   cargo run -p live-stream --example typewriter

use std::thread;
use std::time::Duration;

use live_render::TreeSitterHighlighter;
use live_stream::renderer::StreamOptions;
use live_stream::session::{SessionOptions, StreamSession};

const DOCUMENT: &str = "\
# md-live\n\
\n\
Streaming **markdown**, composed *in place*.\n\
\n\
- minimal-movement patches\n\
- in-place code block highlighting\n\
- viewport clipping for long streams\n\
\n\
```rust\n\
fn main() {\n\
    println!(\"hello from the stream\");\n\
}\n\
```\n\
\n\
> The closing fence above triggered the rewrite you just saw.\n";

fn main() {
    let mut session = StreamSession::new(StreamOptions::default(), SessionOptions::default())
        .unwrap_or_else(|e| {
            eprintln!("typewriter: {e}");
            std::process::exit(1);
        });
    session
        .renderer_mut()
        .set_highlighter(TreeSitterHighlighter::new());

    let chunk = 7;
    let mut rest = DOCUMENT;
    while !rest.is_empty() {
        let mut cut = chunk.min(rest.len());
        while !rest.is_char_boundary(cut) {
            cut += 1;
        }
        let (head, tail) = rest.split_at(cut);
        if let Err(e) = session.push(head) {
            eprintln!("typewriter: {e}");
            std::process::exit(1);
        }
        rest = tail;
        thread::sleep(Duration::from_millis(12));
    }

    if let Err(e) = session.finish() {
        eprintln!("typewriter: {e}");
        std::process::exit(1);
    }
}
