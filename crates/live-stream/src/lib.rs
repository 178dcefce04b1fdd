// SPDX-License-Identifier: MIT
//
// live-stream — the streaming render core of md-live.
//
// Chunks of markdown go in; minimal ANSI patches come out. On every chunk
// the accumulated source is re-parsed and re-rendered, the transition is
// classified (append, in-place code block rewrite, or full redraw), and
// the anchored surface produces the shortest patch that realises the new
// state. Syntax highlights that resolve out of band are folded back in as
// in-place rewrites.
//
//   caller ──push──▶ renderer ──parse──▶ tree ──render──▶ text
//                        │                                  │
//                        ◀─────────── patch ◀── surface ◀───┘

pub mod error;
pub mod renderer;
pub mod session;
pub mod stats;
pub mod viewport;

pub use error::{SessionError, StreamError};
pub use renderer::{ColorChoice, Strategy, StreamOptions, StreamRenderer};
pub use session::{SessionOptions, StreamSession};
pub use stats::StreamStats;
