// SPDX-License-Identifier: MIT
//
// Error types for the streaming core.
//
// Only the smart strategy with the full-redraw fallback disabled can fail:
// those errors say "the narrow patch you insisted on is not possible".
// With the fallback enabled (the default) every odd transition resolves to
// a full rewrite instead. Highlight failures never surface here at all;
// the plain rendering simply stays on screen.

use std::error::Error;
use std::fmt;
use std::io;

// ─── StreamError ─────────────────────────────────────────────────────────────

/// A push could not produce the patch the configuration demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// A code block closed but no fence position was recorded, so there is
    /// no anchor for an in-place rewrite.
    RewriteStartMissing,
    /// The rendered text before the recorded fence position changed
    /// between pushes; rewriting from the fence would corrupt the screen.
    RewritePrefixChanged,
    /// The new render does not start with the previous one, so it cannot
    /// be emitted as an append.
    NonAppendUpdate,
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RewriteStartMissing => {
                write!(f, "in-place rewrite impossible: no fence position recorded")
            }
            Self::RewritePrefixChanged => {
                write!(f, "in-place rewrite impossible: text before the fence changed")
            }
            Self::NonAppendUpdate => {
                write!(f, "update is not an append and full redraw fallback is disabled")
            }
        }
    }
}

impl Error for StreamError {}

// ─── SessionError ────────────────────────────────────────────────────────────

/// A terminal session failed to start or write.
#[derive(Debug)]
pub enum SessionError {
    /// The session requires a TTY but stdout is not one.
    NotATty,
    /// The renderer refused a patch (see [`StreamError`]).
    Stream(StreamError),
    /// Writing to the terminal failed.
    Io(io::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotATty => write!(f, "stdout is not a terminal"),
            Self::Stream(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "terminal write failed: {e}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotATty => None,
            Self::Stream(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<StreamError> for SessionError {
    fn from(e: StreamError) -> Self {
        Self::Stream(e)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
