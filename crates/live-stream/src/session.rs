// SPDX-License-Identifier: MIT
//
// Stream session — a renderer wired to the real terminal.
//
// The renderer itself never touches stdout; it hands back patch strings.
// This wrapper owns the plumbing: TTY checks, cursor visibility, the
// optional alternate screen, synchronised updates around each write, and
// printing the complete final render after a clipped stream ends.

use live_term::terminal::{self, Terminal};

use crate::error::SessionError;
use crate::renderer::{StreamOptions, StreamRenderer};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Terminal-side session configuration.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Stream inside the alternate screen (restored on finish).
    pub alt_screen: bool,
    /// Bracket every patch in a synchronised update.
    pub sync_updates: bool,
    /// Fail construction when stdout is not a TTY.
    pub require_tty: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            alt_screen: false,
            sync_updates: true,
            require_tty: false,
        }
    }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// A streaming render session against stdout.
///
/// ```no_run
/// use live_stream::renderer::StreamOptions;
/// use live_stream::session::{SessionOptions, StreamSession};
///
/// let mut session = StreamSession::new(StreamOptions::default(), SessionOptions::default())?;
/// session.push("# Hello\n\nstreaming ")?;
/// session.push("world\n")?;
/// let final_text = session.finish()?;
/// # Ok::<(), live_stream::error::SessionError>(())
/// ```
pub struct StreamSession {
    renderer: StreamRenderer,
    terminal: Terminal,
    alt_screen: bool,
}

impl StreamSession {
    /// Set up the terminal and create the renderer.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotATty`] when a TTY is required but absent, or an
    /// I/O error from the mode switch.
    pub fn new(stream: StreamOptions, session: SessionOptions) -> Result<Self, SessionError> {
        if session.require_tty && !terminal::is_tty() {
            return Err(SessionError::NotATty);
        }
        let mut term = Terminal::new(session.alt_screen, session.sync_updates);
        term.enter()?;
        Ok(Self {
            renderer: StreamRenderer::new(stream),
            terminal: term,
            alt_screen: session.alt_screen,
        })
    }

    /// The underlying renderer, for highlighter/theme installation.
    pub fn renderer_mut(&mut self) -> &mut StreamRenderer {
        &mut self.renderer
    }

    /// Push a chunk and write the resulting patches to the terminal.
    ///
    /// Patches from highlight tasks that completed since the last push are
    /// written first, in emission order, then the chunk's own patch.
    ///
    /// # Errors
    ///
    /// Renderer refusals (narrow-patch configurations) and terminal write
    /// failures.
    pub fn push(&mut self, chunk: &str) -> Result<(), SessionError> {
        let patch = self.renderer.push(chunk)?;
        for late in self.renderer.take_pending_patches() {
            self.terminal.write_patch(&late)?;
        }
        self.terminal.write_patch(&patch)?;
        Ok(())
    }

    /// Wait for outstanding highlights, write their patches, restore the
    /// terminal, and return the complete unclipped render.
    ///
    /// # Errors
    ///
    /// Terminal write failures.
    pub fn finish(mut self) -> Result<String, SessionError> {
        for late in self.renderer.flush() {
            self.terminal.write_patch(&late)?;
        }
        self.terminal.leave()?;
        let full = self.renderer.full_rendered_text().to_string();

        // An alternate-screen stream vanishes with the screen; print the
        // final state where the user can see (and scroll) it.
        if self.alt_screen && !full.is_empty() {
            use std::io::Write;
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(full.as_bytes())?;
            lock.flush()?;
        }
        Ok(full)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
