// SPDX-License-Identifier: MIT
//
// Terminal control — TTY queries, screen modes, and panic-safe cleanup.
//
// Safety: this module necessarily uses `unsafe` for isatty, ioctl
// (TIOCGWINSZ) and raw fd writes. These are the standard POSIX interfaces
// for terminal queries and there is no safe alternative. Each unsafe block
// is minimal.
#![allow(unsafe_code)]
//
// Unlike a full TUI, a streaming renderer only *writes*: it never needs raw
// mode, mouse tracking or a keyboard protocol. What it does need is cursor
// visibility, optionally the alternate screen, synchronised updates around
// each patch, and a guarantee that all of that is undone when the process
// leaves, even through a panic.
//
// The panic hook bypasses Rust's stdout lock entirely, writing a pre-built
// restore sequence directly to fd 1. This prevents deadlock if the panic
// happened while the lock was held (common during a patch write). One raw
// write, everything restored, then the original panic handler prints its
// message to a working terminal.

use std::io::{self, Write};
use std::sync::Once;

use crate::ansi;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

// ─── Terminal queries ───────────────────────────────────────────────────────

/// Query the current terminal size via `ioctl(TIOCGWINSZ)` on stdout.
///
/// Returns `None` if stdout is not a terminal or the query fails.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    } else {
        None
    }
}

#[cfg(not(unix))]
#[must_use]
pub fn get_size() -> Option<Size> {
    None
}

/// Check whether stdout is connected to a terminal (TTY).
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDOUT_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Panic-safe restore ─────────────────────────────────────────────────────

/// Complete restore sequence for emergency use.
///
/// End synchronised output, reset SGR, show the cursor, exit the alternate
/// screen. Ordered so the restored shell content appears with no artifacts;
/// alternate screen exit comes last.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[?2026l\
    \x1b[0m\
    \x1b[?25h\
    \x1b[?1049l";

/// Panic hook guard: the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that restores the terminal before printing the error.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            original(info);
        }));
    });
}

/// Write the restore sequence directly to stdout's file descriptor,
/// bypassing Rust's `io::stdout()` lock.
fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// Terminal handle with RAII cleanup.
///
/// [`enter`](Self::enter) hides the cursor and optionally switches to the
/// alternate screen; [`write_patch`](Self::write_patch) brackets each patch
/// in a synchronised update so the terminal never shows a half-applied
/// frame. Everything is undone on [`leave`](Self::leave) or drop, panic
/// included.
pub struct Terminal {
    alt_screen: bool,
    sync_updates: bool,
    active: bool,
}

impl Terminal {
    /// Create an inactive handle. Call [`enter`](Self::enter) to switch
    /// modes.
    #[must_use]
    pub const fn new(alt_screen: bool, sync_updates: bool) -> Self {
        Self {
            alt_screen,
            sync_updates,
            active: false,
        }
    }

    /// Whether [`enter`](Self::enter) has been called without a matching
    /// [`leave`](Self::leave).
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Hide the cursor, optionally enter the alternate screen, and install
    /// the panic hook. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }
        install_panic_hook();

        let stdout = io::stdout();
        let mut lock = stdout.lock();
        if self.alt_screen {
            lock.write_all(ansi::ALT_SCREEN_ENTER.as_bytes())?;
            lock.write_all(ansi::CLEAR_SCREEN.as_bytes())?;
            lock.write_all(ansi::CURSOR_HOME.as_bytes())?;
        }
        lock.write_all(ansi::CURSOR_HIDE.as_bytes())?;
        lock.flush()?;

        self.active = true;
        Ok(())
    }

    /// Restore the terminal. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        lock.write_all(ansi::SYNC_END.as_bytes())?;
        lock.write_all(ansi::SGR_RESET.as_bytes())?;
        lock.write_all(ansi::CURSOR_SHOW.as_bytes())?;
        if self.alt_screen {
            lock.write_all(ansi::ALT_SCREEN_EXIT.as_bytes())?;
        }
        lock.flush()?;

        self.active = false;
        Ok(())
    }

    /// Write one patch to stdout, bracketed in a synchronised update when
    /// enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn write_patch(&mut self, patch: &str) -> io::Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        if self.sync_updates {
            lock.write_all(ansi::SYNC_BEGIN.as_bytes())?;
        }
        lock.write_all(patch.as_bytes())?;
        if self.sync_updates {
            lock.write_all(ansi::SYNC_END.as_bytes())?;
        }
        lock.flush()
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.active {
            let _ = self.leave();
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
