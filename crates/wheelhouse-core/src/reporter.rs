//! Reporter trait for dependency injection
//!
//! Index building and synchronization report progress through this trait
//! without being coupled to a terminal. A reporter instance lives for one run
//! and is handed explicitly to whichever component renders progress.

use crossterm::QueueableCommand;
use crossterm::terminal::{Clear, ClearType};
use std::io::{IsTerminal, Write};
use std::sync::Mutex;

/// Width of the `#`/`-` bar.
const BAR_WIDTH: usize = 30;
/// Item names are padded or truncated to this width.
const NAME_WIDTH: usize = 40;

/// Sink for user-facing progress and status lines.
pub trait Reporter: Send + Sync {
    /// Step `index` of `total` in `phase` (1-based), working on `item`.
    fn progress(&self, phase: &str, index: usize, total: usize, item: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Display a final one-line summary.
    fn summary(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn progress(&self, phase: &str, index: usize, total: usize, item: &str) {
        (**self).progress(phase, index, total, item);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn summary(&self, msg: &str) {
        (**self).summary(msg);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn progress(&self, _: &str, _: usize, _: usize, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn summary(&self, _: &str) {}
}

/// Render one progress line: `{phase} [{bar}] {index}/{total} {item}`.
///
/// The item is truncated with `...` past 40 characters and padded to 40 so
/// a shorter redraw fully covers a longer one.
pub fn format_progress_line(phase: &str, index: usize, total: usize, item: &str) -> String {
    let filled = if total == 0 {
        BAR_WIDTH
    } else {
        (BAR_WIDTH * index.min(total)) / total
    };
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled));
    let line = format!("{phase} [{bar}] {index}/{total}");
    if item.is_empty() {
        return line;
    }

    let item = if item.chars().count() > NAME_WIDTH {
        let head: String = item.chars().take(NAME_WIDTH - 3).collect();
        format!("{head}...")
    } else {
        item.to_string()
    };
    format!("{line} {item:<NAME_WIDTH$}")
}

#[derive(Debug, Default)]
struct LineState {
    /// A progress line is on screen without a trailing newline.
    open: bool,
}

/// Terminal reporter that redraws progress in place on a single line.
///
/// Status messages printed while a progress line is open first terminate
/// that line so the two never interleave.
#[derive(Debug)]
pub struct TerminalReporter {
    state: Mutex<LineState>,
    interactive: bool,
}

impl TerminalReporter {
    /// Create a reporter writing to stdout.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LineState::default()),
            interactive: std::io::stdout().is_terminal(),
        }
    }

    fn close_line(&self, out: &mut impl Write) {
        if let Ok(mut state) = self.state.lock() {
            if state.open {
                let _ = writeln!(out);
                state.open = false;
            }
        }
    }

    fn println(&self, msg: &str) {
        let mut out = std::io::stdout().lock();
        self.close_line(&mut out);
        let _ = writeln!(out, "  {msg}");
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for TerminalReporter {
    fn progress(&self, phase: &str, index: usize, total: usize, item: &str) {
        let line = format_progress_line(phase, index, total, item);
        let last = index >= total;
        let mut out = std::io::stdout().lock();

        if !self.interactive {
            // Redraws are meaningless in a log file, one line per step instead.
            let _ = writeln!(out, "  {line}");
            return;
        }

        let _ = write!(out, "\r  {line}");
        let _ = out.queue(Clear(ClearType::UntilNewLine));
        if let Ok(mut state) = self.state.lock() {
            if last {
                let _ = writeln!(out);
                state.open = false;
            } else {
                state.open = true;
            }
        }
        let _ = out.flush();
    }

    fn info(&self, msg: &str) {
        self.println(msg);
    }

    fn warning(&self, msg: &str) {
        self.println(&format!("warn: {msg}"));
    }

    fn summary(&self, msg: &str) {
        self.println(msg);
    }
}
