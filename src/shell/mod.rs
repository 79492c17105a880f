//! Console command engine.
//!
//! Raw peer bytes go through the [`LineBuffer`]; each completed line is
//! split into a command token and an argument tail, looked up in the
//! static [`COMMANDS`](commands::COMMANDS) table, and the handler's reply
//! is handed back to the caller for sending.
//!
//! ```text
//!  bytes ──▶ LineBuffer ──▶ "led on" ──▶ ("led", "on") ──▶ cmd_led ──▶ reply
//! ```
//!
//! Line assembly is byte-at-a-time, so the same command text yields the
//! same replies however the transport splits it.

pub mod commands;
pub mod line;

use log::{info, warn};

use crate::error::CommandError;
use commands::{CommandContext, Response, lookup};
use line::LineBuffer;

/// Split a line into its command token and the raw argument tail.
///
/// Leading whitespace is skipped; the tail starts after the first
/// whitespace run following the token and keeps its inner spacing.
pub fn split_command(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start();
    if line.is_empty() {
        return None;
    }
    Some(match line.find(char::is_whitespace) {
        Some(idx) => (&line[..idx], line[idx..].trim_start()),
        None => (line, ""),
    })
}

/// Run one line. `out` always holds the text to send back (possibly
/// empty); the error is for logging only.
pub fn execute(line: &str, ctx: &mut CommandContext<'_>, out: &mut Response) -> Result<(), CommandError> {
    out.clear();
    let Some((name, args)) = split_command(line) else {
        return Ok(());
    };
    match lookup(name) {
        Some(entry) => (entry.handler)(ctx, args, out),
        None => {
            let _ = out.push_str("Unknown command: ");
            let _ = out.push_str(name);
            let _ = out.push_str("\nType 'help' for available commands\n");
            Err(CommandError::UnknownCommand)
        }
    }
}

pub struct CommandDispatcher {
    line: LineBuffer,
    response: Response,
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self {
            line: LineBuffer::new(),
            response: Response::new(),
        }
    }

    /// Feed received bytes. `reply` is called once per completed line
    /// that produced output. Stops early once a reset was requested.
    ///
    /// Returns the number of lines executed.
    pub fn feed(
        &mut self,
        data: &[u8],
        ctx: &mut CommandContext<'_>,
        mut reply: impl FnMut(&str),
    ) -> usize {
        let mut executed = 0;
        for &byte in data {
            let Some(line) = self.line.feed(byte) else {
                continue;
            };
            info!("SHELL: processing '{}'", line);
            executed += 1;
            if let Err(e) = execute(&line, ctx, &mut self.response) {
                warn!("SHELL: '{}' failed: {}", line, e);
            }
            if !self.response.is_empty() {
                reply(&self.response);
            }
            if ctx.reset_requested {
                self.line.clear();
                break;
            }
        }
        executed
    }

    /// Bytes waiting for a terminator.
    pub fn pending(&self) -> &[u8] {
        self.line.pending()
    }
}
