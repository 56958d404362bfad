//! The transcript player: replays a scripted terminal session.
//!
//! Each line appears after its per-line delay, so the cumulative delay
//! of line *i* is the sum of the delays for lines `[0..=i]` -- the same
//! cadence rule the playback driver uses for events. The terminal has
//! no pause control; a session either plays to the end or its task is
//! dropped.

use tokio::time::{sleep, Duration};

use duality_demos::TerminalScript;
use duality_types::{TerminalLine, TerminalLineKind};

/// Receives transcript lines as they are revealed.
pub trait LineSink: Send + Sync {
    /// Called once per line, in order, after the line's delay elapsed.
    fn line(&self, line: &TerminalLine);
}

/// Format one transcript line for console display.
///
/// Returns `None` for the trailing cursor marker, which has no console
/// representation.
pub fn format_line(line: &TerminalLine) -> Option<String> {
    match line.kind {
        TerminalLineKind::Cursor => None,
        TerminalLineKind::Command => {
            let prompt = line.prompt.as_deref().unwrap_or("");
            Some(format!("{prompt}{}", line.text))
        }
        TerminalLineKind::Output
        | TerminalLineKind::Data
        | TerminalLineKind::Info
        | TerminalLineKind::Success => Some(line.text.clone()),
    }
}

/// Prints transcript lines to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl LineSink for ConsoleSink {
    fn line(&self, line: &TerminalLine) {
        if let Some(text) = format_line(line) {
            println!("  {text}");
        }
    }
}

/// Replay a terminal session against the given sink.
pub async fn play(session: &TerminalScript, sink: &dyn LineSink) {
    for line in &session.lines {
        sleep(Duration::from_millis(line.delay_ms)).await;
        sink.line(line);
    }
}
