//! Terminal presentation for watch mode
//!
//! The header line is redrawn in place on every tick; transitions are printed
//! as log lines underneath it. The view counts the lines written below the
//! header, so a redraw can always find it again. When the output is not a
//! terminal the header is printed once and never redrawn.

use std::io::{self, Write};
use std::time::Duration;

use baud_watch::{CancelHandle, TransitionEvent, TransitionKind, WatchEvent, WatchOutcome};
use chrono::{DateTime, Local};
use colored::Colorize;
use crossterm::{cursor, queue, terminal};
use tokio::sync::mpsc;

const HEADER_ACTIVE: &str = "Baud Watch Mode Active | Ctrl+C to Exit";
const HEADER_FINISHED: &str = "Baud Watch Mode | Session Finished";

/// How watch output is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Header redrawn in place with cursor control sequences
    Interactive,
    /// Plain log lines, no cursor movement
    Plain,
    /// One JSON object per transition
    Json,
}

/// Renders a stream of watch events
pub struct WatchView<W: Write> {
    out: W,
    mode: ViewMode,
    /// Lines printed since the header
    lines_below: u16,
}

/// Header text, with the countdown when the session is bounded
pub fn header_text(remaining: Option<Duration>) -> String {
    match remaining {
        Some(remaining) => {
            // round to whole seconds like the countdown a user expects
            let secs = (remaining.as_millis() + 500) / 1000;
            format!(
                "{} | {}",
                HEADER_ACTIVE,
                format!("{}s", secs).truecolor(255, 135, 0).bold()
            )
        }
        None => HEADER_ACTIVE.to_string(),
    }
}

/// One log line for a transition
pub fn transition_line(event: &TransitionEvent) -> String {
    let ts = DateTime::<Local>::from(event.observed_at)
        .format("%H:%M:%S ")
        .to_string()
        .dimmed()
        .italic();

    let badge = match event.kind {
        TransitionKind::Appeared => " CONNECTED ".white().on_green().bold(),
        TransitionKind::Disappeared => " DISCONNECTED ".white().on_red().bold(),
    };

    let mut line = format!(
        "{}{} {}",
        ts,
        badge,
        event.record.name.bright_cyan().bold()
    );
    if event.record.is_resolved() {
        line.push_str(
            &format!(" ({})", event.record.product_name)
                .dimmed()
                .italic()
                .to_string(),
        );
    }
    line
}

impl<W: Write> WatchView<W> {
    /// Create a view writing to `out`
    pub fn new(out: W, mode: ViewMode) -> Self {
        Self {
            out,
            mode,
            lines_below: 0,
        }
    }

    fn draw_header(&mut self, text: &str) -> io::Result<()> {
        let up = self.lines_below.saturating_add(1);
        if let Ok((_, rows)) = terminal::size() {
            // scrolled out of view; some ptys report zero rows
            if rows > 0 && up >= rows {
                return Ok(());
            }
        }

        queue!(
            self.out,
            cursor::SavePosition,
            cursor::MoveToPreviousLine(up),
            terminal::Clear(terminal::ClearType::CurrentLine)
        )?;
        write!(self.out, "{}", text.bright_purple().bold())?;
        queue!(self.out, cursor::RestorePosition)?;
        self.out.flush()
    }

    fn log_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{}", line)?;
        self.lines_below = self.lines_below.saturating_add(1);
        Ok(())
    }

    /// Render one event
    pub fn handle(&mut self, event: &WatchEvent) -> io::Result<()> {
        match (self.mode, event) {
            (ViewMode::Json, WatchEvent::Transition(transition)) => {
                let json = serde_json::to_string(transition).map_err(io::Error::other)?;
                writeln!(self.out, "{}", json)?;
            }
            (ViewMode::Json, _) => {}
            (_, WatchEvent::Started { .. }) => {
                writeln!(self.out, "{}", HEADER_ACTIVE.bright_purple().bold())?;
                self.lines_below = 0;
            }
            (ViewMode::Interactive, WatchEvent::Tick { remaining }) => {
                if remaining.is_some() {
                    self.draw_header(&header_text(*remaining))?;
                }
            }
            (_, WatchEvent::Tick { .. }) => {}
            (_, WatchEvent::Transition(transition)) => {
                self.log_line(&transition_line(transition))?;
            }
            (_, WatchEvent::EnumerationFailed { message }) => {
                let line = format!("{} {}", "Enumeration failed:".red().bold(), message);
                self.log_line(&line)?;
            }
        }
        self.out.flush()
    }

    /// Render the end of a session
    pub fn finish(&mut self, outcome: WatchOutcome) -> io::Result<()> {
        if self.mode == ViewMode::Json {
            return Ok(());
        }

        if self.mode == ViewMode::Interactive {
            self.draw_header(HEADER_FINISHED)?;
        }

        match outcome {
            WatchOutcome::Expired => writeln!(self.out, "\nWatch time expired.")?,
            WatchOutcome::Cancelled => writeln!(self.out, "\nWatch cancelled.")?,
        }
        self.out.flush()
    }

    /// Consume the view, returning the writer
    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

/// Render events until the session closes the channel
///
/// A failed write requests cancellation and drops the receiver, so the session
/// stops instead of waiting on output nobody can see.
pub async fn render_events<W: Write>(
    view: &mut WatchView<W>,
    mut events: mpsc::Receiver<WatchEvent>,
    cancel: &CancelHandle,
) -> io::Result<()> {
    while let Some(event) = events.recv().await {
        if let Err(e) = view.handle(&event) {
            cancel.cancel();
            return Err(e);
        }
    }
    Ok(())
}
