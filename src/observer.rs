//! Live status observer: periodic terminal rendering of a run.
//!
//! The observer polls the status board on a fixed interval and repaints a
//! compact frame — one line per task plus a progress bar — by moving the
//! cursor back over the previous frame. It reads only through
//! `snapshot()` and the progress aggregator, so it can tick at any rate
//! without ever blocking the scheduler.
//!
//! While the observer owns the terminal it flips the board's
//! renderer-activity flag and silences the log's stderr echo; `stop()`
//! paints one final frame with the settled state and restores both.

use crate::progress::completion_percentage;
use crate::state::{StatusBoard, TaskState};
use crate::core::task::TaskStatus;
use crossterm::{cursor, queue, style::Print, terminal};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How often the observer repaints.
pub const RENDER_INTERVAL: Duration = Duration::from_millis(200);

const BAR_WIDTH: usize = 30;

/// Handle to a running render loop.
pub struct StatusObserver {
    board: Arc<StatusBoard>,
    cancel: CancellationToken,
    handle: JoinHandle<u16>,
}

impl StatusObserver {
    /// Start the poll-render loop on the current runtime.
    pub fn start(board: Arc<StatusBoard>) -> Self {
        board.set_active(true);
        crate::log::set_console_echo(false);

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let render_board = board.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(RENDER_INTERVAL);
            let mut painted = 0u16;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        painted = render_frame(&render_board, painted);
                    }
                }
            }
            painted
        });

        Self {
            board,
            cancel,
            handle,
        }
    }

    /// Cancel the loop and paint one final frame synchronously.
    pub async fn stop(self) {
        self.cancel.cancel();
        let painted = self.handle.await.unwrap_or(0);
        render_frame(&self.board, painted);
        self.board.set_active(false);
        crate::log::set_console_echo(true);
    }
}

/// Paint one frame over the previous one; returns the new frame height.
fn render_frame(board: &StatusBoard, prev_lines: u16) -> u16 {
    let snapshot = board.snapshot();
    let mut stderr = io::stderr();
    let _ = draw(&mut stderr, &snapshot, prev_lines);
    (snapshot.len() + 1) as u16
}

fn status_glyph(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "·",
        TaskStatus::Running => "▸",
        TaskStatus::Completed => "✓",
        TaskStatus::Failed => "✗",
    }
}

fn draw(
    out: &mut impl Write,
    snapshot: &HashMap<String, TaskState>,
    prev_lines: u16,
) -> io::Result<()> {
    if prev_lines > 0 {
        queue!(
            out,
            cursor::MoveUp(prev_lines),
            terminal::Clear(terminal::ClearType::FromCursorDown)
        )?;
    }

    let mut ids: Vec<&String> = snapshot.keys().collect();
    ids.sort();

    for id in ids {
        let state = &snapshot[id];
        let mut line = format!("  {} {}", status_glyph(state.status), id);
        if let Some(step) = &state.step {
            line.push_str(&format!("  [{}]", step));
        }
        if let Some(message) = &state.message {
            line.push_str(&format!("  {}", message));
        }
        queue!(out, Print(line), Print("\n"))?;
    }

    let pct = completion_percentage(snapshot);
    let done = snapshot
        .values()
        .filter(|s| s.status.is_finished())
        .count();
    let filled = pct as usize * BAR_WIDTH / 100;
    let bar = format!(
        "[{}{}] {}% ({}/{} done)",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        pct,
        done,
        snapshot.len()
    );
    queue!(out, Print(bar), Print("\n"))?;

    out.flush()
}
