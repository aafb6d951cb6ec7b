//! Console status display
//!
//! Stands in for the camera overlay: the status box, strike marks,
//! recognition progress bar, eye/grin indicators and frame rate are rendered
//! as one text line, logged whenever it changes.

use std::time::Instant;

use tracing::{debug, info};

use crate::context::Context;
use crate::state::Snapshot;

/// Ticks between frame-rate recalculations
const FPS_WINDOW: u32 = 100;

/// Width of the progress bar in characters
const PROGRESS_WIDTH: usize = 10;

/// Frames-per-second meter, recomputed every [`FPS_WINDOW`] ticks
#[derive(Debug, Clone)]
pub struct FrameRate {
    started: Instant,
    frames: u32,
    fps: Option<f64>,
}

impl FrameRate {
    pub fn new(now: Instant) -> Self {
        Self {
            started: now,
            frames: 0,
            fps: None,
        }
    }

    /// Count one frame
    pub fn update(&mut self, now: Instant) {
        self.frames += 1;
        if self.frames == FPS_WINDOW {
            let secs = now.saturating_duration_since(self.started).as_secs_f64();
            if secs > 0.0 {
                self.fps = Some(f64::from(self.frames) / secs);
            }
            self.started = now;
            self.frames = 0;
        }
    }

    /// Latest rate as display text
    pub fn label(&self) -> String {
        match self.fps {
            Some(fps) => format!("{:.1}", fps),
            None => "???".to_string(),
        }
    }
}

/// Render the status line
pub fn status_line(snapshot: &Snapshot, ctx: &Context, fps: &str) -> String {
    let mut line = format!(
        "[{:<4} {}] strikes={} ({})",
        snapshot.label,
        snapshot.color,
        ctx.strike_marks(),
        snapshot.exchange_color
    );
    if ctx.failed {
        line.push_str(" FAIL");
    }

    if snapshot.progress > 0.0 {
        let filled = (snapshot.progress * PROGRESS_WIDTH as f64).ceil() as usize;
        let filled = filled.min(PROGRESS_WIDTH);
        line.push_str(&format!(
            " hear=[{}{}]",
            "#".repeat(filled),
            ".".repeat(PROGRESS_WIDTH - filled)
        ));
    }

    line.push_str(&format!(
        " eyes={} grin={} fps={}",
        if ctx.eyes { "on" } else { "off" },
        if ctx.grin { "on" } else { "off" },
        fps
    ));
    line
}

/// Logs the status line when it changes
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    last: String,
}

impl ConsoleDisplay {
    pub fn render(&mut self, snapshot: &Snapshot, ctx: &Context, fps: &str) {
        let line = status_line(snapshot, ctx, fps);
        if line != self.last {
            info!(status = %line, "monitor");
            if let Ok(json) = serde_json::to_string(snapshot) {
                debug!(snapshot = %json, "snapshot");
            }
            self.last = line;
        }
    }

    pub fn last(&self) -> &str {
        &self.last
    }
}
