//! Read-only display projection of the state machine

use serde::Serialize;

/// Named display colors for the status indicators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Black,
    Pink,
    Cyan,
    Gray,
    Yellow,
    Green,
    Red,
    Brick,
    Purple,
    Blue,
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Color::Black => "black",
            Color::Pink => "pink",
            Color::Cyan => "cyan",
            Color::Gray => "gray",
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Red => "red",
            Color::Brick => "brick",
            Color::Purple => "purple",
            Color::Blue => "blue",
        };
        f.write_str(name)
    }
}

/// Status shown to the operator, refreshed synchronously by every crank
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Short status label
    pub label: &'static str,
    /// Status box color
    pub color: Color,
    /// Remaining recognition window in `[0.0, 1.0]`; zero unless listening
    pub progress: f64,
    /// Color of the speech-exchange indicator
    pub exchange_color: Color,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            label: "HALT",
            color: Color::Red,
            progress: 0.0,
            exchange_color: Color::Gray,
        }
    }
}
