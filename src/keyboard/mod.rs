//! Keyboard module for operator input
//!
//! Reads single key presses from the raw terminal on a dedicated thread and
//! maps them to abstract commands; the ones the state machine understands
//! become events on the following tick.

mod keys;
mod listener;
mod terminal;

pub use keys::{KeyCommand, HELP};
pub use listener::KeyboardListener;
pub use terminal::console_writer;
