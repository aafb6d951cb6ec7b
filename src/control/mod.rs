//! Control module: the per-tick loop and its camera/vision/display edges

mod display;
mod runner;
mod vision;

pub use runner::{ControlLoop, LoopSettings};
pub use vision::{ManualVision, SyntheticCamera};
