//! Camera and vision collaborators
//!
//! The control loop only needs a frame per tick and a yes/no "face found"
//! answer with some regions to draw. Real capture and detection live behind
//! these traits; the defaults here keep the kiosk runnable without them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Share of the frame height trimmed from top and bottom before detection
pub const ROI_TRIM_HEIGHT: f32 = 0.1;
/// Share of the frame width trimmed from left and right before detection
pub const ROI_TRIM_WIDTH: f32 = 0.2;

/// One captured image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Packed BGR pixels, row-major
    pub pixels: Vec<u8>,
}

impl Frame {
    /// A black frame of the given size
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 3],
        }
    }

    /// Region searched for faces: the frame minus a border on each side
    pub fn roi(&self) -> Region {
        let y0 = (ROI_TRIM_HEIGHT * self.height as f32) as u32;
        let y1 = ((1.0 - ROI_TRIM_HEIGHT) * self.height as f32) as u32;
        let x0 = (ROI_TRIM_WIDTH * self.width as f32) as u32;
        let x1 = ((1.0 - ROI_TRIM_WIDTH) * self.width as f32) as u32;
        Region {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }
}

/// Axis-aligned rectangle in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Result of one detection pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    pub found: bool,
    pub regions: Vec<Region>,
}

/// Errors from the camera
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("camera could not be opened: {0}")]
    Open(String),

    #[error("frame capture failed: {0}")]
    Capture(String),
}

/// Frame source, polled once per tick
pub trait Camera {
    fn capture(&mut self) -> Result<Frame, CameraError>;
}

/// Face detector
pub trait Vision {
    /// Look for a face, optionally also requiring eyes and/or a grin
    fn detect(&mut self, frame: &Frame, eyes: bool, grin: bool) -> Detection;
}

/// Camera producing blank frames of a fixed size
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    width: u32,
    height: u32,
}

impl SyntheticCamera {
    pub fn open(width: u32, height: u32) -> Result<Self, CameraError> {
        if width == 0 || height == 0 {
            return Err(CameraError::Open(format!(
                "invalid frame size {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }
}

impl Camera for SyntheticCamera {
    fn capture(&mut self) -> Result<Frame, CameraError> {
        Ok(Frame::blank(self.width, self.height))
    }
}

/// Detector whose answer is a switch flipped by the operator
#[derive(Debug, Clone)]
pub struct ManualVision {
    presence: Arc<AtomicBool>,
}

impl ManualVision {
    pub fn new(presence: Arc<AtomicBool>) -> Self {
        Self { presence }
    }
}

impl Vision for ManualVision {
    fn detect(&mut self, frame: &Frame, _eyes: bool, _grin: bool) -> Detection {
        if self.presence.load(Ordering::SeqCst) {
            Detection {
                found: true,
                regions: vec![frame.roi()],
            }
        } else {
            Detection::default()
        }
    }
}
