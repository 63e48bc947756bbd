//! Capture and decode seams.
//!
//! The camera device and the QR decoding algorithm are external
//! collaborators; the scanner only ever talks to these traits.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which camera to ask the platform for.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CameraFacing {
    /// Rear camera, the one pointed at the code being scanned.
    #[default]
    Environment,
    User,
}

/// Camera acquisition failures, categorized so the caller can render the
/// right guidance. Terminal for the attempt; never auto-retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera access was denied; enable camera permissions and try again")]
    PermissionDenied,
    #[error("no camera was found; ensure a camera is connected and enabled")]
    DeviceNotFound,
    #[error("the camera is already in use by another application")]
    DeviceBusy,
    #[error("unexpected camera failure: {0}")]
    Unknown(String),
}

/// Off-screen RGBA bitmap the current frame is rendered into, resized to each
/// frame's native resolution and reused across ticks.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize to the frame's native resolution and zero the pixels.
    pub fn reset(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        let len = (width as usize) * (height as usize) * 4;
        self.pixels.clear();
        self.pixels.resize(len, 0);
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Produces exclusive camera streams.
pub trait CameraDevice: Send + Sync {
    fn acquire(&self, facing: CameraFacing) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// A live camera stream readable as pixel frames.
pub trait CameraStream: Send {
    /// Render the next available frame into `buffer` at its native
    /// resolution. Returns `Ok(false)` when no new frame is ready yet.
    /// Errors are transient (buffer not ready, pixel-read failure) and the
    /// caller is expected to skip the frame.
    fn read_frame_into(&mut self, buffer: &mut FrameBuffer) -> Result<bool>;

    /// Release the underlying capture device.
    fn release(&mut self);
}

/// Decodes a machine-readable code out of a pixel buffer. Pure; returns
/// `None` when the frame holds no decodable code.
pub trait CodeDecoder: Send + Sync {
    fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Option<String>;
}
