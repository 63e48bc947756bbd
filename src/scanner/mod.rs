pub mod capture;
pub mod controller;
mod fingerprint;
mod frame_loop;

pub use capture::{
    CameraDevice, CameraError, CameraFacing, CameraStream, CodeDecoder, FrameBuffer,
};
pub use controller::{ScannerController, ScannerStatus};
