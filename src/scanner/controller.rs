//! Scanner lifecycle.
//!
//! Owns the camera stream for the duration of an arm and the task running the
//! frame loop. One emission per arm: after a successful decode the loop
//! suspends itself and the operator re-arms explicitly.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use log::error;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::capture::{CameraDevice, CameraError, CameraFacing, CodeDecoder};
use super::frame_loop::scan_loop;

/// Roughly the display refresh rate.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScannerStatus {
    Idle,
    Scanning,
}

pub struct ScannerController {
    camera: Arc<dyn CameraDevice>,
    decoder: Arc<dyn CodeDecoder>,
    scanning: Arc<AtomicBool>,
    /// Fingerprint of the frame behind the last report. Survives re-arms so
    /// the same static code is not re-reported immediately.
    last_report: Arc<Mutex<Option<String>>>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    tick_interval: Duration,
}

impl ScannerController {
    pub fn new(camera: Arc<dyn CameraDevice>, decoder: Arc<dyn CodeDecoder>) -> Self {
        Self {
            camera,
            decoder,
            scanning: Arc::new(AtomicBool::new(false)),
            last_report: Arc::new(Mutex::new(None)),
            handle: None,
            cancel_token: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn status(&self) -> ScannerStatus {
        if self.scanning.load(Ordering::SeqCst) {
            ScannerStatus::Scanning
        } else {
            ScannerStatus::Idle
        }
    }

    /// Arm the scanner. Any previously held stream is released first, so
    /// repeated starts never leak a camera. On failure the controller stays
    /// `Idle` and the error is returned for the operator, never retried here.
    pub async fn start(
        &mut self,
        facing: CameraFacing,
        payload_tx: mpsc::UnboundedSender<String>,
    ) -> Result<(), CameraError> {
        self.stop().await;

        let stream = self.camera.acquire(facing)?;

        let cancel_token = CancellationToken::new();
        self.scanning.store(true, Ordering::SeqCst);

        let handle = tokio::spawn(scan_loop(
            stream,
            Arc::clone(&self.decoder),
            payload_tx,
            Arc::clone(&self.scanning),
            Arc::clone(&self.last_report),
            cancel_token.clone(),
            self.tick_interval,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Disarm and release the camera. Waits for the loop task, so no payload
    /// emission can happen after this returns. Safe to call when idle.
    pub async fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                error!("scan loop task failed to join: {err}");
            }
        }

        self.scanning.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::capture::{CameraStream, FrameBuffer};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    struct DenyCamera(CameraError);

    impl CameraDevice for DenyCamera {
        fn acquire(&self, _facing: CameraFacing) -> Result<Box<dyn CameraStream>, CameraError> {
            Err(self.0.clone())
        }
    }

    #[derive(Default)]
    struct FakeCamera {
        frames: Mutex<VecDeque<Vec<u8>>>,
        size: (u32, u32),
        acquired: AtomicUsize,
        released: Arc<AtomicUsize>,
        frames_read: Arc<AtomicUsize>,
    }

    struct FakeStream {
        frames: VecDeque<Vec<u8>>,
        size: (u32, u32),
        released: Arc<AtomicUsize>,
        frames_read: Arc<AtomicUsize>,
    }

    impl FakeCamera {
        fn new(size: (u32, u32), frames: Vec<Vec<u8>>) -> Self {
            Self {
                frames: Mutex::new(frames.into()),
                size,
                ..Default::default()
            }
        }
    }

    impl CameraDevice for FakeCamera {
        fn acquire(&self, _facing: CameraFacing) -> Result<Box<dyn CameraStream>, CameraError> {
            self.acquired.fetch_add(1, Ordering::SeqCst);
            let frames = std::mem::take(&mut *self.frames.lock().unwrap());
            Ok(Box::new(FakeStream {
                frames,
                size: self.size,
                released: Arc::clone(&self.released),
                frames_read: Arc::clone(&self.frames_read),
            }))
        }
    }

    impl CameraStream for FakeStream {
        fn read_frame_into(&mut self, buffer: &mut FrameBuffer) -> anyhow::Result<bool> {
            let Some(frame) = self.frames.pop_front() else {
                return Ok(false);
            };
            self.frames_read.fetch_add(1, Ordering::SeqCst);
            buffer.reset(self.size.0, self.size.1);
            buffer.pixels_mut().copy_from_slice(&frame);
            Ok(true)
        }

        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FixedDecoder(Option<String>);

    impl CodeDecoder for FixedDecoder {
        fn decode(&self, _pixels: &[u8], _width: u32, _height: u32) -> Option<String> {
            self.0.clone()
        }
    }

    fn gradient_frame(width: u32, height: u32) -> Vec<u8> {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..height {
            for x in 0..width {
                let level = (x * 255 / width.max(1)) as u8;
                pixels.extend_from_slice(&[level, level, level, 255]);
            }
        }
        pixels
    }

    fn controller(camera: Arc<dyn CameraDevice>, decoder: Arc<dyn CodeDecoder>) -> ScannerController {
        ScannerController::new(camera, decoder).with_tick_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn denied_camera_reports_error_and_stays_idle() {
        let camera = Arc::new(DenyCamera(CameraError::PermissionDenied));
        let decoder = Arc::new(FixedDecoder(Some("abc-123".to_string())));
        let mut scanner = controller(camera, decoder);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let result = scanner.start(CameraFacing::Environment, tx).await;

        assert_eq!(result, Err(CameraError::PermissionDenied));
        assert_eq!(scanner.status(), ScannerStatus::Idle);
        assert!(rx.try_recv().is_err(), "no frames may ever be sampled");
    }

    #[tokio::test]
    async fn emits_once_then_suspends_and_releases() {
        let camera = Arc::new(FakeCamera::new(
            (16, 16),
            vec![gradient_frame(16, 16), gradient_frame(16, 16)],
        ));
        let decoder = Arc::new(FixedDecoder(Some("abc-123".to_string())));
        let mut scanner = controller(camera.clone(), decoder);

        let (tx, mut rx) = mpsc::unbounded_channel();
        scanner.start(CameraFacing::Environment, tx).await.unwrap();
        assert_eq!(scanner.status(), ScannerStatus::Scanning);

        let payload = rx.recv().await.expect("decoded payload");
        assert_eq!(payload, "abc-123");

        // The loop marked itself idle and released the stream before sending.
        assert_eq!(scanner.status(), ScannerStatus::Idle);
        assert_eq!(camera.released.load(Ordering::SeqCst), 1);

        // One emission per arm.
        assert!(rx.try_recv().is_err());
        scanner.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_synchronously_final() {
        let camera = Arc::new(FakeCamera::new((16, 16), Vec::new()));
        let decoder = Arc::new(FixedDecoder(None));
        let mut scanner = controller(camera.clone(), decoder);

        let (tx, mut rx) = mpsc::unbounded_channel();
        scanner.start(CameraFacing::Environment, tx).await.unwrap();

        scanner.stop().await;
        assert_eq!(scanner.status(), ScannerStatus::Idle);
        assert_eq!(camera.released.load(Ordering::SeqCst), 1);

        // After stop returns, nothing fires.
        assert!(rx.try_recv().is_err());
        scanner.stop().await;
        assert_eq!(camera.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn restarting_releases_the_previous_stream_first() {
        let camera = Arc::new(FakeCamera::new((16, 16), Vec::new()));
        let decoder = Arc::new(FixedDecoder(None));
        let mut scanner = controller(camera.clone(), decoder);

        let (tx, _rx) = mpsc::unbounded_channel();
        scanner.start(CameraFacing::Environment, tx.clone()).await.unwrap();
        scanner.start(CameraFacing::Environment, tx).await.unwrap();

        assert_eq!(camera.acquired.load(Ordering::SeqCst), 2);
        assert_eq!(camera.released.load(Ordering::SeqCst), 1);
        assert_eq!(scanner.status(), ScannerStatus::Scanning);

        scanner.stop().await;
        assert_eq!(camera.released.load(Ordering::SeqCst), 2);
    }
}
