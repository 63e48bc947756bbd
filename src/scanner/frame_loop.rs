use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};

use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::capture::{CameraStream, CodeDecoder, FrameBuffer};
use super::fingerprint::{frame_fingerprint, hamming_distance, FRAME_CHANGE_THRESHOLD};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

// Import the logging macros (exported at crate root)
use crate::{log_info, log_warn};

pub(crate) async fn scan_loop(
    mut stream: Box<dyn CameraStream>,
    decoder: Arc<dyn CodeDecoder>,
    payload_tx: mpsc::UnboundedSender<String>,
    scanning: Arc<AtomicBool>,
    last_report: Arc<Mutex<Option<String>>>,
    cancel_token: CancellationToken,
    tick_interval: Duration,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut buffer = FrameBuffer::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match poll_frame(stream.as_mut(), &mut buffer, decoder.as_ref(), &last_report) {
                    Ok(Some(payload)) => {
                        scanning.store(false, Ordering::SeqCst);
                        stream.release();
                        if payload_tx.send(payload).is_err() {
                            log_warn!("payload receiver dropped before delivery");
                        }
                        log_info!("scan loop suspended after decode");
                        break;
                    }
                    Ok(None) => {}
                    // Transient per-frame failures only cost this frame.
                    Err(err) => log_warn!("frame read failed, skipping frame: {err:#}"),
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("scan loop shutting down");
                stream.release();
                break;
            }
        }
    }
}

/// One tick: read a frame at native resolution, skip it if it is
/// near-identical to the frame that produced the last report, otherwise run
/// the decoder. Returns a non-empty payload at most once.
pub(crate) fn poll_frame(
    stream: &mut dyn CameraStream,
    buffer: &mut FrameBuffer,
    decoder: &dyn CodeDecoder,
    last_report: &Mutex<Option<String>>,
) -> anyhow::Result<Option<String>> {
    if !stream.read_frame_into(buffer)? {
        return Ok(None);
    }
    if buffer.is_empty() {
        return Ok(None);
    }

    let print = frame_fingerprint(buffer.pixels(), buffer.width(), buffer.height()).ok();
    if let Some(current) = &print {
        if let Some(previous) = lock_last_report(last_report).as_deref() {
            if hamming_distance(current, previous) < FRAME_CHANGE_THRESHOLD {
                return Ok(None);
            }
        }
    }

    let Some(payload) = decoder.decode(buffer.pixels(), buffer.width(), buffer.height()) else {
        return Ok(None);
    };
    if payload.is_empty() {
        return Ok(None);
    }

    if print.is_some() {
        *lock_last_report(last_report) = print;
    }
    Ok(Some(payload))
}

fn lock_last_report(mutex: &Mutex<Option<String>>) -> MutexGuard<'_, Option<String>> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct QueueStream {
        frames: VecDeque<Vec<u8>>,
        size: (u32, u32),
    }

    impl CameraStream for QueueStream {
        fn read_frame_into(&mut self, buffer: &mut FrameBuffer) -> anyhow::Result<bool> {
            let Some(frame) = self.frames.pop_front() else {
                return Ok(false);
            };
            buffer.reset(self.size.0, self.size.1);
            buffer.pixels_mut().copy_from_slice(&frame);
            Ok(true)
        }

        fn release(&mut self) {}
    }

    struct FixedDecoder(Option<String>);

    impl CodeDecoder for FixedDecoder {
        fn decode(&self, _pixels: &[u8], _width: u32, _height: u32) -> Option<String> {
            self.0.clone()
        }
    }

    fn gradient_frame(width: u32, height: u32, reversed: bool) -> Vec<u8> {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..height {
            for x in 0..width {
                let step = if reversed { width - 1 - x } else { x };
                let level = (step * 255 / width.max(1)) as u8;
                pixels.extend_from_slice(&[level, level, level, 255]);
            }
        }
        pixels
    }

    #[test]
    fn no_frame_means_no_emission() {
        let mut stream = QueueStream {
            frames: VecDeque::new(),
            size: (16, 16),
        };
        let mut buffer = FrameBuffer::new();
        let decoder = FixedDecoder(Some("abc-123".to_string()));
        let last_report = Mutex::new(None);

        let result = poll_frame(&mut stream, &mut buffer, &decoder, &last_report).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn decode_miss_is_silent() {
        let mut stream = QueueStream {
            frames: VecDeque::from([gradient_frame(16, 16, false)]),
            size: (16, 16),
        };
        let mut buffer = FrameBuffer::new();
        let decoder = FixedDecoder(None);
        let last_report = Mutex::new(None);

        let result = poll_frame(&mut stream, &mut buffer, &decoder, &last_report).unwrap();
        assert!(result.is_none());
        assert!(last_report.lock().unwrap().is_none());
    }

    #[test]
    fn decoded_payload_is_reported_and_fingerprinted() {
        let mut stream = QueueStream {
            frames: VecDeque::from([gradient_frame(16, 16, false)]),
            size: (16, 16),
        };
        let mut buffer = FrameBuffer::new();
        let decoder = FixedDecoder(Some("abc-123".to_string()));
        let last_report = Mutex::new(None);

        let result = poll_frame(&mut stream, &mut buffer, &decoder, &last_report).unwrap();
        assert_eq!(result.as_deref(), Some("abc-123"));
        assert!(last_report.lock().unwrap().is_some());
    }

    #[test]
    fn static_frame_already_reported_is_skipped() {
        let frame = gradient_frame(16, 16, false);
        let mut stream = QueueStream {
            frames: VecDeque::from([frame.clone(), frame.clone()]),
            size: (16, 16),
        };
        let mut buffer = FrameBuffer::new();
        let decoder = FixedDecoder(Some("abc-123".to_string()));
        let last_report = Mutex::new(None);

        let first = poll_frame(&mut stream, &mut buffer, &decoder, &last_report).unwrap();
        assert!(first.is_some());

        let second = poll_frame(&mut stream, &mut buffer, &decoder, &last_report).unwrap();
        assert!(second.is_none(), "identical frame must not be re-reported");
    }

    #[test]
    fn changed_frame_is_decoded_again() {
        let mut stream = QueueStream {
            frames: VecDeque::from([
                gradient_frame(16, 16, false),
                gradient_frame(16, 16, true),
            ]),
            size: (16, 16),
        };
        let mut buffer = FrameBuffer::new();
        let decoder = FixedDecoder(Some("abc-123".to_string()));
        let last_report = Mutex::new(None);

        assert!(poll_frame(&mut stream, &mut buffer, &decoder, &last_report)
            .unwrap()
            .is_some());
        assert!(poll_frame(&mut stream, &mut buffer, &decoder, &last_report)
            .unwrap()
            .is_some());
    }

    #[test]
    fn empty_payload_is_not_an_emission() {
        let mut stream = QueueStream {
            frames: VecDeque::from([gradient_frame(16, 16, false)]),
            size: (16, 16),
        };
        let mut buffer = FrameBuffer::new();
        let decoder = FixedDecoder(Some(String::new()));
        let last_report = Mutex::new(None);

        let result = poll_frame(&mut stream, &mut buffer, &decoder, &last_report).unwrap();
        assert!(result.is_none());
    }
}
