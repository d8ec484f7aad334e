//! Consumer side of the capture hand-off queue.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Convert one mono f32 frame to the int16 PCM representation the classifier
/// and the utterance sink both consume.
pub(super) fn quantize_frame(frame: &[f32]) -> Vec<i16> {
    frame
        .iter()
        .map(|&sample| {
            let clamped = sample.clamp(-1.0, 1.0);
            (clamped * 32_768.0).clamp(-32_768.0, 32_767.0) as i16
        })
        .collect()
}

/// Lazy, blocking view of the captured frame stream.
///
/// Pulls mono f32 frames off the hand-off queue in capture order and yields
/// them as int16 PCM. The sequence ends — it never errors — when:
/// - a frame arrives shorter than the configured block (stream-end sentinel),
/// - the producer hangs up,
/// - the capture failure slot has been written (the controller surfaces it),
/// - the cancellation flag is observed while waiting for a frame.
///
/// One reader exists per session; a new session builds a new pipeline.
pub struct FrameReader {
    receiver: Receiver<Vec<f32>>,
    block_samples: usize,
    wait: Duration,
    failure: Arc<Mutex<Option<String>>>,
    cancel: Arc<AtomicBool>,
}

impl FrameReader {
    pub(super) fn new(
        receiver: Receiver<Vec<f32>>,
        block_samples: usize,
        wait: Duration,
        failure: Arc<Mutex<Option<String>>>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            receiver,
            block_samples,
            wait,
            failure,
            cancel,
        }
    }

    fn capture_failed(&self) -> bool {
        self.failure
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(true)
    }
}

impl Iterator for FrameReader {
    type Item = Vec<i16>;

    fn next(&mut self) -> Option<Vec<i16>> {
        loop {
            match self.receiver.recv_timeout(self.wait) {
                Ok(frame) => {
                    if frame.len() < self.block_samples {
                        return None;
                    }
                    return Some(quantize_frame(&frame));
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.capture_failed() || self.cancel.load(Ordering::Relaxed) {
                        return None;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}
