//! Session orchestration: runs the capture source and the segmenter,
//! assembles voiced frames into utterances, and hands each finished
//! utterance to the caller's sink. `ListenSession` wraps all of that on a
//! worker thread so the caller stays responsive.

use crate::audio::{FrameSource, Recorder, SegmentEvent, SpeechClassifier, UtteranceSegmenter};
use crate::config::SessionConfig;
use crate::error::SessionError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info};

/// Receives each completed, non-empty utterance in session order.
pub trait UtteranceSink {
    fn on_utterance(&mut self, samples: Vec<i16>);
}

impl<F> UtteranceSink for F
where
    F: FnMut(Vec<i16>),
{
    fn on_utterance(&mut self, samples: Vec<i16>) {
        self(samples)
    }
}

/// Counters collected while a session runs, for observability and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetrics {
    pub frames_processed: usize,
    pub voiced_frames: usize,
    pub frames_dropped: usize,
    pub utterances: usize,
    pub cancelled: bool,
}

struct DeliveryStats {
    voiced_frames: usize,
    utterances: usize,
}

/// Drain the segmenter's event stream, growing one utterance buffer at a
/// time and sealing it at each boundary.
///
/// A boundary with nothing accumulated is a legal no-op; the replay-on-
/// trigger design cannot produce one, but the assembler tolerates it. When
/// the event stream ends, whatever is left in the buffer is an unsealed
/// utterance and is discarded, never delivered.
fn deliver_utterances(
    events: &mut dyn Iterator<Item = SegmentEvent>,
    sink: &mut dyn UtteranceSink,
) -> DeliveryStats {
    let mut stats = DeliveryStats {
        voiced_frames: 0,
        utterances: 0,
    };
    let mut pending: Vec<i16> = Vec::new();

    for event in events {
        match event {
            SegmentEvent::Voiced(frame) => {
                stats.voiced_frames += 1;
                pending.extend_from_slice(&frame);
            }
            SegmentEvent::Boundary => {
                if pending.is_empty() {
                    continue;
                }
                stats.utterances += 1;
                debug!(
                    samples = pending.len(),
                    utterance = stats.utterances,
                    "utterance sealed"
                );
                sink.on_utterance(std::mem::take(&mut pending));
            }
        }
    }

    stats
}

/// Run one listening session to completion on the current thread.
///
/// Blocks until the frame stream ends, `cancel` is set, or the device
/// fails. The capture stream is stopped and the device released before
/// this returns; a capture failure is surfaced as an error rather than
/// being passed off as a clean stop.
pub fn run_session(
    recorder: &Recorder,
    cfg: &SessionConfig,
    classifier: Box<dyn SpeechClassifier + Send>,
    sink: &mut dyn UtteranceSink,
    cancel: Arc<AtomicBool>,
) -> Result<SessionMetrics, SessionError> {
    let (mut source, reader) = FrameSource::start(recorder, cfg, cancel.clone())?;
    info!(
        device = %recorder.device_name(),
        classifier = classifier.name(),
        ring_capacity = cfg.ring_capacity(),
        "listening session started"
    );

    let mut segmenter = UtteranceSegmenter::new(reader, classifier, cfg, cancel.clone());
    let stats = deliver_utterances(&mut segmenter, sink);

    source.stop();
    if let Some(message) = source.take_failure() {
        return Err(SessionError::Capture(message));
    }

    let metrics = SessionMetrics {
        frames_processed: segmenter.frames_processed(),
        voiced_frames: stats.voiced_frames,
        frames_dropped: source.frames_dropped(),
        utterances: stats.utterances,
        cancelled: cancel.load(Ordering::Relaxed),
    };
    debug!(
        frames_processed = metrics.frames_processed,
        voiced_frames = metrics.voiced_frames,
        frames_dropped = metrics.frames_dropped,
        utterances = metrics.utterances,
        cancelled = metrics.cancelled,
        "listening session finished"
    );
    Ok(metrics)
}

/// Build the classifier selected by configuration.
pub fn build_classifier(
    kind: crate::config::ClassifierKind,
    aggressiveness: u8,
    energy_threshold_db: f32,
) -> Box<dyn SpeechClassifier + Send> {
    match kind {
        crate::config::ClassifierKind::Energy => {
            Box::new(crate::audio::EnergyClassifier::new(energy_threshold_db))
        }
        crate::config::ClassifierKind::Earshot => {
            #[cfg(feature = "vad_earshot")]
            {
                Box::new(crate::vad_earshot::EarshotClassifier::new(aggressiveness))
            }
            #[cfg(not(feature = "vad_earshot"))]
            {
                let _ = aggressiveness;
                unreachable!("earshot classifier requested without 'vad_earshot' feature")
            }
        }
    }
}

/// Handle for a session running on a worker thread.
pub struct ListenSession {
    cancel: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<Result<SessionMetrics, SessionError>>>,
}

impl ListenSession {
    /// Spawn a worker thread that captures and segments until stopped.
    pub fn start<S>(
        recorder: Recorder,
        cfg: SessionConfig,
        classifier: Box<dyn SpeechClassifier + Send>,
        mut sink: S,
    ) -> Self
    where
        S: UtteranceSink + Send + 'static,
    {
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = cancel.clone();
        let handle = thread::spawn(move || {
            run_session(&recorder, &cfg, classifier, &mut sink, worker_cancel)
        });
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Request a cooperative stop. Idempotent; the session honors it within
    /// roughly one block duration.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Block until the worker exits and the device is released.
    pub fn join(mut self) -> Result<SessionMetrics, SessionError> {
        let Some(handle) = self.handle.take() else {
            return Err(SessionError::Capture("session already joined".to_string()));
        };
        match handle.join() {
            Ok(result) => result,
            Err(_) => Err(SessionError::Capture(
                "session worker panicked".to_string(),
            )),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests<W>(worker: W) -> Self
    where
        W: FnOnce(Arc<AtomicBool>) -> Result<SessionMetrics, SessionError> + Send + 'static,
    {
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = cancel.clone();
        let handle = thread::spawn(move || worker(worker_cancel));
        Self {
            cancel,
            handle: Some(handle),
        }
    }
}

impl Drop for ListenSession {
    fn drop(&mut self) {
        // A dropped handle must not leave the microphone held open.
        self.cancel.store(true, Ordering::Relaxed);
    }
}
