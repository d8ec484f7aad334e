//! Utterance segmentation state machine.
//!
//! Consumes the capture frame stream, classifies each frame, and groups
//! contiguous speech into utterances delimited by `Boundary` events. A
//! padding ring buffer retains the most recent classified frames so that
//! the onset of speech — which happened before the trigger decision could
//! be confirmed — is replayed instead of lost.

use super::vad::SpeechClassifier;
use crate::config::SessionConfig;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// One output event of the segmenter.
///
/// A run of `Voiced` frames followed by a single `Boundary` makes up one
/// utterance. The frame payload is mono int16 PCM of exactly the configured
/// block size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentEvent {
    Voiced(Vec<i16>),
    Boundary,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum TriggerState {
    Idle,
    Active,
}

struct ClassifiedFrame {
    samples: Vec<i16>,
    is_speech: bool,
}

/// Fixed-capacity FIFO of recently classified frames.
///
/// Insertion evicts the oldest entry once full, so the ring always holds
/// the most recent `capacity` frames of history for the majority vote.
pub(super) struct PaddingRing {
    frames: VecDeque<ClassifiedFrame>,
    capacity: usize,
}

impl PaddingRing {
    pub(super) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub(super) fn push(&mut self, samples: Vec<i16>, is_speech: bool) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(ClassifiedFrame { samples, is_speech });
    }

    pub(super) fn voiced(&self) -> usize {
        self.frames.iter().filter(|f| f.is_speech).count()
    }

    pub(super) fn unvoiced(&self) -> usize {
        self.frames.iter().filter(|f| !f.is_speech).count()
    }

    pub(super) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(super) fn len(&self) -> usize {
        self.frames.len()
    }

    /// Remove and return every buffered frame in arrival order.
    pub(super) fn take_frames(&mut self) -> VecDeque<Vec<i16>> {
        self.frames.drain(..).map(|f| f.samples).collect()
    }

    pub(super) fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Stateful filter turning the frame stream into `SegmentEvent`s.
///
/// While `Idle`, frames only accumulate in the padding ring; once voiced
/// frames exceed `ratio * capacity` of the ring, the whole ring is replayed
/// as the start of an utterance and the segmenter goes `Active`. While
/// `Active`, every frame is emitted immediately; once unvoiced frames
/// exceed the same threshold, a single `Boundary` closes the utterance.
///
/// The same ratio gates onset and release. A single misclassified frame
/// can therefore never start or end an utterance on its own.
///
/// The sequence ends when the upstream frame iterator ends (stream-end
/// sentinel included) or when the cancellation flag is set; either way an
/// in-progress utterance is dropped without a trailing `Boundary`.
pub struct UtteranceSegmenter<I> {
    frames: I,
    classifier: Box<dyn SpeechClassifier + Send>,
    ring: PaddingRing,
    trigger_ratio: f32,
    sample_rate: u32,
    block_samples: usize,
    state: TriggerState,
    cancel: Arc<AtomicBool>,
    replay: VecDeque<Vec<i16>>,
    pending_boundary: bool,
    frames_processed: usize,
    done: bool,
}

impl<I> UtteranceSegmenter<I>
where
    I: Iterator<Item = Vec<i16>>,
{
    pub fn new(
        frames: I,
        classifier: Box<dyn SpeechClassifier + Send>,
        cfg: &SessionConfig,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            frames,
            classifier,
            ring: PaddingRing::new(cfg.ring_capacity()),
            trigger_ratio: cfg.trigger_ratio,
            sample_rate: cfg.sample_rate,
            block_samples: cfg.block_samples,
            state: TriggerState::Idle,
            cancel,
            replay: VecDeque::new(),
            pending_boundary: false,
            frames_processed: 0,
            done: false,
        }
    }

    /// Total frames pulled and classified so far.
    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }

    pub fn ring_capacity(&self) -> usize {
        self.ring.capacity()
    }

    fn over_threshold(&self, count: usize) -> bool {
        count as f32 > self.trigger_ratio * self.ring.capacity() as f32
    }
}

impl<I> Iterator for UtteranceSegmenter<I>
where
    I: Iterator<Item = Vec<i16>>,
{
    type Item = SegmentEvent;

    fn next(&mut self) -> Option<SegmentEvent> {
        loop {
            if self.pending_boundary {
                self.pending_boundary = false;
                return Some(SegmentEvent::Boundary);
            }
            if let Some(frame) = self.replay.pop_front() {
                return Some(SegmentEvent::Voiced(frame));
            }
            if self.done {
                return None;
            }

            let Some(frame) = self.frames.next() else {
                self.done = true;
                return None;
            };
            // A short frame is the stream-end sentinel, not data.
            if frame.len() < self.block_samples {
                self.done = true;
                return None;
            }
            if self.cancel.load(Ordering::Relaxed) {
                self.done = true;
                return None;
            }

            let is_speech = self.classifier.is_speech(&frame, self.sample_rate);
            self.frames_processed += 1;

            match self.state {
                TriggerState::Idle => {
                    self.ring.push(frame, is_speech);
                    if self.over_threshold(self.ring.voiced()) {
                        debug!(
                            buffered = self.ring.len(),
                            "speech confirmed, replaying padding window"
                        );
                        self.state = TriggerState::Active;
                        self.replay = self.ring.take_frames();
                    }
                }
                TriggerState::Active => {
                    // The current frame is emitted before it is counted, so
                    // the closing stretch of an utterance is never truncated.
                    self.ring.push(frame.clone(), is_speech);
                    if self.over_threshold(self.ring.unvoiced()) {
                        debug!("silence confirmed, sealing utterance");
                        self.state = TriggerState::Idle;
                        self.ring.clear();
                        self.pending_boundary = true;
                    }
                    return Some(SegmentEvent::Voiced(frame));
                }
            }
        }
    }
}
