use super::dispatch::{append_downmixed_samples, FrameDispatcher};
use super::reader::{quantize_frame, FrameReader};
use super::segmenter::PaddingRing;
use super::{EnergyClassifier, SegmentEvent, SpeechClassifier, UtteranceSegmenter};
use crate::config::SessionConfig;
use crossbeam_channel::bounded;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn test_config(sample_rate: u32, block_samples: usize, padding_ms: u64, ratio: f32) -> SessionConfig {
    SessionConfig {
        sample_rate,
        block_samples,
        padding_ms,
        trigger_ratio: ratio,
        channel_capacity: 64,
    }
}

/// Classifier that answers from a pre-recorded script, then says "silence".
struct ScriptedClassifier {
    script: VecDeque<bool>,
}

impl ScriptedClassifier {
    fn new(script: &[bool]) -> Self {
        Self {
            script: script.iter().copied().collect(),
        }
    }
}

impl SpeechClassifier for ScriptedClassifier {
    fn is_speech(&mut self, _frame: &[i16], _sample_rate: u32) -> bool {
        self.script.pop_front().unwrap_or(false)
    }
}

struct ConstantClassifier {
    decision: bool,
}

impl SpeechClassifier for ConstantClassifier {
    fn is_speech(&mut self, _frame: &[i16], _sample_rate: u32) -> bool {
        self.decision
    }
}

fn frame(tag: i16, len: usize) -> Vec<i16> {
    vec![tag; len]
}

fn no_cancel() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

#[test]
fn downmixes_multi_channel_audio() {
    let mut buf = Vec::new();
    let samples = [1.0f32, -1.0, 0.5, 0.5];
    append_downmixed_samples(&mut buf, &samples, 2, |sample| sample);
    assert_eq!(buf, vec![0.0, 0.5]);
}

#[test]
fn preserves_single_channel_audio() {
    let mut buf = Vec::new();
    let samples = [0.1f32, 0.2, 0.3];
    append_downmixed_samples(&mut buf, &samples, 1, |sample| sample);
    assert_eq!(buf, samples);
}

#[test]
fn downmix_averages_partial_trailing_frame() {
    let mut buf = Vec::new();
    let samples = [1.0f32, 3.0, 5.0];
    append_downmixed_samples(&mut buf, &samples, 2, |sample| sample);
    assert_eq!(buf, vec![2.0, 5.0]);
}

#[test]
fn downmix_three_channel_average() {
    let mut buf = Vec::new();
    let samples = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
    append_downmixed_samples(&mut buf, &samples, 3, |sample| sample);
    assert_eq!(buf, vec![2.0, 5.0]);
}

#[test]
fn quantize_scales_and_clamps_to_int16() {
    let frame = [0.0f32, 0.5, 1.0, -1.0, 2.0, -2.0];
    let pcm = quantize_frame(&frame);
    assert_eq!(pcm, vec![0, 16_384, 32_767, -32_768, 32_767, -32_768]);
}

#[test]
fn frame_dispatcher_emits_frames_and_tracks_drops() {
    let (tx, rx) = bounded::<Vec<f32>>(1);
    let dropped = Arc::new(AtomicUsize::new(0));
    let mut dispatcher = FrameDispatcher::new(2, tx, dropped.clone());

    dispatcher.push(&[1.0f32, 2.0, 3.0, 4.0], 1, |sample| sample);

    let frame = rx.try_recv().expect("missing frame");
    assert_eq!(frame, vec![1.0, 2.0]);
    assert_eq!(dropped.load(Ordering::Relaxed), 1);
}

#[test]
fn frame_dispatcher_accumulates_partial_frames() {
    let (tx, rx) = bounded::<Vec<f32>>(1);
    let dropped = Arc::new(AtomicUsize::new(0));
    let mut dispatcher = FrameDispatcher::new(3, tx, dropped);

    dispatcher.push(&[1.0f32, 2.0], 1, |sample| sample);
    assert!(rx.try_recv().is_err());

    dispatcher.push(&[3.0f32, 4.0], 1, |sample| sample);
    let frame = rx.try_recv().expect("missing frame");
    assert_eq!(frame, vec![1.0, 2.0, 3.0]);
}

#[test]
fn frame_dispatcher_downmixes_before_chunking() {
    let (tx, rx) = bounded::<Vec<f32>>(4);
    let dropped = Arc::new(AtomicUsize::new(0));
    let mut dispatcher = FrameDispatcher::new(2, tx, dropped);

    dispatcher.push(&[1.0f32, 3.0, 5.0, 7.0], 2, |sample| sample);
    let frame = rx.try_recv().expect("missing frame");
    assert_eq!(frame, vec![2.0, 6.0]);
}

#[test]
fn padding_ring_evicts_oldest_at_capacity() {
    let mut ring = PaddingRing::new(2);
    ring.push(frame(1, 4), true);
    ring.push(frame(2, 4), false);
    ring.push(frame(3, 4), true);

    assert_eq!(ring.len(), 2);
    let frames: Vec<Vec<i16>> = ring.take_frames().into_iter().collect();
    assert_eq!(frames, vec![frame(2, 4), frame(3, 4)]);
}

#[test]
fn padding_ring_counts_voiced_and_unvoiced() {
    let mut ring = PaddingRing::new(4);
    ring.push(frame(1, 2), true);
    ring.push(frame(2, 2), false);
    ring.push(frame(3, 2), true);

    assert_eq!(ring.voiced(), 2);
    assert_eq!(ring.unvoiced(), 1);
}

#[test]
fn padding_ring_take_frames_empties_the_ring() {
    let mut ring = PaddingRing::new(3);
    ring.push(frame(1, 2), true);
    ring.push(frame(2, 2), true);

    let drained: Vec<Vec<i16>> = ring.take_frames().into_iter().collect();
    assert_eq!(drained, vec![frame(1, 2), frame(2, 2)]);
    assert_eq!(ring.len(), 0);
    assert_eq!(ring.voiced(), 0);
}

#[test]
fn padding_ring_capacity_has_floor_of_one() {
    let ring = PaddingRing::new(0);
    assert_eq!(ring.capacity(), 1);
}

// 10ms blocks at 1kHz with a 40ms window: ring capacity 4, so at ratio 0.75
// the threshold sits at 3.0 and a strict majority needs 4 agreeing frames.
fn small_config() -> SessionConfig {
    test_config(1_000, 10, 40, 0.75)
}

#[test]
fn segmenter_stays_idle_below_threshold() {
    let cfg = small_config();
    let frames: Vec<Vec<i16>> = (0..8).map(|i| frame(i, 10)).collect();
    // Three voiced frames never strictly exceed 0.75 * 4.
    let script = [true, true, true, false, false, false, false, false];
    let segmenter = UtteranceSegmenter::new(
        frames.into_iter(),
        Box::new(ScriptedClassifier::new(&script)),
        &cfg,
        no_cancel(),
    );

    assert_eq!(segmenter.count(), 0);
}

#[test]
fn segmenter_triggers_once_voiced_count_exceeds_threshold() {
    let cfg = small_config();
    let frames: Vec<Vec<i16>> = (1..=4).map(|i| frame(i, 10)).collect();
    let mut segmenter = UtteranceSegmenter::new(
        frames.into_iter(),
        Box::new(ConstantClassifier { decision: true }),
        &cfg,
        no_cancel(),
    );
    assert_eq!(segmenter.ring_capacity(), 4);

    // The fourth voiced frame crosses the threshold; the whole window is
    // replayed in arrival order, each frame exactly once.
    let events: Vec<SegmentEvent> = segmenter.by_ref().collect();
    assert_eq!(
        events,
        vec![
            SegmentEvent::Voiced(frame(1, 10)),
            SegmentEvent::Voiced(frame(2, 10)),
            SegmentEvent::Voiced(frame(3, 10)),
            SegmentEvent::Voiced(frame(4, 10)),
        ]
    );
    assert_eq!(segmenter.frames_processed(), 4);
}

#[test]
fn segmenter_replay_includes_unvoiced_padding_frames() {
    let cfg = test_config(1_000, 10, 40, 0.4);
    let frames: Vec<Vec<i16>> = (1..=4).map(|i| frame(i, 10)).collect();
    let script = [false, true, false, true];
    let segmenter = UtteranceSegmenter::new(
        frames.into_iter(),
        Box::new(ScriptedClassifier::new(&script)),
        &cfg,
        no_cancel(),
    );

    // Ratio 0.4 over capacity 4 puts the threshold at 1.6; the second voiced
    // frame (the fourth overall) triggers and the silence captured in the
    // padding window is replayed along with the speech.
    let events: Vec<SegmentEvent> = segmenter.collect();
    assert_eq!(events.len(), 4);
    assert_eq!(events[0], SegmentEvent::Voiced(frame(1, 10)));
    assert_eq!(events[3], SegmentEvent::Voiced(frame(4, 10)));
}

#[test]
fn segmenter_releases_after_sustained_silence() {
    let cfg = test_config(1_000, 10, 20, 0.5);
    // Capacity 2, threshold 1.0: two voiced frames trigger, two unvoiced
    // frames release, and a second burst of speech starts a new utterance.
    let frames: Vec<Vec<i16>> = (1..=6).map(|i| frame(i, 10)).collect();
    let script = [true, true, false, false, true, true];
    let segmenter = UtteranceSegmenter::new(
        frames.into_iter(),
        Box::new(ScriptedClassifier::new(&script)),
        &cfg,
        no_cancel(),
    );

    let events: Vec<SegmentEvent> = segmenter.collect();
    assert_eq!(
        events,
        vec![
            SegmentEvent::Voiced(frame(1, 10)),
            SegmentEvent::Voiced(frame(2, 10)),
            SegmentEvent::Voiced(frame(3, 10)),
            SegmentEvent::Voiced(frame(4, 10)),
            SegmentEvent::Boundary,
            SegmentEvent::Voiced(frame(5, 10)),
            SegmentEvent::Voiced(frame(6, 10)),
        ]
    );
}

#[test]
fn segmenter_matches_reference_timing_scenario() {
    // 320-sample blocks at 16kHz are 20ms, so a 300ms window holds 15
    // frames and ratio 0.75 puts the threshold at 11.25: the 12th
    // consecutive speech frame triggers, the 12th consecutive non-speech
    // frame afterwards releases.
    let cfg = test_config(16_000, 320, 300, 0.75);
    let frames: Vec<Vec<i16>> = (0..24).map(|i| frame(i, 320)).collect();
    let mut script = vec![true; 12];
    script.extend(vec![false; 12]);
    let mut segmenter = UtteranceSegmenter::new(
        frames.into_iter(),
        Box::new(ScriptedClassifier::new(&script)),
        &cfg,
        no_cancel(),
    );
    assert_eq!(segmenter.ring_capacity(), 15);

    let events: Vec<SegmentEvent> = segmenter.by_ref().collect();
    let boundaries = events
        .iter()
        .filter(|event| matches!(event, SegmentEvent::Boundary))
        .count();
    assert_eq!(events.len(), 25, "12 replayed + 12 active + 1 boundary");
    assert_eq!(boundaries, 1);
    assert_eq!(events[24], SegmentEvent::Boundary);
    // Replay covers the 12 speech frames that filled the window, in order.
    for (idx, event) in events[..12].iter().enumerate() {
        assert_eq!(*event, SegmentEvent::Voiced(frame(idx as i16, 320)));
    }
}

#[test]
fn segmenter_yields_nothing_for_pure_silence() {
    let cfg = small_config();
    let frames: Vec<Vec<i16>> = (0..100).map(|_| frame(0, 10)).collect();
    let segmenter = UtteranceSegmenter::new(
        frames.into_iter(),
        Box::new(ConstantClassifier { decision: false }),
        &cfg,
        no_cancel(),
    );
    assert_eq!(segmenter.count(), 0);
}

#[test]
fn short_frame_is_a_stream_end_sentinel() {
    let cfg = small_config();
    let mut frames: Vec<Vec<i16>> = (1..=4).map(|i| frame(i, 10)).collect();
    frames.push(frame(9, 3)); // short: terminates the stream
    frames.push(frame(10, 10)); // must never be reached
    let mut segmenter = UtteranceSegmenter::new(
        frames.into_iter(),
        Box::new(ConstantClassifier { decision: true }),
        &cfg,
        no_cancel(),
    );

    let events: Vec<SegmentEvent> = segmenter.by_ref().collect();
    // The trigger replay is delivered, then the short frame ends the
    // sequence without a boundary; the in-progress utterance is dropped.
    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|e| matches!(e, SegmentEvent::Voiced(_))));
    assert_eq!(segmenter.frames_processed(), 4);
}

#[test]
fn cancellation_terminates_without_boundary() {
    let cfg = small_config();
    let cancel = no_cancel();
    let frames: Vec<Vec<i16>> = (0..50).map(|i| frame(i, 10)).collect();
    let mut segmenter = UtteranceSegmenter::new(
        frames.into_iter(),
        Box::new(ConstantClassifier { decision: true }),
        &cfg,
        cancel.clone(),
    );

    // Let the segmenter trigger and emit part of an utterance.
    let mut events = Vec::new();
    for _ in 0..6 {
        events.push(segmenter.next().expect("expected voiced frame"));
    }
    assert!(events.iter().all(|e| matches!(e, SegmentEvent::Voiced(_))));

    // Cancellation is observed at the next pulled frame; the in-progress
    // utterance is discarded with no trailing boundary.
    cancel.store(true, Ordering::Relaxed);
    assert_eq!(segmenter.next(), None);
    assert_eq!(segmenter.next(), None);
}

#[test]
fn frame_reader_quantizes_full_frames() {
    let (tx, rx) = bounded::<Vec<f32>>(4);
    let failure = Arc::new(Mutex::new(None));
    let mut reader = FrameReader::new(
        rx,
        4,
        Duration::from_millis(5),
        failure,
        no_cancel(),
    );

    tx.send(vec![0.5f32; 4]).unwrap();
    assert_eq!(reader.next(), Some(vec![16_384i16; 4]));
}

#[test]
fn frame_reader_treats_short_frame_as_stream_end() {
    let (tx, rx) = bounded::<Vec<f32>>(4);
    let failure = Arc::new(Mutex::new(None));
    let mut reader = FrameReader::new(
        rx,
        4,
        Duration::from_millis(5),
        failure,
        no_cancel(),
    );

    tx.send(vec![0.1f32; 2]).unwrap();
    assert_eq!(reader.next(), None);
}

#[test]
fn frame_reader_ends_when_producer_disconnects() {
    let (tx, rx) = bounded::<Vec<f32>>(4);
    let failure = Arc::new(Mutex::new(None));
    let mut reader = FrameReader::new(
        rx,
        4,
        Duration::from_millis(5),
        failure,
        no_cancel(),
    );

    drop(tx);
    assert_eq!(reader.next(), None);
}

#[test]
fn frame_reader_ends_on_recorded_capture_failure() {
    let (tx, rx) = bounded::<Vec<f32>>(4);
    let failure = Arc::new(Mutex::new(Some("device unplugged".to_string())));
    let mut reader = FrameReader::new(
        rx,
        4,
        Duration::from_millis(1),
        failure,
        no_cancel(),
    );

    // Queue stays quiet; the reader notices the failure on its next poll
    // instead of blocking forever. The sender stays alive to prove the
    // failure slot, not disconnection, ended the stream.
    assert_eq!(reader.next(), None);
    drop(tx);
}

#[test]
fn frame_reader_ends_on_cancellation_while_waiting() {
    let (tx, rx) = bounded::<Vec<f32>>(4);
    let failure = Arc::new(Mutex::new(None));
    let cancel = no_cancel();
    cancel.store(true, Ordering::Relaxed);
    let mut reader = FrameReader::new(rx, 4, Duration::from_millis(1), failure, cancel);

    assert_eq!(reader.next(), None);
    drop(tx);
}

#[test]
fn frame_reader_preserves_capture_order() {
    let (tx, rx) = bounded::<Vec<f32>>(8);
    let failure = Arc::new(Mutex::new(None));
    let mut reader = FrameReader::new(
        rx,
        2,
        Duration::from_millis(5),
        failure,
        no_cancel(),
    );

    for tag in 0..4 {
        tx.send(vec![tag as f32 / 100.0; 2]).unwrap();
    }
    drop(tx);

    let frames: Vec<Vec<i16>> = reader.collect();
    assert_eq!(frames.len(), 4);
    let first: Vec<i16> = frames.iter().map(|f| f[0]).collect();
    let mut sorted = first.clone();
    sorted.sort_unstable();
    assert_eq!(first, sorted, "frames must arrive in capture order");
}

#[test]
fn unknown_device_fails_with_device_error_before_capture() {
    match super::Recorder::new(Some("voicesplit-nonexistent-device")) {
        Err(crate::SessionError::Device(message)) => {
            assert!(!message.is_empty());
        }
        Ok(_) => panic!("opening a nonexistent device must fail"),
        Err(other) => panic!("expected device error, got {other:?}"),
    }
}

#[test]
fn energy_classifier_separates_speech_from_silence() {
    let mut classifier = EnergyClassifier::new(-30.0);
    assert!(!classifier.is_speech(&[], 16_000));
    assert!(!classifier.is_speech(&[30i16; 160], 16_000));
    assert!(classifier.is_speech(&[3_000i16; 160], 16_000));
}

#[test]
fn energy_classifier_name_is_stable() {
    let classifier = EnergyClassifier::new(-55.0);
    assert_eq!(classifier.name(), "energy_classifier");
}

#[test]
fn classifier_default_name_is_stable() {
    let classifier = ConstantClassifier { decision: false };
    assert_eq!(classifier.name(), "unknown_classifier");
}
