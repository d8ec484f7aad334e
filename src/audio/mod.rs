//! Audio capture and utterance segmentation pipeline.
//!
//! Frames flow: device → capture callback (downmix + chunking) → bounded
//! hand-off queue → `FrameReader` (int16 conversion) → `UtteranceSegmenter`
//! (padding ring + hysteresis) → session assembly. Exactly one producer
//! and one consumer share the queue; everything downstream of the reader
//! is single-threaded.

mod dispatch;
mod reader;
mod segmenter;
mod source;
#[cfg(test)]
mod tests;
mod vad;

pub use reader::FrameReader;
pub use segmenter::{SegmentEvent, UtteranceSegmenter};
pub use source::{FrameSource, Recorder};
pub use vad::{EnergyClassifier, SpeechClassifier};
