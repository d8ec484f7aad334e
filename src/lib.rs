//! Live utterance segmentation for downstream transcription.
//!
//! Captures microphone audio on a real-time path, classifies fixed-size
//! frames as speech/non-speech, and splits the continuous stream into
//! discrete utterances delimited by silence. Consumers receive each
//! finished utterance as mono int16 PCM through an [`UtteranceSink`].

pub mod audio;
pub mod config;
mod error;
pub mod session;
#[cfg(feature = "vad_earshot")]
pub mod vad_earshot;

pub use error::SessionError;
pub use session::{run_session, ListenSession, SessionMetrics, UtteranceSink};
