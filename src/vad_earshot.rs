//! Earshot-powered speech classifier implementing `SpeechClassifier`.

use crate::audio::SpeechClassifier;
use earshot::{VoiceActivityDetector, VoiceActivityProfile};

/// Number of samples in one 20ms detector frame at 16kHz.
const DETECTOR_FRAME_SAMPLES: usize = 320;

/// Thin wrapper that adapts `earshot` to the crate's `SpeechClassifier` trait.
///
/// Earshot evaluates 10/20/30ms frames at 16kHz; capture blocks may be
/// larger, so each block is scanned in 20ms sub-frames and counted as
/// speech if any sub-frame is voiced.
pub struct EarshotClassifier {
    detector: VoiceActivityDetector,
    scratch: Vec<i16>,
}

impl EarshotClassifier {
    /// `aggressiveness` follows the WebRTC VAD scale: 0 (most permissive)
    /// through 3 (most aggressive at rejecting non-speech).
    pub fn new(aggressiveness: u8) -> Self {
        let profile = match aggressiveness {
            0 => VoiceActivityProfile::QUALITY,
            1 => VoiceActivityProfile::LBR,
            2 => VoiceActivityProfile::AGGRESSIVE,
            _ => VoiceActivityProfile::VERY_AGGRESSIVE,
        };
        Self {
            detector: VoiceActivityDetector::new(profile),
            scratch: Vec::new(),
        }
    }
}

impl SpeechClassifier for EarshotClassifier {
    fn is_speech(&mut self, frame: &[i16], _sample_rate: u32) -> bool {
        if frame.is_empty() {
            return false;
        }
        if frame.len() < DETECTOR_FRAME_SAMPLES {
            // Short blocks get zero-padded to one detector frame.
            self.scratch.clear();
            self.scratch.extend_from_slice(frame);
            self.scratch.resize(DETECTOR_FRAME_SAMPLES, 0);
            return matches!(self.detector.predict_16khz(&self.scratch), Ok(true));
        }
        for chunk in frame.chunks_exact(DETECTOR_FRAME_SAMPLES) {
            if matches!(self.detector.predict_16khz(chunk), Ok(true)) {
                return true;
            }
        }
        false
    }

    fn reset(&mut self) {
        self.detector.reset();
    }

    fn name(&self) -> &'static str {
        "earshot_classifier"
    }
}
