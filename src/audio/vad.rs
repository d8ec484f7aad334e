//! Per-frame speech/non-speech classification.
//!
//! The segmenter treats the classifier as a black box: one fixed-size block
//! of int16 PCM in, one boolean out. Hysteresis and padding live entirely in
//! the segmenter, so classifiers stay stateless or nearly so.

/// Frame-level speech classifier.
///
/// # Frame Size Contract
/// Implementations may require specific frame sizes. The Earshot backend
/// expects 10ms, 20ms, or 30ms worth of samples at 16kHz; the segmenter
/// always hands over the configured block, and adapters are responsible
/// for slicing it into whatever their model wants.
pub trait SpeechClassifier {
    /// Classify one mono int16 PCM frame captured at `sample_rate`.
    fn is_speech(&mut self, frame: &[i16], sample_rate: u32) -> bool;

    /// Discard any internal model state between sessions.
    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "unknown_classifier"
    }
}

/// Lightweight fallback classifier that thresholds RMS energy. Used when
/// Earshot is disabled or unavailable.
#[derive(Debug, Clone)]
pub struct EnergyClassifier {
    threshold_db: f32,
}

impl EnergyClassifier {
    pub fn new(threshold_db: f32) -> Self {
        Self { threshold_db }
    }
}

impl SpeechClassifier for EnergyClassifier {
    fn is_speech(&mut self, frame: &[i16], _sample_rate: u32) -> bool {
        if frame.is_empty() {
            return false;
        }
        let energy: f32 = frame
            .iter()
            .map(|&s| {
                let normalized = f32::from(s) / 32_768.0;
                normalized * normalized
            })
            .sum::<f32>()
            / frame.len() as f32;
        let rms = energy.sqrt().max(1e-6);
        let db = 20.0 * rms.log10();
        db >= self.threshold_db
    }

    fn name(&self) -> &'static str {
        "energy_classifier"
    }
}
