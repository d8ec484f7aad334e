//! Default values and limits for CLI options.

use super::ClassifierKind;

/// Processing sample rate required of the capture device (Hz).
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Samples per captured block.
pub const DEFAULT_BLOCK_SAMPLES: usize = 640;

/// Padding window retained for the trigger decision (milliseconds).
pub const DEFAULT_PADDING_MS: u64 = 300;

/// Share of the padding window that must agree before the segmenter
/// triggers or releases.
pub const DEFAULT_TRIGGER_RATIO: f32 = 0.75;

/// WebRTC-style VAD aggressiveness (0 permissive .. 3 aggressive).
pub const DEFAULT_AGGRESSIVENESS: u8 = 3;

/// Energy classifier silence threshold (decibels, full scale).
pub const DEFAULT_ENERGY_THRESHOLD_DB: f32 = -55.0;

/// Frame hand-off queue capacity between capture and segmentation.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const MAX_SAMPLE_RATE: u32 = 96_000;

/// Block duration bounds (milliseconds), applied to the derived
/// `block_samples / sample_rate` duration rather than the raw sample count.
pub const MIN_BLOCK_MS: u64 = 5;
pub const MAX_BLOCK_MS: u64 = 120;

pub const MIN_PADDING_MS: u64 = 20;
pub const MAX_PADDING_MS: u64 = 5_000;

pub const MIN_CHANNEL_CAPACITY: usize = 8;
pub const MAX_CHANNEL_CAPACITY: usize = 1_024;

/// Sample rate the earshot classifier supports.
pub const EARSHOT_SAMPLE_RATE: u32 = 16_000;

pub fn default_classifier() -> ClassifierKind {
    #[cfg(feature = "vad_earshot")]
    {
        ClassifierKind::Earshot
    }
    #[cfg(not(feature = "vad_earshot"))]
    {
        ClassifierKind::Energy
    }
}
