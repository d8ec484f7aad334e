//! Command-line parsing and validation helpers.

mod defaults;
mod validation;

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

pub use defaults::{
    default_classifier, DEFAULT_AGGRESSIVENESS, DEFAULT_BLOCK_SAMPLES, DEFAULT_CHANNEL_CAPACITY,
    DEFAULT_ENERGY_THRESHOLD_DB, DEFAULT_PADDING_MS, DEFAULT_SAMPLE_RATE, DEFAULT_TRIGGER_RATIO,
    EARSHOT_SAMPLE_RATE,
};

/// CLI options for the voicesplit segmenter. Validated values keep the
/// capture pipeline within what the classifier backends support.
#[derive(Debug, Parser, Clone)]
#[command(about = "voicesplit — live utterance segmentation", author, version)]
pub struct AppConfig {
    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Processing sample rate the device must capture at (Hz)
    #[arg(long = "sample-rate", default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Captured block size (samples)
    #[arg(long = "block-samples", default_value_t = DEFAULT_BLOCK_SAMPLES)]
    pub block_samples: usize,

    /// Padding window retained before a trigger decision (milliseconds)
    #[arg(long = "padding-ms", default_value_t = DEFAULT_PADDING_MS)]
    pub padding_ms: u64,

    /// Fraction of the padding window that must agree to trigger or release
    #[arg(long = "trigger-ratio", default_value_t = DEFAULT_TRIGGER_RATIO)]
    pub trigger_ratio: f32,

    /// VAD aggressiveness, 0 (permissive) to 3 (aggressive)
    #[arg(long, default_value_t = DEFAULT_AGGRESSIVENESS)]
    pub aggressiveness: u8,

    /// Energy classifier silence threshold (decibels)
    #[arg(long = "energy-threshold-db", allow_hyphen_values = true, default_value_t = DEFAULT_ENERGY_THRESHOLD_DB)]
    pub energy_threshold_db: f32,

    /// Speech classifier implementation to use
    #[arg(long, value_enum, default_value_t = default_classifier())]
    pub classifier: ClassifierKind,

    /// Frame hand-off queue capacity between capture and segmentation
    #[arg(long = "channel-capacity", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Directory to write finished utterances into as WAV files
    #[arg(long = "out-dir")]
    pub out_dir: Option<PathBuf>,
}

/// Tunable parameters for one listening session, snapshot from the CLI.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub sample_rate: u32,
    pub block_samples: usize,
    pub padding_ms: u64,
    pub trigger_ratio: f32,
    pub channel_capacity: usize,
}

impl SessionConfig {
    /// Duration of one captured block, derived from the actual block size.
    pub fn frame_duration_ms(&self) -> u64 {
        ((self.block_samples as u64) * 1_000) / u64::from(self.sample_rate.max(1))
    }

    /// Padding ring capacity in frames.
    pub fn ring_capacity(&self) -> usize {
        let frame_ms = self.frame_duration_ms().max(1);
        ((self.padding_ms / frame_ms) as usize).max(1)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_samples: DEFAULT_BLOCK_SAMPLES,
            padding_ms: DEFAULT_PADDING_MS,
            trigger_ratio: DEFAULT_TRIGGER_RATIO,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Available runtime-selectable classifier implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClassifierKind {
    Earshot,
    Energy,
}

impl ClassifierKind {
    pub fn label(self) -> &'static str {
        match self {
            ClassifierKind::Earshot => "earshot",
            ClassifierKind::Energy => "energy",
        }
    }
}
