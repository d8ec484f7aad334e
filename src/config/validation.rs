use super::defaults::{
    EARSHOT_SAMPLE_RATE, MAX_BLOCK_MS, MAX_CHANNEL_CAPACITY, MAX_PADDING_MS, MAX_SAMPLE_RATE,
    MIN_BLOCK_MS, MIN_CHANNEL_CAPACITY, MIN_PADDING_MS, MIN_SAMPLE_RATE,
};
use super::{AppConfig, ClassifierKind, SessionConfig};
use anyhow::{bail, Result};
use clap::Parser;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values against what the pipeline and classifiers support.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            bail!(
                "--sample-rate must be between {MIN_SAMPLE_RATE} and {MAX_SAMPLE_RATE} Hz, got {}",
                self.sample_rate
            );
        }

        if self.block_samples == 0 {
            bail!("--block-samples must be greater than zero");
        }
        let block_ms = (self.block_samples as u64 * 1_000) / u64::from(self.sample_rate);
        if !(MIN_BLOCK_MS..=MAX_BLOCK_MS).contains(&block_ms) {
            bail!(
                "--block-samples ({}) spans {block_ms} ms at {} Hz; blocks must span {MIN_BLOCK_MS} to {MAX_BLOCK_MS} ms",
                self.block_samples,
                self.sample_rate
            );
        }

        if !(MIN_PADDING_MS..=MAX_PADDING_MS).contains(&self.padding_ms) {
            bail!(
                "--padding-ms must be between {MIN_PADDING_MS} and {MAX_PADDING_MS}, got {}",
                self.padding_ms
            );
        }
        if self.padding_ms < block_ms {
            bail!(
                "--padding-ms ({}) must cover at least one block ({block_ms} ms)",
                self.padding_ms
            );
        }

        if !(self.trigger_ratio > 0.0 && self.trigger_ratio <= 1.0) {
            bail!(
                "--trigger-ratio must be within (0.0, 1.0], got {}",
                self.trigger_ratio
            );
        }

        if self.aggressiveness > 3 {
            bail!(
                "--aggressiveness must be between 0 and 3, got {}",
                self.aggressiveness
            );
        }

        if !(-120.0..=0.0).contains(&self.energy_threshold_db) {
            bail!(
                "--energy-threshold-db must be between -120.0 and 0.0 dB, got {}",
                self.energy_threshold_db
            );
        }

        if !(MIN_CHANNEL_CAPACITY..=MAX_CHANNEL_CAPACITY).contains(&self.channel_capacity) {
            bail!(
                "--channel-capacity must be between {MIN_CHANNEL_CAPACITY} and {MAX_CHANNEL_CAPACITY}, got {}",
                self.channel_capacity
            );
        }

        if matches!(self.classifier, ClassifierKind::Earshot)
            && self.sample_rate != EARSHOT_SAMPLE_RATE
        {
            bail!(
                "--classifier earshot only supports {EARSHOT_SAMPLE_RATE} Hz; use --classifier energy for {} Hz",
                self.sample_rate
            );
        }

        #[cfg(not(feature = "vad_earshot"))]
        if matches!(self.classifier, ClassifierKind::Earshot) {
            bail!("--classifier earshot requires building with the 'vad_earshot' feature");
        }

        Ok(())
    }

    /// Snapshot the CLI-controlled session settings for the pipeline.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            sample_rate: self.sample_rate,
            block_samples: self.block_samples,
            padding_ms: self.padding_ms,
            trigger_ratio: self.trigger_ratio,
            channel_capacity: self.channel_capacity,
        }
    }
}
