//! CLI entry point: run a listening session against the microphone and
//! write each finished utterance to disk as a WAV file.

use anyhow::{Context, Result};
use std::io::BufRead;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voicesplit::audio::Recorder;
use voicesplit::config::AppConfig;
use voicesplit::session::build_classifier;
use voicesplit::{ListenSession, UtteranceSink};

/// Writes utterances as numbered 16-bit mono WAV files, or only logs them
/// when no output directory was given.
struct WavDumpSink {
    out_dir: Option<PathBuf>,
    sample_rate: u32,
    written: usize,
}

impl WavDumpSink {
    fn new(out_dir: Option<PathBuf>, sample_rate: u32) -> Self {
        Self {
            out_dir,
            sample_rate,
            written: 0,
        }
    }

    fn write_wav(&self, path: &PathBuf, samples: &[i16]) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("failed to create '{}'", path.display()))?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer
            .finalize()
            .with_context(|| format!("failed to finalize '{}'", path.display()))?;
        Ok(())
    }
}

impl UtteranceSink for WavDumpSink {
    fn on_utterance(&mut self, samples: Vec<i16>) {
        self.written += 1;
        let seconds = samples.len() as f64 / f64::from(self.sample_rate);
        match &self.out_dir {
            Some(dir) => {
                let path = dir.join(format!("utterance_{:04}.wav", self.written));
                match self.write_wav(&path, &samples) {
                    Ok(()) => info!(
                        utterance = self.written,
                        seconds,
                        path = %path.display(),
                        "utterance written"
                    ),
                    Err(err) => tracing::error!(%err, "failed to write utterance"),
                }
            }
            None => info!(
                utterance = self.written,
                seconds,
                samples = samples.len(),
                "utterance captured (no --out-dir, discarding audio)"
            ),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::parse_args()?;

    if config.list_input_devices {
        let devices = Recorder::list_devices()?;
        if devices.is_empty() {
            println!("No audio input devices detected.");
        } else {
            println!("Audio input devices:");
            for name in devices {
                println!("  {name}");
            }
        }
        return Ok(());
    }

    if let Some(dir) = &config.out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory '{}'", dir.display()))?;
    }

    let recorder = Recorder::new(config.input_device.as_deref())?;
    info!(device = %recorder.device_name(), "using input device");

    let session_cfg = config.session_config();
    let classifier = build_classifier(
        config.classifier,
        config.aggressiveness,
        config.energy_threshold_db,
    );
    let sink = WavDumpSink::new(config.out_dir.clone(), session_cfg.sample_rate);

    let session = ListenSession::start(recorder, session_cfg, classifier, sink);
    println!("Listening; press Enter to stop.");

    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);

    session.stop();
    let metrics = session.join()?;
    println!(
        "Session finished: {} utterance(s), {} frame(s) processed, {} dropped.",
        metrics.utterances, metrics.frames_processed, metrics.frames_dropped
    );
    Ok(())
}
