//! Microphone capture via CPAL.
//!
//! `Recorder` owns device selection; `FrameSource` owns the live input
//! stream for one session. Samples are converted to f32 and downmixed to
//! mono inside the capture callback, then chunked into fixed-size blocks
//! and pushed onto the bounded hand-off queue.

use super::dispatch::FrameDispatcher;
use super::reader::FrameReader;
use crate::config::SessionConfig;
use crate::error::SessionError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Audio input device wrapper.
pub struct Recorder {
    device: cpal::Device,
}

impl Recorder {
    /// List microphone names so the CLI can expose a human-friendly selector.
    pub fn list_devices() -> Result<Vec<String>, SessionError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|err| SessionError::Device(format!("no input devices available: {err}")))?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Create a recorder, optionally forcing a specific device so users can
    /// pick the right microphone when a machine exposes multiple inputs.
    pub fn new(preferred_device: Option<&str>) -> Result<Self, SessionError> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().map_err(|err| {
                    SessionError::Device(format!("no input devices available: {err}"))
                })?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| {
                        SessionError::Device(format!("input device '{name}' not found"))
                    })?
            }
            None => host.default_input_device().ok_or_else(|| {
                SessionError::Device("no default input device available".to_string())
            })?,
        };
        Ok(Self { device })
    }

    /// Get the name of the active recording device.
    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string())
    }
}

/// One session's exclusive hold on the capture device.
///
/// Construction opens the stream and starts it playing; frames begin
/// flowing into the hand-off queue immediately. `stop()` pauses the stream
/// and dropping the source releases the device.
pub struct FrameSource {
    stream: cpal::Stream,
    dropped: Arc<AtomicUsize>,
    failure: Arc<Mutex<Option<String>>>,
    stopped: bool,
}

impl FrameSource {
    /// Open the device for `cfg` and return the running source together with
    /// the reader end of the hand-off queue.
    ///
    /// Fails with `Device` if the stream cannot be opened and with
    /// `UnsupportedRate` if the device's native rate differs from the
    /// configured processing rate; this crate does not resample.
    pub fn start(
        recorder: &Recorder,
        cfg: &SessionConfig,
        cancel: Arc<AtomicBool>,
    ) -> Result<(Self, FrameReader), SessionError> {
        let default_config = recorder
            .device
            .default_input_config()
            .map_err(|err| SessionError::Device(format!("no default input config: {err}")))?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.into();
        let device_sample_rate = device_config.sample_rate.0;
        let channels = usize::from(device_config.channels.max(1));

        if device_sample_rate != cfg.sample_rate {
            return Err(SessionError::UnsupportedRate {
                actual: device_sample_rate,
                required: cfg.sample_rate,
            });
        }

        debug!(
            device = %recorder.device_name(),
            ?format,
            sample_rate = device_sample_rate,
            channels,
            block_samples = cfg.block_samples,
            "opening capture stream"
        );

        let (sender, receiver) = crossbeam_channel::bounded::<Vec<f32>>(cfg.channel_capacity.max(1));
        let dropped = Arc::new(AtomicUsize::new(0));
        let failure = Arc::new(Mutex::new(None));
        let dispatcher = Arc::new(Mutex::new(FrameDispatcher::new(
            cfg.block_samples,
            sender,
            dropped.clone(),
        )));

        let stream = match format {
            SampleFormat::F32 => {
                let dispatcher = dispatcher.clone();
                let dropped = dropped.clone();
                recorder
                    .device
                    .build_input_stream(
                        &device_config,
                        move |data: &[f32], _| {
                            if let Ok(mut pump) = dispatcher.try_lock() {
                                pump.push(data, channels, |sample| sample);
                            } else {
                                dropped.fetch_add(1, Ordering::Relaxed);
                            }
                        },
                        record_stream_error(failure.clone()),
                        None,
                    )
                    .map_err(|err| SessionError::Device(err.to_string()))?
            }
            SampleFormat::I16 => {
                let dispatcher = dispatcher.clone();
                let dropped = dropped.clone();
                recorder
                    .device
                    .build_input_stream(
                        &device_config,
                        move |data: &[i16], _| {
                            if let Ok(mut pump) = dispatcher.try_lock() {
                                pump.push(data, channels, |sample| sample as f32 / 32_768.0);
                            } else {
                                dropped.fetch_add(1, Ordering::Relaxed);
                            }
                        },
                        record_stream_error(failure.clone()),
                        None,
                    )
                    .map_err(|err| SessionError::Device(err.to_string()))?
            }
            SampleFormat::U16 => {
                let dispatcher = dispatcher.clone();
                let dropped = dropped.clone();
                recorder
                    .device
                    .build_input_stream(
                        &device_config,
                        move |data: &[u16], _| {
                            if let Ok(mut pump) = dispatcher.try_lock() {
                                pump.push(data, channels, |sample| {
                                    (sample as f32 - 32_768.0) / 32_768.0
                                });
                            } else {
                                dropped.fetch_add(1, Ordering::Relaxed);
                            }
                        },
                        record_stream_error(failure.clone()),
                        None,
                    )
                    .map_err(|err| SessionError::Device(err.to_string()))?
            }
            other => {
                return Err(SessionError::Device(format!(
                    "unsupported sample format: {other:?}"
                )))
            }
        };

        stream
            .play()
            .map_err(|err| SessionError::Device(err.to_string()))?;

        let reader = FrameReader::new(
            receiver,
            cfg.block_samples,
            Duration::from_millis(cfg.frame_duration_ms().max(1)),
            failure.clone(),
            cancel,
        );

        Ok((
            Self {
                stream,
                dropped,
                failure,
                stopped: false,
            },
            reader,
        ))
    }

    /// Pause the stream. Safe to call more than once; the device itself is
    /// released when the source is dropped.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Err(err) = self.stream.pause() {
            warn!(%err, "failed to pause capture stream");
        }
    }

    /// Frames discarded because the hand-off queue was full.
    pub fn frames_dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// First mid-stream device error, if any occurred.
    pub fn take_failure(&self) -> Option<String> {
        self.failure
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
    }
}

/// Record the first stream error for the controller to surface; later
/// errors from a dying device would only repeat the story.
fn record_stream_error(
    failure: Arc<Mutex<Option<String>>>,
) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        warn!(%err, "capture stream error");
        if let Ok(mut slot) = failure.lock() {
            slot.get_or_insert_with(|| err.to_string());
        }
    }
}
