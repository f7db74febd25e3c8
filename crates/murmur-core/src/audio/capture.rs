use crate::{PipelineError, Result};

use std::{
    collections::VecDeque,
    panic::Location,
    sync::{
        atomic::{AtomicBool, Ordering},
        {Arc, Mutex},
    },
};

use cpal::{
    Device, Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

/// Maximum mono samples to buffer (5 minutes at 48 kHz).
/// Prevents unbounded memory growth during long recordings.
pub(crate) const MAX_BUFFER_SAMPLES: usize = 48_000 * 60 * 5;

/// Capacity of the streaming block channel. Blocks are forwarded with
/// `try_send` from the audio callback, so a listener that falls behind
/// loses blocks rather than stalling capture; the session file is the
/// lossless path.
pub(crate) const BLOCK_CHANNEL_CAPACITY: usize = 64;

/// Microphone capture at the device's native config, downmixed to mono.
///
/// Samples accumulate in a bounded ring buffer until [`stop`] drains them;
/// each downmixed block is additionally offered to an optional streaming
/// listener registered via [`subscribe_blocks`].
///
/// [`stop`]: AudioCapturer::stop
/// [`subscribe_blocks`]: AudioCapturer::subscribe_blocks
pub struct AudioCapturer {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    samples: Arc<Mutex<VecDeque<f32>>>,
    block_tx: Arc<Mutex<Option<mpsc::Sender<Vec<f32>>>>>,
    /// Signals the audio callback to stop writing. Set to `true` before
    /// dropping the stream so no in-flight callback writes after the
    /// buffer is drained in `stop()`.
    shutdown: Arc<AtomicBool>,
}

impl AudioCapturer {
    /// Open the named input device, or the host default when `device_name`
    /// is `None`.
    #[track_caller]
    #[instrument]
    pub(crate) fn new(device_name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| PipelineError::DeviceUnavailable {
                    reason: format!("Failed to enumerate input devices: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?
                .find(|d| d.name().is_ok_and(|n| n == name))
                .ok_or(PipelineError::DeviceUnavailable {
                    reason: format!("Input device not found: {}", name),
                    location: ErrorLocation::from(Location::caller()),
                })?,
            None => {
                host.default_input_device()
                    .ok_or(PipelineError::DeviceUnavailable {
                        reason: "No default input device".to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    })?
            }
        };

        let config = device
            .default_input_config()
            .map_err(|e| PipelineError::DeviceUnavailable {
                reason: format!("Failed to get input config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(
            device_id = ?device.id(),
            sample_rate = config.sample_rate(),
            channels = config.channels(),
            "AudioCapturer initialized"
        );

        Ok(Self {
            device,
            config: config.into(),
            stream: None,
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_BUFFER_SAMPLES))),
            block_tx: Arc::new(Mutex::new(None)),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Register a streaming listener receiving each captured mono block at
    /// the device rate. Replaces any previous listener.
    pub(crate) fn subscribe_blocks(&self) -> mpsc::Receiver<Vec<f32>> {
        let (tx, rx) = mpsc::channel(BLOCK_CHANNEL_CAPACITY);
        *self
            .block_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(tx);
        rx
    }

    /// Start streaming from the device into the ring buffer.
    #[track_caller]
    #[instrument(skip(self))]
    pub(crate) fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Err(PipelineError::invalid_state("start audio capture", "capturing"));
        }

        let samples = Arc::clone(&self.samples);
        let block_tx = Arc::clone(&self.block_tx);
        let shutdown = Arc::clone(&self.shutdown);
        let channels = usize::from(self.config.channels);

        // Reset shutdown flag and discard samples from a previous session.
        self.shutdown.store(false, Ordering::Release);
        samples
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Check shutdown before acquiring the lock: once stop()
                    // sets this flag, no new samples are written even if the
                    // backend fires one more callback before the stream drops.
                    if shutdown.load(Ordering::Acquire) {
                        return;
                    }

                    let mono = downmix_to_mono(data, channels);

                    // Recover from lock poison rather than dropping audio.
                    // A poisoned mutex means a previous holder panicked, but
                    // the VecDeque data is still valid and usable.
                    let mut buf = samples.lock().unwrap_or_else(|e| {
                        error!("Sample buffer lock poisoned, recovering: {}", e);
                        e.into_inner()
                    });
                    buf.extend(mono.iter().copied());
                    // Ring buffer: O(1) amortized drop of oldest samples.
                    while buf.len() > MAX_BUFFER_SAMPLES {
                        buf.pop_front();
                    }
                    drop(buf);

                    // Never block the audio thread on a slow listener.
                    if let Some(tx) = block_tx
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .as_ref()
                    {
                        let _ = tx.try_send(mono);
                    }
                },
                |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| PipelineError::DeviceUnavailable {
                reason: format!("Failed to build input stream: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        stream.play().map_err(|e| PipelineError::DeviceUnavailable {
            reason: format!("Failed to start input stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        self.stream = Some(stream);
        info!("Audio capture started");

        Ok(())
    }

    /// Stop capturing and drain the buffered mono samples at the device
    /// rate. Returns `None` when no capture was active, so repeated calls
    /// are a no-op and the drained buffer is handed out exactly once.
    #[instrument(skip(self))]
    pub(crate) fn stop(&mut self) -> Option<Vec<f32>> {
        // Signal the callback to stop writing BEFORE dropping the stream:
        // even if a backend's drop is asynchronous, the callback observes
        // the flag and returns early.
        self.shutdown.store(true, Ordering::Release);

        let stream = self.stream.take()?;
        drop(stream);
        // Brief yield so any in-flight callback observes the shutdown flag
        // and completes. Most backends join the audio thread in drop and
        // make this redundant; it costs <5ms where they do not.
        std::thread::sleep(std::time::Duration::from_millis(5));

        let samples: Vec<f32> = {
            let mut buf = self.samples.lock().unwrap_or_else(|e| {
                warn!("Sample buffer lock poisoned, recovering: {}", e);
                e.into_inner()
            });
            buf.drain(..).collect()
        };

        debug!(sample_count = samples.len(), "Audio capture stopped");

        Some(samples)
    }

    /// Native sample rate of the capture device.
    pub(crate) fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }
}

/// Average interleaved frames down to one channel. Already-mono input is
/// copied as-is; a trailing partial frame is discarded.
pub(crate) fn downmix_to_mono(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }

    data.chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
