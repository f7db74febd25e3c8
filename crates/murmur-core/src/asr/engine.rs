use crate::{
    PipelineError, Result,
    asr::AcousticModel,
    audio::{AudioSession, TARGET_SAMPLE_RATE},
    pipeline::{CallbackChannel, PipelineEvent},
};

use std::{
    panic::Location,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use error_location::ErrorLocation;
use hound::SampleFormat;
use tracing::{debug, info, instrument};
use whisper_rs::{FullParams, SamplingStrategy};

/// Samples per decode window: the model's native 30 s input at 16 kHz.
/// The cancellation flag is checked between windows, bounding abort
/// latency to one window's decode time.
pub(crate) const WINDOW_SAMPLES: usize = TARGET_SAMPLE_RATE as usize * 30;

/// What to do with a session's audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Transcribe in the spoken language.
    Transcribe,
    /// Translate to English while transcribing (multilingual models only).
    Translate,
}

/// Ephemeral binding of a finalized session to a decoding action.
#[derive(Clone, Copy)]
pub struct TranscriptionRequest<'a> {
    /// The finalized recording to run inference on.
    pub session: &'a AudioSession,
    /// Requested decoding action.
    pub action: Action,
}

/// Cheap clonable handle flipping the engine's shared cancellation flag.
///
/// Observed by the inference worker between decode windows; a cancelled
/// run ends with `Err(Cancelled)` instead of a result.
#[derive(Clone, Debug)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Request that the in-flight transcription abandon its work.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clear the flag for a newly accepted request. Must happen at accept
    /// time, before the request's worker spawns, so a cancel issued any
    /// time after acceptance is never erased.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Wrapper around the acoustic model driving one transcription at a time.
///
/// Lifecycle contract: [`load_model`] at most once before any request;
/// [`unload_model`] releases the engine's reference and is a no-op when
/// nothing is loaded.
///
/// [`load_model`]: InferenceEngine::load_model
/// [`unload_model`]: InferenceEngine::unload_model
pub struct InferenceEngine {
    model: Option<Arc<AcousticModel>>,
    cancel: Arc<AtomicBool>,
}

impl InferenceEngine {
    pub(crate) fn new() -> Self {
        Self {
            model: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for cancelling an in-flight transcription without holding
    /// the engine lock.
    pub(crate) fn cancel_token(&self) -> CancelToken {
        CancelToken(Arc::clone(&self.cancel))
    }

    /// Load model weights and vocabulary. At most once per engine; a
    /// second call without an intervening unload is a programming error.
    #[track_caller]
    #[instrument(skip(self, model_path, vocab_path))]
    pub(crate) fn load_model(
        &mut self,
        model_path: &Path,
        vocab_path: &Path,
        use_gpu: bool,
    ) -> Result<()> {
        if self.model.is_some() {
            return Err(PipelineError::invalid_state(
                "load model",
                "a model is already loaded",
            ));
        }

        let model = AcousticModel::load(model_path, vocab_path, use_gpu)?;
        self.model = Some(Arc::new(model));

        Ok(())
    }

    /// Release the engine's reference to the model. No-op when nothing is
    /// loaded. An in-flight worker holds its own `Arc` clone, so weights
    /// referenced by a running inference stay alive until it completes.
    pub(crate) fn unload_model(&mut self) {
        if self.model.take().is_some() {
            info!("Acoustic model unloaded");
        }
    }

    /// Whether a model is currently loaded.
    pub(crate) fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Run one request to completion on a dedicated blocking worker.
    ///
    /// Emits a progress event per decode window, then returns the full
    /// text. `Err(Cancelled)` when the cancellation flag was observed;
    /// empty session audio yields an empty result, not an error. The flag
    /// is never cleared here: the caller resets it via
    /// [`CancelToken::reset`] when the request is accepted, so a cancel
    /// issued between acceptance and decode is honored.
    #[instrument(skip(self, request, events), fields(session_id = %request.session.id()))]
    pub(crate) async fn transcribe(
        &mut self,
        request: TranscriptionRequest<'_>,
        events: &CallbackChannel,
    ) -> Result<String> {
        let model = self
            .model
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| PipelineError::invalid_state("transcribe", "the model is unloaded"))?;

        let session_id = request.session.id();
        let path = request.session.path().to_path_buf();
        let action = request.action;
        let cancel = Arc::clone(&self.cancel);
        let events = events.clone();

        let start = std::time::Instant::now();

        let worker = tokio::task::spawn_blocking(move || -> Result<String> {
            let samples = read_session_audio(&path)?;

            if samples.is_empty() {
                debug!(session_id = %session_id, "Session holds no audio, returning empty result");
                return Ok(String::new());
            }

            let mut text = String::new();

            for window in samples.chunks(WINDOW_SAMPLES) {
                if cancel.load(Ordering::Acquire) {
                    return Err(PipelineError::Cancelled {
                        location: ErrorLocation::from(Location::caller()),
                    });
                }

                let window_text = decode_window(&model, window, action)?;

                if !window_text.is_empty() {
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(&window_text);

                    events.post_blocking(PipelineEvent::TranscriptionProgress {
                        session_id,
                        text: window_text,
                    });
                }
            }

            // A cancel that landed during the last window is still honored:
            // the caller asked for no result and gets an acknowledgement.
            if cancel.load(Ordering::Acquire) {
                return Err(PipelineError::Cancelled {
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            Ok(text)
        });

        let result = worker.await.map_err(|e| PipelineError::Inference {
            reason: format!("Inference worker panicked: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if let Ok(text) = &result {
            info!(
                session_id = %session_id,
                duration_ms = start.elapsed().as_millis(),
                text_len = text.len(),
                "Transcription complete"
            );
        }

        result
    }
}

/// Read session audio, enforcing the engine's input contract: mono,
/// 16 kHz, 16-bit integer or 32-bit float samples. Anything else is a
/// precondition violation, never silently resampled.
#[track_caller]
pub(crate) fn read_session_audio(path: &Path) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path).map_err(PipelineError::from_wav)?;
    let spec = reader.spec();

    if spec.channels != 1 || spec.sample_rate != TARGET_SAMPLE_RATE {
        return Err(PipelineError::UnsupportedAudioFormat {
            detail: format!(
                "Expected mono {} Hz, got {} channel(s) at {} Hz",
                TARGET_SAMPLE_RATE, spec.channels, spec.sample_rate
            ),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| f32::from(v) / f32::from(i16::MAX)))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(PipelineError::from_wav)?,
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(PipelineError::from_wav)?,
        (format, bits) => {
            return Err(PipelineError::UnsupportedAudioFormat {
                detail: format!(
                    "Expected 16-bit int or 32-bit float samples, got {}-bit {:?}",
                    bits, format
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }
    };

    Ok(samples)
}

/// Decode one window of samples with the loaded model.
#[track_caller]
fn decode_window(model: &AcousticModel, samples: &[f32], action: Action) -> Result<String> {
    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

    // English-only models pin the language; multilingual models auto-detect.
    if model.is_multilingual() {
        params.set_language(None);
    } else {
        params.set_language(Some("en"));
    }

    if action == Action::Translate {
        params.set_translate(true);
    }

    if let Some(prompt) = model.vocab_prompt() {
        params.set_initial_prompt(prompt);
    }

    params.set_print_progress(false);
    params.set_print_special(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);
    params.set_suppress_blank(true);
    params.set_suppress_nst(true);

    let mut state = model
        .context()
        .create_state()
        .map_err(|e| PipelineError::Inference {
            reason: format!("Failed to create decode state: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    state
        .full(params, samples)
        .map_err(|e| PipelineError::Inference {
            reason: format!("Decode failed: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let num_segments = state.full_n_segments();
    let mut result = String::with_capacity(num_segments as usize * 256);

    for i in 0..num_segments {
        let segment = state
            .get_segment(i)
            .ok_or_else(|| PipelineError::Inference {
                reason: format!("Failed to get segment {}", i),
                location: ErrorLocation::from(Location::caller()),
            })?;

        result.push_str(&segment.to_string());
        result.push(' ');
    }

    debug!(
        sample_count = samples.len(),
        segment_count = num_segments,
        "Window decoded"
    );

    Ok(result.trim().to_string())
}
