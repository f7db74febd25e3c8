use crate::{
    PipelineError, Result,
    asr::{Action, CancelToken, InferenceEngine, TranscriptionRequest},
    audio::{AudioCapturer, AudioSession, Resampler, TARGET_SAMPLE_RATE},
    pipeline::{CallbackChannel, PipelineEvent, PipelineEvents, PipelineState},
};

use std::{
    path::PathBuf,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// How long cleanup waits for an in-flight transcription to acknowledge
/// cancellation. The worker checks the flag between decode windows, so
/// this is generous; if it still elapses, the worker's own `Arc` keeps
/// the model memory alive until it finishes.
const CLEANUP_JOIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything needed to construct a [`TranscriptionPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Path to the ggml model file. The file name's `.en` stem suffix
    /// selects English-only mode.
    pub model_path: PathBuf,
    /// Path to the vocabulary wordlist biasing decoding.
    pub vocab_path: PathBuf,
    /// Directory session WAV files are written to.
    pub recordings_dir: PathBuf,
    /// Input device name; `None` selects the host default.
    pub input_device: Option<String>,
    /// Use a GPU backend when one was compiled in (Metal/Vulkan).
    pub use_gpu: bool,
    /// Translate to English instead of transcribing in the spoken
    /// language. Only meaningful with a multilingual model.
    pub translate: bool,
}

/// The recording/transcription state machine.
///
/// Sequences microphone capture and inference through
/// `Idle → Recording → Transcribing → Idle`. At most one audio session
/// and one in-flight transcription exist at any time; the acoustic model
/// is loaded once at construction and released once by [`cleanup`].
/// Misuse detected synchronously (`InvalidState`) is returned from the
/// call itself; failures inside an accepted request arrive as exactly one
/// terminal event on the channel returned by [`new`].
///
/// [`new`]: TranscriptionPipeline::new
/// [`cleanup`]: TranscriptionPipeline::cleanup
pub struct TranscriptionPipeline {
    state: Arc<StdMutex<PipelineState>>,
    capturer: Arc<Mutex<AudioCapturer>>,
    engine: Arc<Mutex<InferenceEngine>>,
    cancel: CancelToken,
    events: CallbackChannel,
    /// Session currently owned by capture (Recording state).
    active: Arc<StdMutex<Option<AudioSession>>>,
    /// Last completed session, kept until replaced or torn down.
    finished: Arc<StdMutex<Option<AudioSession>>>,
    /// In-flight transcription task, joined by cleanup.
    task: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
    recordings_dir: PathBuf,
    action: Action,
}

impl std::fmt::Debug for TranscriptionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptionPipeline")
            .field("recordings_dir", &self.recordings_dir)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

impl TranscriptionPipeline {
    /// Construct the pipeline: load the model and vocabulary (the one
    /// blocking, bounded operation in the lifecycle) and open the capture
    /// device. Returns the pipeline and the single event consumer.
    #[track_caller]
    #[instrument(skip(config))]
    pub fn new(config: PipelineConfig) -> Result<(Self, PipelineEvents)> {
        let mut engine = InferenceEngine::new();
        engine.load_model(&config.model_path, &config.vocab_path, config.use_gpu)?;
        let cancel = engine.cancel_token();

        let capturer = AudioCapturer::new(config.input_device.as_deref())?;

        let (events, receiver) = CallbackChannel::new();

        let action = if config.translate {
            Action::Translate
        } else {
            Action::Transcribe
        };

        info!("Transcription pipeline initialized");

        Ok((
            Self {
                state: Arc::new(StdMutex::new(PipelineState::Idle)),
                capturer: Arc::new(Mutex::new(capturer)),
                engine: Arc::new(Mutex::new(engine)),
                cancel,
                events,
                active: Arc::new(StdMutex::new(None)),
                finished: Arc::new(StdMutex::new(None)),
                task: Arc::new(Mutex::new(None)),
                recordings_dir: config.recordings_dir,
                action,
            },
            receiver,
        ))
    }

    /// Begin a new recording session.
    ///
    /// Rejected with `InvalidState` unless the pipeline is idle: a
    /// running recording or a still-unfinished transcription must end
    /// first. Returns the new session's id.
    #[instrument(skip(self))]
    pub async fn start_recording(&self) -> Result<Uuid> {
        {
            let mut state = lock(&self.state);
            if *state != PipelineState::Idle {
                return Err(PipelineError::invalid_state("start recording", state.name()));
            }
            *state = PipelineState::Recording;
        }

        match self.begin_capture().await {
            Ok(session_id) => {
                info!(session_id = %session_id, "Recording started");
                Ok(session_id)
            }
            Err(e) => {
                *lock(&self.state) = PipelineState::Idle;
                Err(e)
            }
        }
    }

    async fn begin_capture(&self) -> Result<Uuid> {
        let mut engine_guard = self.engine.lock().await;
        if !engine_guard.is_loaded() {
            return Err(PipelineError::invalid_state("start recording", "shut down"));
        }
        drop(engine_guard);

        // A new session replaces the previous finished one.
        if let Some(previous) = lock(&self.finished).take() {
            let _ = previous.remove_file();
        }

        let session = AudioSession::new(&self.recordings_dir)?;
        let session_id = session.id();

        self.capturer.lock().await.start()?;
        *lock(&self.active) = Some(session);

        Ok(session_id)
    }

    /// Stop the current recording and submit it for transcription.
    ///
    /// Returns as soon as the request is accepted; capture drain, WAV
    /// finalization, and inference run on background tasks, reporting
    /// through the event channel. Rejected with `InvalidState` unless a
    /// recording is active.
    #[instrument(skip(self))]
    pub async fn stop_recording(&self) -> Result<()> {
        {
            let mut state = lock(&self.state);
            if *state != PipelineState::Recording {
                return Err(PipelineError::invalid_state("stop recording", state.name()));
            }
            *state = PipelineState::Transcribing;
            // Clear stale cancellation while accepting, inside the state
            // lock: a cancel issued any time after acceptance must reach
            // the inference worker, including one that lands while the
            // recording is still being finalized.
            self.cancel.reset();
        }

        let capturer = Arc::clone(&self.capturer);
        let engine = Arc::clone(&self.engine);
        let events = self.events.clone();
        let state = Arc::clone(&self.state);
        let active = Arc::clone(&self.active);
        let finished = Arc::clone(&self.finished);
        let action = self.action;

        let handle = tokio::spawn(async move {
            run_transcription(capturer, engine, events, state, active, finished, action).await;
        });
        *self.task.lock().await = Some(handle);

        info!("Recording stopped, transcription submitted");

        Ok(())
    }

    /// Current pipeline state.
    pub fn state(&self) -> PipelineState {
        *lock(&self.state)
    }

    /// Whether a recording session is active.
    pub fn is_recording(&self) -> bool {
        self.state() == PipelineState::Recording
    }

    /// Whether a transcription is in flight.
    pub fn is_transcribing(&self) -> bool {
        self.state() == PipelineState::Transcribing
    }

    /// Register a streaming listener receiving each captured mono block
    /// at the device rate. Blocks are dropped rather than queued when the
    /// listener lags; the session file is the lossless path.
    pub async fn sample_blocks(&self) -> mpsc::Receiver<Vec<f32>> {
        self.capturer.lock().await.subscribe_blocks()
    }

    /// Full teardown: stop any live capture, cancel and join in-flight
    /// transcription, unload the model, and delete session audio. Safe to
    /// call repeatedly; afterwards new recordings are rejected.
    #[instrument(skip(self))]
    pub async fn cleanup(&self) -> Result<()> {
        // Release the device first so a live recording ends promptly.
        {
            let mut capturer = self.capturer.lock().await;
            let _ = capturer.stop();
        }

        // Cancel, then join. Bounded: the worker observes the flag
        // between decode windows.
        self.cancel.cancel();
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            match tokio::time::timeout(CLEANUP_JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => debug!("In-flight transcription drained"),
                Ok(Err(e)) => error!(error = ?e, "Transcription task panicked during cleanup"),
                Err(_) => warn!(
                    "In-flight transcription did not acknowledge cancellation in time; \
                     its model reference keeps the weights alive until it finishes"
                ),
            }
        }

        // The engine lock is normally free by now; a short timeout keeps
        // cleanup bounded if a straggling worker still holds it.
        match tokio::time::timeout(Duration::from_secs(1), self.engine.lock()).await {
            Ok(mut engine) => engine.unload_model(),
            Err(_) => warn!("Engine still busy, deferring model release to its worker"),
        }

        if let Some(session) = lock(&self.active).take() {
            if let Err(e) = session.remove_file() {
                warn!(error = ?e, "Failed to remove active session audio");
            }
        }
        if let Some(session) = lock(&self.finished).take() {
            if let Err(e) = session.remove_file() {
                warn!(error = ?e, "Failed to remove finished session audio");
            }
        }

        *lock(&self.state) = PipelineState::Idle;

        info!("Pipeline cleaned up");

        Ok(())
    }
}

/// Lock with poison recovery: a panic while holding the lock leaves the
/// protected value itself valid.
fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Drive one accepted request to its single terminal event, then return
/// the pipeline to idle.
#[allow(clippy::too_many_arguments)]
async fn run_transcription(
    capturer: Arc<Mutex<AudioCapturer>>,
    engine: Arc<Mutex<InferenceEngine>>,
    events: CallbackChannel,
    state: Arc<StdMutex<PipelineState>>,
    active: Arc<StdMutex<Option<AudioSession>>>,
    finished: Arc<StdMutex<Option<AudioSession>>>,
    action: Action,
) {
    let Some(session) = lock(&active).take() else {
        // Cleanup raced us and already reclaimed the session.
        error!("No active session at stop, returning to idle");
        *lock(&state) = PipelineState::Idle;
        return;
    };
    let session_id = session.id();
    let session_path = session.path().to_path_buf();

    // Drain the device.
    let (raw, device_rate) = {
        let mut capturer = capturer.lock().await;
        let raw = capturer.stop().unwrap_or_default();
        (raw, capturer.sample_rate())
    };

    // Convert to the engine rate and finalize the session WAV off the
    // async runtime.
    let finalize = tokio::task::spawn_blocking(move || -> crate::Result<AudioSession> {
        let mut session = session;
        let samples = if device_rate == TARGET_SAMPLE_RATE {
            raw
        } else {
            Resampler::new(device_rate, TARGET_SAMPLE_RATE)?.resample(&raw)?
        };
        session.write_samples(&samples)?;
        Ok(session)
    });

    let session = match finalize.await {
        Ok(Ok(session)) => session,
        Ok(Err(e)) => {
            let _ = std::fs::remove_file(&session_path);
            fail(&events, &state, session_id, e).await;
            return;
        }
        Err(e) => {
            let _ = std::fs::remove_file(&session_path);
            let error = PipelineError::Inference {
                reason: format!("Finalize worker panicked: {}", e),
                location: ErrorLocation::from(std::panic::Location::caller()),
            };
            fail(&events, &state, session_id, error).await;
            return;
        }
    };

    events
        .post(PipelineEvent::TranscriptionStarted { session_id })
        .await;

    let request = TranscriptionRequest {
        session: &session,
        action,
    };
    let outcome = engine.lock().await.transcribe(request, &events).await;

    match outcome {
        Ok(text) => {
            events
                .post(PipelineEvent::TranscriptionResult { session_id, text })
                .await;
            *lock(&finished) = Some(session);
            *lock(&state) = PipelineState::Idle;
        }
        Err(PipelineError::Cancelled { .. }) => {
            info!(session_id = %session_id, "Transcription cancelled");
            events
                .post(PipelineEvent::TranscriptionCancelled { session_id })
                .await;
            let _ = session.remove_file();
            *lock(&state) = PipelineState::Idle;
        }
        Err(e) => {
            let _ = session.remove_file();
            fail(&events, &state, session_id, e).await;
        }
    }
}

/// Post the single failure terminal event and return to idle.
async fn fail(
    events: &CallbackChannel,
    state: &Arc<StdMutex<PipelineState>>,
    session_id: Uuid,
    error: PipelineError,
) {
    error!(session_id = %session_id, error = ?error, "Transcription request failed");

    events
        .post(PipelineEvent::TranscriptionFailed {
            session_id,
            kind: error.kind(),
            message: error.to_string(),
        })
        .await;

    *lock(state) = PipelineState::Idle;
}
