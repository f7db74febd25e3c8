use error_location::ErrorLocation;
use thiserror::Error;

/// Broad classification of a [`PipelineError`].
///
/// Failure events delivered to the caller must be `Clone`, while the full
/// error type (which may hold an `io::Error` source) is not. Events carry
/// this kind plus a rendered message instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Microphone missing, busy, or permission denied.
    DeviceUnavailable,
    /// Filesystem failure while creating, writing, or removing session audio.
    Io,
    /// Model or vocabulary file missing/corrupt, or model allocation failed.
    ModelLoad,
    /// Audio data does not match the engine's expected input format.
    UnsupportedAudioFormat,
    /// Operation issued in a state that does not permit it.
    InvalidState,
    /// Runtime failure inside the inference engine.
    Inference,
    /// Work was abandoned after an explicit cancellation request.
    Cancelled,
}

/// Pipeline errors with source location tracking.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Audio input device could not be opened or failed mid-session.
    #[error("Audio device unavailable: {reason} {location}")]
    DeviceUnavailable {
        /// Description of the device failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Filesystem operation on session audio failed.
    #[error("Audio I/O failed: {source} {location}")]
    Io {
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Acoustic model or vocabulary could not be loaded.
    #[error("Model load failed: {reason} {location}")]
    ModelLoad {
        /// Description of the load failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio does not satisfy the engine's input contract.
    #[error("Unsupported audio format: {detail} {location}")]
    UnsupportedAudioFormat {
        /// What was expected and what was found.
        detail: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Operation rejected because the pipeline is in the wrong state.
    #[error("Cannot {operation} while {state} {location}")]
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the pipeline was in.
        state: &'static str,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Transcription failed at runtime.
    #[error("Inference failed: {reason} {location}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Transcription was cancelled before completion. Expected outcome of
    /// an explicit cancellation request, not a fault.
    #[error("Transcription cancelled {location}")]
    Cancelled {
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl PipelineError {
    /// The [`ErrorKind`] classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceUnavailable { .. } => ErrorKind::DeviceUnavailable,
            Self::Io { .. } => ErrorKind::Io,
            Self::ModelLoad { .. } => ErrorKind::ModelLoad,
            Self::UnsupportedAudioFormat { .. } => ErrorKind::UnsupportedAudioFormat,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Inference { .. } => ErrorKind::Inference,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Build an [`PipelineError::InvalidState`] for a rejected operation.
    #[track_caller]
    pub(crate) fn invalid_state(operation: &'static str, state: &'static str) -> Self {
        Self::InvalidState {
            operation,
            state,
            location: ErrorLocation::from(std::panic::Location::caller()),
        }
    }

    /// Map a WAV codec error onto the pipeline taxonomy. I/O failures keep
    /// their `io::Error` source; everything else is a format violation.
    #[track_caller]
    pub(crate) fn from_wav(source: hound::Error) -> Self {
        let location = ErrorLocation::from(std::panic::Location::caller());
        match source {
            hound::Error::IoError(source) => Self::Io { source, location },
            other => Self::UnsupportedAudioFormat {
                detail: other.to_string(),
                location,
            },
        }
    }
}

// Manual From with location tracking. Cannot use #[from] because it does
// not support extra fields.
impl From<std::io::Error> for PipelineError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        PipelineError::Io {
            source,
            location: ErrorLocation::from(std::panic::Location::caller()),
        }
    }
}

/// Result type alias using [`PipelineError`].
pub type Result<T> = std::result::Result<T, PipelineError>;
