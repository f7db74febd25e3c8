use crate::ErrorKind;

use uuid::Uuid;

/// Events delivered to the pipeline's single consumer.
///
/// For each transcription request, zero or more progress events are
/// followed by exactly one terminal event: result, failure, or
/// cancellation. No further events for that session arrive after the
/// terminal one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// Inference has begun on a finalized recording.
    TranscriptionStarted {
        /// Session the transcription belongs to.
        session_id: Uuid,
    },
    /// Incremental text produced by one decode window.
    TranscriptionProgress {
        /// Session the transcription belongs to.
        session_id: Uuid,
        /// Text decoded from this window.
        text: String,
    },
    /// Terminal: the full transcription text.
    TranscriptionResult {
        /// Session the transcription belongs to.
        session_id: Uuid,
        /// Complete transcription; empty for silent or empty audio.
        text: String,
    },
    /// Terminal: the request failed.
    TranscriptionFailed {
        /// Session the transcription belongs to.
        session_id: Uuid,
        /// Classification of the failure.
        kind: ErrorKind,
        /// Rendered error message.
        message: String,
    },
    /// Terminal: the request was cancelled before completing.
    TranscriptionCancelled {
        /// Session the transcription belongs to.
        session_id: Uuid,
    },
}

impl PipelineEvent {
    /// The session this event belongs to.
    pub fn session_id(&self) -> Uuid {
        match self {
            Self::TranscriptionStarted { session_id }
            | Self::TranscriptionProgress { session_id, .. }
            | Self::TranscriptionResult { session_id, .. }
            | Self::TranscriptionFailed { session_id, .. }
            | Self::TranscriptionCancelled { session_id } => *session_id,
        }
    }

    /// Whether no further events for this session will follow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::TranscriptionResult { .. }
                | Self::TranscriptionFailed { .. }
                | Self::TranscriptionCancelled { .. }
        )
    }
}
