/// Lifecycle state of the transcription pipeline.
///
/// Exactly one state holds at any time. Every public operation checks the
/// current state and either proceeds or is rejected with `InvalidState`;
/// misuse is reported, never silently absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No recording or transcription in progress.
    Idle,
    /// Microphone capture is active.
    Recording,
    /// A finalized recording is being transcribed.
    Transcribing,
}

impl PipelineState {
    /// Human-readable name, used in rejection errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Transcribing => "transcribing",
        }
    }
}
