pub(crate) mod capture;
pub(crate) mod resampler;
mod session;

pub(crate) use {capture::AudioCapturer, resampler::Resampler};

pub use session::AudioSession;

/// Sample rate of session audio and of the inference engine's input.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;
