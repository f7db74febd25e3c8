//! Murmur Core Library
//!
//! On-device speech capture and transcription pipeline using CPAL, Rubato,
//! Hound, and Whisper.
//!
//! # Example
//!
//! ```no_run
//! use murmur_core::{PipelineConfig, PipelineEvent, TranscriptionPipeline};
//!
//! use std::{path::PathBuf, time::Duration};
//!
//! #[tokio::main]
//! async fn main() -> murmur_core::Result<()> {
//!     let config = PipelineConfig {
//!         model_path: PathBuf::from("models/ggml-base.en.bin"),
//!         vocab_path: PathBuf::from("models/vocab.en.txt"),
//!         recordings_dir: std::env::temp_dir(),
//!         input_device: None,
//!         use_gpu: true,
//!         translate: false,
//!     };
//!     let (pipeline, mut events) = TranscriptionPipeline::new(config)?;
//!
//!     pipeline.start_recording().await?;
//!     tokio::time::sleep(Duration::from_secs(3)).await;
//!     pipeline.stop_recording().await?;
//!
//!     while let Some(event) = events.recv().await {
//!         if let PipelineEvent::TranscriptionResult { text, .. } = &event {
//!             println!("Transcribed: {}", text);
//!         }
//!         if event.is_terminal() {
//!             break;
//!         }
//!     }
//!
//!     pipeline.cleanup().await
//! }
//! ```

mod asr;
mod audio;
mod error;
mod pipeline;

pub use {
    asr::AcousticModel,
    audio::{AudioSession, TARGET_SAMPLE_RATE},
    error::{ErrorKind, PipelineError, Result},
    pipeline::{
        PipelineConfig, PipelineEvent, PipelineEvents, PipelineState, TranscriptionPipeline,
    },
};

#[cfg(test)]
mod tests;
