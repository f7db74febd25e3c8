use crate::{PipelineError, Result, audio::TARGET_SAMPLE_RATE};

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// One recording, from capture to transcription hand-off.
///
/// Owns the on-disk WAV file backing the session: mono, 16 kHz, 16-bit
/// signed PCM, the inference engine's input contract. Created when
/// recording starts, written once when recording stops, and removed when
/// the pipeline replaces it or tears down.
pub struct AudioSession {
    id: Uuid,
    path: PathBuf,
    duration: Duration,
}

impl AudioSession {
    /// Allocate a session file path under `recordings_dir`, creating the
    /// directory if needed. The file itself is written on finalize.
    #[track_caller]
    pub(crate) fn new(recordings_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(recordings_dir)?;

        let id = Uuid::new_v4();
        let path = recordings_dir.join(format!("session-{id}.wav"));

        debug!(session_id = %id, path = ?path, "Audio session created");

        Ok(Self {
            id,
            path,
            duration: Duration::ZERO,
        })
    }

    /// Unique id for this session, used for event and log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Path of the backing WAV file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sample rate of the session audio.
    pub fn sample_rate(&self) -> u32 {
        TARGET_SAMPLE_RATE
    }

    /// Channel count of the session audio (always mono).
    pub fn channels(&self) -> u16 {
        1
    }

    /// Bit depth of the session audio.
    pub fn bits_per_sample(&self) -> u16 {
        16
    }

    /// Accumulated duration, known once the recording has been finalized.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    fn wav_spec() -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate: TARGET_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    /// Write 16 kHz mono samples as 16-bit PCM, replacing any previous
    /// file content, and record the resulting duration.
    #[track_caller]
    #[instrument(skip(self, samples))]
    pub(crate) fn write_samples(&mut self, samples: &[f32]) -> Result<()> {
        let mut writer =
            WavWriter::create(&self.path, Self::wav_spec()).map_err(PipelineError::from_wav)?;

        for &sample in samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer
                .write_sample((clamped * f32::from(i16::MAX)) as i16)
                .map_err(PipelineError::from_wav)?;
        }

        writer.finalize().map_err(PipelineError::from_wav)?;

        self.duration =
            Duration::from_secs_f64(samples.len() as f64 / f64::from(TARGET_SAMPLE_RATE));

        info!(
            session_id = %self.id,
            sample_count = samples.len(),
            duration_ms = self.duration.as_millis(),
            "Session audio finalized"
        );

        Ok(())
    }

    /// Delete the backing file. A missing file is not an error, so the
    /// call is idempotent and safe on never-finalized sessions.
    pub(crate) fn remove_file(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(session_id = %self.id, path = ?self.path, "Session audio removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
