use crate::{PipelineError, Result};

use std::panic::Location;

use audioadapter_buffers::direct::InterleavedSlice;
use error_location::ErrorLocation;
use rubato::{Fft, FixedSync, Resampler as RubatoResampler};
use tracing::{debug, instrument};

/// Input block size consumed per FFT pass.
const CHUNK_FRAMES: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Mono sample-rate converter from the capture device's native rate to the
/// engine rate.
///
/// Conversion failures surface as [`PipelineError::UnsupportedAudioFormat`]:
/// a device rate the converter cannot handle is a capture format the
/// pipeline does not support.
pub struct Resampler {
    inner: Fft<f32>,
    input_rate: u32,
    output_rate: u32,
    /// Fixed-size input block, reused across passes; short tails are
    /// zero-padded into it.
    scratch_in: Vec<f32>,
    scratch_out: Vec<f32>,
}

impl Resampler {
    #[track_caller]
    #[instrument]
    pub(crate) fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        let inner = Fft::<f32>::new(
            input_rate as usize,
            output_rate as usize,
            CHUNK_FRAMES,
            SUB_CHUNKS,
            1, // mono
            FixedSync::Input,
        )
        .map_err(|e| PipelineError::UnsupportedAudioFormat {
            detail: format!(
                "Cannot convert {} Hz capture to {} Hz: {}",
                input_rate, output_rate, e
            ),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let scratch_out = vec![0.0f32; inner.output_frames_max()];

        debug!(input_rate, output_rate, chunk_frames = CHUNK_FRAMES, "Resampler initialized");

        Ok(Self {
            inner,
            input_rate,
            output_rate,
            scratch_in: vec![0.0f32; CHUNK_FRAMES],
            scratch_out,
        })
    }

    /// Convert a mono buffer to the output rate. The result is trimmed to
    /// the length implied by the rate ratio, discarding padding introduced
    /// by the final partial block.
    #[track_caller]
    #[instrument(skip(self, samples))]
    pub(crate) fn resample(&mut self, samples: &[f32]) -> Result<Vec<f32>> {
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let expected =
            (samples.len() as f64 * f64::from(self.output_rate) / f64::from(self.input_rate))
                as usize;
        let mut output = Vec::with_capacity(expected + self.scratch_out.len());

        for chunk in samples.chunks(CHUNK_FRAMES) {
            self.scratch_in[..chunk.len()].copy_from_slice(chunk);
            self.scratch_in[chunk.len()..].fill(0.0);

            let source =
                InterleavedSlice::new(&self.scratch_in, 1, CHUNK_FRAMES).map_err(|e| {
                    PipelineError::UnsupportedAudioFormat {
                        detail: format!("Failed to wrap input block: {}", e),
                        location: ErrorLocation::from(Location::caller()),
                    }
                })?;

            let capacity = self.scratch_out.len();
            let mut sink = InterleavedSlice::new_mut(&mut self.scratch_out, 1, capacity)
                .map_err(|e| PipelineError::UnsupportedAudioFormat {
                    detail: format!("Failed to wrap output block: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            let (_frames_read, frames_written) = self
                .inner
                .process_into_buffer(&source, &mut sink, None)
                .map_err(|e| PipelineError::UnsupportedAudioFormat {
                    detail: format!("Resampling failed: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            drop(sink);
            output.extend_from_slice(&self.scratch_out[..frames_written]);
        }

        output.truncate(expected);

        debug!(
            input_len = samples.len(),
            output_len = output.len(),
            input_rate = self.input_rate,
            output_rate = self.output_rate,
            "Resampled audio"
        );

        Ok(output)
    }
}
