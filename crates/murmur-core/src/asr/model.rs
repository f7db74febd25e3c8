use crate::{PipelineError, Result};

use std::{panic::Location, path::Path};

use error_location::ErrorLocation;
use tracing::{info, instrument};
use whisper_rs::{WhisperContext, WhisperContextParameters};

/// Loaded Whisper model plus its decoding vocabulary.
///
/// Read-shared behind an `Arc` with at most one inference worker at a
/// time. The engine drops its reference on unload; a worker's clone keeps
/// the weights alive until the in-flight call completes, so running
/// inference never touches freed memory.
pub struct AcousticModel {
    ctx: WhisperContext,
    vocab_prompt: Option<String>,
    multilingual: bool,
}

impl std::fmt::Debug for AcousticModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcousticModel")
            .field("vocab_prompt", &self.vocab_prompt)
            .field("multilingual", &self.multilingual)
            .finish_non_exhaustive()
    }
}

impl AcousticModel {
    /// Whether a model file name denotes a multilingual model.
    ///
    /// Follows the ggml naming convention: an `.en` suffix on the stem
    /// (`ggml-base.en.bin`) marks an English-only model; anything else is
    /// multilingual.
    pub fn multilingual_from_name(model_path: &Path) -> bool {
        !model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| stem.ends_with(".en"))
    }

    /// Default vocabulary file name for a language mode, resolved next to
    /// the model file when no explicit path is configured.
    pub fn default_vocab_name(multilingual: bool) -> &'static str {
        if multilingual { "vocab.txt" } else { "vocab.en.txt" }
    }

    /// Load model weights and the vocabulary wordlist into memory.
    #[track_caller]
    #[instrument(skip(model_path, vocab_path))]
    pub(crate) fn load(model_path: &Path, vocab_path: &Path, use_gpu: bool) -> Result<Self> {
        if !model_path.exists() {
            return Err(PipelineError::ModelLoad {
                reason: format!("Model not found at path: {:?}", model_path),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if !vocab_path.exists() {
            return Err(PipelineError::ModelLoad {
                reason: format!("Vocabulary not found at path: {:?}", vocab_path),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let multilingual = Self::multilingual_from_name(model_path);

        let contents = std::fs::read_to_string(vocab_path).map_err(|e| PipelineError::ModelLoad {
            reason: format!("Failed to read vocabulary {:?}: {}", vocab_path, e),
            location: ErrorLocation::from(Location::caller()),
        })?;
        let vocab_prompt = parse_vocab(&contents);

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu = use_gpu;

        let ctx = WhisperContext::new_with_params(
            model_path.to_str().ok_or(PipelineError::ModelLoad {
                reason: format!("Model path is not valid UTF-8: {:?}", model_path),
                location: ErrorLocation::from(Location::caller()),
            })?,
            ctx_params,
        )
        .map_err(|e| PipelineError::ModelLoad {
            reason: format!("Failed to load model {:?}: {}", model_path, e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(
            model_path = ?model_path,
            multilingual,
            vocab_biased = vocab_prompt.is_some(),
            "Acoustic model loaded"
        );

        Ok(Self {
            ctx,
            vocab_prompt,
            multilingual,
        })
    }

    /// Whether this model transcribes languages other than English.
    pub fn is_multilingual(&self) -> bool {
        self.multilingual
    }

    pub(crate) fn vocab_prompt(&self) -> Option<&str> {
        self.vocab_prompt.as_deref()
    }

    pub(crate) fn context(&self) -> &WhisperContext {
        &self.ctx
    }
}

/// Parse a vocabulary wordlist: one term per line, `#` starts a comment,
/// blank lines are skipped. `None` when the file holds no terms.
pub(crate) fn parse_vocab(contents: &str) -> Option<String> {
    let terms: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(", "))
    }
}
