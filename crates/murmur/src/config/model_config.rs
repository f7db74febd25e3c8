use crate::config::default_use_gpu;

use std::path::{Path, PathBuf};

use murmur_core::AcousticModel;
use serde::{Deserialize, Serialize};

/// Acoustic model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the ggml model file (e.g., ggml-base.en.bin). An `.en`
    /// stem suffix selects English-only mode.
    pub model_path: PathBuf,

    /// Path to the vocabulary wordlist biasing decoding. When unset, a
    /// default name is resolved next to the model file based on the
    /// model's language mode.
    #[serde(default)]
    pub vocab_path: Option<PathBuf>,

    /// Use GPU for inference if a GPU backend was compiled in (Metal/Vulkan).
    #[serde(default = "default_use_gpu")]
    pub use_gpu: bool,

    /// Translate speech to English instead of transcribing it in the
    /// spoken language. Only meaningful with a multilingual model.
    #[serde(default)]
    pub translate: bool,
}

impl ModelConfig {
    /// The vocabulary path in effect: the configured one, or the default
    /// name for the model's language mode resolved next to the model file.
    pub fn effective_vocab_path(&self) -> PathBuf {
        match &self.vocab_path {
            Some(path) => path.clone(),
            None => {
                let multilingual = AcousticModel::multilingual_from_name(&self.model_path);
                self.model_path
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(AcousticModel::default_vocab_name(multilingual))
            }
        }
    }
}
