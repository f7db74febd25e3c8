//! Configuration management for murmur.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, lazy validation, and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{AudioConfig, DEFAULT_USE_GPU, ModelConfig},
};

use std::{fs, io::Write, panic::Location, path::PathBuf};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use murmur_core::PipelineConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Main configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Acoustic model configuration.
    pub model: ModelConfig,
    /// Audio device configuration.
    pub audio: AudioConfig,
}

impl Config {
    /// Load configuration from disk, creating default if not found.
    ///
    /// Note: This does NOT validate that the model assets exist. Call
    /// `validate_assets()` before constructing the pipeline, so the
    /// config can load and be edited even when the model has not been
    /// downloaded yet.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to read config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to parse config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            info!(config_path = ?config_path, "Configuration loaded");

            Ok(config)
        } else {
            info!("No config found, creating default");
            Self::create_default()
        }
    }

    /// Validate that the model file and vocabulary wordlist exist.
    ///
    /// Call this before constructing the pipeline, not at config load
    /// time, so a fresh install can still start and report what is
    /// missing.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn validate_assets(&self) -> AppResult<()> {
        if !self.model.model_path.exists() {
            return Err(AppError::ConfigError {
                reason: format!(
                    "Model not found at: {:?}. Download a ggml model or configure model_path.",
                    self.model.model_path
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let vocab_path = self.model.effective_vocab_path();
        if !vocab_path.exists() {
            return Err(AppError::ConfigError {
                reason: format!(
                    "Vocabulary not found at: {:?}. Create the wordlist or configure vocab_path.",
                    vocab_path
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(())
    }

    /// Build the pipeline configuration from this config.
    #[track_caller]
    pub fn pipeline_config(&self) -> AppResult<PipelineConfig> {
        Ok(PipelineConfig {
            model_path: self.model.model_path.clone(),
            vocab_path: self.model.effective_vocab_path(),
            recordings_dir: Self::recordings_dir()?,
            input_device: self.audio.selected_device.clone(),
            use_gpu: self.model.use_gpu,
            translate: self.model.translate,
        })
    }

    /// Save configuration to disk using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument]
    pub fn save(&self) -> AppResult<()> {
        let config_path = Self::config_path()?;

        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        // Atomic write: write to temp file then rename
        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, &config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Directory session WAV files are written to. Session audio is
    /// transient, so it lives under the cache dir, not user data.
    #[track_caller]
    pub fn recordings_dir() -> AppResult<PathBuf> {
        Ok(Self::project_dirs()?.cache_dir().join("recordings"))
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        let proj_dirs = Self::project_dirs()?;
        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join("config.toml"))
    }

    #[track_caller]
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from("dev", "murmur", "Murmur").ok_or_else(|| AppError::ConfigError {
            reason: "Failed to get project directories".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    fn create_default() -> AppResult<Self> {
        let data_dir = Self::project_dirs()?.data_dir().to_path_buf();
        let model_path = data_dir.join("models").join("ggml-base.en.bin");

        let config = Config {
            model: ModelConfig {
                model_path: model_path.clone(),
                vocab_path: None,
                use_gpu: DEFAULT_USE_GPU,
                translate: false,
            },
            audio: AudioConfig {
                selected_device: None,
            },
        };

        config.save()?;

        warn!(
            model_path = ?model_path,
            "Default config created. A ggml model must be downloaded before recording."
        );

        Ok(config)
    }
}
