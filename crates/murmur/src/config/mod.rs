mod audio_config;
#[allow(clippy::module_inception)]
mod config;
mod model_config;

pub(crate) use {audio_config::AudioConfig, config::Config, model_config::ModelConfig};

pub(crate) const DEFAULT_USE_GPU: bool = true;

pub(crate) fn default_use_gpu() -> bool {
    DEFAULT_USE_GPU
}
