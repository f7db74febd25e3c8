//! Murmur: on-device speech capture and transcription.

mod app;
mod app_command;
mod config;
mod error;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    error::{AppError, Result as AppResult},
};

use crate::config::Config;

use murmur_core::TranscriptionPipeline;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Application entry point.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("murmur=info,murmur_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate_assets() {
        error!("Model validation failed: {:?}", e);
        std::process::exit(1);
    }

    let pipeline_config = match config.pipeline_config() {
        Ok(pc) => pc,
        Err(e) => {
            error!("Failed to resolve pipeline config: {:?}", e);
            std::process::exit(1);
        }
    };

    let (pipeline, events) = match TranscriptionPipeline::new(pipeline_config) {
        Ok(pair) => pair,
        Err(e) => {
            error!("Failed to initialize pipeline: {:?}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = App::new(pipeline, events).run().await {
        error!(error = ?e, "App error");
        std::process::exit(1);
    }
}
