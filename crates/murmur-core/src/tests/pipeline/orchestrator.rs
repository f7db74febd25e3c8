use crate::{
    ErrorKind, PipelineConfig, PipelineEvent, PipelineState, TranscriptionPipeline,
};

use std::time::Duration;

use tempfile::TempDir;
use tokio::time::timeout;

fn config_in(dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        model_path: dir.path().join("ggml-base.en.bin"),
        vocab_path: dir.path().join("vocab.en.txt"),
        recordings_dir: dir.path().join("recordings"),
        input_device: None,
        use_gpu: false,
        translate: false,
    }
}

/// Config pointing at real model weights, for tests behind the
/// integration-tests feature.
fn integration_config(dir: &TempDir) -> PipelineConfig {
    let mut config = config_in(dir);
    config.model_path = std::env::var("TEST_WHISPER_MODEL_PATH")
        .unwrap_or_else(|_| "models/ggml-base.en.bin".to_string())
        .into();
    std::fs::write(&config.vocab_path, "").unwrap();
    config
}

/// WHAT: Construction fails fast when the model file is absent
/// WHY: The caller needs a synchronous, classified error before any
/// recording can be attempted
#[tokio::test]
async fn given_missing_model_when_constructing_then_model_load_error() {
    let dir = TempDir::new().unwrap();

    let err = TranscriptionPipeline::new(config_in(&dir)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ModelLoad);
}

/// WHAT: Construction fails fast when the vocabulary file is absent
/// WHY: Both assets are load-time requirements, checked before the
/// capture device is opened
#[tokio::test]
async fn given_missing_vocab_when_constructing_then_model_load_error() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir);
    std::fs::write(&config.model_path, b"weights").unwrap();
    config.vocab_path = dir.path().join("nowhere.txt");

    let err = TranscriptionPipeline::new(config).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ModelLoad);
}

/// WHAT: Stopping while idle is rejected and the state is unchanged
/// WHY: Illegal transitions must be reported, never silently absorbed
#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn given_idle_pipeline_when_stopping_then_invalid_state() {
    // Given: A pipeline with a real model and the default input device
    let dir = TempDir::new().unwrap();
    let (pipeline, _events) = TranscriptionPipeline::new(integration_config(&dir)).unwrap();
    assert_eq!(pipeline.state(), PipelineState::Idle);

    // When: Stopping without a recording in progress
    let err = pipeline.stop_recording().await.unwrap_err();

    // Then: The call is rejected and the pipeline stays idle
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert!(!pipeline.is_recording());
    assert!(!pipeline.is_transcribing());

    pipeline.cleanup().await.unwrap();
}

/// WHAT: One request delivers Started once, then exactly one terminal
/// WHY: Consumers rely on started, optional progress, then one terminal,
/// in that order, with nothing after the terminal
#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn given_record_then_stop_when_draining_events_then_single_terminal_in_order() {
    // Given: A real pipeline with a short recording in flight
    let dir = TempDir::new().unwrap();
    let (pipeline, mut events) = TranscriptionPipeline::new(integration_config(&dir)).unwrap();

    let session_id = pipeline.start_recording().await.unwrap();
    assert!(pipeline.is_recording());
    tokio::time::sleep(Duration::from_millis(300)).await;

    // When: Stopping and draining the event stream
    pipeline.stop_recording().await.unwrap();

    let first = timeout(Duration::from_secs(120), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, PipelineEvent::TranscriptionStarted { session_id });

    let mut event = timeout(Duration::from_secs(120), events.recv())
        .await
        .unwrap()
        .unwrap();
    while !event.is_terminal() {
        assert!(matches!(
            event,
            PipelineEvent::TranscriptionProgress { .. }
        ));
        assert_eq!(event.session_id(), session_id);
        event = timeout(Duration::from_secs(120), events.recv())
            .await
            .unwrap()
            .unwrap();
    }

    // Then: The terminal is a result for this session, delivered once
    assert_eq!(event.session_id(), session_id);
    assert!(matches!(event, PipelineEvent::TranscriptionResult { .. }));
    assert!(
        timeout(Duration::from_millis(500), events.recv())
            .await
            .is_err()
    );
    assert_eq!(pipeline.state(), PipelineState::Idle);

    pipeline.cleanup().await.unwrap();
}

/// WHAT: Teardown during transcription yields one terminal within a bound
/// WHY: A cancel issued after the request was accepted must reach the
/// worker; teardown must never hang on a run that ignores it
#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn given_cleanup_during_transcription_then_single_terminal_within_bound() {
    // Given: A request just accepted and still being processed
    let dir = TempDir::new().unwrap();
    let (pipeline, mut events) = TranscriptionPipeline::new(integration_config(&dir)).unwrap();

    let session_id = pipeline.start_recording().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    pipeline.stop_recording().await.unwrap();

    // When: Tearing down immediately, racing the in-flight work
    timeout(Duration::from_secs(60), pipeline.cleanup())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pipeline.state(), PipelineState::Idle);

    // Then: Exactly one terminal for the session, cancelled or completed
    let mut terminals = 0;
    while let Ok(Some(event)) = timeout(Duration::from_millis(500), events.recv()).await {
        assert_eq!(event.session_id(), session_id);
        if event.is_terminal() {
            terminals += 1;
            assert!(matches!(
                event,
                PipelineEvent::TranscriptionCancelled { .. }
                    | PipelineEvent::TranscriptionResult { .. }
            ));
        }
    }
    assert_eq!(terminals, 1);
}
