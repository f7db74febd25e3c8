use crate::{AppCommand, AppResult};

use murmur_core::{PipelineEvent, PipelineEvents, TranscriptionPipeline};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, instrument};

/// Interactive front end driving the transcription pipeline from
/// standard input.
///
/// Runs two flows through one select loop: commands typed on stdin, and
/// pipeline events printed to stdout as they arrive. State-machine
/// rejections (e.g. `stop` while idle) are reported and the loop keeps
/// going; only `quit` or closed stdin ends it.
pub struct App {
    pipeline: TranscriptionPipeline,
    events: PipelineEvents,
}

impl App {
    pub(crate) fn new(pipeline: TranscriptionPipeline, events: PipelineEvents) -> Self {
        Self { pipeline, events }
    }

    /// Run the main application loop until `quit` or end of input, then
    /// tear the pipeline down.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Murmur starting");
        println!("Commands: start, stop, status, quit (blank line toggles record/stop)");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            if !self.handle_line(&line).await {
                                break;
                            }
                        }
                        None => {
                            info!("Input closed, shutting down");
                            break;
                        }
                    }
                }

                event = self.events.recv() => {
                    match event {
                        Some(event) => println!("{}", render_event(&event)),
                        None => {
                            info!("Event channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        self.pipeline.cleanup().await?;
        info!("Murmur shut down successfully");

        Ok(())
    }

    /// Handle one input line. Returns `false` when the loop should end.
    async fn handle_line(&self, line: &str) -> bool {
        // A blank line toggles: start when idle, stop when recording.
        let command = match AppCommand::parse(line) {
            Some(command) => command,
            None if line.trim().is_empty() => {
                if self.pipeline.is_recording() {
                    AppCommand::Stop
                } else {
                    AppCommand::Start
                }
            }
            None => {
                println!("Unknown command: {}", line.trim());
                return true;
            }
        };

        match command {
            AppCommand::Start => match self.pipeline.start_recording().await {
                Ok(session_id) => println!("Recording session {}", session_id),
                Err(e) => {
                    error!(error = ?e, "Failed to start recording");
                    println!("Cannot start: {}", e);
                }
            },
            AppCommand::Stop => match self.pipeline.stop_recording().await {
                Ok(()) => println!("Transcribing..."),
                Err(e) => {
                    error!(error = ?e, "Failed to stop recording");
                    println!("Cannot stop: {}", e);
                }
            },
            AppCommand::Status => println!("State: {}", self.pipeline.state().name()),
            AppCommand::Quit => {
                info!("Shutdown requested");
                return false;
            }
        }

        true
    }
}

/// Render one pipeline event as a line of user-facing output.
pub(crate) fn render_event(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::TranscriptionStarted { session_id } => {
            format!("[{}] transcription started", session_id)
        }
        PipelineEvent::TranscriptionProgress { session_id, text } => {
            format!("[{}] ... {}", session_id, text)
        }
        PipelineEvent::TranscriptionResult { session_id, text } => {
            if text.is_empty() {
                format!("[{}] (no speech detected)", session_id)
            } else {
                format!("[{}] {}", session_id, text)
            }
        }
        PipelineEvent::TranscriptionFailed {
            session_id,
            kind,
            message,
        } => format!("[{}] failed ({:?}): {}", session_id, kind, message),
        PipelineEvent::TranscriptionCancelled { session_id } => {
            format!("[{}] cancelled", session_id)
        }
    }
}
