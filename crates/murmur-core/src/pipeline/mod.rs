pub(crate) mod channel;
mod event;
mod orchestrator;
mod state;

pub(crate) use channel::CallbackChannel;

pub use {
    channel::PipelineEvents,
    event::PipelineEvent,
    orchestrator::{PipelineConfig, TranscriptionPipeline},
    state::PipelineState,
};
