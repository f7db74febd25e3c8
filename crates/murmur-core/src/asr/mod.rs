pub(crate) mod engine;
pub(crate) mod model;

pub(crate) use engine::{Action, CancelToken, InferenceEngine, TranscriptionRequest};

pub use model::AcousticModel;
