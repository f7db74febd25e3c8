use crate::PipelineState;

/// WHAT: State names render as the words used in rejection messages
/// WHY: Errors quote the current state; the wording is part of the API
#[test]
fn given_each_state_when_naming_then_lowercase_word() {
    assert_eq!(PipelineState::Idle.name(), "idle");
    assert_eq!(PipelineState::Recording.name(), "recording");
    assert_eq!(PipelineState::Transcribing.name(), "transcribing");
}

/// WHAT: States compare by value and copy freely
/// WHY: The orchestrator snapshots state under a short-lived lock
#[test]
fn given_state_when_copied_then_equality_holds() {
    let state = PipelineState::Recording;
    let copy = state;

    assert_eq!(state, copy);
    assert_ne!(state, PipelineState::Idle);
}
