use crate::{ErrorKind, PipelineEvent};

use uuid::Uuid;

/// WHAT: Result, failure, and cancellation are the terminal events
/// WHY: Consumers stop listening for a session on its terminal event
#[test]
fn given_each_event_kind_when_checking_terminality_then_classified() {
    let session_id = Uuid::new_v4();

    assert!(!PipelineEvent::TranscriptionStarted { session_id }.is_terminal());
    assert!(
        !PipelineEvent::TranscriptionProgress {
            session_id,
            text: "partial".into()
        }
        .is_terminal()
    );
    assert!(
        PipelineEvent::TranscriptionResult {
            session_id,
            text: "done".into()
        }
        .is_terminal()
    );
    assert!(
        PipelineEvent::TranscriptionFailed {
            session_id,
            kind: ErrorKind::Inference,
            message: "decode failed".into()
        }
        .is_terminal()
    );
    assert!(PipelineEvent::TranscriptionCancelled { session_id }.is_terminal());
}

/// WHAT: Every event carries its originating session id
/// WHY: Consumers correlate events across overlapping sessions
#[test]
fn given_any_event_when_reading_session_id_then_matches_origin() {
    let session_id = Uuid::new_v4();

    let events = [
        PipelineEvent::TranscriptionStarted { session_id },
        PipelineEvent::TranscriptionProgress {
            session_id,
            text: String::new(),
        },
        PipelineEvent::TranscriptionResult {
            session_id,
            text: String::new(),
        },
        PipelineEvent::TranscriptionFailed {
            session_id,
            kind: ErrorKind::Io,
            message: String::new(),
        },
        PipelineEvent::TranscriptionCancelled { session_id },
    ];

    for event in events {
        assert_eq!(event.session_id(), session_id);
    }
}
