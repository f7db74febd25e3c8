use crate::audio::{AudioSession, TARGET_SAMPLE_RATE};

use std::time::Duration;

use hound::{SampleFormat, WavReader};
use tempfile::TempDir;

/// WHAT: A new session allocates a unique wav path under the recordings dir
/// WHY: Concurrent or back-to-back recordings must never collide on disk
#[test]
fn given_two_sessions_when_created_then_paths_and_ids_differ() {
    let dir = TempDir::new().unwrap();

    let a = AudioSession::new(dir.path()).unwrap();
    let b = AudioSession::new(dir.path()).unwrap();

    assert_ne!(a.id(), b.id());
    assert_ne!(a.path(), b.path());
    assert!(a.path().starts_with(dir.path()));
    assert_eq!(a.path().extension().unwrap(), "wav");
}

/// WHAT: Session creation builds missing directories
/// WHY: First run on a fresh machine has no recordings directory yet
#[test]
fn given_missing_recordings_dir_when_creating_session_then_dir_created() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a").join("b");

    let session = AudioSession::new(&nested).unwrap();

    assert!(nested.is_dir());
    assert!(session.path().starts_with(&nested));
}

/// WHAT: Finalized audio is written as mono 16 kHz 16-bit PCM
/// WHY: This is the only format the inference engine accepts
#[test]
fn given_samples_when_writing_then_wav_spec_matches_engine_contract() {
    let dir = TempDir::new().unwrap();
    let mut session = AudioSession::new(dir.path()).unwrap();

    session.write_samples(&vec![0.5f32; 1600]).unwrap();

    let reader = WavReader::open(session.path()).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, TARGET_SAMPLE_RATE);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, SampleFormat::Int);
    assert_eq!(reader.len(), 1600);
}

/// WHAT: Writing records the session duration from the sample count
/// WHY: Duration drives log correlation and UI feedback downstream
#[test]
fn given_one_second_of_samples_when_writing_then_duration_is_one_second() {
    let dir = TempDir::new().unwrap();
    let mut session = AudioSession::new(dir.path()).unwrap();
    assert_eq!(session.duration(), Duration::ZERO);

    session
        .write_samples(&vec![0.0f32; TARGET_SAMPLE_RATE as usize])
        .unwrap();

    assert_eq!(session.duration(), Duration::from_secs(1));
}

/// WHAT: Out-of-range float samples are clamped, not wrapped
/// WHY: Callback spikes above full scale must not flip sign on conversion
#[test]
fn given_samples_beyond_full_scale_when_writing_then_clamped() {
    let dir = TempDir::new().unwrap();
    let mut session = AudioSession::new(dir.path()).unwrap();

    session.write_samples(&[2.0, -3.0, 0.0]).unwrap();

    let samples: Vec<i16> = WavReader::open(session.path())
        .unwrap()
        .samples::<i16>()
        .map(|s| s.unwrap())
        .collect();
    assert_eq!(samples, vec![i16::MAX, -i16::MAX, 0]);
}

/// WHAT: Removing a session file twice succeeds
/// WHY: Teardown and replacement paths can both try to delete the file
#[test]
fn given_removed_session_when_removing_again_then_ok() {
    let dir = TempDir::new().unwrap();
    let mut session = AudioSession::new(dir.path()).unwrap();
    session.write_samples(&[0.1, 0.2]).unwrap();
    assert!(session.path().exists());

    session.remove_file().unwrap();
    assert!(!session.path().exists());

    session.remove_file().unwrap();
}

/// WHAT: A never-finalized session can still be removed
/// WHY: Recording failures abandon sessions before any file is written
#[test]
fn given_unwritten_session_when_removing_then_ok() {
    let dir = TempDir::new().unwrap();
    let session = AudioSession::new(dir.path()).unwrap();

    session.remove_file().unwrap();
}
