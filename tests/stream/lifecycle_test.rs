//! Lazy launch, abandonment, and cleanup tests.

use std::time::Duration;

use json_lineage::{AsyncLineStream, LineSource, StreamState, SyncLineStream};

use super::{wait_until_gone, FakeConverter};

/// Emits one record, then blocks forever without exiting.
const HANGING_CONVERTER: &str = "echo '{\"n\": 1}'\nexec sleep 30\n";

/// Records that it was spawned by creating a `spawned` file next to itself.
const MARKING_CONVERTER: &str = ": > \"$(dirname \"$0\")/spawned\"\necho '[1]'\n";

#[test]
fn sync_constructing_does_not_spawn() {
    let converter = FakeConverter::new(MARKING_CONVERTER);
    let stream = SyncLineStream::new(converter.command());
    drop(stream);

    std::thread::sleep(Duration::from_millis(100));
    assert!(!converter.dir().join("spawned").exists());
}

#[test]
fn sync_first_pull_spawns() {
    let converter = FakeConverter::new(MARKING_CONVERTER);
    let mut stream = SyncLineStream::new(converter.command());

    assert_eq!(stream.next().unwrap().unwrap(), "[1]");
    assert!(converter.dir().join("spawned").exists());
}

#[tokio::test]
async fn async_dropped_without_polling_never_spawns() {
    let converter = FakeConverter::new(MARKING_CONVERTER);

    let stream = AsyncLineStream::new(converter.command());
    drop(stream);

    let mut stream = AsyncLineStream::new(converter.command());
    let pending = stream.next_line();
    drop(pending);
    assert_eq!(stream.state(), StreamState::NotStarted);
    drop(stream);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!converter.dir().join("spawned").exists());
}

#[test]
fn sync_terminate_mid_stream_kills_converter() {
    let converter = FakeConverter::new(HANGING_CONVERTER);
    let mut stream = SyncLineStream::new(converter.command());

    assert_eq!(stream.next().unwrap().unwrap(), r#"{"n": 1}"#);
    let pid = stream.pid().unwrap();

    stream.terminate();
    assert_eq!(stream.state(), StreamState::Abandoned);
    assert!(stream.pid().is_none());
    assert!(wait_until_gone(pid));

    // Idempotent, and never relaunches.
    stream.terminate();
    stream.terminate();
    assert!(stream.next().is_none());
    assert_eq!(stream.state(), StreamState::Abandoned);
}

#[test]
fn sync_drop_mid_stream_kills_converter() {
    let converter = FakeConverter::new(HANGING_CONVERTER);
    let mut stream = SyncLineStream::new(converter.command());

    assert!(stream.next().unwrap().is_ok());
    let pid = stream.pid().unwrap();
    drop(stream);

    assert!(wait_until_gone(pid));
}

#[test]
fn sync_terminate_after_exhaustion_is_harmless() {
    let converter = FakeConverter::sample();
    let mut stream = SyncLineStream::new(converter.command());

    assert_eq!(stream.by_ref().count(), 2);
    stream.terminate();
    stream.terminate();
    assert_eq!(stream.state(), StreamState::Exhausted);
    assert!(stream.next().is_none());
}

#[test]
fn sync_terminate_after_failure_keeps_failed_state() {
    let converter = FakeConverter::new("exit 4\n");
    let mut stream = SyncLineStream::new(converter.command());

    assert!(stream.next().unwrap().is_err());
    stream.terminate();
    assert_eq!(stream.state(), StreamState::Failed);
}

#[tokio::test(flavor = "multi_thread")]
async fn async_terminate_mid_stream_kills_converter() {
    let converter = FakeConverter::new(HANGING_CONVERTER);
    let mut stream = AsyncLineStream::new(converter.command());

    assert_eq!(stream.next_line().await.unwrap().unwrap(), r#"{"n": 1}"#);
    let pid = stream.pid().unwrap();

    stream.terminate();
    stream.terminate();
    assert_eq!(stream.state(), StreamState::Abandoned);
    assert!(stream.next_line().await.is_none());
    assert!(tokio::task::spawn_blocking(move || wait_until_gone(pid))
        .await
        .unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn async_drop_mid_stream_kills_converter() {
    let converter = FakeConverter::new(HANGING_CONVERTER);
    let mut stream = AsyncLineStream::new(converter.command());

    assert!(stream.next_line().await.unwrap().is_ok());
    let pid = stream.pid().unwrap();
    drop(stream);

    assert!(tokio::task::spawn_blocking(move || wait_until_gone(pid))
        .await
        .unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn async_deadline_by_abandonment() {
    let converter = FakeConverter::new(HANGING_CONVERTER);
    let mut stream = AsyncLineStream::new(converter.command());

    assert!(stream.next_line().await.unwrap().is_ok());
    let pid = stream.pid().unwrap();

    let waited = tokio::time::timeout(Duration::from_millis(100), stream.next_line()).await;
    assert!(waited.is_err());
    assert_eq!(stream.state(), StreamState::Running);

    stream.terminate();
    assert!(tokio::task::spawn_blocking(move || wait_until_gone(pid))
        .await
        .unwrap());
}
