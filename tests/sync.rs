//! Sync sessions against the in-memory Stripe fake, with checkpoints in a
//! temporary directory.

use std::sync::Arc;
use std::time::Duration;

use checkpoint::{FilesystemStore, SyncManager};
use serde_json::Value;
use stripe_sync::{resolve_start_position, run_sync, JsonlSink, RunLimits, StopReason};
use stripe_sync_source::resources::{self, EventClassifier};
use stripe_sync_source::testing::{event, item, FakeStripe};
use stripe_sync_source::{
    ChangeIterator, Error, IntervalTimer, IteratorOpts, Mode, NoDelay, Position,
};
use tempfile::TempDir;
use tokio::sync::broadcast;

const START: i64 = 1_652_790_765;

fn iterator(fake: &Arc<FakeStripe>, position: Position) -> ChangeIterator<Arc<FakeStripe>, NoDelay> {
    let classifier = EventClassifier::new(resources::lookup("plan").unwrap(), false);
    ChangeIterator::new(fake.clone(), position, IteratorOpts::new(classifier), NoDelay)
}

fn manager(dir: &TempDir) -> SyncManager<FilesystemStore> {
    SyncManager::new(FilesystemStore::new(dir.path()))
}

fn limits(max_records: u64, checkpoint_every: u64) -> RunLimits {
    RunLimits {
        timeout: None,
        max_records: Some(max_records),
        checkpoint_every,
    }
}

fn lines(sink: JsonlSink<Vec<u8>>) -> Vec<Value> {
    String::from_utf8(sink.into_inner())
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

fn fake_with_plans(ids: &[&str]) -> Arc<FakeStripe> {
    let fake = Arc::new(FakeStripe::new(2));
    for (n, id) in ids.iter().enumerate() {
        fake.add_resource(item(id, START - 100 + n as i64));
    }
    fake
}

#[tokio::test]
async fn test_max_records_stores_last_emitted_position() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let fake = fake_with_plans(&["plan_a", "plan_b", "plan_c"]);
    let (_tx, rx) = broadcast::channel(1);

    let mut iter = iterator(&fake, Position::start(START));
    let mut sink = JsonlSink::new(Vec::new());
    let summary = run_sync(&mut iter, &mut sink, &manager, "plan", limits(2, 1), rx)
        .await
        .unwrap();

    assert_eq!(summary.stop, StopReason::MaxRecords);
    assert_eq!(summary.records, 2);
    assert_eq!(summary.position.cursor, "plan_b");

    let output = lines(sink);
    assert_eq!(output.len(), 2);
    assert_eq!(output[0]["operation"], "snapshot");
    assert_eq!(output[0]["key"]["id"], "plan_a");
    assert_eq!(output[1]["key"]["id"], "plan_b");
    assert_eq!(
        output[1]["position"],
        Value::String(summary.position.to_string())
    );

    let stored: Position = manager.read_checkpoint("plan").await.unwrap().unwrap();
    assert_eq!(stored, summary.position);
}

#[tokio::test]
async fn test_resumed_session_continues_after_checkpoint() {
    let dir = TempDir::new().unwrap();
    let fake = fake_with_plans(&["plan_a", "plan_b", "plan_c"]);
    fake.add_event(event("evt_1", START + 5, "plan.deleted", "plan_a"));
    let (_tx, rx) = broadcast::channel(1);

    let first = manager(&dir);
    let mut iter = iterator(&fake, Position::start(START));
    let mut sink = JsonlSink::new(Vec::new());
    run_sync(&mut iter, &mut sink, &first, "plan", limits(1, 1), rx)
        .await
        .unwrap();
    assert_eq!(lines(sink).len(), 1);

    // A fresh manager over the same directory, as after a restart.
    let second = manager(&dir);
    let position = resolve_start_position(None, &second, "plan").await.unwrap();
    assert_eq!(position.cursor, "plan_a");
    assert_eq!(position.watermark, START);

    let (_tx, rx) = broadcast::channel(1);
    let mut iter = iterator(&fake, position);
    let mut sink = JsonlSink::new(Vec::new());
    let summary = run_sync(&mut iter, &mut sink, &second, "plan", limits(3, 1), rx)
        .await
        .unwrap();

    let output = lines(sink);
    let seen: Vec<(&str, &str)> = output
        .iter()
        .map(|l| {
            (
                l["operation"].as_str().unwrap(),
                l["key"]["id"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        seen,
        vec![
            ("snapshot", "plan_b"),
            ("snapshot", "plan_c"),
            ("delete", "plan_a")
        ]
    );
    assert_eq!(output[2]["payload"], Value::Null);
    assert_eq!(summary.position.mode, Mode::Incremental);
    assert_eq!(summary.position.cursor, "evt_1");
}

#[tokio::test]
async fn test_checkpoint_interval_still_stores_on_stop() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let fake = fake_with_plans(&["plan_a", "plan_b", "plan_c"]);
    let (_tx, rx) = broadcast::channel(1);

    let mut iter = iterator(&fake, Position::start(START));
    let mut sink = JsonlSink::new(Vec::new());
    let summary = run_sync(&mut iter, &mut sink, &manager, "plan", limits(3, 2), rx)
        .await
        .unwrap();

    assert_eq!(summary.records, 3);
    let stored: Position = manager.read_checkpoint("plan").await.unwrap().unwrap();
    assert_eq!(stored.cursor, "plan_c");
}

#[tokio::test]
async fn test_remote_error_keeps_previous_checkpoint() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let fake = fake_with_plans(&["plan_a", "plan_b", "plan_c"]);

    let (_tx, rx) = broadcast::channel(1);
    let mut iter = iterator(&fake, Position::start(START));
    let mut sink = JsonlSink::new(Vec::new());
    run_sync(&mut iter, &mut sink, &manager, "plan", limits(1, 1), rx)
        .await
        .unwrap();
    let stored: Position = manager.read_checkpoint("plan").await.unwrap().unwrap();

    let (_tx, rx) = broadcast::channel(1);
    let mut iter = iterator(&fake, stored.clone());
    fake.fail_next(Error::Api {
        status: 500,
        message: "boom".to_string(),
    });
    let mut sink = JsonlSink::new(Vec::new());
    let err = run_sync(&mut iter, &mut sink, &manager, "plan", limits(5, 1), rx)
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("boom"), "{err:#}");
    assert!(lines(sink).is_empty());
    assert_eq!(iter.position(), &stored);
    let after: Position = manager.read_checkpoint("plan").await.unwrap().unwrap();
    assert_eq!(after, stored);
}

#[tokio::test]
async fn test_shutdown_signal_stops_and_stores_position() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let fake = Arc::new(FakeStripe::new(10));
    let (tx, rx) = broadcast::channel(1);
    tx.send(()).unwrap();

    let mut iter = iterator(&fake, Position::start(START));
    let mut sink = JsonlSink::new(Vec::new());
    let summary = run_sync(
        &mut iter,
        &mut sink,
        &manager,
        "plan",
        RunLimits::default(),
        rx,
    )
    .await
    .unwrap();

    assert_eq!(summary.stop, StopReason::Shutdown);
    assert_eq!(summary.records, 0);
    let stored: Position = manager.read_checkpoint("plan").await.unwrap().unwrap();
    assert_eq!(stored.watermark, START);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_stops_idle_session() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let fake = Arc::new(FakeStripe::new(10));
    let (_tx, rx) = broadcast::channel(1);

    let mut iter = iterator(&fake, Position::start(START))
        .with_timer(IntervalTimer::new(Duration::from_secs(5)));
    let mut sink = JsonlSink::new(Vec::new());
    let summary = run_sync(
        &mut iter,
        &mut sink,
        &manager,
        "plan",
        RunLimits {
            timeout: Some(Duration::from_secs(12)),
            ..Default::default()
        },
        rx,
    )
    .await
    .unwrap();

    assert_eq!(summary.stop, StopReason::Timeout);
    assert_eq!(summary.records, 0);

    // The watermark is pinned even though nothing was emitted.
    let stored: Position = manager.read_checkpoint("plan").await.unwrap().unwrap();
    assert_eq!(stored.mode, Mode::Incremental);
    assert_eq!(stored.watermark, START);
}

#[tokio::test]
async fn test_resolve_start_position() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);

    let fresh = resolve_start_position(None, &manager, "plan").await.unwrap();
    assert_eq!(fresh.mode, Mode::Snapshot);
    assert!(fresh.watermark > 0);
    assert!(fresh.cursor.is_empty());

    manager
        .save_checkpoint("plan", &Position::start(START))
        .await
        .unwrap();
    let token = r#"{"mode":"cdc","watermark":42,"cursor":"evt_9","index":1}"#;
    let explicit = resolve_start_position(Some(token), &manager, "plan")
        .await
        .unwrap();
    assert_eq!(explicit.mode, Mode::Incremental);
    assert_eq!(explicit.watermark, 42);
    assert_eq!(explicit.index, 1);

    let stored = resolve_start_position(None, &manager, "plan").await.unwrap();
    assert_eq!(stored, Position::start(START));

    assert!(resolve_start_position(Some("{\"mode\":\"bogus\"}"), &manager, "plan")
        .await
        .is_err());
}
