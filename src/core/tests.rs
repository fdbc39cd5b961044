//! Scenario tests for the Scheduler: admission, dispatcher and display workers together.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, broadcast};
use tokio::time::Instant;

use super::{Ack, Scheduler, Snapshot};
use crate::{
    AdmissionStatus, AlarmConfig, AlarmOutput, DisplayMode, Event, EventKind, Notice, Request,
    RuntimeError, Subscribe, SubmitError,
};

/// Display sink that records what it was asked to show.
#[derive(Default)]
struct Recorder {
    lines: Mutex<Vec<String>>,
}

impl Recorder {
    fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlarmOutput for Recorder {
    async fn display(&self, n: &Notice) {
        self.lines
            .lock()
            .unwrap()
            .push(format!("show {} {}", n.message_type, n.id));
    }

    async fn type_changed(&self, n: &Notice) {
        self.lines
            .lock()
            .unwrap()
            .push(format!("changed {} {}->{}", n.id, n.previous_type, n.message_type));
    }
}

/// Display sink that never returns.
#[derive(Default)]
struct Hanging {
    entered: Notify,
}

#[async_trait]
impl AlarmOutput for Hanging {
    async fn display(&self, _n: &Notice) {
        self.entered.notify_one();
        std::future::pending::<()>().await;
    }
}

/// Subscriber that keeps every event kind it sees.
#[derive(Default)]
struct Kinds {
    seen: Mutex<Vec<EventKind>>,
}

#[async_trait]
impl Subscribe for Kinds {
    async fn on_event(&self, event: &Event) {
        self.seen.lock().unwrap().push(event.kind);
    }

    fn name(&self) -> &'static str {
        "kinds"
    }
}

fn build(cfg: AlarmConfig) -> (Arc<Scheduler>, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let scheduler = Scheduler::builder(cfg)
        .with_output(recorder.clone())
        .build();
    (scheduler, recorder)
}

/// Receives until `pred` matches; fails after two virtual minutes.
async fn wait_for(rx: &mut broadcast::Receiver<Event>, pred: impl Fn(&Event) -> bool) -> Event {
    tokio::time::timeout(Duration::from_secs(120), async {
        loop {
            match rx.recv().await {
                Ok(ev) if pred(&ev) => return ev,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
            }
        }
    })
    .await
    .expect("event not observed")
}

fn is(kind: EventKind, message_type: u32) -> impl Fn(&Event) -> bool {
    move |e| e.kind == kind && e.message_type == Some(message_type)
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_schedule_then_watch_displays_once_after_ttl() {
    let (scheduler, recorder) = build(AlarmConfig::default());
    let mut rx = scheduler.subscribe();
    let started = Instant::now();

    scheduler
        .submit(Request::schedule(1, 5, 2, "hi").unwrap())
        .await
        .unwrap();
    scheduler.submit(Request::watch(1).unwrap()).await.unwrap();

    wait_for(&mut rx, is(EventKind::WorkerSpawned, 1)).await;
    let shown = wait_for(&mut rx, is(EventKind::AlarmDisplayed, 1)).await;
    assert_eq!(shown.id, Some(5));
    assert_eq!(shown.text.as_deref(), Some("hi"));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2), "fired early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(2500), "fired late: {elapsed:?}");

    let retired = wait_for(&mut rx, is(EventKind::WorkerRetired, 1)).await;
    assert_eq!(retired.reason.as_deref(), Some("drained"));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(recorder.lines(), vec!["show 1 5"]);
    assert_eq!(scheduler.snapshot().await, Snapshot::default());
    scheduler.shutdown().await.unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_watch_without_schedule_is_rejected_and_spawns_nothing() {
    let (scheduler, _recorder) = build(AlarmConfig::default());

    let err = scheduler
        .submit(Request::watch(2).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(AdmissionStatus::NotFound));

    tokio::time::sleep(Duration::from_secs(1)).await;
    let snapshot = scheduler.snapshot().await;
    assert!(snapshot.entries.is_empty());
    assert!(snapshot.workers.is_empty());
    scheduler.shutdown().await.unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_cancel_retires_worker_without_display() {
    let (scheduler, recorder) = build(AlarmConfig::default());
    let mut rx = scheduler.subscribe();

    scheduler
        .submit(Request::schedule(3, 7, 5, "never").unwrap())
        .await
        .unwrap();
    scheduler.submit(Request::watch(3).unwrap()).await.unwrap();
    wait_for(&mut rx, is(EventKind::WorkerSpawned, 3)).await;

    scheduler.submit(Request::cancel(7).unwrap()).await.unwrap();
    let applied = wait_for(&mut rx, |e| e.kind == EventKind::CancelApplied).await;
    assert_eq!(applied.id, Some(7));
    let retired = wait_for(&mut rx, is(EventKind::WorkerRetired, 3)).await;
    assert_eq!(retired.reason.as_deref(), Some("retired"));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(recorder.lines().is_empty());
    assert_eq!(scheduler.snapshot().await, Snapshot::default());
    scheduler.shutdown().await.unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_cancel_of_missing_id_leaves_registry_unchanged() {
    let (scheduler, _recorder) = build(AlarmConfig::default());
    let mut rx = scheduler.subscribe();

    scheduler
        .submit(Request::schedule(1, 1, 100, "a").unwrap())
        .await
        .unwrap();
    wait_for(&mut rx, |e| e.kind == EventKind::RequestProcessed).await;
    let before = scheduler.snapshot().await;

    let err = scheduler
        .submit(Request::cancel(99).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err, SubmitError::IdNotFound { id: 99 });
    assert_eq!(scheduler.snapshot().await, before);
    scheduler.shutdown().await.unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_replacement_moves_entry_and_notices_type_change_first() {
    let (scheduler, recorder) = build(AlarmConfig::default());
    let mut rx = scheduler.subscribe();

    scheduler
        .submit(Request::schedule(1, 5, 30, "old").unwrap())
        .await
        .unwrap();
    scheduler.submit(Request::watch(1).unwrap()).await.unwrap();
    wait_for(&mut rx, is(EventKind::WorkerSpawned, 1)).await;

    let ack = scheduler
        .submit(Request::schedule(2, 5, 1, "new").unwrap())
        .await
        .unwrap();
    assert!(matches!(ack, Ack::Replaced { previous_type: 1, .. }));
    scheduler.submit(Request::watch(2).unwrap()).await.unwrap();

    wait_for(&mut rx, is(EventKind::WorkerRetired, 1)).await;
    let changed = wait_for(&mut rx, is(EventKind::TypeChanged, 2)).await;
    assert_eq!(changed.previous_type, Some(1));
    wait_for(&mut rx, is(EventKind::AlarmDisplayed, 2)).await;

    assert_eq!(recorder.lines(), vec!["changed 5 1->2", "show 2 5"]);
    scheduler.shutdown().await.unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_replacement_after_cancel_survives_and_displays_once() {
    let (scheduler, recorder) = build(AlarmConfig::default());
    let mut rx = scheduler.subscribe();

    scheduler
        .submit(Request::schedule(1, 5, 60, "old").unwrap())
        .await
        .unwrap();
    scheduler.submit(Request::cancel(5).unwrap()).await.unwrap();
    let ack = scheduler
        .submit(Request::schedule(1, 5, 2, "new").unwrap())
        .await
        .unwrap();
    assert!(matches!(ack, Ack::Replaced { previous_type: 1, .. }));
    scheduler.submit(Request::watch(1).unwrap()).await.unwrap();

    let superseded = wait_for(&mut rx, |e| e.kind == EventKind::CancelSuperseded).await;
    assert_eq!(superseded.id, Some(5));
    let shown = wait_for(&mut rx, is(EventKind::AlarmDisplayed, 1)).await;
    assert_eq!(shown.id, Some(5));
    assert_eq!(shown.text.as_deref(), Some("new"));

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(recorder.lines(), vec!["show 1 5"]);
    assert_eq!(scheduler.snapshot().await, Snapshot::default());
    scheduler.shutdown().await.unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_cancel_after_replacement_removes_the_replacement() {
    let (scheduler, recorder) = build(AlarmConfig::default());
    let mut rx = scheduler.subscribe();

    scheduler
        .submit(Request::schedule(1, 5, 60, "old").unwrap())
        .await
        .unwrap();
    scheduler
        .submit(Request::schedule(2, 5, 2, "new").unwrap())
        .await
        .unwrap();
    scheduler.submit(Request::watch(2).unwrap()).await.unwrap();
    scheduler.submit(Request::cancel(5).unwrap()).await.unwrap();

    let applied = wait_for(&mut rx, |e| e.kind == EventKind::CancelApplied).await;
    assert_eq!(applied.id, Some(5));
    assert_eq!(applied.message_type, Some(2));

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(recorder.lines().is_empty());
    assert_eq!(scheduler.snapshot().await, Snapshot::default());
    scheduler.shutdown().await.unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_earlier_schedule_interrupts_waiting_worker() {
    let (scheduler, recorder) = build(AlarmConfig::default());
    let mut rx = scheduler.subscribe();
    let started = Instant::now();

    scheduler
        .submit(Request::schedule(1, 1, 60, "late").unwrap())
        .await
        .unwrap();
    scheduler.submit(Request::watch(1).unwrap()).await.unwrap();
    wait_for(&mut rx, is(EventKind::WorkerSpawned, 1)).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    scheduler
        .submit(Request::schedule(1, 2, 1, "soon").unwrap())
        .await
        .unwrap();
    let shown = wait_for(&mut rx, is(EventKind::AlarmDisplayed, 1)).await;
    assert_eq!(shown.id, Some(2));
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(recorder.lines(), vec!["show 1 2"]);
    scheduler.shutdown().await.unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_periodic_mode_redisplays_every_period() {
    let cfg = AlarmConfig {
        display_mode: DisplayMode::Periodic,
        ..AlarmConfig::default()
    };
    let (scheduler, recorder) = build(cfg);

    scheduler
        .submit(Request::schedule(1, 1, 2, "tick").unwrap())
        .await
        .unwrap();
    scheduler.submit(Request::watch(1).unwrap()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(7)).await;

    assert_eq!(recorder.lines(), vec!["show 1 1"; 3]);
    assert_eq!(scheduler.snapshot().await.schedule_ids(), vec![1]);
    scheduler.shutdown().await.unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_stuck_worker_is_orphaned_then_reported_at_shutdown() {
    let cfg = AlarmConfig {
        retire_grace: Duration::from_millis(100),
        grace: Duration::from_millis(200),
        ..AlarmConfig::default()
    };
    let output = Arc::new(Hanging::default());
    let scheduler = Scheduler::builder(cfg)
        .with_output(output.clone())
        .build();
    let mut rx = scheduler.subscribe();

    scheduler
        .submit(Request::schedule(4, 1, 1, "hang").unwrap())
        .await
        .unwrap();
    scheduler
        .submit(Request::schedule(4, 2, 50, "later").unwrap())
        .await
        .unwrap();
    scheduler.submit(Request::watch(4).unwrap()).await.unwrap();
    output.entered.notified().await;

    scheduler.submit(Request::cancel(2).unwrap()).await.unwrap();
    wait_for(&mut rx, is(EventKind::WorkerOrphaned, 4)).await;

    let snapshot = scheduler.snapshot().await;
    assert_eq!(snapshot.orphaned_types(), vec![4]);
    assert!(snapshot.active_types().is_empty());

    let err = scheduler.shutdown().await.unwrap_err();
    assert!(
        matches!(&err, RuntimeError::GraceExceeded { stuck, .. } if stuck == &vec![4]),
        "{err}"
    );
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_snapshot_is_not_blocked_by_pending_retire() {
    let cfg = AlarmConfig {
        retire_grace: Duration::from_secs(10),
        grace: Duration::from_millis(200),
        ..AlarmConfig::default()
    };
    let output = Arc::new(Hanging::default());
    let scheduler = Scheduler::builder(cfg)
        .with_output(output.clone())
        .build();
    let mut rx = scheduler.subscribe();

    scheduler
        .submit(Request::schedule(4, 1, 1, "hang").unwrap())
        .await
        .unwrap();
    scheduler
        .submit(Request::schedule(4, 2, 50, "later").unwrap())
        .await
        .unwrap();
    scheduler.submit(Request::watch(4).unwrap()).await.unwrap();
    output.entered.notified().await;

    scheduler.submit(Request::cancel(2).unwrap()).await.unwrap();
    wait_for(&mut rx, is(EventKind::WatchReleased, 4)).await;

    // The dispatcher now waits up to ten seconds for the stuck worker.
    let snapshot = tokio::time::timeout(Duration::from_secs(1), scheduler.snapshot())
        .await
        .expect("snapshot waited for the retire join");
    assert!(snapshot.entries.is_empty());
    assert!(snapshot.active_types().is_empty());

    wait_for(&mut rx, is(EventKind::WorkerOrphaned, 4)).await;
    assert_eq!(scheduler.snapshot().await.orphaned_types(), vec![4]);
    assert!(scheduler.shutdown().await.is_err());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_shutdown_stops_idle_workers_and_closes_admission() {
    let (scheduler, _recorder) = build(AlarmConfig::default());
    let mut rx = scheduler.subscribe();

    scheduler
        .submit(Request::schedule(1, 1, 3600, "a").unwrap())
        .await
        .unwrap();
    scheduler.submit(Request::watch(1).unwrap()).await.unwrap();
    wait_for(&mut rx, is(EventKind::WorkerSpawned, 1)).await;

    scheduler.shutdown().await.unwrap();
    wait_for(&mut rx, |e| e.kind == EventKind::AllStoppedWithin).await;

    let err = scheduler
        .submit(Request::schedule(1, 2, 1, "b").unwrap())
        .await
        .unwrap_err();
    assert_eq!(err, SubmitError::Closed);
    assert!(scheduler.shutdown().await.is_ok());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_watch_can_be_renewed_after_type_drained() {
    let (scheduler, _recorder) = build(AlarmConfig::default());
    let mut rx = scheduler.subscribe();

    scheduler
        .submit(Request::schedule(6, 1, 1, "a").unwrap())
        .await
        .unwrap();
    scheduler.submit(Request::watch(6).unwrap()).await.unwrap();
    let dup = scheduler
        .submit(Request::watch(6).unwrap())
        .await
        .unwrap_err();
    assert_eq!(dup, SubmitError::DuplicateWatch { message_type: 6 });

    wait_for(&mut rx, is(EventKind::WatchReleased, 6)).await;
    scheduler
        .submit(Request::schedule(6, 2, 1, "b").unwrap())
        .await
        .unwrap();
    scheduler.submit(Request::watch(6).unwrap()).await.unwrap();
    let shown = wait_for(&mut rx, is(EventKind::AlarmDisplayed, 6)).await;
    assert_eq!(shown.id, Some(2));
    scheduler.shutdown().await.unwrap();
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_subscribers_receive_runtime_events() {
    let kinds = Arc::new(Kinds::default());
    let scheduler = Scheduler::builder(AlarmConfig::default())
        .with_subscribers(vec![kinds.clone() as Arc<dyn Subscribe>])
        .with_output(Arc::new(Recorder::default()))
        .build();
    assert_eq!(scheduler.subscriber_count(), 1);

    scheduler
        .submit(Request::schedule(1, 1, 1, "x").unwrap())
        .await
        .unwrap();
    scheduler.submit(Request::watch(1).unwrap()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    let seen = kinds.seen.lock().unwrap().clone();
    for expected in [
        EventKind::RequestAdmitted,
        EventKind::RequestProcessed,
        EventKind::WorkerSpawned,
        EventKind::AlarmDisplayed,
        EventKind::WorkerRetired,
    ] {
        assert!(seen.contains(&expected), "missing {expected:?} in {seen:?}");
    }
    scheduler.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submits_are_neither_lost_nor_duplicated() {
    let (scheduler, _recorder) = build(AlarmConfig::default());
    let ids: Vec<u32> = (1..=32).map(|i| (i * 13) % 32 + 1).collect();

    let mut joins = Vec::new();
    for id in ids {
        let scheduler = Arc::clone(&scheduler);
        joins.push(tokio::spawn(async move {
            scheduler
                .submit(Request::schedule(1 + id % 3, id, 60, format!("m{id}")).unwrap())
                .await
        }));
    }
    for join in joins {
        assert!(join.await.unwrap().is_ok());
    }

    let snapshot = scheduler.snapshot().await;
    assert_eq!(snapshot.schedule_ids(), (1..=32).collect::<Vec<u32>>());
    assert_eq!(snapshot.entries.len(), 32);
    scheduler.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_submit_completes_under_snapshot_churn() {
    let (scheduler, _recorder) = build(AlarmConfig::default());
    let stop = tokio_util::sync::CancellationToken::new();

    let mut readers = Vec::new();
    for _ in 0..6 {
        let scheduler = Arc::clone(&scheduler);
        let stop = stop.clone();
        readers.push(tokio::spawn(async move {
            while !stop.is_cancelled() {
                let _ = scheduler.snapshot().await;
                tokio::task::yield_now().await;
            }
        }));
    }

    for id in 1..=16 {
        let submit = scheduler.submit(Request::schedule(2, id, 60, "x").unwrap());
        tokio::time::timeout(Duration::from_secs(2), submit)
            .await
            .expect("writer starved")
            .unwrap();
    }
    stop.cancel();
    for r in readers {
        r.await.unwrap();
    }
    assert_eq!(scheduler.snapshot().await.schedule_ids().len(), 16);
    scheduler.shutdown().await.unwrap();
}
