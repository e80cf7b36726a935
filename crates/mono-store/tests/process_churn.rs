//! Engine decisions must survive the process exiting between probe runs.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use chrono::Utc;
use mono_alerts::{
    AlarmDispatcher, AlarmEvent, BotApiChannel, DispatcherConfig, EscalateOutcome,
    EscalatorConfig, HistoryStore, Identity, IssueDraft, IssueEscalator, NotifyOutcome, RateLimit,
    STATUS_DOWN, STATUS_UP, SuppressReason,
};
use mono_store::SqliteHistory;
use proptest::prelude::*;
use tempfile::TempDir;

fn identity() -> Identity {
    Identity::new("proj1", "host1")
}

/// One probe run: open the database, notify once, exit.
fn probe_run(path: &Path, status: &str) -> NotifyOutcome {
    let store = Arc::new(SqliteHistory::open(path).unwrap());
    let dispatcher = AlarmDispatcher::new(
        DispatcherConfig::new(identity())
            .with_rate(RateLimit::new(0, 2))
            .test_mode(true),
        store,
        Box::new(BotApiChannel::new("", Vec::new())),
    );
    dispatcher
        .notify("[disk] 92%", "diskProbe", "/var", status)
        .unwrap()
}

#[test]
fn count_limit_holds_across_runs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("monokit.db");

    assert!(matches!(probe_run(&path, STATUS_DOWN), NotifyOutcome::Sent(_)));
    assert!(matches!(probe_run(&path, STATUS_DOWN), NotifyOutcome::Sent(_)));
    assert_eq!(
        probe_run(&path, STATUS_DOWN),
        NotifyOutcome::Suppressed(SuppressReason::LimitReached)
    );

    let NotifyOutcome::Sent(event) = probe_run(&path, STATUS_UP) else {
        panic!("status change must be sent");
    };
    assert_eq!(event.id, 3);
}

#[test]
fn concurrent_writers_share_one_file() {
    const WRITERS: usize = 8;
    const RUNS: usize = 25;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("monokit.db");
    SqliteHistory::open(&path).unwrap();

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let path = path.clone();
            thread::spawn(move || {
                let store = Arc::new(SqliteHistory::open(&path).unwrap());
                let dispatcher = AlarmDispatcher::new(
                    DispatcherConfig::new(identity()).test_mode(true),
                    store,
                    Box::new(BotApiChannel::new("", Vec::new())),
                );
                (0..RUNS)
                    .filter(|run| {
                        let status = if run % 2 == 0 { STATUS_DOWN } else { STATUS_UP };
                        let message = format!("writer {writer} run {run}");
                        !matches!(
                            dispatcher.notify(&message, "diskProbe", "/var", status),
                            Ok(NotifyOutcome::Sent(_))
                        )
                    })
                    .count()
            })
        })
        .collect();

    let failures: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(failures, 0);

    let store = SqliteHistory::open(&path).unwrap();
    let key = identity().key("diskProbe", "/var");
    let rows = store.last_alarms(&key, WRITERS * RUNS + 10).unwrap();
    assert_eq!(rows.len(), WRITERS * RUNS);
    assert!(rows.windows(2).all(|w| w[0].id > w[1].id));
}

fn escalate_run(path: &Path, status: &str) -> EscalateOutcome {
    let store = Arc::new(SqliteHistory::open(path).unwrap());
    let escalator = IssueEscalator::new(
        EscalatorConfig::new(identity()).test_mode(true),
        store,
        None,
    );
    escalator
        .escalate(
            IssueDraft::builder("disk /var is full", status)
                .service("diskProbe")
                .module("/var")
                .build(),
        )
        .unwrap()
}

#[test]
fn ticket_lifecycle_across_runs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("monokit.db");

    let EscalateOutcome::Created(created) = escalate_run(&path, STATUS_DOWN) else {
        panic!("expected Created");
    };
    assert_eq!(created.ticket_id, 1);
    assert_eq!(escalate_run(&path, STATUS_DOWN).label(), "no-op");
    assert_eq!(escalate_run(&path, STATUS_UP).label(), "updated");

    let reopened = escalate_run(&path, STATUS_DOWN);
    assert_eq!(reopened.label(), "reopened");
    assert_eq!(reopened.event().map(|e| e.ticket_id), Some(1));

    let store = SqliteHistory::open(&path).unwrap();
    let key = identity().key("diskProbe", "/var");
    assert_eq!(store.last_issues(&key, 10).unwrap().len(), 3);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn last_is_always_head_of_window(
        statuses in prop::collection::vec(prop_oneof![Just(STATUS_UP), Just(STATUS_DOWN)], 1..20),
        limit in 1usize..10,
    ) {
        let store = SqliteHistory::open_in_memory().unwrap();
        let key = identity().key("diskProbe", "/var");
        for status in &statuses {
            store.insert_alarm(AlarmEvent::new(&key, "msg", *status, Utc::now())).unwrap();
        }

        let window = store.last_alarms(&key, limit).unwrap();
        let last = store.last_alarm(&key).unwrap();

        prop_assert_eq!(window.len(), limit.min(statuses.len()));
        prop_assert_eq!(last.as_ref(), window.first());
        prop_assert_eq!(last.map(|e| e.status), statuses.last().map(|s| (*s).to_string()));
        prop_assert!(window.windows(2).all(|w| w[0].id > w[1].id));
    }
}
