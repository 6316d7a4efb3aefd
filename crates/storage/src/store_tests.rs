// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fw_core::{ActionKind, AlertKind, Command, FakeClock, RunState, Severity};
use std::path::PathBuf;

struct Fixture {
    _dir: tempfile::TempDir,
    path: PathBuf,
    store: Store,
    clock: FakeClock,
    config: RunLockConfig,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.wal");
    let store = Store::open(&path).unwrap();
    Fixture {
        _dir: dir,
        path,
        store,
        clock: FakeClock::new(),
        config: RunLockConfig::new().with_grace(Duration::from_secs(600)),
    }
}

fn ids() -> (TaskId, AgentId) {
    (TaskId::new("t1"), AgentId::new("a1"))
}

fn alert(id: &str, kind: AlertKind, now: DateTime<Utc>) -> Alert {
    Alert::new(
        AlertId::new(id),
        AgentId::new("a1"),
        kind,
        Severity::Warning,
        "disk space low",
        now,
    )
}

#[test]
fn acquire_emits_dispatch_and_persists() {
    let f = fixture();
    let (task, agent) = ids();

    let effects = f.store.acquire_run(&task, &agent, &f.config, &f.clock).unwrap();
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Dispatch { command: Command::RunTask(_), .. }
    )));

    let reopened = Store::open(&f.path).unwrap();
    let result = reopened.task_result(&task, &agent).unwrap();
    assert_eq!(result.state, RunState::Running);
    assert_eq!(result.locked_at, Some(f.clock.now()));
}

#[test]
fn second_acquire_conflicts_until_janitor_releases() {
    let f = fixture();
    let (task, agent) = ids();
    f.store.acquire_run(&task, &agent, &f.config, &f.clock).unwrap();

    let err = f.store.acquire_run(&task, &agent, &f.config, &f.clock).unwrap_err();
    assert!(matches!(err, StoreError::RunLock(RunLockError::LockConflict { .. })));

    // Young lock survives the janitor
    assert!(!f.store.release_stale_run(&task, &agent, &f.config, &f.clock).unwrap());

    f.clock.advance(Duration::from_secs(601));
    let err = f.store.acquire_run(&task, &agent, &f.config, &f.clock).unwrap_err();
    assert!(matches!(err, StoreError::RunLock(RunLockError::StaleLock { .. })));

    assert!(f.store.release_stale_run(&task, &agent, &f.config, &f.clock).unwrap());
    assert!(f.store.acquire_run(&task, &agent, &f.config, &f.clock).is_ok());
}

#[test]
fn racing_acquires_have_one_winner() {
    let f = fixture();
    let (task, agent) = ids();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = f.store.clone();
            let clock = f.clock.clone();
            let config = f.config.clone();
            let (task, agent) = (task.clone(), agent.clone());
            std::thread::spawn(move || store.acquire_run(&task, &agent, &config, &clock).is_ok())
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(f.store.sequence(), 1);
}

#[test]
fn completion_only_applies_to_running() {
    let f = fixture();
    let (task, agent) = ids();
    let report = RunReport {
        retcode: Some(0),
        stdout: "ok".into(),
        ..Default::default()
    };

    assert!(!f
        .store
        .complete_run(&task, &agent, report.clone(), &f.config, &f.clock)
        .unwrap());

    f.store.acquire_run(&task, &agent, &f.config, &f.clock).unwrap();
    assert!(f
        .store
        .complete_run(&task, &agent, report.clone(), &f.config, &f.clock)
        .unwrap());
    assert!(!f
        .store
        .complete_run(&task, &agent, report, &f.config, &f.clock)
        .unwrap());

    let result = f.store.task_result(&task, &agent).unwrap();
    assert_eq!(result.state, RunState::Completed);
    assert_eq!(result.report.unwrap().stdout, "ok");
    assert!(f.store.running().is_empty());
}

#[test]
fn action_completion_is_idempotent() {
    let f = fixture();
    let action = PendingAction::new(
        ActionId::new("act-1"),
        AgentId::new("a1"),
        ActionKind::InstallSoftware {
            name: "widget".into(),
        },
        serde_json::json!({"name": "widget"}),
        f.clock.now(),
    );
    f.store.create_action(action).unwrap();

    let first = f
        .store
        .complete_action(
            &ActionId::new("act-1"),
            "widget already installed. Use --force to reinstall",
            f.clock.now(),
        )
        .unwrap();
    assert_eq!(first, Some(Outcome::AlreadyInstalled));

    let second = f
        .store
        .complete_action(&ActionId::new("act-1"), "other", f.clock.now())
        .unwrap();
    assert_eq!(second, None);

    let stored = f.store.action(&ActionId::new("act-1")).unwrap();
    assert_eq!(
        stored.result.as_deref(),
        Some("widget already installed. Use --force to reinstall")
    );
    assert!(matches!(
        f.store.complete_action(&ActionId::new("missing"), "x", f.clock.now()),
        Err(StoreError::ActionNotFound(_))
    ));
}

#[test]
fn raise_alert_dedupes_open_alerts() {
    let f = fixture();
    let now = f.clock.now();

    let (first, effects) = f.store.raise_alert(alert("al-1", AlertKind::Check, now)).unwrap();
    assert_eq!(effects.len(), 1);
    let (again, effects) = f.store.raise_alert(alert("al-2", AlertKind::Check, now)).unwrap();
    assert_eq!(again, first);
    assert!(effects.is_empty());

    f.store.resolve_alert(&first, now).unwrap();
    let (third, _) = f.store.raise_alert(alert("al-3", AlertKind::Check, now)).unwrap();
    assert_eq!(third, AlertId::new("al-3"));
}

#[test]
fn snooze_expiry_and_prune() {
    let f = fixture();
    let now = f.clock.now();
    let (id, _) = f.store.raise_alert(alert("al-1", AlertKind::Custom, now)).unwrap();

    let until = now + chrono::Duration::minutes(30);
    f.store.snooze_alert(&id, until, now).unwrap();
    assert!(f.store.expired_snoozes(now).is_empty());

    f.clock.advance(Duration::from_secs(30 * 60));
    assert_eq!(f.store.expired_snoozes(f.clock.now()), vec![id.clone()]);
    assert_eq!(f.store.unsnooze_alert(&id, f.clock.now()).unwrap().len(), 1);
    assert!(f.store.unsnooze_alert(&id, f.clock.now()).unwrap().is_empty());

    f.store.resolve_alert(&id, f.clock.now()).unwrap();
    assert!(matches!(
        f.store.snooze_alert(&id, f.clock.now() + chrono::Duration::hours(1), f.clock.now()),
        Err(StoreError::Alert(AlertError::AlreadyResolved(_)))
    ));

    let retention = Duration::from_secs(24 * 3600);
    assert!(f.store.prunable_alerts(retention, f.clock.now()).is_empty());
    f.clock.advance(Duration::from_secs(24 * 3600 + 1));
    assert_eq!(f.store.prunable_alerts(retention, f.clock.now()), vec![id.clone()]);
    assert!(f.store.prune_alert(&id).unwrap());
    assert!(f.store.alert(&id).is_none());
}

#[test]
fn inventory_search_is_case_insensitive() {
    let f = fixture();
    let now = f.clock.now();
    f.store
        .store_inventory(
            InventoryBlob::compress(AgentId::new("a1"), InventoryKind::Software, "Mozilla Firefox", now)
                .unwrap(),
        )
        .unwrap();
    f.store
        .store_inventory(InventoryBlob::raw(
            AgentId::new("a2"),
            InventoryKind::Software,
            b"7-Zip".to_vec(),
            now,
        ))
        .unwrap();

    assert_eq!(
        f.store.search_inventory(InventoryKind::Software, "firefox"),
        vec![AgentId::new("a1")]
    );
    assert!(f.store.search_inventory(InventoryKind::Services, "firefox").is_empty());
    assert!(f.store.inventory(&AgentId::new("a2"), InventoryKind::Software).is_some());
}
