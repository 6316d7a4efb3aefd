// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{agent, fleet, store, task};
use fw_adapters::{FakeTransport, TransportCall};
use fw_core::{
    encode_reply, AutomatedTask, FakeClock, RunLockError, RunState, TaskSchedule, TaskTarget,
};

struct Harness {
    _dir: tempfile::TempDir,
    store: Store,
    transport: FakeTransport,
    clock: FakeClock,
    runner: TaskRunner<FakeTransport, FakeClock>,
}

fn harness() -> Harness {
    let (dir, store) = store();
    let transport = FakeTransport::new();
    let clock = FakeClock::new();
    let dispatcher = Dispatcher::new(transport.clone()).with_timeout(Duration::from_secs(5));
    let runner = TaskRunner::new(store.clone(), dispatcher, clock.clone(), TaskConfig::default());
    Harness {
        _dir: dir,
        store,
        transport,
        clock,
        runner,
    }
}

fn report(retcode: i32, stderr: &str) -> RunReport {
    RunReport {
        retcode: Some(retcode),
        stdout: "done".to_string(),
        stderr: stderr.to_string(),
        execution_time: 1.5,
    }
}

#[tokio::test]
async fn run_due_locks_and_dispatches_each_due_pair() {
    let h = harness();

    let report = h.runner.run_due(&fleet()).await.unwrap();

    assert_eq!(report.dispatched, 3);
    assert_eq!(report.conflicts, 0);
    let mut published = h.transport.published();
    published.sort();
    assert_eq!(published, vec!["a1", "a1", "a3"]);
    assert_eq!(h.store.running().len(), 3);
    assert_eq!(h.transport.connect_count(), 1);
}

#[tokio::test]
async fn run_due_fires_once_per_minute() {
    let h = harness();
    let fleet = fleet();

    h.runner.run_due(&fleet).await.unwrap();
    let again = h.runner.run_due(&fleet).await.unwrap();

    assert_eq!(again, RunDueReport::default());
    assert_eq!(h.transport.published().len(), 3);
}

#[tokio::test]
async fn run_due_counts_pairs_already_running() {
    let h = harness();
    let a_minute_ago = FakeClock::at(h.clock.now() - chrono::Duration::minutes(1));
    h.store
        .acquire_run(&task("daily"), &agent("a1"), &RunLockConfig::default(), &a_minute_ago)
        .unwrap();

    let report = h.runner.run_due(&fleet()).await.unwrap();

    assert_eq!(report.dispatched, 2);
    assert_eq!(report.conflicts, 1);
}

#[tokio::test]
async fn undeliverable_batch_releases_its_locks() {
    let h = harness();
    h.transport.set_down(true);

    let err = h.runner.run_due(&fleet()).await.unwrap_err();

    assert!(matches!(
        err,
        TaskError::Dispatch(DispatchError::TransportDown(_))
    ));
    assert!(h.store.running().is_empty());
}

#[tokio::test]
async fn one_shot_task_is_retried_after_undeliverable_batch() {
    let h = harness();
    let mut fleet = fleet();
    let once: AutomatedTask = serde_json::from_value(serde_json::json!({
        "id": "once", "name": "Install agent update",
        "schedule": { "type": "run_once", "at": "2026-01-05T09:00:00Z" },
        "target": { "kind": "agent", "id": "a1" }
    }))
    .unwrap();
    fleet.tasks.insert(task("once"), once);

    h.transport.set_down(true);
    assert!(h.runner.run_due(&fleet).await.is_err());
    let released = h.store.task_result(&task("once"), &agent("a1")).unwrap();
    assert_eq!(released.state, RunState::Idle);
    assert_eq!(released.last_run, None);

    h.transport.set_down(false);
    h.clock.advance(Duration::from_secs(2 * 60));
    let report = h.runner.run_due(&fleet).await.unwrap();

    assert_eq!(report.dispatched, 1);
    assert!(h.store.task_result(&task("once"), &agent("a1")).unwrap().is_running());
}

#[tokio::test]
async fn stale_release_restores_the_previous_run_time() {
    let h = harness();
    let fleet = fleet();
    h.runner.run_due(&fleet).await.unwrap();
    h.runner
        .complete(&task("daily"), &agent("a1"), report(0, ""))
        .unwrap();
    let first_run = h.clock.now();

    // Next day's run never reports back
    h.clock.advance(Duration::from_secs(24 * 3600));
    h.runner.run_due(&fleet).await.unwrap();
    h.clock.advance(Duration::from_secs(31 * 60));
    h.runner.release_stale();

    let result = h.store.task_result(&task("daily"), &agent("a1")).unwrap();
    assert_eq!(result.state, RunState::Idle);
    assert_eq!(result.last_run, Some(first_run));
}

#[tokio::test]
async fn stale_locks_are_released_after_grace() {
    let h = harness();
    h.runner.run_due(&fleet()).await.unwrap();

    h.clock.advance(Duration::from_secs(10 * 60));
    assert_eq!(h.runner.release_stale(), SweepReport::default());

    h.clock.advance(Duration::from_secs(21 * 60));
    let swept = h.runner.release_stale();
    assert_eq!(swept.processed, 3);
    assert!(h.store.running().is_empty());
}

#[tokio::test]
async fn run_now_records_the_report() {
    let h = harness();
    h.transport
        .reply("a1", encode_reply(&report(0, "")).unwrap());

    let got = h
        .runner
        .run_now(&fleet(), &task("manual"), &agent("a1"))
        .await
        .unwrap();

    assert_eq!(got.stdout, "done");
    let result = h.store.task_result(&task("manual"), &agent("a1")).unwrap();
    assert_eq!(result.state, RunState::Completed);
    assert_eq!(result.report, Some(report(0, "")));
}

#[tokio::test]
async fn run_now_sends_the_run_timeout() {
    let h = harness();
    h.transport
        .reply("a1", encode_reply(&report(0, "")).unwrap());

    h.runner
        .run_now(&fleet(), &task("manual"), &agent("a1"))
        .await
        .unwrap();

    let sent = h
        .transport
        .calls()
        .into_iter()
        .find_map(|c| match c {
            TransportCall::Request { payload, .. } => Some(payload),
            _ => None,
        })
        .unwrap();
    let envelope = Envelope::decode(&sent).unwrap();
    assert_eq!(envelope.timeout, Some(120));
    assert_eq!(envelope.command, Command::run_task(task("manual")));
}

#[tokio::test]
async fn nonzero_exit_is_agent_failure() {
    let h = harness();
    h.transport
        .reply("a1", encode_reply(&report(2, "access denied")).unwrap());

    let err = h
        .runner
        .run_now(&fleet(), &task("manual"), &agent("a1"))
        .await
        .unwrap_err();

    match err {
        TaskError::AgentFailed { retcode, stderr, .. } => {
            assert_eq!(retcode, Some(2));
            assert_eq!(stderr, "access denied");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(h.store.running().is_empty());
}

#[tokio::test]
async fn run_now_rejects_unknown_ids() {
    let h = harness();
    let fleet = fleet();

    let err = h
        .runner
        .run_now(&fleet, &task("nope"), &agent("a1"))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::UnknownTask(_)));

    let err = h
        .runner
        .run_now(&fleet, &task("manual"), &agent("a9"))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::UnknownAgent(_)));
    assert!(h.transport.calls().is_empty());
}

#[tokio::test]
async fn run_now_on_running_pair_is_lock_conflict() {
    let h = harness();
    h.store
        .acquire_run(&task("manual"), &agent("a1"), &RunLockConfig::default(), &h.clock)
        .unwrap();

    let err = h
        .runner
        .run_now(&fleet(), &task("manual"), &agent("a1"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TaskError::Lock(RunLockError::LockConflict { .. })
    ));
    assert!(h.transport.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn silent_agent_releases_the_lock() {
    let h = harness();

    let err = h
        .runner
        .run_now(&fleet(), &task("manual"), &agent("a1"))
        .await
        .unwrap_err();

    assert!(matches!(err, TaskError::Dispatch(DispatchError::Timeout)));
    let result = h.store.task_result(&task("manual"), &agent("a1")).unwrap();
    assert_eq!(result.state, RunState::Idle);
}

#[test]
fn report_for_idle_pair_is_ignored() {
    let h = harness();

    let completed = h
        .runner
        .complete(&task("daily"), &agent("a1"), report(0, ""))
        .unwrap();

    assert!(!completed);
}

#[tokio::test]
async fn reconcile_deletes_only_unowned_prefixed_entries() {
    let h = harness();
    let listing = vec!["FleetWarden_daily", "FleetWarden_gone", "UserBackup"];
    h.transport.reply("a1", encode_reply(&listing).unwrap());

    let report = h.runner.reconcile_orphans(&fleet()).await.unwrap();

    assert_eq!(
        report,
        ReconcileReport {
            agents_checked: 1,
            agents_skipped: 0,
            orphans_removed: 1,
        }
    );
    let deleted: Vec<Command> = h
        .transport
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            TransportCall::Publish { payload, .. } => Some(Envelope::decode(&payload).unwrap().command),
            _ => None,
        })
        .collect();
    assert_eq!(deleted, vec![Command::delete_scheduled("FleetWarden_gone")]);
}

#[tokio::test]
async fn reconcile_keeps_entries_of_newly_created_tasks() {
    let h = harness();
    let mut fleet = fleet();
    let created = AutomatedTask::new("fresh", "Patch now", TaskSchedule::Manual)
        .with_target(TaskTarget::Agent(agent("a1")));
    let entry = created.scheduled_name.clone();
    fleet.tasks.insert(task("fresh"), created);
    h.transport.reply("a1", encode_reply(&vec![entry.as_str(), "FleetWarden_gone"]).unwrap());

    let report = h.runner.reconcile_orphans(&fleet).await.unwrap();

    assert!(entry.starts_with(&TaskConfig::default().name_prefix));
    assert_eq!(report.orphans_removed, 1);
}

#[tokio::test(start_paused = true)]
async fn reconcile_skips_agents_that_do_not_answer() {
    let h = harness();

    let report = h.runner.reconcile_orphans(&fleet()).await.unwrap();

    assert_eq!(report.agents_checked, 0);
    assert_eq!(report.agents_skipped, 1);
    assert!(h.transport.published().is_empty());
}
