// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use yare::parameterized;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 10, 14, 0, 0).unwrap()
}

fn install(name: &str) -> PendingAction {
    PendingAction::new(
        ActionId::new("act-1"),
        AgentId::new("agent-1"),
        ActionKind::InstallSoftware { name: name.into() },
        serde_json::json!({ "name": name }),
        now(),
    )
}

#[parameterized(
    fresh_install = {
        "Chocolatey installed 1/1 packages.\nThe install of widget was successful.",
        Outcome::Success
    },
    already_there = {
        "widget v1.2 already installed.\nUse --force to reinstall, specify a version to install.",
        Outcome::AlreadyInstalled
    },
    shouting = {
        "THE INSTALL OF WIDGET WAS SUCCESSFUL. INSTALLED.",
        Outcome::Success
    },
    partial_success_set = {
        "The install of widget failed.",
        Outcome::Unknown
    },
    unrelated = {
        "network unreachable",
        Outcome::Unknown
    },
    empty = { "", Outcome::Unknown },
)]
fn install_classification(text: &str, expected: Outcome) {
    assert_eq!(classify_install("widget", text), expected);
}

#[test]
fn success_set_is_checked_first() {
    let both = "install of widget was successful installed already --force reinstall";
    assert_eq!(classify_install("widget", both), Outcome::Success);
}

#[test]
fn both_known_sets_count_as_success() {
    assert!(Outcome::Success.is_success());
    assert!(Outcome::AlreadyInstalled.is_success());
    assert!(!Outcome::Unknown.is_success());
}

#[test]
fn non_install_kinds_are_unknown() {
    assert_eq!(
        classify(&ActionKind::PatchScan, "install of widget was successful installed"),
        Outcome::Unknown
    );
}

#[test]
fn complete_first_time_records_outcome() {
    let action = install("widget");
    let later = now() + chrono::Duration::minutes(3);
    let (done, effects) = action
        .complete("The install of widget was successful. 1 installed", later)
        .unwrap();

    assert_eq!(done.status, ActionStatus::Completed);
    assert_eq!(done.completed_at, Some(later));
    assert_eq!(done.outcome, Some(Outcome::Success));
    assert!(matches!(
        &effects[0],
        Effect::Emit(Event::ActionCompleted { outcome: Outcome::Success, .. })
    ));
}

#[test]
fn second_completion_is_ignored() {
    let (done, _) = install("widget").complete("first", now()).unwrap();
    assert!(done.complete("second", now()).is_none());
    assert_eq!(done.result.as_deref(), Some("first"));
}

#[test]
fn descriptions_and_due() {
    let due = now() + chrono::Duration::hours(2);
    let reboot = ActionKind::ScheduledReboot { due };
    assert_eq!(reboot.due(), Some(due));
    assert_eq!(reboot.description(), "Device pending reboot at 2026-02-10 16:00 UTC");
    assert_eq!(
        ActionKind::InstallSoftware { name: "git".into() }.description(),
        "git software install"
    );
    assert_eq!(ActionKind::PatchInstall.due(), None);
}

#[test]
fn kind_serializes_tagged() {
    let json = serde_json::to_value(ActionKind::RunCommand { cmd: "ipconfig".into() }).unwrap();
    assert_eq!(json["kind"], "run_command");
    assert_eq!(json["cmd"], "ipconfig");
}

#[test]
fn only_old_completed_actions_are_prunable() {
    let retention = std::time::Duration::from_secs(7 * 24 * 3600);
    let pending = install("widget");
    assert!(!pending.is_prunable(retention, now() + chrono::Duration::days(30)));

    let (done, _) = pending.complete("ok", now()).unwrap();
    assert!(!done.is_prunable(retention, now() + chrono::Duration::days(7)));
    assert!(done.is_prunable(retention, now() + chrono::Duration::days(8)));
}
