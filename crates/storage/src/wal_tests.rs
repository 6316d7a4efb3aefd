// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fw_core::{AgentId, AlertId, TaskId};

fn released(task: &str) -> Operation {
    Operation::TaskLockReleased {
        task_id: TaskId::new(task),
        agent_id: AgentId::new("agent-1"),
        last_run: None,
    }
}

#[test]
fn wal_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");

    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&released("t1")).unwrap();
        wal.append(&Operation::AlertPruned {
            id: AlertId::new("al-1"),
        })
        .unwrap();
    }

    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0], released("t1"));
    assert!(matches!(ops[1], Operation::AlertPruned { .. }));
}

#[test]
fn wal_sequence_continues() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");

    {
        let mut wal = Wal::open(&path).unwrap();
        assert_eq!(wal.sequence(), 0);
        assert_eq!(wal.append(&released("t1")).unwrap(), 1);
    }

    {
        let mut wal = Wal::open(&path).unwrap();
        assert_eq!(wal.sequence(), 1);
        assert_eq!(wal.append(&released("t2")).unwrap(), 2);
    }

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.lines().nth(1).unwrap().starts_with(r#"{"seq":2,"#));
}

#[test]
fn wal_replay_nonexistent() {
    let path = Path::new("/nonexistent/path/wal");
    let ops = Wal::replay(path).unwrap();
    assert!(ops.is_empty());
}

#[test]
fn wal_replay_reports_corrupt_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&released("t1")).unwrap();
    }
    let mut text = std::fs::read_to_string(&path).unwrap();
    text.push_str("{\"seq\":2,\"op\":{\"Nope\":{}}}\n");
    std::fs::write(&path, text).unwrap();

    assert!(matches!(
        Wal::replay(&path),
        Err(WalError::Corrupt { line: 2, .. })
    ));
}
