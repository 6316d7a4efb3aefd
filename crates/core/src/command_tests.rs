// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::BTreeMap;
use yare::parameterized;

/// Loose view of an encoded message for asserting on keys
#[derive(Deserialize)]
struct Loose {
    func: String,
    #[serde(default)]
    payload: Option<BTreeMap<String, String>>,
    #[serde(default)]
    timeout: Option<u64>,
}

#[test]
fn unit_command_has_no_payload_key() {
    let bytes = Envelope::new(Command::Ping).encode().unwrap();
    let map: BTreeMap<String, String> = rmp_serde::from_slice(&bytes).unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map["func"], "ping");
}

#[test]
fn run_task_encodes_named_payload() {
    let bytes = Envelope::new(Command::run_task(TaskId::new("task-9")))
        .encode()
        .unwrap();
    let loose: Loose = rmp_serde::from_slice(&bytes).unwrap();
    assert_eq!(loose.func, "runtask");
    assert_eq!(loose.payload.unwrap()["task_id"], "task-9");
    assert_eq!(loose.timeout, None);
}

#[test]
fn options_are_encoded_when_set() {
    let envelope = Envelope::new(Command::RunCommand(CommandPayload {
        cmd: "whoami".into(),
        shell: Shell::Powershell,
    }))
    .with_timeout(Duration::from_secs(90))
    .with_run_as_user(true);

    let decoded = Envelope::decode(&envelope.encode().unwrap()).unwrap();
    assert_eq!(decoded, envelope);
    assert_eq!(decoded.timeout, Some(90));
    assert_eq!(decoded.command.func(), "rawcmd");
}

#[parameterized(
    whole = { 90_000, 90 },
    fraction_rounds_up = { 1_500, 2 },
    sub_second = { 250, 1 },
    zero = { 0, 1 },
)]
fn timeout_is_whole_seconds(millis: u64, secs: u64) {
    let envelope = Envelope::new(Command::Ping).with_timeout(Duration::from_millis(millis));
    assert_eq!(envelope.timeout, Some(secs));
}

#[test]
fn script_payload_survives_decoding() {
    let envelope = Envelope::new(Command::RunScript(ScriptPayload {
        script_id: "s-1".into(),
        code: "Get-Service".into(),
        shell: Shell::Powershell,
        args: vec!["-Name".into(), "Spooler".into()],
    }));
    assert_eq!(Envelope::decode(&envelope.encode().unwrap()).unwrap(), envelope);
}

#[test]
fn binary_is_smaller_than_json() {
    let envelope = Envelope::new(Command::delete_scheduled("FleetWarden_abcdefghijklmnop"))
        .with_timeout(Duration::from_secs(10));
    let binary = envelope.encode().unwrap();
    let json = serde_json::json!({
        "func": "delschedtask",
        "payload": { "name": "FleetWarden_abcdefghijklmnop" },
        "timeout": 10
    })
    .to_string();
    assert!(binary.len() < json.len());
}

#[test]
fn unknown_func_is_rejected() {
    #[derive(Serialize)]
    struct Bogus {
        func: &'static str,
    }
    let bytes = rmp_serde::to_vec_named(&Bogus { func: "selfdestruct" }).unwrap();
    assert!(matches!(
        Envelope::decode(&bytes),
        Err(DecodeError::UnknownFunc(f)) if f == "selfdestruct"
    ));
}

#[test]
fn garbage_is_malformed() {
    assert!(matches!(
        Envelope::decode(&[0xc1, 0x00, 0x13]),
        Err(DecodeError::Malformed(_))
    ));
}

#[test]
fn missing_payload_is_malformed() {
    #[derive(Serialize)]
    struct Bare {
        func: &'static str,
    }
    let bytes = rmp_serde::to_vec_named(&Bare { func: "runtask" }).unwrap();
    assert!(matches!(Envelope::decode(&bytes), Err(DecodeError::Malformed(_))));
}

#[test]
fn replies_decode_to_requested_shape() {
    let bytes = encode_reply(&vec!["FleetWarden_a", "Other"]).unwrap();
    let names: Vec<String> = decode_reply(&bytes).unwrap();
    assert_eq!(names, vec!["FleetWarden_a", "Other"]);

    let wrong: Result<u32, _> = decode_reply(&bytes);
    assert!(matches!(wrong, Err(DecodeError::Malformed(_))));
}
