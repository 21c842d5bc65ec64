//! End-to-end tests against the compiled host binary.
//!
//! Each test points BERGAMOT_HOME at a temp dir, writes frames to the
//! child's stdin, closes it, and decodes whatever came back on stdout.

use std::io::{Cursor, Write};
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::{Value, json};

use bergamot_host::{FrameCodec, Inbound};

fn frame(value: &Value) -> Vec<u8> {
    let payload = serde_json::to_vec(value).unwrap();
    let mut bytes = (payload.len() as u32).to_ne_bytes().to_vec();
    bytes.extend(payload);
    bytes
}

fn run_host(state_dir: &Path, input: &[u8], args: &[&str]) -> Output {
    let bin = env!("CARGO_BIN_EXE_bergamot-native-host");

    let mut child = Command::new(bin)
        .args(args)
        .env("BERGAMOT_HOME", state_dir)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn host");

    {
        let mut stdin = child.stdin.take().unwrap();
        // The host may exit before consuming stdin (e.g. unusable state dir).
        if let Err(e) = stdin.write_all(input) {
            assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe, "{e}");
        }
        // stdin dropped here: the host sees end-of-stream.
    }

    child.wait_with_output().expect("failed to wait for host")
}

fn decode_all(stdout: Vec<u8>) -> Vec<Value> {
    let codec = FrameCodec::default();
    let mut cursor = Cursor::new(stdout);
    let mut out = Vec::new();
    loop {
        match codec.read_frame(&mut cursor).unwrap() {
            Inbound::Frame(v) => out.push(v),
            Inbound::EndOfStream => return out,
            Inbound::Malformed(e) => panic!("host wrote a malformed frame: {e}"),
        }
    }
}

#[test]
fn relays_frames_and_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("port.json"), r#"{"port": 5432}"#).unwrap();

    let mut input = frame(&json!({"type": "ping", "data": "integration_test"}));
    input.extend(frame(&json!({"type": "get_port"})));
    input.extend(frame(&json!({"type": "unknown_type"})));

    let output = run_host(dir.path(), &input, &["chrome-extension://abcdef/"]);

    assert!(output.status.success(), "host exited with {:?}", output.status);
    assert_eq!(
        decode_all(output.stdout),
        vec![
            json!({"type": "pong", "echo": "integration_test"}),
            json!({"type": "port", "port": 5432}),
            json!({"type": "error", "error": "Unknown message type: unknown_type"}),
        ]
    );
}

#[test]
fn immediate_end_of_stream_exits_zero_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_host(dir.path(), &[], &[]);

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
}

#[test]
fn truncated_frame_does_not_crash() {
    let dir = tempfile::tempdir().unwrap();
    let mut input = 1000u32.to_ne_bytes().to_vec();
    input.extend_from_slice(br#"{"type":"ping"}"#);

    let output = run_host(dir.path(), &input, &[]);

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
}

#[test]
fn writes_log_file_in_state_dir() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_host(dir.path(), &frame(&json!({"type": "ping"})), &[]);
    assert!(output.status.success());

    let log = std::fs::read_to_string(dir.path().join("native-host.log")).unwrap();
    assert!(log.contains("Native host started"));
    assert!(log.contains("Received message"));
}

#[test]
fn version_flag_prints_version() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_host(dir.path(), &[], &["--version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        stdout.trim(),
        format!("bergamot-native-host {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn unusable_state_dir_exits_one_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let not_a_dir = dir.path().join("home");
    std::fs::write(&not_a_dir, "").unwrap();

    let output = run_host(&not_a_dir, &frame(&json!({"type": "ping"})), &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("failed to open log file"), "stderr: {stderr}");
}
