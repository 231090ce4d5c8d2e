// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use cb_core::test_support::{request_for, test_root, SharedBuf};
use cb_core::{ByteSource, Payload};

use super::*;

fn emitter_for(path: &[&str], args: &[&str]) -> (CliEmitter, tokio::sync::oneshot::Receiver<i32>, SharedBuf, SharedBuf) {
    let root = test_root();
    let req = request_for(&root, path, args);
    let stdout = SharedBuf::new();
    let stderr = SharedBuf::new();
    let (emitter, exit_rx) =
        CliEmitter::new(req, Box::new(stdout.clone()), Box::new(stderr.clone())).unwrap();
    (emitter, exit_rx, stdout, stderr)
}

#[tokio::test]
async fn text_encoder_renders_plain_lines() {
    // The add fixture brings a newline-terminated text encoder.
    let (mut re, exit_rx, stdout, _stderr) = emitter_for(&["add"], &["1"]);
    re.emit(Payload::value(&"total: 1").unwrap()).await.unwrap();
    re.close().await.unwrap();

    assert_eq!(stdout.contents(), "total: 1\n");
    assert_eq!(exit_rx.await.unwrap(), 0);
}

#[tokio::test]
async fn commands_without_text_encoder_fall_back_to_json() {
    let (mut re, exit_rx, stdout, _stderr) = emitter_for(&["echo"], &[]);
    re.emit(Payload::value(&"quoted").unwrap()).await.unwrap();
    re.close().await.unwrap();

    assert_eq!(stdout.contents(), "\"quoted\"\n");
    assert_eq!(exit_rx.await.unwrap(), 0);
}

#[tokio::test]
async fn terminal_error_prints_and_sets_exit_code() {
    let (mut re, exit_rx, stdout, stderr) = emitter_for(&["add"], &["1"]);
    re.emit(Payload::value(&"partial").unwrap()).await.unwrap();
    re.close_with_error(Some(cb_core::Error::new("invalid integer: \"x\""))).await.unwrap();

    assert_eq!(stdout.contents(), "partial\n");
    assert!(stderr.contents().starts_with("Error: invalid integer"));
    assert_eq!(exit_rx.await.unwrap(), 1);
}

#[tokio::test]
async fn streams_bypass_the_encoder() {
    let (mut re, _exit_rx, stdout, _stderr) = emitter_for(&["add"], &["1"]);
    re.emit(Payload::Stream(ByteSource::from_bytes(b"raw bytes".to_vec()))).await.unwrap();
    re.close().await.unwrap();

    assert_eq!(stdout.contents(), "raw bytes");
}

#[tokio::test]
async fn single_closes_the_emitter() {
    let (mut re, exit_rx, stdout, _stderr) = emitter_for(&["echo"], &[]);
    re.emit(Payload::single(&"once").unwrap()).await.unwrap();
    assert!(re.close().await.unwrap_err().is_benign_close());

    assert_eq!(stdout.contents(), "\"once\"\n");
    assert_eq!(exit_rx.await.unwrap(), 0);
}

#[tokio::test]
async fn emit_after_close_fails() {
    let (mut re, _exit_rx, _stdout, _stderr) = emitter_for(&["add"], &["1"]);
    re.close().await.unwrap();
    assert!(re.emit(Payload::value(&1).unwrap()).await.is_err());
}

#[test]
fn effective_encoding_selection() {
    let root = test_root();
    // add declares a text encoder: text stays text.
    let req = request_for(&root, &["add"], &["1"]);
    assert_eq!(effective_encoding(&req), EncodingType::Text);
    // echo does not: text falls back to json.
    let req = request_for(&root, &["echo"], &[]);
    assert_eq!(effective_encoding(&req), EncodingType::Json);
}
