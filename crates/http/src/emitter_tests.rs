// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The server emitter's state machine, observed through the raw bytes it
//! writes.

use cb_core::test_support::{request_for, test_root};
use cb_core::{ByteSource, Error, Payload, ResponseEmitter};

use super::*;
use crate::proto::Headers;

fn emitter(sink: Vec<u8>) -> HttpEmitter<Vec<u8>> {
    let root = test_root();
    let req = request_for(&root, &["echo"], &[]);
    HttpEmitter::new(sink, req, EncodingType::Json, false, Headers::new()).unwrap()
}

fn written(re: HttpEmitter<Vec<u8>>) -> String {
    String::from_utf8_lossy(&re.into_inner()).into_owned()
}

#[tokio::test]
async fn single_value_gets_no_framing_marker() {
    let mut re = emitter(Vec::new());
    re.emit(Payload::single(&"some value").unwrap()).await.unwrap();

    let out = written(re);
    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"), "{out}");
    assert!(out.contains("Content-Type: application/json"));
    assert!(!out.contains(STREAM_HEADER));
    assert!(!out.contains(CHANNEL_HEADER));
    assert!(out.contains("\"some value\"\n"));
    assert!(out.ends_with("0\r\n\r\n"));
}

#[tokio::test]
async fn structured_values_get_the_channel_marker() {
    let mut re = emitter(Vec::new());
    re.emit(Payload::value(&1).unwrap()).await.unwrap();
    re.close().await.unwrap();

    let out = written(re);
    assert!(out.contains("X-Chunked-Output: 1"));
    assert!(out.contains("Trailer: X-Stream-Error"));
}

#[tokio::test]
async fn raw_streams_get_the_stream_marker_and_plain_text() {
    let mut re = emitter(Vec::new());
    re.emit(Payload::Stream(ByteSource::from_bytes(b"raw bytes".to_vec()))).await.unwrap();
    re.close().await.unwrap();

    let out = written(re);
    assert!(out.contains("X-Stream-Output: 1"));
    assert!(out.contains("Content-Type: text/plain"));
    assert!(out.contains("raw bytes"));
}

#[tokio::test]
async fn encoding_override_wins_the_content_type() {
    let mut re = emitter(Vec::new());
    re.set_encoding(EncodingType::Text);
    re.emit(Payload::value(&"x").unwrap()).await.unwrap();
    re.close().await.unwrap();

    let out = written(re);
    assert!(out.contains("Content-Type: text/plain"));
}

#[tokio::test]
async fn length_hint_becomes_x_content_length() {
    let mut re = emitter(Vec::new());
    re.set_length(42);
    re.emit(Payload::value(&1).unwrap()).await.unwrap();
    re.close().await.unwrap();

    assert!(written(re).contains("X-Content-Length: 42"));
}

#[tokio::test]
async fn client_error_before_any_emit_is_a_400() {
    let mut re = emitter(Vec::new());
    re.close_with_error(Some(Error::client("bad arguments"))).await.unwrap();

    let out = written(re);
    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{out}");
    assert!(out.contains("{\"Message\":\"bad arguments\",\"Code\":1,\"Type\":\"error\"}"));
}

#[tokio::test]
async fn generic_error_before_any_emit_is_a_500() {
    let mut re = emitter(Vec::new());
    re.close_with_error(Some(Error::new("an error occurred"))).await.unwrap();

    let out = written(re);
    assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{out}");
}

#[tokio::test]
async fn normal_close_before_any_emit_is_a_200() {
    let mut re = emitter(Vec::new());
    re.close().await.unwrap();
    assert!(written(re).starts_with("HTTP/1.1 200 OK\r\n"));
}

#[tokio::test]
async fn late_error_lands_in_the_trailer() {
    let mut re = emitter(Vec::new());
    re.emit(Payload::value(&"ok").unwrap()).await.unwrap();
    re.close_with_error(Some(Error::new("late\nfailure"))).await.unwrap();

    let out = written(re);
    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    // Only the first line of the message survives sanitizing.
    assert!(out.ends_with("0\r\nX-Stream-Error: late\r\n\r\n"), "{out}");
}

#[tokio::test]
async fn second_close_is_benign() {
    let mut re = emitter(Vec::new());
    re.close().await.unwrap();
    assert!(re.close().await.unwrap_err().is_benign_close());
}

#[tokio::test]
async fn emit_after_close_fails() {
    let mut re = emitter(Vec::new());
    re.close().await.unwrap();
    let err = re.emit(Payload::value(&1).unwrap()).await.unwrap_err();
    assert_eq!(err, Error::closed_emitter());
}

#[tokio::test]
async fn head_requests_write_only_the_preamble() {
    let root = test_root();
    let req = request_for(&root, &["echo"], &[]);
    let mut re =
        HttpEmitter::new(Vec::new(), req, EncodingType::Json, true, Headers::new()).unwrap();
    re.emit(Payload::single(&"body").unwrap()).await.unwrap();

    let out = written(re);
    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(!out.contains("body"));
}
