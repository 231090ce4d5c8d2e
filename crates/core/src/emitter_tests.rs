// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::{json, Value};

use super::*;
use crate::chan::channel_pair;
use crate::test_support::{collect, request_for, test_root};

fn req() -> std::sync::Arc<crate::request::Request> {
    request_for(&test_root(), &["add"], &["1"])
}

#[tokio::test]
async fn byte_source_round_trips_bytes() {
    let mut source = ByteSource::from_bytes(b"streamed".to_vec());
    assert_eq!(source.read_to_end().await.unwrap(), b"streamed");

    let reader = std::io::Cursor::new(b"from a reader".to_vec());
    let mut source = ByteSource::from_reader(reader);
    assert_eq!(source.read_to_end().await.unwrap(), b"from a reader");
}

#[tokio::test]
async fn emit_once_matches_emit_then_close() {
    let (mut re, mut res) = channel_pair(req());
    let writer = tokio::spawn(async move {
        emit_once(&mut re, json!({"one": true})).await.unwrap();
    });
    let (values, error) = collect(&mut res).await;
    assert_eq!(values, vec![json!({"one": true})]);
    assert!(error.is_none());
    writer.await.unwrap();
}

#[tokio::test]
async fn copy_forwards_values_length_and_termination() {
    let (mut upstream_re, mut upstream_res) = channel_pair(req());
    let (mut downstream_re, mut downstream_res) = channel_pair(req());

    let producer = tokio::spawn(async move {
        upstream_re.set_length(2);
        upstream_re.emit(Payload::value(&1).unwrap()).await.unwrap();
        upstream_re.emit(Payload::value(&2).unwrap()).await.unwrap();
        upstream_re.close_with_error(Some(Error::new("tail"))).await.unwrap();
    });
    let pump = tokio::spawn(async move {
        copy(&mut downstream_re, &mut upstream_res).await.unwrap();
    });

    assert_eq!(downstream_res.length().await, 2);
    let (values, error) = collect(&mut downstream_res).await;
    assert_eq!(values, vec![json!(1), json!(2)]);
    assert_eq!(error, Some(Error::new("tail")));
    producer.await.unwrap();
    pump.await.unwrap();
}

#[tokio::test]
async fn tee_duplicates_values_and_termination() {
    let (first_re, mut first_res) = channel_pair(req());
    let (second_re, mut second_res) = channel_pair(req());

    let writer = tokio::spawn(async move {
        let mut tee = TeeEmitter::new(first_re, second_re);
        tee.set_length(1);
        tee.emit(Payload::value(&"dup").unwrap()).await.unwrap();
        tee.emit(Payload::Stream(ByteSource::from_bytes(b"raw".to_vec()))).await.unwrap();
        tee.close_with_error(Some(Error::new("done"))).await.unwrap();
    });

    // Drain both sides concurrently; the tee blocks on each in turn.
    let second = tokio::spawn(async move { collect(&mut second_res).await });
    let (first_values, first_err) = collect(&mut first_res).await;
    let (second_values, second_err) = second.await.unwrap();

    let expected = vec![json!("dup"), Value::String("raw".to_string())];
    assert_eq!(first_values, expected);
    assert_eq!(second_values, expected);
    assert_eq!(first_err, Some(Error::new("done")));
    assert_eq!(second_err, Some(Error::new("done")));
    writer.await.unwrap();
}
