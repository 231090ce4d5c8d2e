// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contract tests for the in-process pair: ordering, termination, metadata
//! visibility and cancellation.

use serde_json::{json, Value};

use super::*;
use crate::error::ErrorKind;
use crate::test_support::{collect, request_for, test_root};

fn pair() -> (ChannelEmitter, ChannelResponse) {
    let root = test_root();
    channel_pair(request_for(&root, &["add"], &["1"]))
}

#[tokio::test]
async fn values_arrive_in_emission_order() {
    let (mut re, mut res) = pair();
    let writer = tokio::spawn(async move {
        for i in 0..5i64 {
            re.emit(Payload::value(&i).unwrap()).await.unwrap();
        }
        re.close().await.unwrap();
    });

    let (values, error) = collect(&mut res).await;
    assert_eq!(values, (0..5).map(Value::from).collect::<Vec<_>>());
    assert!(error.is_none());
    writer.await.unwrap();
}

#[tokio::test]
async fn end_of_stream_is_a_singleton() {
    let (mut re, mut res) = pair();
    re.close().await.unwrap();

    assert!(res.next().await.unwrap().is_none());
    assert!(res.next().await.unwrap().is_none());
    assert!(res.error().await.is_none());
}

#[tokio::test]
async fn terminal_error_repeats() {
    let (mut re, mut res) = pair();
    re.close_with_error(Some(Error::new("boom"))).await.unwrap();

    let first = res.next().await.unwrap_err();
    let second = res.next().await.unwrap_err();
    assert_eq!(first, second);
    assert_eq!(first.message, "boom");
    assert_eq!(res.error().await, Some(first));
}

#[tokio::test]
async fn second_close_fails_without_altering_terminal_state() {
    let (mut re, mut res) = pair();
    re.close_with_error(Some(Error::new("first"))).await.unwrap();

    let err = re.close_with_error(Some(Error::new("second"))).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ClosingClosedEmitter);
    let err = re.close().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ClosingClosedEmitter);

    assert_eq!(res.next().await.unwrap_err().message, "first");
}

#[tokio::test]
async fn emit_after_close_fails() {
    let (mut re, _res) = pair();
    re.close().await.unwrap();
    let err = re.emit(Payload::value(&1).unwrap()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ClosedEmitter);
}

#[tokio::test]
async fn set_length_before_first_emit_is_visible() {
    let (mut re, mut res) = pair();
    let writer = tokio::spawn(async move {
        re.set_length(2);
        re.set_length(5);
        re.emit(Payload::value(&"a").unwrap()).await.unwrap();
        // Too late: the hint is frozen by the first emit.
        re.set_length(9);
        re.close().await.unwrap();
    });

    assert_eq!(res.length().await, 5);
    let (values, _) = collect(&mut res).await;
    assert_eq!(values, vec![json!("a")]);
    assert_eq!(res.length().await, 5);
    writer.await.unwrap();
}

#[tokio::test]
async fn close_before_any_emit_unblocks_metadata() {
    let (mut re, mut res) = pair();
    re.close_with_error(Some(Error::client("nope"))).await.unwrap();

    let head = res.head().await;
    assert_eq!(head.length, 0);
    assert_eq!(head.error, Some(Error::client("nope")));
}

#[tokio::test]
async fn single_is_value_then_normal_close() {
    let (mut re, mut res) = pair();
    let writer = tokio::spawn(async move {
        re.emit(Payload::single(&"only").unwrap()).await.unwrap();
        // The emitter closed itself as part of the single emit.
        let err = re.close().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ClosingClosedEmitter);
    });

    let (values, error) = collect(&mut res).await;
    assert_eq!(values, vec![json!("only")]);
    assert!(error.is_none());
    writer.await.unwrap();
}

#[tokio::test]
async fn sequences_are_flattened() {
    let (mut re, mut res) = pair();
    let writer = tokio::spawn(async move {
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        for i in 0..3i64 {
            tx.send(Payload::value(&i).unwrap()).await.unwrap();
        }
        drop(tx);
        re.emit(Payload::Sequence(rx)).await.unwrap();
        re.close().await.unwrap();
    });

    let (values, error) = collect(&mut res).await;
    assert_eq!(values, vec![json!(0), json!(1), json!(2)]);
    assert!(error.is_none());
    writer.await.unwrap();
}

#[tokio::test]
async fn cancellation_unblocks_a_parked_reader() {
    let (_re, mut res) = pair();
    let token = res.request().token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        token.cancel();
    });

    let err = res.next().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
    // The cancellation is the terminal state from here on.
    assert_eq!(res.next().await.unwrap_err().kind, ErrorKind::Cancelled);
    assert_eq!(res.error().await, Some(Error::cancelled()));
}

#[tokio::test]
async fn cancellation_unblocks_a_parked_writer() {
    let (mut re, res) = pair();
    let token = res.request().token.clone();
    // Nobody reads: the emit parks waiting for the reader's ack.
    let writer = tokio::spawn(async move {
        re.emit(Payload::value(&1).unwrap()).await
    });
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    token.cancel();

    let err = writer.await.unwrap().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
    drop(res);
}

#[tokio::test]
async fn back_pressure_blocks_the_writer_until_accepted() {
    let (mut re, mut res) = pair();
    let flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let seen = flag.clone();
    let writer = tokio::spawn(async move {
        re.emit(Payload::value(&1).unwrap()).await.unwrap();
        seen.store(true, std::sync::atomic::Ordering::SeqCst);
        re.close().await.unwrap();
    });

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(!flag.load(std::sync::atomic::Ordering::SeqCst), "emit returned before accept");
    assert!(res.next().await.unwrap().is_some());
    writer.await.unwrap();
}

#[tokio::test]
async fn dropping_the_emitter_ends_the_stream() {
    let (re, mut res) = pair();
    drop(re);
    assert!(res.next().await.unwrap().is_none());
    assert!(res.error().await.is_none());
}
