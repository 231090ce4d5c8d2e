// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire shape and taxonomy tests for the error type.

use super::*;

#[test]
fn serializes_to_tagged_record() {
    let err = Error::client("bad input");
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"Message": "bad input", "Code": 1, "Type": "error"})
    );
}

#[test]
fn deserializes_with_and_without_tag() {
    let tagged: Error =
        serde_json::from_str(r#"{"Message":"boom","Code":0,"Type":"error"}"#).unwrap();
    assert_eq!(tagged, Error::new("boom"));

    let untagged: Error = serde_json::from_str(r#"{"Message":"boom","Code":4}"#).unwrap();
    assert_eq!(untagged.kind, ErrorKind::Forbidden);
}

#[test]
fn kind_codes_roundtrip() {
    for kind in [
        ErrorKind::Normal,
        ErrorKind::Client,
        ErrorKind::Implementation,
        ErrorKind::RateLimited,
        ErrorKind::Forbidden,
        ErrorKind::NotFound,
    ] {
        assert_eq!(ErrorKind::from_code(kind.code()), kind);
    }
}

#[test]
fn error_record_requires_tag_in_strict_mode() {
    let tagged = serde_json::json!({"Message": "m", "Code": 0, "Type": "error"});
    let legacy = serde_json::json!({"Message": "m", "Code": 0});
    let value = serde_json::json!({"Message": "m", "Code": 0, "Extra": true});

    assert!(error_record(&tagged, true).is_some());
    assert!(error_record(&legacy, true).is_none());
    assert!(error_record(&legacy, false).is_some());
    // An object that merely contains Message/Code among other fields is a value.
    assert!(error_record(&value, false).is_none());
}

#[test]
fn plain_values_are_never_error_records() {
    assert!(error_record(&serde_json::json!("Message"), false).is_none());
    assert!(error_record(&serde_json::json!({"Foo": "bar"}), false).is_none());
}

#[test]
fn benign_close_detection() {
    assert!(Error::closing_closed_emitter().is_benign_close());
    assert!(!Error::closed_emitter().is_benign_close());
    assert!(!Error::new("x").is_benign_close());
}

#[test]
fn display_is_the_message() {
    assert_eq!(Error::not_found("no such thing").to_string(), "no such thing");
}
