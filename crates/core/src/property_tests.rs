// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property tests for wire round-trips: the error record, frame encoding,
//! and the incremental decoder against arbitrary chunk boundaries.

use proptest::prelude::*;
use serde_json::Value;

use crate::encoding::{Encoder, JsonEncoder, JsonFrames};
use crate::error::{Error, ErrorKind};

fn arb_kind() -> impl Strategy<Value = ErrorKind> {
    prop_oneof![
        Just(ErrorKind::Normal),
        Just(ErrorKind::Client),
        Just(ErrorKind::Implementation),
        Just(ErrorKind::RateLimited),
        Just(ErrorKind::Forbidden),
        Just(ErrorKind::NotFound),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::hash_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::from(serde_json::Map::from_iter(m))),
        ]
    })
}

proptest! {
    #[test]
    fn error_record_serde_roundtrip(message in ".{0,64}", kind in arb_kind()) {
        let err = Error::with_kind(message, kind);
        let encoded = serde_json::to_vec(&err).expect("encode");
        let decoded: Error = serde_json::from_slice(&encoded).expect("decode");
        prop_assert_eq!(decoded, err);
    }

    #[test]
    fn encoded_frames_decode_to_the_same_values(values in prop::collection::vec(arb_value(), 0..8)) {
        let mut enc = JsonEncoder;
        let mut wire = Vec::new();
        for value in &values {
            wire.extend(enc.encode(value).expect("encode"));
        }

        let mut frames = JsonFrames::new();
        frames.push(&wire);
        let mut decoded = Vec::new();
        while let Some(value) = frames.next().expect("decode") {
            decoded.push(value);
        }
        prop_assert_eq!(decoded, values);
        prop_assert!(!frames.has_pending());
    }

    #[test]
    fn chunk_boundaries_do_not_change_decoding(
        values in prop::collection::vec(arb_value(), 1..6),
        chunk in 1usize..16,
    ) {
        let mut enc = JsonEncoder;
        let mut wire = Vec::new();
        for value in &values {
            wire.extend(enc.encode(value).expect("encode"));
        }

        let mut frames = JsonFrames::new();
        let mut decoded = Vec::new();
        for piece in wire.chunks(chunk) {
            frames.push(piece);
            while let Some(value) = frames.next().expect("decode") {
                decoded.push(value);
            }
        }
        prop_assert_eq!(decoded, values);
    }
}
