// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn names_lists_long_name_then_aliases() {
    let def = OptDef::bool(REC_LONG, "recurse").with_alias(REC_SHORT);
    assert_eq!(def.names().collect::<Vec<_>>(), vec!["recursive", "r"]);
}

#[test]
fn bool_parsing_accepts_bare_and_explicit_forms() {
    let def = OptDef::bool("flag", "");
    assert_eq!(def.parse("").unwrap(), OptValue::Bool(true));
    assert_eq!(def.parse("true").unwrap(), OptValue::Bool(true));
    assert_eq!(def.parse("false").unwrap(), OptValue::Bool(false));
    assert!(def.parse("yes").unwrap_err().is_client());
}

#[test]
fn numeric_parsing_respects_width_and_sign() {
    assert_eq!(OptDef::int("n", "").parse("-3").unwrap(), OptValue::Int(-3));
    assert!(OptDef::uint("n", "").parse("-3").is_err());
    assert_eq!(OptDef::float("n", "").parse("2.5").unwrap(), OptValue::Float(2.5));

    let err = OptDef::int("count", "").parse("x").unwrap_err();
    assert!(err.message.contains("could not convert"));
    assert!(err.message.contains("count"));
}

#[test]
fn strings_parse_wraps_single_values() {
    assert_eq!(
        OptDef::strings("ignore", "").parse("*.log").unwrap(),
        OptValue::Strings(vec!["*.log".to_string()])
    );
}

#[test]
fn builtin_set_covers_the_cli_surface() {
    let defs = builtin_options();
    let mut names: Vec<String> = defs.iter().flat_map(|d| d.names().map(str::to_string)).collect();
    names.sort();
    for expected in [
        "encoding", "enc", "recursive", "r", "stream-channels", "timeout", "help", "h",
        "dereference-args", "stdin-name", "hidden", "H", "ignore", "ignore-rules-path",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing builtin {expected}");
    }
}

#[test]
fn encoding_builtin_defaults_to_text() {
    let defs = builtin_options();
    let enc = defs.iter().find(|d| d.name == ENC_LONG).unwrap();
    assert_eq!(enc.default, Some(OptValue::String("text".to_string())));
}

#[test]
fn query_value_rendering() {
    assert_eq!(OptValue::Bool(true).to_query_value(), "true");
    assert_eq!(OptValue::Int(-7).to_query_value(), "-7");
    assert_eq!(OptValue::String("x y".to_string()).to_query_value(), "x y");
}
