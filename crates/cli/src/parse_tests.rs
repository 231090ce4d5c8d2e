// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use cb_core::test_support::test_root;
use cb_core::OptValue;

use super::*;

fn parse_args(args: &[&str]) -> Result<Arc<Request>, Error> {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    parse(&test_root(), &args, None)
}

#[test]
fn subcommands_resolve_until_the_first_positional() {
    let req = parse_args(&["add", "1", "2"]).unwrap();
    assert_eq!(req.path, vec!["add"]);
    assert_eq!(req.arguments, vec!["1", "2"]);

    let req = parse_args(&["parent", "leaf", "3"]).unwrap();
    assert_eq!(req.path, vec!["parent", "leaf"]);
    assert_eq!(req.arguments, vec!["3"]);
}

#[test]
fn positionals_shadow_later_subcommand_names() {
    // Once a positional appears, tokens stop resolving as subcommands.
    let req = parse_args(&["add", "1", "add"]).unwrap();
    assert_eq!(req.path, vec!["add"]);
    assert_eq!(req.arguments, vec!["1", "add"]);
}

#[test]
fn long_and_short_option_forms_parse() {
    let req = parse_args(&["add", "--encoding=json", "1"]).unwrap();
    assert_eq!(req.string_option("encoding"), Some("json"));

    let req = parse_args(&["add", "-enc", "json", "1"]).unwrap();
    assert_eq!(req.string_option("encoding"), Some("json"));
}

#[test]
fn boolean_flags_do_not_consume_the_next_token() {
    let req = parse_args(&["add", "--stream-channels", "1"]).unwrap();
    assert_eq!(req.option("stream-channels"), Some(&OptValue::Bool(true)));
    assert_eq!(req.arguments, vec!["1"]);

    let req = parse_args(&["add", "--stream-channels=false", "1"]).unwrap();
    assert_eq!(req.option("stream-channels"), Some(&OptValue::Bool(false)));
}

#[test]
fn double_dash_ends_option_parsing() {
    let req = parse_args(&["add", "--", "--encoding=json"]).unwrap();
    assert_eq!(req.arguments, vec!["--encoding=json"]);
    assert!(req.string_option("encoding").is_none());
}

#[test]
fn unknown_options_are_rejected() {
    let err = parse_args(&["add", "--frobnicate", "1"]).unwrap_err();
    assert!(err.is_client());
    assert!(err.message.contains("unknown option"));
}

#[test]
fn missing_option_value_is_rejected() {
    let err = parse_args(&["add", "1", "--timeout"]).unwrap_err();
    assert!(err.message.contains("missing argument"));
}

#[test]
fn duplicate_scalar_options_are_rejected() {
    let err = parse_args(&["add", "--timeout=1s", "--timeout=2s", "1"]).unwrap_err();
    assert!(err.message.contains("multiple values"));
}

#[test]
fn list_options_accumulate() {
    let req = parse_args(&["add", "--ignore=a", "--ignore=b", "1"]).unwrap();
    assert_eq!(
        req.option("ignore"),
        Some(&OptValue::Strings(vec!["a".to_string(), "b".to_string()]))
    );
}

fn stdin_root() -> Arc<Command> {
    let mut subcommands = std::collections::HashMap::new();
    subcommands.insert(
        "tally".to_string(),
        Arc::new(Command {
            arguments: vec![
                cb_core::ArgDef::string("entries", true, true, "lines to tally").with_stdin(),
            ],
            ..Default::default()
        }),
    );
    Arc::new(Command { subcommands, ..Default::default() })
}

#[test]
fn dash_reads_arguments_from_stdin() {
    let args: Vec<String> = vec!["tally".to_string(), "-".to_string()];
    let mut stdin = std::io::Cursor::new(b"4\n5\n".to_vec());
    let req = parse(&stdin_root(), &args, Some(&mut stdin)).unwrap();
    assert_eq!(req.arguments, vec!["4", "5"]);
}

#[test]
fn dash_reads_arguments_from_a_redirected_file() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "10").unwrap();
    writeln!(file, "20").unwrap();

    let args: Vec<String> = vec!["tally".to_string(), "-".to_string()];
    let reopened = std::fs::File::open(file.path()).unwrap();
    let mut stdin = std::io::BufReader::new(reopened);
    let req = parse(&stdin_root(), &args, Some(&mut stdin)).unwrap();
    assert_eq!(req.arguments, vec!["10", "20"]);
}

#[test]
fn dash_without_stdin_eligible_argument_fails() {
    let args: Vec<String> = vec!["echo".to_string(), "-".to_string()];
    let mut stdin = std::io::Cursor::new(Vec::new());
    let err = parse(&test_root(), &args, Some(&mut stdin)).unwrap_err();
    assert!(err.message.contains("stdin"));
}

#[test]
fn help_path_follows_known_subcommands() {
    let root = test_root();
    let args: Vec<String> =
        vec!["parent".to_string(), "leaf".to_string(), "--help".to_string()];
    assert_eq!(help_path(&root, &args), vec!["parent", "leaf"]);

    let args: Vec<String> = vec!["bogus".to_string()];
    assert!(help_path(&root, &args).is_empty());
}
