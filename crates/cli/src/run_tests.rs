// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Harness scenarios: the adder command end to end on a terminal.

use std::sync::Arc;

use cb_core::test_support::{test_root, SharedBuf};
use cb_core::{Command, LocalExecutor};

use super::*;

async fn run_line(root: Arc<Command>, line: &[&str]) -> (i32, String, String) {
    let argv: Vec<String> = line.iter().map(|s| s.to_string()).collect();
    let stdout = SharedBuf::new();
    let stderr = SharedBuf::new();
    let exec_root = root.clone();
    let code = run(
        root,
        RunConfig {
            argv: &argv,
            stdin: None,
            stdout: Box::new(stdout.clone()),
            stderr: Box::new(stderr.clone()),
            make_env: Box::new(|_req| Ok(Arc::new(()) as cb_core::Environment)),
            make_executor: Box::new(move |_req, _env| {
                Ok(Box::new(LocalExecutor::new(exec_root)) as Box<dyn cb_core::Executor>)
            }),
        },
    )
    .await;
    (code, stdout.contents(), stderr.contents())
}

#[tokio::test]
async fn adding_integers_streams_intermediate_results() {
    let (code, stdout, stderr) = run_line(test_root(), &["crossbar", "add", "2", "3", "5"]).await;
    assert_eq!(code, 0, "stderr: {stderr}");
    assert_eq!(
        stdout,
        "intermediate result: 2; 2 left\n\
         intermediate result: 5; 1 left\n\
         intermediate result: 10; 0 left\n\
         total: 10\n"
    );
    assert!(stderr.is_empty());
}

#[tokio::test]
async fn bad_integer_argument_fails_without_a_total() {
    let (code, stdout, stderr) = run_line(test_root(), &["crossbar", "add", "2", "x", "5"]).await;
    assert_ne!(code, 0);
    assert!(!stdout.contains("total:"), "{stdout}");
    assert!(stderr.starts_with("Error:"), "{stderr}");
}

#[tokio::test]
async fn help_flag_prints_help_and_skips_run() {
    let (code, stdout, _stderr) = run_line(test_root(), &["crossbar", "add", "--help"]).await;
    assert_eq!(code, 0);
    assert!(stdout.contains("USAGE"));
    assert!(stdout.contains("add"));
    assert!(!stdout.contains("total:"));

    let (code, stdout, _stderr) = run_line(test_root(), &["crossbar", "add", "-h"]).await;
    assert_eq!(code, 0);
    assert!(stdout.contains("USAGE"));
}

#[tokio::test]
async fn group_commands_print_their_help() {
    let (code, stdout, _stderr) = run_line(test_root(), &["crossbar", "parent"]).await;
    assert_eq!(code, 0);
    assert!(stdout.contains("SUBCOMMANDS"));
    assert!(stdout.contains("leaf"));
}

#[tokio::test]
async fn missing_arguments_report_a_client_error() {
    let (code, _stdout, stderr) = run_line(test_root(), &["crossbar", "add"]).await;
    assert_ne!(code, 0);
    assert!(stderr.starts_with("Error:"), "{stderr}");
    assert!(stderr.contains("--help"), "{stderr}");
}

#[tokio::test]
async fn unknown_option_prints_error_and_help() {
    let (code, _stdout, stderr) = run_line(test_root(), &["crossbar", "add", "--nope"]).await;
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown option"));
    assert!(stderr.contains("USAGE"));
}

#[tokio::test]
async fn invalid_encoding_is_reported() {
    let (code, _stdout, stderr) =
        run_line(test_root(), &["crossbar", "add", "--encoding=foobar", "1"]).await;
    assert_ne!(code, 0);
    assert!(stderr.contains("invalid encoding: foobar"), "{stderr}");
}

#[tokio::test]
async fn cli_post_run_transforms_terminal_output() {
    let root = cb_core::test_support::doubling_root(cb_core::EmitterKind::Cli);
    let (code, stdout, stderr) = run_line(root, &["crossbar", "double"]).await;
    assert_eq!(code, 0, "stderr: {stderr}");
    assert_eq!(stdout, "14\n");
}

#[tokio::test]
async fn echo_renders_json_on_the_terminal() {
    let (code, stdout, _stderr) = run_line(test_root(), &["crossbar", "echo"]).await;
    assert_eq!(code, 0);
    assert_eq!(stdout, "{\"Foo\":\"beep\",\"Bar\":\"boop\",\"Baz\":1337}\n");
}
