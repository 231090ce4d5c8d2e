// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The run harness: parse argv, build the environment and executor, run the
//! command against a CLI emitter, and produce the process exit code.

use std::io::{BufRead, Write};
use std::sync::Arc;

use cb_core::option::{OPT_LONG_HELP, OPT_SHORT_HELP};
use cb_core::{Command, Environment, Error, Executor, Request};

use crate::emitter::CliEmitter;
use crate::helptext::{long_help, short_help};
use crate::parse::{help_path, parse};

/// Everything the harness needs from its embedder.
pub struct RunConfig<'a> {
    /// Full argv; the first element is the binary name.
    pub argv: &'a [String],
    pub stdin: Option<&'a mut dyn BufRead>,
    pub stdout: Box<dyn Write + Send>,
    pub stderr: Box<dyn Write + Send>,
    /// Build the command environment once the request is known.
    pub make_env: Box<dyn FnOnce(&Arc<Request>) -> Result<Environment, Error> + Send>,
    /// Pick the executor: in-process, or an HTTP client for daemon dispatch.
    pub make_executor:
        Box<dyn FnOnce(&Arc<Request>, &Environment) -> Result<Box<dyn Executor>, Error> + Send>,
}

/// Run a command line against `root` and return the process exit code.
pub async fn run(root: Arc<Command>, config: RunConfig<'_>) -> i32 {
    let RunConfig { argv, stdin, mut stdout, mut stderr, make_env, make_executor } = config;

    let binary = argv
        .first()
        .map(|b| b.rsplit('/').next().unwrap_or(b.as_str()).to_string())
        .unwrap_or_else(|| "crossbar".to_string());
    let args = argv.get(1..).unwrap_or_default();

    let print_error = |stderr: &mut dyn Write, err: &Error| {
        let _ = writeln!(stderr, "Error: {}", err.message);
    };

    // Help requests win over everything, including parse errors.
    let wants_long = args.iter().any(|a| a == &format!("--{OPT_LONG_HELP}"));
    let wants_short = args.iter().any(|a| a == &format!("-{OPT_SHORT_HELP}"));
    if wants_long || wants_short {
        let path = help_path(&root, args);
        let result = if wants_long {
            long_help(&binary, &root, &path, &mut stdout)
        } else {
            short_help(&binary, &root, &path, &mut stdout)
        };
        if let Err(err) = result {
            print_error(&mut stderr, &err);
            return 1;
        }
        return 0;
    }

    let req = match parse(&root, args, stdin) {
        Ok(req) => req,
        Err(err) => {
            print_error(&mut stderr, &err);
            let _ = writeln!(stderr);
            let path = help_path(&root, args);
            let _ = short_help(&binary, &root, &path, &mut stderr);
            return 1;
        }
    };

    // Invoking a group command prints its help instead of failing.
    if req.command.run.is_none() {
        if let Err(err) = short_help(&binary, &root, &req.path, &mut stdout) {
            print_error(&mut stderr, &err);
            return 1;
        }
        return 0;
    }

    let env = match make_env(&req) {
        Ok(env) => env,
        Err(err) => {
            print_error(&mut stderr, &err);
            return 1;
        }
    };
    let executor = match make_executor(&req, &env) {
        Ok(executor) => executor,
        Err(err) => {
            print_error(&mut stderr, &err);
            return 1;
        }
    };

    // Reject a bad --encoding before the writers move into the emitter, so
    // the error still reports on stderr.
    if let Some(raw) = req.string_option(cb_core::option::ENC_LONG) {
        if let Err(err) = raw.parse::<cb_core::EncodingType>() {
            print_error(&mut stderr, &err);
            return 1;
        }
    }
    if let Err(err) = cb_core::encoder_for(&req, crate::emitter::effective_encoding(&req)) {
        print_error(&mut stderr, &err);
        return 1;
    }
    let (mut emitter, exit_rx) = match CliEmitter::new(req.clone(), stdout, stderr) {
        Ok(pair) => pair,
        Err(err) => {
            tracing::error!(error = %err, "could not build terminal emitter");
            return 1;
        }
    };

    match executor.execute(&req, &mut emitter, &env).await {
        Ok(()) => {}
        Err(err) => {
            // Pre-emission failure: the emitter never saw the error, so the
            // harness reports it.
            print_error(emitter.stderr(), &err);
            if err.is_client() {
                let cmd_path = req.path.join(" ");
                let _ = writeln!(
                    emitter.stderr(),
                    "Use '{binary} {cmd_path} --help' for information about this command"
                );
            }
            return 1;
        }
    }

    // The executor closed the emitter, so the exit code is already on the
    // channel.
    exit_rx.await.unwrap_or(1)
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
