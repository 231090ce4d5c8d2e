// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command execution: PreRun → Run → PostRun.
//!
//! The executor owns the ordering guarantee of the pipeline: the outer
//! emitter's close is the last thing that happens, so every observation by
//! the outer consumer is strictly before `execute` returns. Run and PostRun
//! errors travel through `close_with_error` and reach the consumer as the
//! terminal state; only pre-emission failures (unresolvable or uncallable
//! command, bad arguments, PreRun) are returned synchronously.

use std::sync::Arc;

use async_trait::async_trait;

use crate::chan::channel_pair;
use crate::command::{Command, CommandTree, Environment};
use crate::emitter::ResponseEmitter;
use crate::error::Error;
use crate::request::Request;

/// Anything that can run a request against an emitter: the in-process
/// executor here, or an HTTP client standing in for a remote daemon.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(
        &self,
        req: &Arc<Request>,
        re: &mut dyn ResponseEmitter,
        env: &Environment,
    ) -> Result<(), Error>;
}

/// Executes commands by calling their Run functions in-process.
pub struct LocalExecutor {
    root: Arc<Command>,
}

impl LocalExecutor {
    pub fn new(root: Arc<Command>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn execute(
        &self,
        req: &Arc<Request>,
        re: &mut dyn ResponseEmitter,
        env: &Environment,
    ) -> Result<(), Error> {
        let cmd = self.root.get(&req.path)?;
        let Some(run) = cmd.run.clone() else {
            return Err(Error::not_callable());
        };
        cmd.check_arguments(req)?;

        if let Some(pre_run) = &cmd.pre_run {
            pre_run(req, env)?;
        }

        if let Some(timeout) = req.timeout()? {
            let token = req.token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(timeout) => token.cancel(),
                }
            });
        }

        let req_ref: &Request = req;
        match cmd.post_run.get(&re.kind()).cloned() {
            None => {
                let run_err = run(req_ref, re, env).await.err();
                swallow_benign(re.close_with_error(run_err).await)
            }
            Some(post_run) => {
                // Interpose PostRun between Run and the outer consumer: Run
                // writes a fresh channel pair, PostRun reads it and writes
                // the outer emitter, both driven concurrently.
                let (mut inner_re, mut inner_res) = channel_pair(req.clone());
                let run_side = async {
                    let run_err = run(req_ref, &mut inner_re, env).await.err();
                    let closed = inner_re.close_with_error(run_err.clone()).await;
                    if let Err(err) = closed {
                        if !err.is_benign_close() {
                            tracing::warn!(error = %err, "inner emitter close failed");
                        }
                    }
                    run_err
                };
                let post_side = post_run(&mut inner_res, re);
                let (run_err, post_result) = tokio::join!(run_side, post_side);
                let post_err = post_result.err().filter(|e| !e.is_benign_close());
                if let (Some(run_err), Some(post_err)) = (&run_err, &post_err) {
                    tracing::warn!(
                        run_error = %run_err,
                        post_error = %post_err,
                        "both run and post-run failed; reporting run's error"
                    );
                }
                let terminal = run_err.or(post_err);
                swallow_benign(re.close_with_error(terminal).await)
            }
        }
    }
}

/// PostRun typically closes the outer emitter itself (e.g. by forwarding a
/// `Single`); the executor's final close then hits an already-closed
/// emitter, which is fine.
fn swallow_benign(result: Result<(), Error>) -> Result<(), Error> {
    match result {
        Err(err) if err.is_benign_close() => Ok(()),
        other => other,
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
