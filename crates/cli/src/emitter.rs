// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal-side response emitter.
//!
//! Values render to stdout through the command's text encoder when it has
//! one, falling back to JSON otherwise. A terminal error prints as an
//! `Error:` line on stderr and turns into a non-zero exit code, delivered
//! to the run harness over a one-shot channel when the emitter closes.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use cb_core::{
    encoder_for, Encoder, EncodingType, EmitterKind, Error, Payload, Request, ResponseEmitter,
};
use tokio::sync::oneshot;

pub struct CliEmitter {
    stdout: Box<dyn Write + Send>,
    stderr: Box<dyn Write + Send>,
    req: Arc<Request>,
    enc: Box<dyn Encoder>,
    exit_tx: Option<oneshot::Sender<i32>>,
    exit_code: i32,
    closed: bool,
}

/// The encoding the terminal will actually use: text is the default, but
/// only commands that bring a text encoder can honor it; everyone else
/// falls back to JSON.
pub fn effective_encoding(req: &Request) -> EncodingType {
    let requested = req.encoding(EncodingType::Text);
    if requested == EncodingType::Text
        && !req.command.encoders.contains_key(&EncodingType::Text)
    {
        EncodingType::Json
    } else {
        requested
    }
}

impl CliEmitter {
    /// Returns the emitter and the channel the final exit code arrives on.
    pub fn new(
        req: Arc<Request>,
        stdout: Box<dyn Write + Send>,
        stderr: Box<dyn Write + Send>,
    ) -> Result<(Self, oneshot::Receiver<i32>), Error> {
        let enc = encoder_for(&req, effective_encoding(&req))?;
        let (exit_tx, exit_rx) = oneshot::channel();
        let emitter = Self {
            stdout,
            stderr,
            req,
            enc,
            exit_tx: Some(exit_tx),
            exit_code: 0,
            closed: false,
        };
        Ok((emitter, exit_rx))
    }

    /// Raw stdout access for commands that bypass the encoder.
    pub fn stdout(&mut self) -> &mut dyn Write {
        &mut self.stdout
    }

    /// Raw stderr access.
    pub fn stderr(&mut self) -> &mut dyn Write {
        &mut self.stderr
    }

    fn finish(&mut self) -> Result<(), Error> {
        if self.closed {
            return Err(Error::closing_closed_emitter());
        }
        self.closed = true;
        let _ = self.stdout.flush();
        let _ = self.stderr.flush();
        if let Some(tx) = self.exit_tx.take() {
            let _ = tx.send(self.exit_code);
        }
        Ok(())
    }

    fn write_stdout(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.stdout
            .write_all(bytes)
            .map_err(|e| Error::new(format!("write to stdout failed: {e}")))
    }
}

#[async_trait]
impl ResponseEmitter for CliEmitter {
    fn kind(&self) -> EmitterKind {
        EmitterKind::Cli
    }

    // The terminal renders values as they come; a count hint has nothing to
    // adjust.
    fn set_length(&mut self, _length: u64) {}

    async fn emit(&mut self, value: Payload) -> Result<(), Error> {
        let value = match value {
            Payload::Sequence(mut rx) => {
                while let Some(inner) = rx.recv().await {
                    self.emit(inner).await?;
                }
                return Ok(());
            }
            other => other,
        };
        if self.closed {
            return Err(Error::closed_emitter());
        }
        if self.req.token.is_cancelled() {
            return Err(Error::cancelled());
        }
        match value {
            Payload::Value(v) => {
                cb_core::emitter::warn_error_value(&v);
                let bytes = self.enc.encode(&v)?;
                self.write_stdout(&bytes)
            }
            Payload::Single(v) => {
                cb_core::emitter::warn_error_value(&v);
                let bytes = self.enc.encode(&v)?;
                self.write_stdout(&bytes)?;
                self.finish()
            }
            Payload::Stream(mut source) => {
                while let Some(chunk) = source.next_chunk().await? {
                    self.write_stdout(&chunk)?;
                }
                Ok(())
            }
            Payload::Sequence(_) => Err(Error::implementation("sequence was not drained")),
        }
    }

    async fn close_with_error(&mut self, error: Option<Error>) -> Result<(), Error> {
        if self.closed {
            return Err(Error::closing_closed_emitter());
        }
        if let Some(err) = error {
            self.exit_code = 1;
            writeln!(self.stderr, "Error: {}", err.message)
                .map_err(|e| Error::new(format!("write to stderr failed: {e}")))?;
        }
        self.finish()
    }
}

#[cfg(test)]
#[path = "emitter_tests.rs"]
mod tests;
