// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Byte-stream emitter/response pair.
//!
//! The emitter encodes each value with the negotiated encoder and writes the
//! bytes to an `AsyncWrite`; the reader decodes one value at a time into the
//! command's declared output type. A byte stream cannot carry a late abort
//! in-band, so `close_with_error` needs the optional oneshot side channel
//! wired between the two ends.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;

use crate::emitter::{
    warn_error_value, EmitterKind, Head, Item, Payload, Response, ResponseEmitter,
};
use crate::encoding::{decode_frame, encoder_for, Encoder, EncodingType, JsonFrames, OutputType};
use crate::error::Error;
use crate::request::Request;

/// Write side over any byte sink.
pub struct WriterEmitter<W> {
    writer: W,
    req: Arc<Request>,
    enc: Box<dyn Encoder>,
    closed: bool,
    error_tx: Option<oneshot::Sender<Error>>,
}

impl<W: AsyncWrite + Send + Unpin> WriterEmitter<W> {
    pub fn new(writer: W, req: Arc<Request>, encoding: EncodingType) -> Result<Self, Error> {
        let enc = encoder_for(&req, encoding)?;
        Ok(Self { writer, req, enc, closed: false, error_tx: None })
    }

    /// Wire the side channel that carries a late `close_with_error` to the
    /// matching [`ReaderResponse`].
    pub fn with_error_channel(mut self, tx: oneshot::Sender<Error>) -> Self {
        self.error_tx = Some(tx);
        self
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        tokio::select! {
            written = async {
                self.writer.write_all(bytes).await?;
                self.writer.flush().await
            } => written.map_err(|e| Error::new(format!("write failed: {e}"))),
            _ = self.req.token.cancelled() => {
                self.closed = true;
                Err(Error::cancelled())
            }
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Send + Unpin> ResponseEmitter for WriterEmitter<W> {
    fn kind(&self) -> EmitterKind {
        EmitterKind::Writer
    }

    // The hint never crosses the byte stream; the reader side of a pipe has
    // no way to learn it.
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
        match value {
            Payload::Value(v) => {
                warn_error_value(&v);
                let bytes = self.enc.encode(&v)?;
                self.write_all(&bytes).await
            }
            Payload::Single(v) => {
                warn_error_value(&v);
                let bytes = self.enc.encode(&v)?;
                self.write_all(&bytes).await?;
                self.closed = true;
                let _ = self.writer.shutdown().await;
                Ok(())
            }
            Payload::Stream(mut source) => {
                while let Some(chunk) = source.next_chunk().await? {
                    self.write_all(&chunk).await?;
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
        self.closed = true;
        if let Some(err) = error {
            match self.error_tx.take() {
                Some(tx) => {
                    let _ = tx.send(err);
                }
                None => {
                    return Err(Error::new(
                        "writer emitter cannot carry a late error without a side channel",
                    ));
                }
            }
        }
        let _ = self.writer.shutdown().await;
        Ok(())
    }
}

/// Read side over any byte source, decoding JSON frames.
#[derive(Debug)]
pub struct ReaderResponse<R> {
    reader: R,
    req: Arc<Request>,
    frames: JsonFrames,
    output: Option<OutputType>,
    error_rx: Option<oneshot::Receiver<Error>>,
    done: Option<Option<Error>>,
}

impl<R: AsyncRead + Send + Unpin> ReaderResponse<R> {
    pub fn new(reader: R, req: Arc<Request>, encoding: EncodingType) -> Result<Self, Error> {
        if encoding != EncodingType::Json {
            return Err(Error::client(format!("no decoder for encoding: {encoding}")));
        }
        let output = req.command.output;
        Ok(Self {
            reader,
            req,
            frames: JsonFrames::new(),
            output,
            error_rx: None,
            done: None,
        })
    }

    pub fn with_error_channel(mut self, rx: oneshot::Receiver<Error>) -> Self {
        self.error_rx = Some(rx);
        self
    }

    fn terminate(&mut self, error: Option<Error>) -> Result<Option<Item>, Error> {
        self.done = Some(error.clone());
        match error {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Send + Unpin> Response for ReaderResponse<R> {
    fn request(&self) -> &Arc<Request> {
        &self.req
    }

    // A pipe carries no metadata preamble: the length hint is always zero
    // and the error is whatever terminal state has been observed.
    async fn head(&mut self) -> Head {
        Head { length: 0, error: self.done.clone().flatten() }
    }

    async fn next(&mut self) -> Result<Option<Item>, Error> {
        if let Some(done) = &self.done {
            return match done {
                Some(err) => Err(err.clone()),
                None => Ok(None),
            };
        }
        loop {
            match self.frames.next() {
                Ok(Some(frame)) => {
                    return match decode_frame(frame, self.output.as_ref()) {
                        Ok(value) => Ok(Some(Item::Value(value))),
                        Err(err) => self.terminate(Some(err)),
                    };
                }
                Ok(None) => {}
                Err(err) => return self.terminate(Some(err)),
            }

            let mut buf = vec![0u8; 8 * 1024];
            let read = tokio::select! {
                read = self.reader.read(&mut buf) => {
                    read.map_err(|e| Error::new(format!("read failed: {e}")))
                }
                _ = self.req.token.cancelled() => Err(Error::cancelled()),
            };
            let n = match read {
                Ok(n) => n,
                Err(err) => return self.terminate(Some(err)),
            };
            if n == 0 {
                // End of stream: a side-channel error outranks a clean end.
                if let Some(mut rx) = self.error_rx.take() {
                    if let Ok(err) = rx.try_recv() {
                        return self.terminate(Some(err));
                    }
                }
                if self.frames.has_pending() {
                    return self.terminate(Some(Error::new("truncated response frame")));
                }
                return self.terminate(None);
            }
            self.frames.push(&buf[..n]);
        }
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
