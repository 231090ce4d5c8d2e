// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-side response emitter.
//!
//! One HTTP request gets one emitter, driven through a three-state machine:
//! headers pending → streaming → closed. The preamble (status line plus
//! headers) is committed exactly once, on the first emit or on close,
//! whichever happens first; a close that arrives after the preamble can no
//! longer change the status and reports its error in the `X-Stream-Error`
//! trailer instead.

use std::sync::Arc;

use async_trait::async_trait;
use cb_core::emitter::warn_error_value;
use cb_core::{
    encoder_for, Encoder, EncodingType, EmitterKind, Error, ErrorKind, Payload, Request,
    ResponseEmitter,
};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::proto::{chunk, last_chunk, write_response_head, Headers};
use crate::{
    CHANNEL_HEADER, CONTENT_TYPE_HEADER, EXTRA_CONTENT_LENGTH_HEADER, PLAIN_TEXT, STREAM_ERR_HEADER,
    STREAM_HEADER,
};

enum WireState {
    Preamble,
    Streaming,
    Closed,
}

/// Shape of the first value, which decides the framing markers.
enum FirstValue {
    Single,
    Channel,
    Stream,
    ErrorBody,
}

/// HTTP status for a terminal error committed before any emission.
pub fn status_for(error: &Error) -> u16 {
    match error.kind {
        ErrorKind::Client => 400,
        ErrorKind::Forbidden => 403,
        ErrorKind::NotFound => 404,
        ErrorKind::RateLimited => 429,
        _ => 500,
    }
}

/// A trailer value must stay on one line.
pub fn sanitize_error_message(message: &str) -> String {
    message
        .split(['\r', '\n'])
        .next()
        .unwrap_or_default()
        .to_string()
}

pub struct HttpEmitter<W> {
    writer: W,
    req: Arc<Request>,
    encoding: EncodingType,
    enc: Box<dyn Encoder>,
    override_encoding: Option<EncodingType>,
    base_headers: Headers,
    length: Option<u64>,
    state: WireState,
    head_only: bool,
}

impl<W: AsyncWrite + Send + Unpin> HttpEmitter<W> {
    /// `base_headers` carries everything the handler decided beforehand:
    /// CORS response headers and the user-configured extras.
    pub fn new(
        writer: W,
        req: Arc<Request>,
        encoding: EncodingType,
        head_only: bool,
        base_headers: Headers,
    ) -> Result<Self, Error> {
        let enc = encoder_for(&req, encoding)?;
        Ok(Self {
            writer,
            req,
            encoding,
            enc,
            override_encoding: None,
            base_headers,
            length: None,
            state: WireState::Preamble,
            head_only,
        })
    }

    /// Consume the emitter and hand back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        tokio::select! {
            written = async {
                self.writer.write_all(bytes).await?;
                self.writer.flush().await
            } => written.map_err(|e| Error::new(format!("write failed: {e}"))),
            _ = self.req.token.cancelled() => Err(Error::cancelled()),
        }
    }

    async fn write_preamble(&mut self, status: u16, first: FirstValue) -> Result<(), Error> {
        let mut headers = self.base_headers.clone();
        headers.set("Transfer-Encoding", "chunked");
        headers.set("Connection", "close");

        if !matches!(first, FirstValue::ErrorBody) {
            headers.set("Trailer", STREAM_ERR_HEADER);
        }
        if let Some(length) = self.length {
            headers.set(EXTRA_CONTENT_LENGTH_HEADER, &length.to_string());
        }
        match first {
            FirstValue::Stream => {
                headers.set(STREAM_HEADER, "1");
            }
            FirstValue::Channel => {
                headers.set(CHANNEL_HEADER, "1");
            }
            FirstValue::Single | FirstValue::ErrorBody => {}
        }

        // Content-Type: explicit override first, then text/plain for raw
        // streams so browsers never render untrusted bytes as HTML.
        let mime = match self.override_encoding {
            Some(enc) => enc.mime(),
            None if matches!(first, FirstValue::Stream) => PLAIN_TEXT,
            None => self.encoding.mime(),
        };
        headers.set(CONTENT_TYPE_HEADER, mime);

        write_response_head(&mut self.writer, status, &headers).await?;
        self.state = WireState::Streaming;
        Ok(())
    }

    /// Body of a terminal error committed before any value: plain text for
    /// text encodings, the encoded error record otherwise.
    fn error_body(&self, error: &Error) -> Result<Vec<u8>, Error> {
        match self.encoding {
            EncodingType::Text | EncodingType::TextNl => Ok(error.message.clone().into_bytes()),
            _ => {
                let mut bytes = serde_json::to_vec(error)
                    .map_err(|e| Error::implementation(format!("error encode failed: {e}")))?;
                bytes.push(b'\n');
                Ok(bytes)
            }
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Send + Unpin> ResponseEmitter for HttpEmitter<W> {
    fn kind(&self) -> EmitterKind {
        EmitterKind::Http
    }

    fn set_length(&mut self, length: u64) {
        if matches!(self.state, WireState::Preamble) {
            self.length = Some(length);
        }
    }

    fn set_encoding(&mut self, encoding: EncodingType) {
        if matches!(self.state, WireState::Preamble) {
            self.override_encoding = Some(encoding);
        }
    }

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
        if matches!(self.state, WireState::Closed) {
            return Err(Error::closed_emitter());
        }

        if matches!(self.state, WireState::Preamble) {
            let first = match &value {
                Payload::Single(_) => FirstValue::Single,
                Payload::Stream(_) => FirstValue::Stream,
                _ => FirstValue::Channel,
            };
            self.write_preamble(200, first).await?;
        }

        match value {
            Payload::Value(v) => {
                warn_error_value(&v);
                let bytes = self.enc.encode(&v)?;
                if !self.head_only {
                    self.send(&chunk(&bytes)).await?;
                }
                Ok(())
            }
            Payload::Single(v) => {
                warn_error_value(&v);
                let bytes = self.enc.encode(&v)?;
                if !self.head_only {
                    self.send(&chunk(&bytes)).await?;
                    self.send(&last_chunk(&[])).await?;
                }
                self.state = WireState::Closed;
                let _ = self.writer.shutdown().await;
                Ok(())
            }
            Payload::Stream(mut source) => {
                while let Some(bytes) = source.next_chunk().await? {
                    if !self.head_only {
                        self.send(&chunk(&bytes)).await?;
                    }
                }
                Ok(())
            }
            Payload::Sequence(_) => Err(Error::implementation("sequence was not drained")),
        }
    }

    async fn close_with_error(&mut self, error: Option<Error>) -> Result<(), Error> {
        match self.state {
            WireState::Closed => Err(Error::closing_closed_emitter()),
            WireState::Preamble => {
                // The status line is still ours to choose.
                match error {
                    None => {
                        self.write_preamble(200, FirstValue::Channel).await?;
                        if !self.head_only {
                            self.send(&last_chunk(&[])).await?;
                        }
                    }
                    Some(err) => {
                        let status = status_for(&err);
                        let body = self.error_body(&err)?;
                        self.write_preamble(status, FirstValue::ErrorBody).await?;
                        if !self.head_only {
                            self.send(&chunk(&body)).await?;
                            self.send(&last_chunk(&[])).await?;
                        }
                    }
                }
                self.state = WireState::Closed;
                let _ = self.writer.shutdown().await;
                Ok(())
            }
            WireState::Streaming => {
                let tail = match &error {
                    Some(err) => {
                        let message = sanitize_error_message(&err.message);
                        last_chunk(&[(STREAM_ERR_HEADER, &message)])
                    }
                    None => last_chunk(&[]),
                };
                if !self.head_only {
                    self.send(&tail).await?;
                }
                self.state = WireState::Closed;
                let _ = self.writer.shutdown().await;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "emitter_tests.rs"]
mod tests;
