// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side response: decodes the streamed body and recovers late errors
//! from the trailer.

use std::sync::Arc;

use async_trait::async_trait;
use cb_core::{
    decode_frame, ByteSource, ByteStream, EncodingType, Error, ErrorKind, Head, Item, JsonFrames,
    OutputType, Request, Response,
};
use parking_lot::Mutex;
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::proto::{Body, ResponseHead};
use crate::{APPLICATION_JSON, EXTRA_CONTENT_LENGTH_HEADER, STREAM_ERR_HEADER};

type BodyReader = Body<BufReader<OwnedReadHalf>>;

enum Mode {
    /// Structured values, decoded one frame at a time.
    Decode,
    /// The whole body is one raw byte stream.
    Stream,
}

/// The read side of an HTTP command invocation.
pub struct HttpResponse {
    req: Arc<Request>,
    length: u64,
    mode: Mode,
    body: Option<BodyReader>,
    frames: JsonFrames,
    output: Option<OutputType>,
    trailer_error: Arc<Mutex<Option<Error>>>,
    done: Option<Option<Error>>,
    _writer: OwnedWriteHalf,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse").finish_non_exhaustive()
    }
}

impl HttpResponse {
    /// Interpret a response head. Statuses ≥ 400 are decoded into the error
    /// they carry and returned as `Err`.
    pub(crate) async fn parse(
        head: ResponseHead,
        reader: BufReader<OwnedReadHalf>,
        writer: OwnedWriteHalf,
        req: Arc<Request>,
    ) -> Result<Self, Error> {
        let mut body = Body::from_head(reader, &head.headers);
        if head.status >= 400 {
            let bytes = body.read_to_end().await?;
            return Err(status_error(&head, &bytes));
        }

        let length = head
            .headers
            .get(EXTRA_CONTENT_LENGTH_HEADER)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let mode = match head.headers.media_type() {
            Some(mime) if EncodingType::from_mime(mime) == Some(EncodingType::Json) => {
                Mode::Decode
            }
            _ => Mode::Stream,
        };
        let output = req.command.output;
        Ok(Self {
            req,
            length,
            mode,
            body: Some(body),
            frames: JsonFrames::new(),
            output,
            trailer_error: Arc::new(Mutex::new(None)),
            done: None,
            _writer: writer,
        })
    }

    fn terminate(&mut self, error: Option<Error>) -> Result<Option<Item>, Error> {
        self.done = Some(error.clone());
        match error {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }

    fn finish_body(body: &BodyReader) -> Option<Error> {
        body.trailer(STREAM_ERR_HEADER)
            .filter(|msg| !msg.is_empty())
            .map(Error::new)
    }
}

#[async_trait]
impl Response for HttpResponse {
    fn request(&self) -> &Arc<Request> {
        &self.req
    }

    async fn head(&mut self) -> Head {
        let error = match &self.done {
            Some(done) => done.clone(),
            None => self.trailer_error.lock().clone(),
        };
        Head { length: self.length, error }
    }

    async fn next(&mut self) -> Result<Option<Item>, Error> {
        if let Some(done) = &self.done {
            return match done {
                Some(err) => Err(err.clone()),
                None => Ok(None),
            };
        }

        match self.mode {
            Mode::Stream => match self.body.take() {
                Some(body) => {
                    let stream = BodyStream { body, slot: self.trailer_error.clone() };
                    Ok(Some(Item::Bytes(ByteSource::new(stream))))
                }
                None => {
                    // The single stream value is out; whatever its consumer
                    // found in the trailer is the terminal state.
                    let error = self.trailer_error.lock().clone();
                    self.terminate(error)
                }
            },
            Mode::Decode => loop {
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

                let Some(body) = self.body.as_mut() else {
                    return self.terminate(None);
                };
                let bytes = tokio::select! {
                    bytes = body.next_bytes() => bytes,
                    _ = self.req.token.cancelled() => Err(Error::cancelled()),
                };
                match bytes {
                    Ok(Some(bytes)) => self.frames.push(&bytes),
                    Ok(None) => {
                        if let Some(err) = Self::finish_body(body) {
                            return self.terminate(Some(err));
                        }
                        if self.frames.has_pending() {
                            return self.terminate(Some(Error::new("truncated response frame")));
                        }
                        return self.terminate(None);
                    }
                    Err(err) => return self.terminate(Some(err)),
                }
            },
        }
    }
}

/// Byte stream over the response body; stores a trailer error where the
/// owning response can see it.
struct BodyStream {
    body: BodyReader,
    slot: Arc<Mutex<Option<Error>>>,
}

#[async_trait]
impl ByteStream for BodyStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, Error> {
        match self.body.next_bytes().await? {
            Some(bytes) => Ok(Some(bytes)),
            None => match HttpResponse::finish_body(&self.body) {
                Some(err) => {
                    *self.slot.lock() = Some(err.clone());
                    Err(err)
                }
                None => Ok(None),
            },
        }
    }
}

/// Map a failing status onto the error it represents.
fn status_error(head: &ResponseHead, body: &[u8]) -> Error {
    if head.status == 404 {
        return Error::not_found("command not found");
    }
    let message = String::from_utf8_lossy(body).trim().to_string();
    if head.headers.media_type() == Some(APPLICATION_JSON) {
        if let Ok(err) = serde_json::from_slice(body) {
            return err;
        }
    }
    let kind = match head.status {
        400 => ErrorKind::Client,
        403 => ErrorKind::Forbidden,
        429 => ErrorKind::RateLimited,
        _ => ErrorKind::Normal,
    };
    Error::with_kind(message, kind)
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
