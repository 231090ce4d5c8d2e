// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The emitter/response contract.
//!
//! A `ResponseEmitter`/`Response` pair connects a command's Run function to
//! its consumer through any backing: an in-process channel, a byte stream,
//! or an HTTP request. All backings share the same semantics: values arrive
//! in emission order, the writer blocks until the reader accepts each value,
//! and exactly one terminal signal (normal end or an error) follows the last
//! value.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use crate::encoding::EncodingType;
use crate::error::{error_record, Error};
use crate::request::Request;

/// What kind of terminal sits at the end of an emitter. Selects the
/// command's PostRun transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmitterKind {
    Cli,
    Http,
    Channel,
    Writer,
}

/// Metadata committed by the writer side: the advisory length hint and, once
/// terminal, the error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Head {
    pub length: u64,
    pub error: Option<Error>,
}

/// A pull-based byte stream, the transport-neutral form of an `io.Reader`.
#[async_trait]
pub trait ByteStream: Send {
    /// The next chunk of bytes, or `None` at end of stream.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, Error>;
}

/// Boxed byte stream handed through emitters without re-encoding.
pub struct ByteSource(Box<dyn ByteStream>);

impl ByteSource {
    pub fn new(stream: impl ByteStream + 'static) -> Self {
        Self(Box::new(stream))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(BytesOnce(Some(bytes)))
    }

    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::new(ReaderStream(reader))
    }

    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, Error> {
        self.0.next_chunk().await
    }

    pub async fn read_to_end(&mut self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ByteSource")
    }
}

struct BytesOnce(Option<Vec<u8>>);

#[async_trait]
impl ByteStream for BytesOnce {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.0.take().filter(|b| !b.is_empty()))
    }
}

struct ReaderStream<R>(R);

#[async_trait]
impl<R: AsyncRead + Send + Unpin> ByteStream for ReaderStream<R> {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, Error> {
        let mut buf = vec![0u8; 8 * 1024];
        let n = self
            .0
            .read(&mut buf)
            .await
            .map_err(|e| Error::new(format!("stream read failed: {e}")))?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }
}

/// One element passed to [`ResponseEmitter::emit`].
pub enum Payload {
    /// A structured value; one element of the output stream.
    Value(Value),
    /// A one-shot value. Emitting it delivers the inner value and closes the
    /// emitter with a normal termination, atomically.
    Single(Value),
    /// Raw bytes forwarded without encoding.
    Stream(ByteSource),
    /// A producer of further elements; the emitter drains it transparently.
    Sequence(mpsc::Receiver<Payload>),
}

impl Payload {
    pub fn value<T: Serialize>(value: &T) -> Result<Self, Error> {
        Ok(Payload::Value(to_value(value)?))
    }

    pub fn single<T: Serialize>(value: &T) -> Result<Self, Error> {
        Ok(Payload::Single(to_value(value)?))
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, Error> {
    serde_json::to_value(value)
        .map_err(|e| Error::implementation(format!("value is not serializable: {e}")))
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Payload::Single(v) => f.debug_tuple("Single").field(v).finish(),
            Payload::Stream(_) => f.write_str("Stream"),
            Payload::Sequence(_) => f.write_str("Sequence"),
        }
    }
}

/// One element observed by [`Response::next`]: `Single` is already
/// unwrapped and sequences flattened by the writer side.
#[derive(Debug)]
pub enum Item {
    Value(Value),
    Bytes(ByteSource),
}

impl Item {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Item::Value(v) => Some(v),
            Item::Bytes(_) => None,
        }
    }
}

impl From<Item> for Payload {
    fn from(item: Item) -> Self {
        match item {
            Item::Value(v) => Payload::Value(v),
            Item::Bytes(b) => Payload::Stream(b),
        }
    }
}

/// Write side of a pair. All a command's Run function can write to.
#[async_trait]
pub trait ResponseEmitter: Send {
    fn kind(&self) -> EmitterKind;

    /// Advisory total-count hint. Must be called before the first emit;
    /// later calls are ignored.
    fn set_length(&mut self, length: u64);

    /// Override the wire encoding. Only meaningful for byte-stream emitters
    /// that write a content-type equivalent; a no-op elsewhere.
    fn set_encoding(&mut self, _encoding: EncodingType) {}

    /// Deliver one element. Blocks until the reader accepts it or the
    /// request's cancellation token fires.
    async fn emit(&mut self, value: Payload) -> Result<(), Error>;

    /// Normal termination; equivalent to `close_with_error(None)`.
    async fn close(&mut self) -> Result<(), Error> {
        self.close_with_error(None).await
    }

    /// Terminal close. After a successful close no further emit succeeds; a
    /// second close fails with the closing-closed-emitter error.
    async fn close_with_error(&mut self, error: Option<Error>) -> Result<(), Error>;
}

/// Read side of a pair.
#[async_trait]
pub trait Response: Send {
    fn request(&self) -> &Arc<Request>;

    /// Blocks until the writer has first emitted or closed, then returns the
    /// committed metadata.
    async fn head(&mut self) -> Head;

    async fn length(&mut self) -> u64 {
        self.head().await.length
    }

    /// The terminal error (`None` after a normal close).
    async fn error(&mut self) -> Option<Error> {
        self.head().await.error
    }

    /// The next value, `Ok(None)` at normal end of stream, or the terminal
    /// error. After the first end-of-stream signal every further call
    /// returns the same signal.
    async fn next(&mut self) -> Result<Option<Item>, Error>;
}

/// Emit a value wrapped in `Single`, for commands whose output is logically
/// one value rather than a stream.
pub async fn emit_once(re: &mut dyn ResponseEmitter, value: Value) -> Result<(), Error> {
    re.emit(Payload::Single(value)).await
}

/// Pump every element of `res` into `re`, then propagate the terminal state.
pub async fn copy(re: &mut dyn ResponseEmitter, res: &mut dyn Response) -> Result<(), Error> {
    re.set_length(res.length().await);
    loop {
        match res.next().await {
            Ok(Some(item)) => re.emit(item.into()).await?,
            Ok(None) => return re.close().await,
            Err(err) => return re.close_with_error(Some(err)).await,
        }
    }
}

/// Emitting an error record as a value is the banned legacy path; errors
/// travel through `close_with_error`. Detect it loudly so migrated command
/// definitions that still do it are found.
pub fn warn_error_value(value: &Value) {
    if let Some(err) = error_record(value, false) {
        tracing::error!(error = %err, "error emitted as a value; use close_with_error instead");
    }
}

/// Duplicates one emission stream into two emitters. Raw byte streams are
/// buffered so both sides observe the same bytes.
pub struct TeeEmitter<A, B> {
    first: A,
    second: B,
}

impl<A: ResponseEmitter, B: ResponseEmitter> TeeEmitter<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

#[async_trait]
impl<A: ResponseEmitter, B: ResponseEmitter> ResponseEmitter for TeeEmitter<A, B> {
    fn kind(&self) -> EmitterKind {
        self.first.kind()
    }

    fn set_length(&mut self, length: u64) {
        self.first.set_length(length);
        self.second.set_length(length);
    }

    fn set_encoding(&mut self, encoding: EncodingType) {
        self.first.set_encoding(encoding);
        self.second.set_encoding(encoding);
    }

    async fn emit(&mut self, value: Payload) -> Result<(), Error> {
        match value {
            Payload::Sequence(mut rx) => {
                while let Some(inner) = rx.recv().await {
                    self.emit(inner).await?;
                }
                Ok(())
            }
            Payload::Value(v) => {
                self.first.emit(Payload::Value(v.clone())).await?;
                self.second.emit(Payload::Value(v)).await
            }
            Payload::Single(v) => {
                self.first.emit(Payload::Single(v.clone())).await?;
                self.second.emit(Payload::Single(v)).await
            }
            Payload::Stream(mut source) => {
                let bytes = source.read_to_end().await?;
                self.first.emit(Payload::Stream(ByteSource::from_bytes(bytes.clone()))).await?;
                self.second.emit(Payload::Stream(ByteSource::from_bytes(bytes))).await
            }
        }
    }

    async fn close_with_error(&mut self, error: Option<Error>) -> Result<(), Error> {
        let first = self.first.close_with_error(error.clone()).await;
        let second = self.second.close_with_error(error).await;
        first.and(second)
    }
}

#[cfg(test)]
#[path = "emitter_tests.rs"]
mod tests;
