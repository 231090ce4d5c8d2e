// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Encoding registry: value↔bytes codecs keyed by encoding name.
//!
//! Built-in encoders cover `json`, `text` and `textnl`; a command can bind
//! any name (including `xml` and `protobuf`) through its own encoder map,
//! which always takes precedence. Decoding is JSON-only and incremental:
//! frames are concatenated values with no delimiter beyond the codec's own
//! framing.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{error_record, Error};
use crate::request::Request;

/// A supported encoding name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingType {
    Json,
    Xml,
    Protobuf,
    Text,
    TextNl,
}

impl EncodingType {
    pub fn as_str(self) -> &'static str {
        match self {
            EncodingType::Json => "json",
            EncodingType::Xml => "xml",
            EncodingType::Protobuf => "protobuf",
            EncodingType::Text => "text",
            EncodingType::TextNl => "textnl",
        }
    }

    /// MIME type written as `Content-Type` by byte-stream emitters.
    pub fn mime(self) -> &'static str {
        match self {
            EncodingType::Json => "application/json",
            EncodingType::Xml => "application/xml",
            EncodingType::Protobuf => "application/protobuf",
            EncodingType::Text | EncodingType::TextNl => "text/plain",
        }
    }

    /// Reverse of [`EncodingType::mime`], used by the HTTP client to pick a
    /// decoder from the response `Content-Type`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "application/json" => Some(EncodingType::Json),
            "application/xml" => Some(EncodingType::Xml),
            "application/protobuf" => Some(EncodingType::Protobuf),
            "text/plain" => Some(EncodingType::Text),
            _ => None,
        }
    }
}

impl fmt::Display for EncodingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncodingType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "json" => Ok(EncodingType::Json),
            "xml" => Ok(EncodingType::Xml),
            "protobuf" => Ok(EncodingType::Protobuf),
            "text" => Ok(EncodingType::Text),
            "textnl" => Ok(EncodingType::TextNl),
            other => Err(Error::client(format!("invalid encoding: {other}"))),
        }
    }
}

/// Encodes one value into its byte representation.
pub trait Encoder: Send {
    fn encode(&mut self, value: &Value) -> Result<Vec<u8>, Error>;
}

impl std::fmt::Debug for dyn Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Encoder")
    }
}

/// Factory producing an encoder for a request; commands register these per
/// encoding name.
pub type EncoderFactory = Arc<dyn Fn(&Request) -> Box<dyn Encoder> + Send + Sync>;

/// Compact JSON, one value per frame, newline-terminated.
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&mut self, value: &Value) -> Result<Vec<u8>, Error> {
        let mut bytes = serde_json::to_vec(value)
            .map_err(|e| Error::implementation(format!("json encode failed: {e}")))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Plain text: strings verbatim, everything else as compact JSON.
pub struct TextEncoder {
    /// Append a newline when the frame does not already end with one.
    pub newline: bool,
}

impl Encoder for TextEncoder {
    fn encode(&mut self, value: &Value) -> Result<Vec<u8>, Error> {
        let mut bytes = match value {
            Value::String(s) => s.clone().into_bytes(),
            other => serde_json::to_vec(other)
                .map_err(|e| Error::implementation(format!("text encode failed: {e}")))?,
        };
        if self.newline && !bytes.ends_with(b"\n") {
            bytes.push(b'\n');
        }
        Ok(bytes)
    }
}

/// Resolve the encoder for `encoding`: the command's own factory when it has
/// one, a built-in otherwise. Asking for a name nothing provides is a client
/// error.
pub fn encoder_for(req: &Request, encoding: EncodingType) -> Result<Box<dyn Encoder>, Error> {
    if let Some(factory) = req.command.encoders.get(&encoding) {
        return Ok(factory(req));
    }
    match encoding {
        EncodingType::Json => Ok(Box::new(JsonEncoder)),
        EncodingType::Text => Ok(Box::new(TextEncoder { newline: false })),
        EncodingType::TextNl => Ok(Box::new(TextEncoder { newline: true })),
        other => Err(Error::client(format!("invalid encoding: {other}"))),
    }
}

/// Incremental decoder for back-to-back JSON values.
///
/// Bytes are pushed as they arrive; [`JsonFrames::next`] yields one complete
/// value at a time and `Ok(None)` when the buffered input holds no complete
/// frame yet.
#[derive(Default)]
#[derive(Debug)]
pub struct JsonFrames {
    buf: Vec<u8>,
    pos: usize,
}

impl JsonFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        // Reclaim consumed prefix before growing.
        if self.pos > 0 && self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
        } else if self.pos > 8 * 1024 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.extend_from_slice(bytes);
    }

    pub fn next(&mut self) -> Result<Option<Value>, Error> {
        let remaining = &self.buf[self.pos..];
        let mut stream = serde_json::Deserializer::from_slice(remaining).into_iter::<Value>();
        match stream.next() {
            None => Ok(None),
            Some(Ok(value)) => {
                self.pos += stream.byte_offset();
                Ok(Some(value))
            }
            Some(Err(e)) if e.is_eof() => Ok(None),
            Some(Err(e)) => Err(Error::new(format!("invalid response frame: {e}"))),
        }
    }

    /// True when unconsumed non-whitespace bytes remain. Checked at end of
    /// input to catch a truncated trailing frame.
    pub fn has_pending(&self) -> bool {
        self.buf[self.pos..].iter().any(|b| !b.is_ascii_whitespace())
    }
}

/// The declared output type of a command, used for typed decoding.
///
/// Decoded frames are re-parsed through the Rust type the command declared,
/// so a structurally wrong value fails at the decode boundary instead of
/// deep inside a consumer.
#[derive(Clone, Copy)]
pub struct OutputType {
    name: &'static str,
    reparse: fn(Value) -> Result<Value, serde_json::Error>,
}

impl OutputType {
    pub fn of<T: DeserializeOwned + Serialize>() -> Self {
        fn reparse<T: DeserializeOwned + Serialize>(
            value: Value,
        ) -> Result<Value, serde_json::Error> {
            let typed: T = serde_json::from_value(value)?;
            serde_json::to_value(typed)
        }
        Self { name: std::any::type_name::<T>(), reparse: reparse::<T> }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OutputType").field(&self.name).finish()
    }
}

/// Interpret one decoded frame from a byte stream that can carry either a
/// value or a terminal error record.
///
/// The `Type: "error"` envelope always wins. Without a declared output type
/// the legacy `{Message, Code}` shape is also accepted as an error, which is
/// the compatibility heuristic for streams written by older peers.
pub fn decode_frame(value: Value, output: Option<&OutputType>) -> Result<Value, Error> {
    if let Some(err) = error_record(&value, output.is_some()) {
        return Err(err);
    }
    match output {
        Some(output) => (output.reparse)(value).map_err(|_| {
            Error::new(format!(
                "the command returned a value with a different type than expected ({})",
                output.name
            ))
        }),
        None => Ok(value),
    }
}

#[cfg(test)]
#[path = "encoding_tests.rs"]
mod tests;
