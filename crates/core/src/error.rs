// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command error type and taxonomy.
//!
//! A single `Error` carries a message and a kind. The kind decides how the
//! error surfaces at the edges: HTTP status on the server, exit behavior on
//! the CLI, and whether the executor treats a close failure as benign. On
//! the wire an error is the record `{"Message": …, "Code": …, "Type":
//! "error"}`; the `Type` tag is what lets a byte-stream reader tell a late
//! error apart from an ordinary value.

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Category of a command error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// General failure (HTTP 500, non-zero exit).
    Normal,
    /// Caused by the caller: bad arguments, malformed options (HTTP 400).
    Client,
    /// Programmer error inside the server.
    Implementation,
    /// Server-side throttling (HTTP 429).
    RateLimited,
    /// Origin/CSRF refusal (HTTP 403).
    Forbidden,
    /// No such command or subcommand (HTTP 404).
    NotFound,
    /// Emit was attempted on an emitter that already closed.
    ClosedEmitter,
    /// A second close on an already-closed emitter. Benign; callers filter it.
    ClosingClosedEmitter,
    /// The request's cancellation token fired.
    Cancelled,
}

impl ErrorKind {
    /// Numeric code used on the wire. Contract-level kinds never travel, so
    /// they share the implementation code.
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::Normal | ErrorKind::Cancelled => 0,
            ErrorKind::Client => 1,
            ErrorKind::Implementation
            | ErrorKind::ClosedEmitter
            | ErrorKind::ClosingClosedEmitter => 2,
            ErrorKind::RateLimited => 3,
            ErrorKind::Forbidden => 4,
            ErrorKind::NotFound => 5,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            1 => ErrorKind::Client,
            2 => ErrorKind::Implementation,
            3 => ErrorKind::RateLimited,
            4 => ErrorKind::Forbidden,
            5 => ErrorKind::NotFound,
            _ => ErrorKind::Normal,
        }
    }
}

/// Error returned by commands and by the execution pipeline.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct Error {
    pub message: String,
    pub kind: ErrorKind,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: ErrorKind::Normal }
    }

    pub fn with_kind(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self { message: message.into(), kind }
    }

    pub fn client(message: impl Into<String>) -> Self {
        Self::with_kind(message, ErrorKind::Client)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::with_kind(message, ErrorKind::Forbidden)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::with_kind(message, ErrorKind::RateLimited)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_kind(message, ErrorKind::NotFound)
    }

    pub fn implementation(message: impl Into<String>) -> Self {
        Self::with_kind(message, ErrorKind::Implementation)
    }

    /// A command without a Run function was invoked directly.
    pub fn not_callable() -> Self {
        Self::client("this command cannot be called directly; try one of its subcommands")
    }

    pub fn cancelled() -> Self {
        Self::with_kind("request cancelled", ErrorKind::Cancelled)
    }

    pub fn closed_emitter() -> Self {
        Self::with_kind("emit on closed emitter", ErrorKind::ClosedEmitter)
    }

    pub fn closing_closed_emitter() -> Self {
        Self::with_kind("closing closed emitter", ErrorKind::ClosingClosedEmitter)
    }

    /// True for the double-close error that close callers swallow.
    pub fn is_benign_close(&self) -> bool {
        self.kind == ErrorKind::ClosingClosedEmitter
    }

    pub fn is_client(&self) -> bool {
        self.kind == ErrorKind::Client
    }
}

/// Wire shape of an error record.
#[derive(Serialize, Deserialize)]
struct Wire {
    #[serde(rename = "Message")]
    message: String,
    #[serde(rename = "Code")]
    code: u32,
    #[serde(rename = "Type", default = "error_tag")]
    tag: String,
}

fn error_tag() -> String {
    "error".to_string()
}

impl Serialize for Error {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Wire {
            message: self.message.clone(),
            code: self.kind.code(),
            tag: error_tag(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Error {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = Wire::deserialize(deserializer)?;
        Ok(Error { message: wire.message, kind: ErrorKind::from_code(wire.code) })
    }
}

/// Decode a JSON value as an error record if (and only if) it is one.
///
/// A value is an error record when it is an object tagged `"Type": "error"`,
/// or — `strict` off — when it has exactly the `Message`/`Code` shape the
/// legacy wire format used before the tag existed.
pub fn error_record(value: &serde_json::Value, strict: bool) -> Option<Error> {
    let obj = value.as_object()?;
    let tagged = obj.get("Type").and_then(|t| t.as_str()) == Some("error");
    if !tagged {
        if strict {
            return None;
        }
        let legacy_shape = obj.len() <= 2
            && obj.get("Message").is_some_and(|m| m.is_string())
            && obj.get("Code").is_some_and(|c| c.is_u64());
        if !legacy_shape {
            return None;
        }
    }
    serde_json::from_value(value.clone()).ok()
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
