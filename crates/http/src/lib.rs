// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cb-http: the HTTP transport for crossbar commands.
//!
//! One HTTP request maps to one command execution. The server resolves the
//! URL path in the command tree, rebuilds a request from query parameters
//! and an optional multipart body, and streams encoded values back as a
//! chunked response; errors that arise after the status line has been
//! committed travel in a response trailer. The client is the mirror image
//! and implements the same `Executor` trait as in-process execution, so a
//! CLI binds to either without noticing.

pub mod client;
pub mod config;
pub mod emitter;
pub mod handler;
pub mod multipart;
pub mod parse;
pub mod proto;
pub mod response;

/// Trailer header carrying an error that arose mid-stream.
pub const STREAM_ERR_HEADER: &str = "X-Stream-Error";
/// Marker: the response body is one raw byte stream.
pub const STREAM_HEADER: &str = "X-Stream-Output";
/// Marker: the response body is a stream of encoded values.
pub const CHANNEL_HEADER: &str = "X-Chunked-Output";
/// Advisory value count; distinct from `Content-Length` because the body is
/// chunked.
pub const EXTRA_CONTENT_LENGTH_HEADER: &str = "X-Content-Length";

pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const USER_AGENT_HEADER: &str = "User-Agent";
pub const ORIGIN_HEADER: &str = "Origin";
pub const REFERER_HEADER: &str = "Referer";

pub(crate) const APPLICATION_JSON: &str = "application/json";
pub(crate) const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";
pub(crate) const PLAIN_TEXT: &str = "text/plain";

/// Response headers a consumer may read cross-origin.
pub const EXPOSED_HEADERS: &str =
    "X-Stream-Output, X-Chunked-Output, X-Content-Length, X-Stream-Error";

pub use client::Client;
pub use config::ServerConfig;
pub use emitter::HttpEmitter;
pub use handler::Server;
pub use response::HttpResponse;
