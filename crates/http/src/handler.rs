// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP server: accept loop and per-connection command dispatch.
//!
//! Each connection carries one request. The handler gates method and origin,
//! rebuilds the command request, and hands an [`HttpEmitter`] to the
//! executor; client disconnects cancel the request token so an abandoned
//! command stops emitting.

use std::sync::Arc;

use cb_core::{
    encoder_for, Command, EncodingType, Environment, Error, ErrorKind, Executor, LocalExecutor,
    Request, ResponseEmitter,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::{skip_api_header, ServerConfig};
use crate::emitter::HttpEmitter;
use crate::parse::{parse_request, split_target};
use crate::proto::{read_request_head, write_response_head, Headers, RequestHead};
use crate::{EXPOSED_HEADERS, ORIGIN_HEADER, PLAIN_TEXT};

const MAX_BODY: usize = 64 * 1024 * 1024;

/// Serves a command tree over HTTP.
pub struct Server {
    root: Arc<Command>,
    env: Environment,
    cfg: ServerConfig,
    executor: Arc<dyn Executor>,
}

impl Server {
    pub fn new(root: Arc<Command>, env: Environment, cfg: ServerConfig) -> Self {
        let executor = Arc::new(LocalExecutor::new(root.clone()));
        Self { root, env, cfg, executor }
    }

    /// Replace the executor, e.g. to proxy commands onward.
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    /// Accept connections until the listener fails, one task per connection.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("connection from {addr}");
                    let server = self.clone();
                    tokio::spawn(async move {
                        if let Err(err) = server.handle_connection(stream).await {
                            debug!(error = %err, "connection ended");
                        }
                    });
                }
                Err(err) => {
                    error!("accept error: {err}");
                    return;
                }
            }
        }
    }

    async fn handle_connection(&self, stream: tokio::net::TcpStream) -> Result<(), Error> {
        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut writer = write_half;

        let head = read_request_head(&mut reader).await?;
        debug!(method = %head.method, target = %head.target, "incoming API request");

        let base = self.base_headers(&head.headers);

        if head.method == "OPTIONS" {
            return self.preflight(&mut writer, base).await;
        }
        let method_allowed = matches!(head.method.as_str(), "POST" | "HEAD")
            || (head.method == "GET" && self.cfg.allow_get);
        if !method_allowed {
            return write_simple(&mut writer, 405, base, "405 - Method Not Allowed").await;
        }

        let origin_ok = self.cfg.allow_origin(&head.headers)
            && self.cfg.allow_referer(&head.headers)
            && self.cfg.allow_user_agent(&head.headers);
        if !origin_ok {
            warn!(target = %head.target, "API blocked request (possible CSRF)");
            return write_simple(&mut writer, 403, base, "403 - Forbidden").await;
        }

        let (path, query) = split_target(&head.target);
        let Some(path) = strip_prefix(path, &self.cfg.api_prefix) else {
            return write_simple(&mut writer, 404, base, "404 page not found").await;
        };

        let body = read_body(&mut reader, &head).await?;
        let token = CancellationToken::new();
        let req = match parse_request(&self.root, path, query, &head, body, token.clone()) {
            Ok(req) => req,
            Err(err) => {
                let status = if err.kind == ErrorKind::NotFound { 404 } else { 400 };
                return write_simple(&mut writer, status, base, &err.message).await;
            }
        };

        // Surface an unusable encoding before the emitter owns the socket.
        let encoding = match req.string_option(cb_core::option::ENC_LONG) {
            Some(raw) => match raw.parse::<EncodingType>() {
                Ok(encoding) => encoding,
                Err(err) => return write_simple(&mut writer, 400, base, &err.message).await,
            },
            None => EncodingType::Json,
        };
        if let Err(err) = encoder_for(&req, encoding) {
            return write_simple(&mut writer, 400, base, &err.message).await;
        }

        let head_only = head.method == "HEAD";
        let emitter = HttpEmitter::new(writer, req.clone(), encoding, head_only, base)?;

        // Race execution against client disconnect, like any long command
        // whose caller gave up.
        tokio::select! {
            _ = self.dispatch(req.clone(), emitter) => {}
            _ = detect_disconnect(&mut reader) => {
                debug!("client disconnected, cancelling request");
                token.cancel();
            }
        }
        Ok(())
    }

    async fn dispatch<W: AsyncWrite + Send + Unpin>(&self, req: Arc<Request>, mut re: HttpEmitter<W>) {
        if let Err(err) = self.executor.execute(&req, &mut re, &self.env).await {
            // Pre-emission failure: the preamble is still open, so the close
            // maps the error onto the status line.
            if let Err(close_err) = re.close_with_error(Some(err)).await {
                if !close_err.is_benign_close() {
                    debug!(error = %close_err, "error response failed");
                }
            }
        }
    }

    async fn preflight<W: AsyncWrite + Send + Unpin>(
        &self,
        writer: &mut W,
        mut headers: Headers,
    ) -> Result<(), Error> {
        headers.set("Access-Control-Allow-Methods", &self.cfg.allowed_methods.join(", "));
        headers.set(
            "Access-Control-Allow-Headers",
            &self.cfg.allowed_request_headers.join(", "),
        );
        headers.set("Content-Length", "0");
        write_response_head(writer, 200, &headers).await
    }

    /// Headers every response starts from: the server tag, user extras, and
    /// the CORS grant for an allowed Origin.
    fn base_headers(&self, request_headers: &Headers) -> Headers {
        let mut headers = Headers::new();
        headers.set("Server", concat!("crossbar/", env!("CARGO_PKG_VERSION")));
        for (name, value) in &self.cfg.headers {
            if !skip_api_header(name) {
                headers.set(name, value);
            }
        }
        if let Some(origin) = request_headers.get(ORIGIN_HEADER) {
            if self.cfg.allow_origin(request_headers) {
                headers.set("Access-Control-Allow-Origin", origin);
                headers.set("Vary", "Origin");
            }
        }
        headers.set("Access-Control-Expose-Headers", EXPOSED_HEADERS);
        headers
    }
}

fn strip_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    match path.strip_prefix(prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

async fn read_body<R: AsyncRead + Unpin>(
    reader: &mut R,
    head: &RequestHead,
) -> Result<Vec<u8>, Error> {
    let length = head.headers.content_length().unwrap_or(0);
    if length == 0 {
        return Ok(Vec::new());
    }
    if length > MAX_BODY {
        return Err(Error::client("request body too large"));
    }
    let mut body = vec![0u8; length];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|e| Error::client(format!("truncated request body: {e}")))?;
    Ok(body)
}

/// Resolves when the client half-closes or sends unexpected bytes; in this
/// one-request protocol either means the client is gone.
async fn detect_disconnect<R: AsyncRead + Unpin>(reader: &mut R) {
    let mut buf = [0u8; 1];
    let _ = reader.read(&mut buf).await;
}

async fn write_simple<W: AsyncWrite + Send + Unpin>(
    writer: &mut W,
    status: u16,
    mut headers: Headers,
    body: &str,
) -> Result<(), Error> {
    headers.set("Content-Type", PLAIN_TEXT);
    headers.set("Content-Length", &body.len().to_string());
    headers.set("Connection", "close");
    write_response_head(writer, status, &headers).await?;
    tokio::io::AsyncWriteExt::write_all(writer, body.as_bytes())
        .await
        .map_err(|e| Error::new(format!("write failed: {e}")))
}
