// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client: maps a command request onto a POST and hands back a
//! streaming response.
//!
//! The wire encoding is pinned to JSON when the query string is built — the
//! caller's request keeps its own display-encoding intent untouched. The
//! client implements [`Executor`], so a run harness dispatches to a remote
//! daemon exactly the way it dispatches in-process.

use std::sync::Arc;

use async_trait::async_trait;
use cb_core::option::{CHAN_OPT, ENC_LONG};
use cb_core::{copy, Environment, Error, Executor, OptValue, Request, ResponseEmitter};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::multipart;
use crate::proto::read_response_head;
use crate::response::HttpResponse;
use crate::APPLICATION_OCTET_STREAM;

/// Client for a crossbar command API.
pub struct Client {
    address: String,
    api_prefix: String,
    user_agent: String,
}

impl Client {
    /// `address` is the `host:port` the daemon listens on.
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            api_prefix: "/api/v0".to_string(),
            user_agent: concat!("crossbar/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn with_api_prefix(mut self, prefix: &str) -> Self {
        self.api_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Send `req` and return the streaming response. Server-reported
    /// failures (status ≥ 400) come back as the error they encode.
    pub async fn send(&self, req: &Arc<Request>) -> Result<HttpResponse, Error> {
        let query = build_query(req);
        let target = format!("{}/{}?{}", self.api_prefix, req.path.join("/"), query);

        let (body, content_type) = match &req.files {
            Some(tree) => {
                let boundary = multipart::choose_boundary(tree);
                let body = multipart::encode(tree, &boundary)?;
                (body, format!("multipart/form-data; boundary={boundary}"))
            }
            None => (Vec::new(), APPLICATION_OCTET_STREAM.to_string()),
        };

        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| Error::new(format!("connect to {} failed: {e}", self.address)))?;
        let (read_half, mut write_half) = stream.into_split();

        let head = format!(
            "POST {target} HTTP/1.1\r\n\
             Host: {}\r\n\
             User-Agent: {}\r\n\
             Cache-Control: no-cache\r\n\
             Content-Type: {content_type}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n",
            self.address,
            self.user_agent,
            body.len(),
        );

        let request_io = async {
            write_half.write_all(head.as_bytes()).await?;
            write_half.write_all(&body).await?;
            write_half.flush().await?;
            Ok::<(), std::io::Error>(())
        };
        tokio::select! {
            sent = request_io => {
                sent.map_err(|e| Error::new(format!("request write failed: {e}")))?;
            }
            _ = req.token.cancelled() => return Err(Error::cancelled()),
        }

        let mut reader = BufReader::new(read_half);
        let head = tokio::select! {
            head = read_response_head(&mut reader) => head?,
            _ = req.token.cancelled() => return Err(Error::cancelled()),
        };

        // The write half stays open until the response is drained; closing
        // it early reads as a client disconnect on the server.
        HttpResponse::parse(head, reader, write_half, req.clone()).await
    }
}

#[async_trait]
impl Executor for Client {
    async fn execute(
        &self,
        req: &Arc<Request>,
        re: &mut dyn ResponseEmitter,
        _env: &Environment,
    ) -> Result<(), Error> {
        let mut res = self.send(req).await?;
        copy(re, &mut res).await
    }
}

/// Options become query parameters, positionals repeat as `arg`. The wire
/// encoding is forced to JSON and channel streaming is requested.
fn build_query(req: &Arc<Request>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in &req.options {
        if name == ENC_LONG || name == CHAN_OPT {
            continue;
        }
        match value {
            OptValue::Strings(items) => {
                for item in items {
                    query.append_pair(name, item);
                }
            }
            other => {
                query.append_pair(name, &other.to_query_value());
            }
        }
    }
    query.append_pair(ENC_LONG, "json");
    query.append_pair(CHAN_OPT, "true");
    for arg in &req.arguments {
        query.append_pair("arg", arg);
    }
    query.finish()
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
