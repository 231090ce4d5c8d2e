// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/1.1 plumbing shared by the server and the client: head
//! parsing and writing, and the chunked body codec with trailer capture.

use cb_core::Error;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};

const MAX_LINE: usize = 8 * 1024;
const MAX_HEADERS: usize = 128;

/// Ordered, case-insensitive header map.
#[derive(Debug, Clone, Default)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn add(&mut self, name: &str, value: &str) {
        self.0.push((name.to_string(), value.to_string()));
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.0.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.add(name, value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Content-Length` as a number, if present and well-formed.
    pub fn content_length(&self) -> Option<usize> {
        self.get("Content-Length").and_then(|v| v.trim().parse().ok())
    }

    /// The media type of `Content-Type`, parameters stripped.
    pub fn media_type(&self) -> Option<&str> {
        self.get("Content-Type").map(|ct| ct.split(';').next().unwrap_or(ct).trim())
    }
}

/// Parsed request line plus headers.
#[derive(Debug)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub headers: Headers,
}

/// Parsed status line plus headers.
#[derive(Debug)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: Headers,
}

async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String, Error> {
    let mut line = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        let n = tokio::io::AsyncReadExt::read(reader, &mut byte)
            .await
            .map_err(|e| Error::new(format!("read failed: {e}")))?;
        if n == 0 {
            if line.is_empty() {
                return Err(Error::new("connection closed"));
            }
            break;
        }
        if byte[0] == b'\n' {
            break;
        }
        if line.len() >= MAX_LINE {
            return Err(Error::client("header line too long"));
        }
        line.push(byte[0]);
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8(line).map_err(|_| Error::client("header line is not valid UTF-8"))
}

/// Read header lines up to the blank separator. Also used for trailers.
pub async fn read_headers<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Headers, Error> {
    let mut headers = Headers::new();
    for _ in 0..MAX_HEADERS {
        let line = read_line(reader).await?;
        if line.is_empty() {
            return Ok(headers);
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(Error::client(format!("malformed header line: {line:?}")));
        };
        headers.add(name.trim(), value.trim());
    }
    Err(Error::client("too many header lines"))
}

pub async fn read_request_head<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> Result<RequestHead, Error> {
    let line = read_line(reader).await?;
    let mut parts = line.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::client(format!("malformed request line: {line:?}")));
    };
    if !version.starts_with("HTTP/1.") {
        return Err(Error::client(format!("unsupported protocol: {version}")));
    }
    let headers = read_headers(reader).await?;
    Ok(RequestHead { method: method.to_string(), target: target.to_string(), headers })
}

pub async fn read_response_head<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> Result<ResponseHead, Error> {
    let line = read_line(reader).await?;
    let mut parts = line.split_whitespace();
    let (Some(_version), Some(status)) = (parts.next(), parts.next()) else {
        return Err(Error::new(format!("malformed status line: {line:?}")));
    };
    let status: u16 = status
        .parse()
        .map_err(|_| Error::new(format!("malformed status code in {line:?}")))?;
    let headers = read_headers(reader).await?;
    Ok(ResponseHead { status, headers })
}

pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "",
    }
}

pub async fn write_response_head<W: AsyncWrite + Unpin>(
    writer: &mut W,
    status: u16,
    headers: &Headers,
) -> Result<(), Error> {
    let mut head = format!("HTTP/1.1 {status} {}\r\n", status_reason(status));
    for (name, value) in headers.iter() {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    writer
        .write_all(head.as_bytes())
        .await
        .map_err(|e| Error::new(format!("write failed: {e}")))
}

/// One body chunk in chunked transfer encoding.
pub fn chunk(bytes: &[u8]) -> Vec<u8> {
    let mut out = format!("{:x}\r\n", bytes.len()).into_bytes();
    out.extend_from_slice(bytes);
    out.extend_from_slice(b"\r\n");
    out
}

/// The terminating chunk, optionally carrying trailer headers.
pub fn last_chunk(trailers: &[(&str, &str)]) -> Vec<u8> {
    let mut out = b"0\r\n".to_vec();
    for (name, value) in trailers {
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out
}

/// Decoder for a chunked (or plain) response body. After the final chunk the
/// trailer headers are available.
pub enum Body<R> {
    Chunked { reader: R, trailers: Option<Headers> },
    Sized { reader: R, remaining: usize },
    UntilEof { reader: R },
}

impl<R: AsyncBufRead + Unpin + Send> Body<R> {
    pub fn from_head(reader: R, headers: &Headers) -> Self {
        let chunked = headers
            .get("Transfer-Encoding")
            .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"));
        if chunked {
            Body::Chunked { reader, trailers: None }
        } else if let Some(len) = headers.content_length() {
            Body::Sized { reader, remaining: len }
        } else {
            Body::UntilEof { reader }
        }
    }

    /// The next slab of body bytes, or `None` once the body is exhausted.
    pub async fn next_bytes(&mut self) -> Result<Option<Vec<u8>>, Error> {
        match self {
            Body::Chunked { reader, trailers } => {
                if trailers.is_some() {
                    return Ok(None);
                }
                let size_line = read_line(reader).await?;
                let size_str = size_line.split(';').next().unwrap_or("").trim();
                let size = usize::from_str_radix(size_str, 16)
                    .map_err(|_| Error::new(format!("malformed chunk size: {size_line:?}")))?;
                if size == 0 {
                    *trailers = Some(read_headers(reader).await?);
                    return Ok(None);
                }
                let mut buf = vec![0u8; size];
                tokio::io::AsyncReadExt::read_exact(reader, &mut buf)
                    .await
                    .map_err(|e| Error::new(format!("truncated chunk: {e}")))?;
                let mut crlf = [0u8; 2];
                tokio::io::AsyncReadExt::read_exact(reader, &mut crlf)
                    .await
                    .map_err(|e| Error::new(format!("truncated chunk: {e}")))?;
                Ok(Some(buf))
            }
            Body::Sized { reader, remaining } => {
                if *remaining == 0 {
                    return Ok(None);
                }
                let take = (*remaining).min(8 * 1024);
                let mut buf = vec![0u8; take];
                let n = tokio::io::AsyncReadExt::read(reader, &mut buf)
                    .await
                    .map_err(|e| Error::new(format!("read failed: {e}")))?;
                if n == 0 {
                    return Err(Error::new("truncated response body"));
                }
                buf.truncate(n);
                *remaining -= n;
                Ok(Some(buf))
            }
            Body::UntilEof { reader } => {
                let mut buf = vec![0u8; 8 * 1024];
                let n = tokio::io::AsyncReadExt::read(reader, &mut buf)
                    .await
                    .map_err(|e| Error::new(format!("read failed: {e}")))?;
                if n == 0 {
                    return Ok(None);
                }
                buf.truncate(n);
                Ok(Some(buf))
            }
        }
    }

    pub async fn read_to_end(&mut self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        while let Some(bytes) = self.next_bytes().await? {
            out.extend_from_slice(&bytes);
        }
        Ok(out)
    }

    /// Trailer header value, available once the body has been fully read.
    pub fn trailer(&self, name: &str) -> Option<&str> {
        match self {
            Body::Chunked { trailers: Some(trailers), .. } => trailers.get(name),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "proto_tests.rs"]
mod tests;
