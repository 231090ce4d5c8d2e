// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal multipart/form-data codec for file arguments.
//!
//! The writer and reader are symmetric: each part carries the node's
//! `/`-separated path in `filename`, with directories marked by an
//! `application/x-directory` content type.

use cb_core::{Error, FileNode, FileTreeBuilder};

const DIRECTORY_TYPE: &str = "application/x-directory";
const FILE_TYPE: &str = "application/octet-stream";

/// Extract the boundary parameter from a `multipart/form-data` content type.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').map(str::trim).find_map(|param| {
        param
            .strip_prefix("boundary=")
            .map(|b| b.trim_matches('"').to_string())
    })
}

/// Pick a boundary that does not occur in any file's content.
pub fn choose_boundary(tree: &FileNode) -> String {
    let mut boundary = "crossbar-form-boundary".to_string();
    while tree
        .entries()
        .iter()
        .any(|(_, content)| matches!(content, Some(c) if contains(c, boundary.as_bytes())))
    {
        boundary.push('x');
    }
    boundary
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Encode a file tree as a multipart body.
pub fn encode(tree: &FileNode, boundary: &str) -> Result<Vec<u8>, Error> {
    let mut body = Vec::new();
    for (path, content) in tree.entries() {
        if path.contains('"') {
            return Err(Error::client(format!("file name {path:?} contains a quote")));
        }
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"file\"; filename=\"{path}\"\r\n")
                .as_bytes(),
        );
        let content_type = if content.is_some() { FILE_TYPE } else { DIRECTORY_TYPE };
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        if let Some(bytes) = content {
            body.extend_from_slice(bytes);
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    Ok(body)
}

/// Decode a multipart body back into a file tree.
pub fn decode(body: &[u8], boundary: &str) -> Result<Option<FileNode>, Error> {
    let delimiter = format!("--{boundary}");
    let mut builder = FileTreeBuilder::new();
    let mut rest = body;

    // Skip any preamble before the first delimiter.
    let Some(start) = find(rest, delimiter.as_bytes()) else {
        return Err(Error::client("multipart body without boundary delimiter"));
    };
    rest = &rest[start + delimiter.len()..];

    loop {
        if rest.starts_with(b"--") {
            break;
        }
        rest = strip_crlf(rest);

        let Some(header_end) = find(rest, b"\r\n\r\n") else {
            return Err(Error::client("multipart part without header terminator"));
        };
        let header_bytes = &rest[..header_end];
        let content_start = header_end + 4;

        let headers = String::from_utf8_lossy(header_bytes);
        let filename = parse_filename(&headers)
            .ok_or_else(|| Error::client("multipart part without a filename"))?;
        let is_directory = headers
            .lines()
            .any(|line| line.to_ascii_lowercase().starts_with("content-type:") && line.contains(DIRECTORY_TYPE));

        let after_headers = &rest[content_start..];
        let Some(content_end) = find(after_headers, delimiter.as_bytes()) else {
            return Err(Error::client("multipart part without closing delimiter"));
        };
        // The delimiter is preceded by the part's trailing CRLF.
        let content = after_headers[..content_end]
            .strip_suffix(b"\r\n")
            .unwrap_or(&after_headers[..content_end]);

        builder.insert(&filename, if is_directory { None } else { Some(content.to_vec()) })?;
        rest = &after_headers[content_end + delimiter.len()..];
    }

    Ok(builder.build("upload"))
}

fn parse_filename(headers: &str) -> Option<String> {
    for line in headers.lines() {
        if !line.to_ascii_lowercase().starts_with("content-disposition:") {
            continue;
        }
        let marker = "filename=\"";
        let start = line.find(marker)? + marker.len();
        let end = line[start..].find('"')? + start;
        return Some(line[start..end].to_string());
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn strip_crlf(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\r\n").unwrap_or(bytes)
}

#[cfg(test)]
#[path = "multipart_tests.rs"]
mod tests;
