// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps an HTTP request onto a command [`Request`].
//!
//! The URL path (under the API prefix) resolves in the command tree; query
//! parameters become options, repeated `arg` parameters become positional
//! arguments, and a multipart body becomes the file tree.

use std::sync::Arc;

use cb_core::{
    ArgType, Command, CommandTree, Error, FileNode, OptMap, OptType, OptValue, Request,
};
use cb_core::option::ENC_LONG;
use tokio_util::sync::CancellationToken;

use crate::multipart;
use crate::proto::RequestHead;

/// Split a request target into its path segments and raw query string.
pub fn split_target(target: &str) -> (&str, &str) {
    match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    }
}

/// Build a command request from a parsed HTTP request. `path` is the target
/// path with the API prefix already stripped.
pub fn parse_request(
    root: &Arc<Command>,
    path: &str,
    query: &str,
    head: &RequestHead,
    body: Vec<u8>,
    token: CancellationToken,
) -> Result<Arc<Request>, Error> {
    let segments: Vec<String> =
        path.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect();

    let chain = root.resolve(&segments)?;
    if chain.iter().any(|cmd| cmd.no_remote) {
        return Err(Error::not_found(format!("undefined command: {:?}", segments.join("/"))));
    }
    let cmd = match chain.last() {
        Some(cmd) => cmd.clone(),
        None => root.clone(),
    };
    if cmd.run.is_none() {
        return Err(Error::not_found(format!("undefined command: {:?}", segments.join("/"))));
    }

    let (options, arguments) = parse_query(root, &segments, query)?;
    let files = parse_files(&cmd, head, body)?;

    let req = Request::new(root.clone(), segments, options, arguments, files, token)?;
    cmd.check_arguments(&req)?;
    Ok(req)
}

fn parse_query(
    root: &Arc<Command>,
    segments: &[String],
    query: &str,
) -> Result<(OptMap, Vec<String>), Error> {
    let defs = root.options_for(segments)?;
    let mut options = OptMap::new();
    let mut arguments = Vec::new();

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let key = key.into_owned();
        let value = value.into_owned();
        if key == "arg" {
            arguments.push(value);
            continue;
        }
        match defs.get(&key) {
            // Unknown options ride along as raw strings.
            None => {
                options.insert(key, OptValue::String(value));
            }
            Some(def) if def.ty == OptType::Strings => {
                match options.get_mut(&def.name) {
                    Some(OptValue::Strings(list)) => list.push(value),
                    _ => {
                        options.insert(def.name.clone(), OptValue::Strings(vec![value]));
                    }
                }
            }
            Some(def) => {
                if options.contains_key(&def.name) {
                    return Err(Error::client(format!(
                        "expected key {:?} to have only a single value",
                        def.name
                    )));
                }
                options.insert(def.name.clone(), OptValue::String(value));
            }
        }
    }

    // The wire encoding defaults to JSON regardless of the CLI default.
    options
        .entry(ENC_LONG.to_string())
        .or_insert_with(|| OptValue::String("json".to_string()));

    Ok((options, arguments))
}

fn parse_files(
    cmd: &Arc<Command>,
    head: &RequestHead,
    body: Vec<u8>,
) -> Result<Option<FileNode>, Error> {
    let files = match head.headers.media_type() {
        Some("multipart/form-data") => {
            let content_type = head.headers.get(crate::CONTENT_TYPE_HEADER).unwrap_or_default();
            let boundary = multipart::boundary_from_content_type(content_type)
                .ok_or_else(|| Error::client("multipart body without a boundary"))?;
            multipart::decode(&body, &boundary)?
        }
        _ => None,
    };

    let required_file = cmd
        .arguments
        .iter()
        .find(|arg| arg.ty == ArgType::File && arg.required);
    if let Some(arg) = required_file {
        if files.is_none() {
            return Err(Error::client(format!("file argument {:?} is required", arg.name)));
        }
    }
    Ok(files)
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
