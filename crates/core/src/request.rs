// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A fully resolved command invocation.
//!
//! Option coercion happens exactly once, when the request is built; by the
//! time Run sees a request every option value already has its declared type
//! and every alias has been folded into its long name.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::command::{Command, CommandTree};
use crate::encoding::EncodingType;
use crate::error::Error;
use crate::files::FileNode;
use crate::option::{parse_opt_value, OptType, OptValue, ENC_LONG, TIMEOUT_OPT};

pub type OptMap = HashMap<String, OptValue>;

/// A call to a command from a consumer.
#[derive(Debug)]
pub struct Request {
    pub root: Arc<Command>,
    pub command: Arc<Command>,
    pub path: Vec<String>,
    pub options: OptMap,
    pub arguments: Vec<String>,
    pub files: Option<FileNode>,
    pub token: CancellationToken,
}

impl Request {
    /// Build a request, resolving `path` in `root` and coercing every known
    /// option to its declared type. Unknown options are kept as provided but
    /// never misread as typed ones.
    pub fn new(
        root: Arc<Command>,
        path: Vec<String>,
        options: OptMap,
        arguments: Vec<String>,
        files: Option<FileNode>,
        token: CancellationToken,
    ) -> Result<Arc<Request>, Error> {
        let command = root.get(&path)?;
        let mut req =
            Request { root, command, path, options, arguments, files, token };
        req.convert_options()?;
        Ok(Arc::new(req))
    }

    fn convert_options(&mut self) -> Result<(), Error> {
        let defs = self.root.options_for(&self.path)?;
        let mut converted = OptMap::with_capacity(self.options.len());
        for (given_name, value) in self.options.drain() {
            let Some(def) = defs.get(&given_name) else {
                // Unknown option: tolerated, passed through untouched.
                converted.insert(given_name, value);
                continue;
            };
            let value = coerce(&given_name, value, def.ty)?;
            if converted.insert(def.name.clone(), value).is_some() {
                return Err(Error::client(format!(
                    "duplicate command options were provided ({:?})",
                    def.name
                )));
            }
        }
        self.options = converted;
        Ok(())
    }

    pub fn option(&self, name: &str) -> Option<&OptValue> {
        self.options.get(name)
    }

    pub fn bool_option(&self, name: &str) -> bool {
        self.option(name).and_then(OptValue::as_bool).unwrap_or(false)
    }

    pub fn string_option(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(OptValue::as_str)
    }

    /// The encoding requested for this invocation, or `default` when absent
    /// or unparseable.
    pub fn encoding(&self, default: EncodingType) -> EncodingType {
        self.string_option(ENC_LONG)
            .and_then(|s| s.parse().ok())
            .unwrap_or(default)
    }

    /// The global per-request timeout, parsed from the `timeout` option.
    pub fn timeout(&self) -> Result<Option<Duration>, Error> {
        match self.string_option(TIMEOUT_OPT) {
            None => Ok(None),
            Some(raw) => parse_duration(raw).map(Some),
        }
    }
}

fn coerce(name: &str, value: OptValue, ty: OptType) -> Result<OptValue, Error> {
    if value.type_of() == ty {
        return Ok(value);
    }
    match value {
        // Raw strings are parsed into the declared type.
        OptValue::String(raw) => parse_opt_value(ty, name, &raw),
        other => Err(Error::client(format!(
            "option {name:?} should be type {:?}, but got type {:?}",
            ty.as_str(),
            other.type_of().as_str()
        ))),
    }
}

/// Parse durations of the form `300`, `90s`, `1500ms`, `2m` or `1h`; a bare
/// number means seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, Error> {
    let fail = || Error::client(format!("invalid timeout: {raw:?}"));
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(i) => raw.split_at(i),
        None => (raw, "s"),
    };
    let n: u64 = digits.parse().map_err(|_| fail())?;
    match unit {
        "ms" => Ok(Duration::from_millis(n)),
        "s" => Ok(Duration::from_secs(n)),
        "m" => Ok(Duration::from_secs(n * 60)),
        "h" => Ok(Duration::from_secs(n * 3600)),
        _ => Err(fail()),
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
