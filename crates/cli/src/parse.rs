// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line parsing against the command tree.
//!
//! Tokens resolve subcommands until the first positional argument; `--`
//! terminates option parsing; a lone `-` stands for "read arguments from
//! standard input" when the trailing argument definition allows it.
//! Option values come either inline (`--name=value`) or from the next
//! token; boolean options never consume a following token.

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;

use cb_core::{Command, CommandTree, Error, OptDef, OptMap, OptType, OptValue, Request};
use tokio_util::sync::CancellationToken;

/// Parse `args` (argv without the binary name) into a request. `stdin` is
/// consumed only when a lone `-` asks for it.
pub fn parse(
    root: &Arc<Command>,
    args: &[String],
    mut stdin: Option<&mut dyn BufRead>,
) -> Result<Arc<Request>, Error> {
    let mut path: Vec<String> = Vec::new();
    let mut positionals: Vec<String> = Vec::new();
    let mut raw_options: Vec<(String, String)> = Vec::new();
    let mut current = root.clone();
    let mut defs = root.options_for(&path)?;
    let mut options_done = false;
    let mut stdin_requested = false;

    let mut tokens = args.iter().peekable();
    while let Some(token) = tokens.next() {
        if options_done || !token.starts_with('-') || token == "-" {
            if token == "-" && !options_done {
                stdin_requested = true;
                continue;
            }
            // Subcommand names resolve until the first real positional.
            if positionals.is_empty() && !stdin_requested {
                if let Some(sub) = current.subcommand(token) {
                    let sub = sub.clone();
                    path.push(token.clone());
                    current = sub;
                    defs = root.options_for(&path)?;
                    continue;
                }
            }
            positionals.push(token.clone());
            continue;
        }
        if token == "--" {
            options_done = true;
            continue;
        }

        let name_value = token.trim_start_matches('-');
        let (name, inline) = match name_value.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (name_value, None),
        };
        let Some(def) = defs.get(name) else {
            return Err(Error::client(format!("unknown option {token:?}")));
        };

        let value = match (def.ty, inline) {
            (_, Some(value)) => value,
            // Bare boolean flags never swallow the next token.
            (OptType::Bool, None) => "true".to_string(),
            (_, None) => match tokens.next() {
                Some(value) => value.clone(),
                None => {
                    return Err(Error::client(format!("missing argument for option {token:?}")));
                }
            },
        };
        raw_options.push((def.name.clone(), value));
    }

    let options = assemble_options(raw_options, &defs)?;

    if stdin_requested {
        let stdin_eligible = current
            .arguments
            .last()
            .is_some_and(|arg| arg.supports_stdin);
        if !stdin_eligible {
            return Err(Error::client("this command does not read arguments from stdin"));
        }
        let Some(reader) = stdin.as_deref_mut() else {
            return Err(Error::client("stdin is not available"));
        };
        read_stdin_arguments(reader, &mut positionals)?;
    }

    Request::new(
        root.clone(),
        path,
        options,
        positionals,
        None,
        CancellationToken::new(),
    )
}

fn assemble_options(
    raw: Vec<(String, String)>,
    defs: &HashMap<String, OptDef>,
) -> Result<OptMap, Error> {
    let mut options = OptMap::new();
    for (name, value) in raw {
        let is_list = defs.get(&name).is_some_and(|def| def.ty == OptType::Strings);
        if is_list {
            match options.get_mut(&name) {
                Some(OptValue::Strings(list)) => list.push(value),
                _ => {
                    options.insert(name, OptValue::Strings(vec![value]));
                }
            }
            continue;
        }
        if options.insert(name.clone(), OptValue::String(value)).is_some() {
            return Err(Error::client(format!("multiple values for option {name:?}")));
        }
    }
    Ok(options)
}

fn read_stdin_arguments(
    reader: &mut dyn BufRead,
    positionals: &mut Vec<String>,
) -> Result<(), Error> {
    for line in reader.lines() {
        let line = line.map_err(|e| Error::client(format!("reading stdin failed: {e}")))?;
        if !line.is_empty() {
            positionals.push(line);
        }
    }
    Ok(())
}

/// The subcommand path a (possibly unparsable) argv points at; used to pick
/// which command's help to print.
pub fn help_path(root: &Arc<Command>, args: &[String]) -> Vec<String> {
    let mut path = Vec::new();
    let mut current = root.clone();
    for token in args {
        if token.starts_with('-') {
            continue;
        }
        match current.subcommand(token) {
            Some(sub) => {
                let sub = sub.clone();
                path.push(token.clone());
                current = sub;
            }
            None => break,
        }
    }
    path
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
