// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The command tree.
//!
//! Commands form an immutable tree shared behind `Arc`; a path is the
//! sequence of subcommand names from the root. Option definitions along a
//! root-to-leaf path must be collision-free, which is checked whenever the
//! path's option set is assembled.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::emitter::{EmitterKind, Response, ResponseEmitter};
use crate::encoding::{EncoderFactory, EncodingType, OutputType};
use crate::error::Error;
use crate::option::{builtin_options, OptDef};
use crate::request::Request;

/// Opaque environment handed to PreRun and Run; concrete commands downcast.
pub type Environment = Arc<dyn Any + Send + Sync>;

pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'a>>;

/// The function that processes a request and writes results to the emitter.
pub type RunFn = Arc<
    dyn for<'a> Fn(&'a Request, &'a mut dyn ResponseEmitter, &'a Environment) -> RunFuture<'a>
        + Send
        + Sync,
>;

/// Validation/setup hook invoked before Run; a non-`Ok` return skips Run.
pub type PreRunFn = Arc<dyn Fn(&Request, &Environment) -> Result<(), Error> + Send + Sync>;

/// Stream transformer between Run's output and the outer consumer, selected
/// by the outer emitter's kind.
pub type PostRunFn = Arc<
    dyn for<'a> Fn(&'a mut dyn Response, &'a mut dyn ResponseEmitter) -> RunFuture<'a>
        + Send
        + Sync,
>;

/// Helper for building a [`RunFn`] from an async closure.
pub fn run_fn<F>(f: F) -> RunFn
where
    F: for<'a> Fn(&'a Request, &'a mut dyn ResponseEmitter, &'a Environment) -> RunFuture<'a>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Helper for building a [`PostRunFn`] from an async closure.
pub fn post_run_fn<F>(f: F) -> PostRunFn
where
    F: for<'a> Fn(&'a mut dyn Response, &'a mut dyn ResponseEmitter) -> RunFuture<'a>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Allowed positional argument content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    String,
    File,
}

/// Definition of one positional argument.
#[derive(Debug, Clone)]
pub struct ArgDef {
    pub name: String,
    pub required: bool,
    pub variadic: bool,
    pub ty: ArgType,
    pub supports_stdin: bool,
    pub description: String,
}

impl ArgDef {
    pub fn string(name: &str, required: bool, variadic: bool, description: &str) -> Self {
        Self {
            name: name.to_string(),
            required,
            variadic,
            ty: ArgType::String,
            supports_stdin: false,
            description: description.to_string(),
        }
    }

    pub fn file(name: &str, required: bool, variadic: bool, description: &str) -> Self {
        Self { ty: ArgType::File, ..Self::string(name, required, variadic, description) }
    }

    pub fn with_stdin(mut self) -> Self {
        self.supports_stdin = true;
        self
    }
}

/// Help text attached to a command.
#[derive(Debug, Clone, Default)]
pub struct HelpText {
    pub tagline: String,
    pub short_description: String,
    pub long_description: String,
}

impl HelpText {
    pub fn new(tagline: &str) -> Self {
        Self { tagline: tagline.to_string(), ..Default::default() }
    }
}

/// A node in the command tree.
#[derive(Default)]
pub struct Command {
    pub helptext: HelpText,
    pub options: Vec<OptDef>,
    pub arguments: Vec<ArgDef>,
    pub pre_run: Option<PreRunFn>,
    pub run: Option<RunFn>,
    pub post_run: HashMap<EmitterKind, PostRunFn>,
    pub encoders: HashMap<EncodingType, EncoderFactory>,
    /// Exemplar of Run's output type; enables typed decoding.
    pub output: Option<OutputType>,
    /// Resolvable locally but refused (404) by the HTTP handler.
    pub no_remote: bool,
    pub subcommands: HashMap<String, Arc<Command>>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("arguments", &self.arguments)
            .field("options", &self.options)
            .field("run", &self.run.is_some())
            .field("subcommands", &self.subcommands.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Command {
    pub fn subcommand(&self, name: &str) -> Option<&Arc<Command>> {
        self.subcommands.get(name)
    }

    /// Validate the request's positional arguments against this command's
    /// argument schema.
    pub fn check_arguments(&self, req: &Request) -> Result<(), Error> {
        let args = &req.arguments;
        let num_required = self.arguments.iter().filter(|a| a.required).count();

        let mut value_index = 0;
        let last = self.arguments.len().saturating_sub(1);
        for (i, def) in self.arguments.iter().enumerate() {
            // Skip optional definitions when the remaining values are needed
            // for required ones; file arguments are checked separately.
            if (args.len() - value_index <= num_required && !def.required)
                || def.ty == ArgType::File
            {
                continue;
            }

            let mut found = false;
            if value_index < args.len() {
                found = true;
                value_index += 1;
            }

            // A trailing required argument may still be fed from stdin.
            if !found && i == last && def.supports_stdin {
                found = true;
            }

            check_arg_value(found, def)?;
        }
        Ok(())
    }
}

fn check_arg_value(found: bool, def: &ArgDef) -> Result<(), Error> {
    if def.variadic && def.supports_stdin {
        return Ok(());
    }
    if !found && def.required {
        return Err(Error::client(format!("argument {:?} is required", def.name)));
    }
    Ok(())
}

/// Root-relative path resolution over a shared command tree.
pub trait CommandTree {
    /// The chain of commands along `path`, starting at this node.
    fn resolve(&self, path: &[String]) -> Result<Vec<Arc<Command>>, Error>;

    /// The command addressed by `path`.
    fn get(&self, path: &[String]) -> Result<Arc<Command>, Error>;

    /// All option definitions visible at `path`: the built-ins plus every
    /// command's options along the way, keyed by each long name and alias.
    /// A name claimed twice is an error.
    fn options_for(&self, path: &[String]) -> Result<HashMap<String, OptDef>, Error>;
}

impl CommandTree for Arc<Command> {
    fn resolve(&self, path: &[String]) -> Result<Vec<Arc<Command>>, Error> {
        let mut chain = Vec::with_capacity(path.len() + 1);
        chain.push(self.clone());
        let mut current = self.clone();
        for (i, name) in path.iter().enumerate() {
            let next = current.subcommand(name).cloned().ok_or_else(|| {
                Error::not_found(format!("undefined command: {:?}", path[..=i].join("/")))
            })?;
            chain.push(next.clone());
            current = next;
        }
        Ok(chain)
    }

    fn get(&self, path: &[String]) -> Result<Arc<Command>, Error> {
        let mut chain = self.resolve(path)?;
        Ok(chain.pop().unwrap_or_else(|| self.clone()))
    }

    fn options_for(&self, path: &[String]) -> Result<HashMap<String, OptDef>, Error> {
        let chain = self.resolve(path)?;
        let mut map = HashMap::new();
        let defs = builtin_options()
            .into_iter()
            .chain(chain.iter().flat_map(|cmd| cmd.options.iter().cloned()));
        for def in defs {
            for name in def.names().map(str::to_string).collect::<Vec<_>>() {
                if map.insert(name.clone(), def.clone()).is_some() {
                    return Err(Error::client(format!("option name {name:?} used multiple times")));
                }
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
