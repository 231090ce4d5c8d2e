// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cb-cli: the terminal front end for crossbar commands.
//!
//! Parses argv against the command tree, runs the command through any
//! `Executor` (in-process or an HTTP client), and renders the emitted
//! values to stdout with the command's text encoder when it has one.

pub mod emitter;
pub mod helptext;
pub mod parse;
pub mod run;

pub use emitter::{effective_encoding, CliEmitter};
pub use helptext::{long_help, short_help};
pub use parse::parse;
pub use run::{run, RunConfig};
