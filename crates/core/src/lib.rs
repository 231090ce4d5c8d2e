// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cb-core: command model and streaming execution pipeline for crossbar.
//!
//! A command definition — arguments, options, a Run function, output type
//! and encoders — executes identically whether dispatched in-process or
//! across the network. This crate holds the pieces every transport shares:
//! the command tree, the resolved request, the emitter/response contract
//! with its in-process and byte-stream implementations, and the executor
//! that wires PreRun → Run → PostRun.

pub mod chan;
pub mod command;
pub mod emitter;
pub mod encoding;
pub mod error;
pub mod executor;
pub mod files;
pub mod option;
pub mod request;
pub mod writer;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use chan::{channel_pair, ChannelEmitter, ChannelResponse};
pub use command::{
    post_run_fn, run_fn, ArgDef, ArgType, Command, CommandTree, Environment, HelpText, PostRunFn,
    PreRunFn, RunFn, RunFuture,
};
pub use emitter::{
    copy, emit_once, ByteSource, ByteStream, EmitterKind, Head, Item, Payload, Response,
    ResponseEmitter, TeeEmitter,
};
pub use encoding::{
    encoder_for, decode_frame, Encoder, EncoderFactory, EncodingType, JsonFrames, OutputType,
};
pub use error::{Error, ErrorKind};
pub use executor::{Executor, LocalExecutor};
pub use files::{FileNode, FileTreeBuilder};
pub use option::{builtin_options, OptDef, OptType, OptValue};
pub use request::{parse_duration, OptMap, Request};
pub use writer::{ReaderResponse, WriterEmitter};

#[cfg(test)]
mod property_tests;
