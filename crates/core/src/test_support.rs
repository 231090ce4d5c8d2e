// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command fixtures and stream helpers shared across crate tests.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::command::{ArgDef, Command, Environment, HelpText, RunFuture};
use crate::emitter::{ByteSource, EmitterKind, Item, Payload, Response, ResponseEmitter};
use crate::encoding::{EncodingType, OutputType, TextEncoder};
use crate::error::Error;
use crate::request::{OptMap, Request};

/// Output of the `echo` fixture; field names match the wire casing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EchoPayload {
    pub foo: String,
    pub bar: String,
    pub baz: u32,
}

impl EchoPayload {
    pub fn fixture() -> Self {
        Self { foo: "beep".to_string(), bar: "boop".to_string(), baz: 1337 }
    }
}

fn add_run<'a>(
    req: &'a Request,
    re: &'a mut dyn ResponseEmitter,
    _env: &'a Environment,
) -> RunFuture<'a> {
    Box::pin(async move {
        let mut sum: i64 = 0;
        let total = req.arguments.len();
        for (i, raw) in req.arguments.iter().enumerate() {
            let n: i64 = raw
                .parse()
                .map_err(|_| Error::new(format!("invalid integer: {raw:?}")))?;
            sum += n;
            let line = format!("intermediate result: {sum}; {} left", total - i - 1);
            re.emit(Payload::value(&line)?).await?;
        }
        re.emit(Payload::value(&format!("total: {sum}"))?).await?;
        Ok(())
    })
}

fn echo_run<'a>(
    _req: &'a Request,
    re: &'a mut dyn ResponseEmitter,
    _env: &'a Environment,
) -> RunFuture<'a> {
    Box::pin(async move { re.emit(Payload::single(&EchoPayload::fixture())?).await })
}

fn error_run<'a>(
    _req: &'a Request,
    _re: &'a mut dyn ResponseEmitter,
    _env: &'a Environment,
) -> RunFuture<'a> {
    Box::pin(async move { Err(Error::new("an error occurred")) })
}

fn client_error_run<'a>(
    _req: &'a Request,
    _re: &'a mut dyn ResponseEmitter,
    _env: &'a Environment,
) -> RunFuture<'a> {
    Box::pin(async move { Err(Error::client("bad request")) })
}

fn late_error_run<'a>(
    _req: &'a Request,
    re: &'a mut dyn ResponseEmitter,
    _env: &'a Environment,
) -> RunFuture<'a> {
    Box::pin(async move {
        re.emit(Payload::value(&"some value")?).await?;
        Err(Error::new("an error occurred"))
    })
}

fn single_run<'a>(
    _req: &'a Request,
    re: &'a mut dyn ResponseEmitter,
    _env: &'a Environment,
) -> RunFuture<'a> {
    Box::pin(async move { re.emit(Payload::single(&"some value")?).await })
}

fn reader_run<'a>(
    _req: &'a Request,
    re: &'a mut dyn ResponseEmitter,
    _env: &'a Environment,
) -> RunFuture<'a> {
    Box::pin(async move {
        let bytes = b"the reader call returns a reader.".to_vec();
        re.emit(Payload::Stream(ByteSource::from_bytes(bytes))).await
    })
}

fn cat_run<'a>(
    req: &'a Request,
    re: &'a mut dyn ResponseEmitter,
    _env: &'a Environment,
) -> RunFuture<'a> {
    Box::pin(async move {
        let Some(files) = &req.files else {
            return Err(Error::client("no files provided"));
        };
        for (path, content) in files.entries() {
            if let Some(bytes) = content {
                let text = String::from_utf8_lossy(bytes).into_owned();
                re.emit(Payload::value(&format!("{path}: {text}"))?).await?;
            }
        }
        Ok(())
    })
}

fn text_encoders() -> HashMap<EncodingType, crate::encoding::EncoderFactory> {
    let mut encoders: HashMap<EncodingType, crate::encoding::EncoderFactory> = HashMap::new();
    encoders.insert(
        EncodingType::Text,
        Arc::new(|_req: &Request| {
            Box::new(TextEncoder { newline: true }) as Box<dyn crate::encoding::Encoder>
        }),
    );
    encoders
}

/// The `add` command: sums its integer arguments, streaming intermediate
/// results.
pub fn add_command() -> Command {
    Command {
        helptext: HelpText::new("Add a list of integers"),
        arguments: vec![ArgDef::string(
            "summands",
            true,
            true,
            "values that are supposed to be summed",
        )],
        encoders: text_encoders(),
        output: Some(OutputType::of::<String>()),
        run: Some(Arc::new(add_run)),
        ..Default::default()
    }
}

/// A root with the full set of fixture commands the pipeline tests use.
pub fn test_root() -> Arc<Command> {
    let mut subcommands: HashMap<String, Arc<Command>> = HashMap::new();
    subcommands.insert("add".to_string(), Arc::new(add_command()));
    subcommands.insert(
        "echo".to_string(),
        Arc::new(Command {
            helptext: HelpText::new("Echo a fixed struct"),
            output: Some(OutputType::of::<EchoPayload>()),
            run: Some(Arc::new(echo_run)),
            ..Default::default()
        }),
    );
    subcommands.insert(
        "error".to_string(),
        Arc::new(Command { run: Some(Arc::new(error_run)), ..Default::default() }),
    );
    subcommands.insert(
        "clienterror".to_string(),
        Arc::new(Command { run: Some(Arc::new(client_error_run)), ..Default::default() }),
    );
    subcommands.insert(
        "lateerror".to_string(),
        Arc::new(Command { run: Some(Arc::new(late_error_run)), ..Default::default() }),
    );
    subcommands.insert(
        "single".to_string(),
        Arc::new(Command { run: Some(Arc::new(single_run)), ..Default::default() }),
    );
    subcommands.insert(
        "reader".to_string(),
        Arc::new(Command { run: Some(Arc::new(reader_run)), ..Default::default() }),
    );
    subcommands.insert(
        "noremote".to_string(),
        Arc::new(Command {
            no_remote: true,
            run: Some(Arc::new(single_run)),
            ..Default::default()
        }),
    );
    subcommands.insert(
        "cat".to_string(),
        Arc::new(Command {
            helptext: HelpText::new("Print uploaded files"),
            arguments: vec![ArgDef::file("files", true, true, "files to print")],
            output: Some(OutputType::of::<String>()),
            run: Some(Arc::new(cat_run)),
            ..Default::default()
        }),
    );
    subcommands.insert(
        "parent".to_string(),
        Arc::new(Command {
            helptext: HelpText::new("Has no run of its own"),
            subcommands: {
                let mut sub = HashMap::new();
                sub.insert("leaf".to_string(), Arc::new(add_command()));
                sub
            },
            ..Default::default()
        }),
    );
    Arc::new(Command {
        helptext: HelpText::new("Fixture command tree"),
        subcommands,
        ..Default::default()
    })
}

fn double_run<'a>(
    _req: &'a Request,
    re: &'a mut dyn ResponseEmitter,
    _env: &'a Environment,
) -> RunFuture<'a> {
    Box::pin(async move {
        re.set_length(3);
        re.emit(Payload::value(&7i64)?).await?;
        Ok(())
    })
}

fn double_post<'a>(
    res: &'a mut dyn Response,
    re: &'a mut dyn ResponseEmitter,
) -> RunFuture<'a> {
    Box::pin(async move {
        let length = res.length().await;
        re.set_length(length + 1);
        loop {
            match res.next().await {
                Ok(Some(Item::Value(v))) => {
                    let n = v.as_i64().unwrap_or_default();
                    re.emit(Payload::value(&(2 * n))?).await?;
                }
                Ok(Some(Item::Bytes(source))) => re.emit(Payload::Stream(source)).await?,
                Ok(None) => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    })
}

/// A root whose `double` command installs a PostRun transformer for `kind`:
/// the length hint grows by one and every value is doubled.
pub fn doubling_root(kind: EmitterKind) -> Arc<Command> {
    let mut post_run: HashMap<EmitterKind, crate::command::PostRunFn> = HashMap::new();
    post_run.insert(kind, Arc::new(double_post));
    let mut subcommands = HashMap::new();
    subcommands.insert(
        "double".to_string(),
        Arc::new(Command { run: Some(Arc::new(double_run)), post_run, ..Default::default() }),
    );
    Arc::new(Command { subcommands, ..Default::default() })
}

/// Build a request against a fixture tree with no options or files.
pub fn request_for(root: &Arc<Command>, path: &[&str], args: &[&str]) -> Arc<Request> {
    Request::new(
        root.clone(),
        path.iter().map(|s| s.to_string()).collect(),
        OptMap::new(),
        args.iter().map(|s| s.to_string()).collect(),
        None,
        CancellationToken::new(),
    )
    .expect("fixture request")
}

/// Drain a response into its values and terminal error. Byte streams are
/// collected into strings.
pub async fn collect(res: &mut dyn Response) -> (Vec<Value>, Option<Error>) {
    let mut values = Vec::new();
    loop {
        match res.next().await {
            Ok(Some(Item::Value(v))) => values.push(v),
            Ok(Some(Item::Bytes(mut source))) => {
                let bytes = source.read_to_end().await.unwrap_or_default();
                values.push(Value::String(String::from_utf8_lossy(&bytes).into_owned()));
            }
            Ok(None) => return (values, None),
            Err(err) => return (values, Some(err)),
        }
    }
}

/// An environment carrying nothing.
pub fn null_env() -> Environment {
    Arc::new(())
}

/// Cloneable in-memory writer for capturing terminal output in tests.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<parking_lot::Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
