// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Help text rendering for commands.

use std::io::Write;
use std::sync::Arc;

use cb_core::{ArgDef, Command, CommandTree, Error};

fn usage_line(binary: &str, path: &[String], cmd: &Command) -> String {
    let mut usage = String::from(binary);
    for segment in path {
        usage.push(' ');
        usage.push_str(segment);
    }
    for arg in &cmd.arguments {
        usage.push(' ');
        usage.push_str(&argument_signature(arg));
    }
    usage
}

fn argument_signature(arg: &ArgDef) -> String {
    let mut sig = format!("<{}>", arg.name);
    if arg.variadic {
        sig.push_str("...");
    }
    if !arg.required {
        sig = format!("[{sig}]");
    }
    sig
}

fn render(
    binary: &str,
    root: &Arc<Command>,
    path: &[String],
    long: bool,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    let cmd = match root.get(path) {
        Ok(cmd) => cmd,
        Err(_) => root.clone(),
    };

    writeln!(w, "USAGE")?;
    writeln!(w, "  {}", usage_line(binary, path, &cmd))?;
    if !cmd.helptext.tagline.is_empty() {
        writeln!(w)?;
        writeln!(w, "  {}", cmd.helptext.tagline)?;
    }

    let description = if long && !cmd.helptext.long_description.is_empty() {
        &cmd.helptext.long_description
    } else {
        &cmd.helptext.short_description
    };
    if !description.is_empty() {
        writeln!(w)?;
        for line in description.lines() {
            writeln!(w, "  {line}")?;
        }
    }

    if !cmd.arguments.is_empty() {
        writeln!(w)?;
        writeln!(w, "ARGUMENTS")?;
        for arg in &cmd.arguments {
            writeln!(w, "  {:<24} {}", argument_signature(arg), arg.description)?;
        }
    }

    if !cmd.options.is_empty() {
        writeln!(w)?;
        writeln!(w, "OPTIONS")?;
        for opt in &cmd.options {
            let names: Vec<String> = opt.names().map(|n| format!("--{n}")).collect();
            writeln!(w, "  {:<24} {}", names.join(", "), opt.description)?;
        }
    }

    if !cmd.subcommands.is_empty() {
        writeln!(w)?;
        writeln!(w, "SUBCOMMANDS")?;
        let mut names: Vec<&String> = cmd.subcommands.keys().collect();
        names.sort();
        for name in names {
            let tagline = cmd
                .subcommands
                .get(name)
                .map(|sub| sub.helptext.tagline.as_str())
                .unwrap_or_default();
            writeln!(w, "  {name:<24} {tagline}")?;
        }
        writeln!(w)?;
        writeln!(w, "Use '{binary} <subcommand> --help' for more information.")?;
    }

    Ok(())
}

/// Compact help: usage, arguments, options, subcommands.
pub fn short_help(
    binary: &str,
    root: &Arc<Command>,
    path: &[String],
    w: &mut dyn Write,
) -> Result<(), Error> {
    render(binary, root, path, false, w)
        .map_err(|e| Error::new(format!("rendering help failed: {e}")))
}

/// Full help: adds the long description when the command has one.
pub fn long_help(
    binary: &str,
    root: &Arc<Command>,
    path: &[String],
    w: &mut dyn Write,
) -> Result<(), Error> {
    render(binary, root, path, true, w)
        .map_err(|e| Error::new(format!("rendering help failed: {e}")))
}

#[cfg(test)]
#[path = "helptext_tests.rs"]
mod tests;
