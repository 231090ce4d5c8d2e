// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Option definitions and typed option values.

use crate::error::Error;

// Flag names shared between the CLI surface and the HTTP query mapping.
pub const ENC_LONG: &str = "encoding";
pub const ENC_SHORT: &str = "enc";
pub const REC_LONG: &str = "recursive";
pub const REC_SHORT: &str = "r";
pub const CHAN_OPT: &str = "stream-channels";
pub const TIMEOUT_OPT: &str = "timeout";
pub const OPT_SHORT_HELP: &str = "h";
pub const OPT_LONG_HELP: &str = "help";
pub const DEREF_LONG: &str = "dereference-args";
pub const STDIN_NAME: &str = "stdin-name";
pub const HIDDEN: &str = "hidden";
pub const HIDDEN_SHORT: &str = "H";
pub const IGNORE: &str = "ignore";
pub const IGNORE_RULES: &str = "ignore-rules-path";

/// Value type an option accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptType {
    Bool,
    Int,
    Uint,
    Float,
    String,
    Strings,
}

impl OptType {
    pub fn as_str(self) -> &'static str {
        match self {
            OptType::Bool => "bool",
            OptType::Int => "int",
            OptType::Uint => "uint",
            OptType::Float => "float",
            OptType::String => "string",
            OptType::Strings => "strings",
        }
    }
}

/// A coerced option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptValue {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Strings(Vec<String>),
}

impl OptValue {
    pub fn type_of(&self) -> OptType {
        match self {
            OptValue::Bool(_) => OptType::Bool,
            OptValue::Int(_) => OptType::Int,
            OptValue::Uint(_) => OptType::Uint,
            OptValue::Float(_) => OptType::Float,
            OptValue::String(_) => OptType::String,
            OptValue::Strings(_) => OptType::Strings,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            OptValue::Strings(v) => Some(v),
            _ => None,
        }
    }

    /// Query-string rendering for the HTTP client.
    pub fn to_query_value(&self) -> String {
        match self {
            OptValue::Bool(b) => b.to_string(),
            OptValue::Int(i) => i.to_string(),
            OptValue::Uint(u) => u.to_string(),
            OptValue::Float(f) => f.to_string(),
            OptValue::String(s) => s.clone(),
            OptValue::Strings(v) => v.join(","),
        }
    }
}

/// Definition of one command option: long name, optional aliases, value
/// type, optional default.
#[derive(Debug, Clone)]
pub struct OptDef {
    pub name: String,
    pub aliases: Vec<String>,
    pub ty: OptType,
    pub default: Option<OptValue>,
    pub description: String,
}

impl OptDef {
    fn new(name: &str, ty: OptType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            ty,
            default: None,
            description: description.to_string(),
        }
    }

    pub fn bool(name: &str, description: &str) -> Self {
        Self::new(name, OptType::Bool, description)
    }

    pub fn int(name: &str, description: &str) -> Self {
        Self::new(name, OptType::Int, description)
    }

    pub fn uint(name: &str, description: &str) -> Self {
        Self::new(name, OptType::Uint, description)
    }

    pub fn float(name: &str, description: &str) -> Self {
        Self::new(name, OptType::Float, description)
    }

    pub fn string(name: &str, description: &str) -> Self {
        Self::new(name, OptType::String, description)
    }

    pub fn strings(name: &str, description: &str) -> Self {
        Self::new(name, OptType::Strings, description)
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn with_default(mut self, value: OptValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Long name followed by aliases.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Coerce a raw string to this option's value type.
    pub fn parse(&self, raw: &str) -> Result<OptValue, Error> {
        parse_opt_value(self.ty, &self.name, raw)
    }
}

/// Coerce a raw string to `ty`; `name` is only used in the error message.
pub fn parse_opt_value(ty: OptType, name: &str, raw: &str) -> Result<OptValue, Error> {
    let fail = || {
        let shown =
            if raw.is_empty() { "empty value".to_string() } else { format!("value {raw:?}") };
        Error::client(format!(
            "could not convert {shown} to type {:?} (for option \"-{name}\")",
            ty.as_str()
        ))
    };
    match ty {
        OptType::Bool => match raw {
            "" | "true" => Ok(OptValue::Bool(true)),
            "false" => Ok(OptValue::Bool(false)),
            _ => Err(fail()),
        },
        OptType::Int => raw.parse().map(OptValue::Int).map_err(|_| fail()),
        OptType::Uint => raw.parse().map(OptValue::Uint).map_err(|_| fail()),
        OptType::Float => raw.parse().map(OptValue::Float).map_err(|_| fail()),
        OptType::String => Ok(OptValue::String(raw.to_string())),
        OptType::Strings => Ok(OptValue::Strings(vec![raw.to_string()])),
    }
}

/// Options every command understands, merged into the root's option set
/// during resolution.
pub fn builtin_options() -> Vec<OptDef> {
    vec![
        OptDef::string(
            ENC_LONG,
            "The encoding type the output should be encoded with (json, xml, or text)",
        )
        .with_alias(ENC_SHORT)
        .with_default(OptValue::String("text".to_string())),
        OptDef::bool(REC_LONG, "Add directory paths recursively").with_alias(REC_SHORT),
        OptDef::bool(CHAN_OPT, "Stream channel output"),
        OptDef::string(TIMEOUT_OPT, "Set a global timeout on the command"),
        OptDef::bool(OPT_LONG_HELP, "Show the full command help text"),
        OptDef::bool(OPT_SHORT_HELP, "Show a short version of the command help text"),
        OptDef::bool(DEREF_LONG, "Symlinks supplied in arguments are dereferenced"),
        OptDef::string(STDIN_NAME, "Assign a name if the file source is stdin"),
        OptDef::bool(HIDDEN, "Include files that are hidden. Only takes effect on recursive add")
            .with_alias(HIDDEN_SHORT),
        OptDef::strings(IGNORE, "A rule (.gitignore-style) defining which file(s) to ignore"),
        OptDef::string(IGNORE_RULES, "A path to a file with .gitignore-style ignore rules"),
    ]
}

#[cfg(test)]
#[path = "option_tests.rs"]
mod tests;
