//! Command resolution
//!
//! Turns a contact's `extra` bag into a concrete invocation: command, args,
//! working directory, environment, timeout, stdin mode and output parse mode.
//! Keys present in `extra` win over the per-kind defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CliError;

/// Placeholder replaced by the prompt text in every argument
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// Timeout applied when `timeoutMs` is absent or unusable
pub const DEFAULT_TIMEOUT_MS: u64 = 180_000;

/// How process output is turned into an answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    #[default]
    Text,
    Json,
}

impl FromStr for ParseMode {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ParseMode::Text),
            "json" => Ok(ParseMode::Json),
            other => Err(CliError::InvalidConfig(format!(
                "parse must be 'text' or 'json', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseMode::Text => f.write_str("text"),
            ParseMode::Json => f.write_str("json"),
        }
    }
}

/// Per-kind fallbacks used when `extra` leaves a key out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandDefaults {
    pub command: Option<String>,
    pub args: Vec<String>,
    pub parse: ParseMode,
    pub stdin: bool,
}

impl CommandDefaults {
    pub fn new(command: impl Into<String>, args: &[&str], parse: ParseMode) -> Self {
        Self {
            command: Some(command.into()),
            args: args.iter().map(|a| a.to_string()).collect(),
            parse,
            stdin: false,
        }
    }

    /// No default command; `extra.command` becomes mandatory
    pub fn without_command(parse: ParseMode) -> Self {
        Self {
            command: None,
            args: Vec::new(),
            parse,
            stdin: false,
        }
    }
}

/// A fully resolved invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub timeout: Duration,
    pub stdin: bool,
    pub parse: ParseMode,
}

impl CommandSpec {
    /// Minimal spec with default timeout, text parsing and no stdin
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            cwd: None,
            env: BTreeMap::new(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            stdin: false,
            parse: ParseMode::Text,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_stdin(mut self, stdin: bool) -> Self {
        self.stdin = stdin;
        self
    }

    pub fn with_parse(mut self, parse: ParseMode) -> Self {
        self.parse = parse;
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Resolve `extra` against `defaults`
    pub fn resolve(extra: &Map<String, Value>, defaults: &CommandDefaults) -> Result<Self, CliError> {
        let command = extra
            .get("command")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .or_else(|| defaults.command.clone())
            .ok_or(CliError::MissingCommand)?;

        let args = match extra.get("args") {
            Some(value) => string_list(value)?,
            None => defaults.args.clone(),
        };

        let cwd = extra
            .get("cwd")
            .and_then(Value::as_str)
            .filter(|c| !c.trim().is_empty())
            .map(PathBuf::from);

        let env = match extra.get("env") {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| scalar_to_string(v).map(|v| (k.clone(), v)))
                .collect(),
            Some(Value::Null) | None => BTreeMap::new(),
            Some(_) => {
                return Err(CliError::InvalidConfig("env must be an object".to_string()));
            }
        };

        let stdin = extra
            .get("stdin")
            .and_then(flag)
            .unwrap_or(defaults.stdin);

        let parse = match extra.get("parse").and_then(Value::as_str) {
            Some(raw) => raw.parse()?,
            None => defaults.parse,
        };

        Ok(Self {
            command,
            args,
            cwd,
            env,
            timeout: timeout_from_value(extra.get("timeoutMs")),
            stdin,
            parse,
        })
    }

    /// Arguments with `{prompt}` substituted
    ///
    /// Without any placeholder the prompt is appended as a trailing argument,
    /// unless it travels over stdin.
    pub fn argv_with_prompt(&self, prompt: &str) -> Vec<String> {
        let has_placeholder = self.args.iter().any(|a| a.contains(PROMPT_PLACEHOLDER));

        let mut argv: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(PROMPT_PLACEHOLDER, prompt))
            .collect();

        if !has_placeholder && !self.stdin {
            argv.push(prompt.to_string());
        }
        argv
    }

    /// Timeout in whole milliseconds
    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// `timeoutMs` floored to a positive integer, else the default
pub fn timeout_from_value(value: Option<&Value>) -> Duration {
    let millis = value
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|ms| ms.is_finite())
        .map(f64::floor)
        .filter(|ms| *ms >= 1.0)
        .map(|ms| ms as u64)
        .unwrap_or(DEFAULT_TIMEOUT_MS);

    Duration::from_millis(millis)
}

fn string_list(value: &Value) -> Result<Vec<String>, CliError> {
    match value {
        Value::Array(items) => Ok(items.iter().filter_map(scalar_to_string).collect()),
        Value::String(s) => Ok(s.split_whitespace().map(str::to_string).collect()),
        Value::Null => Ok(Vec::new()),
        _ => Err(CliError::InvalidConfig(
            "args must be an array of strings".to_string(),
        )),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}
