use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{expand_command_abbrev, known_command_names};
use crate::config::Config;

/// Global flags that consume the following argument as their value.
const VALUE_FLAGS: [&str; 3] = ["--rc", "--config", "--data"];

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

/// Parses `key=value` (as given to `--rc`) into a trimmed pair.
fn parse_override(s: &str) -> anyhow::Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "todo",
    version,
    about = "BrightTodo: a small persistent task list",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Override one setting, e.g. `--rc color=off`.
    #[arg(long = "rc", value_parser = parse_override, action = ArgAction::Append)]
    pub rc_overrides: Vec<(String, String)>,

    /// Path to an rc file (defaults to $BRIGHTTODORC or ~/.brighttodorc).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Directory holding storage.json (overrides data.location).
    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

fn default_log_level(verbose: u8, quiet: u8) -> &'static str {
    match (quiet, verbose) {
        (2.., _) => "error",
        (1, _) | (0, 0) => "warn",
        (0, 1) => "info",
        (0, 2) => "debug",
        (0, _) => "trace",
    }
}

/// Logs go to stderr so they never mix with the task table on stdout.
pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_log_level(verbose, quiet)))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Splits `rc.key=value` / `rc.key:value` into an override pair.
fn positional_override(arg: &str) -> Option<(String, String)> {
    let rest = arg.strip_prefix("rc.")?;
    let (key, value) = rest.split_once('=').or_else(|| rest.split_once(':'))?;
    Some((format!("rc.{key}"), value.to_string()))
}

/// Pulls positional `rc.key=value` overrides out of the raw arguments before
/// clap sees them. Only arguments ahead of the command word count; anything
/// after it is command text and passes through untouched.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter();
    cleaned.extend(iter.next().cloned());

    let mut expects_value = false;
    while let Some(arg) = iter.next() {
        let text = arg.to_string_lossy();

        if expects_value {
            expects_value = false;
        } else if let Some((key, value)) = positional_override(&text) {
            debug!(key = %key, value = %value, "captured positional rc override");
            overrides.push((key, value));
            continue;
        } else if VALUE_FLAGS.contains(&&*text) {
            expects_value = true;
        } else if !text.starts_with('-') {
            cleaned.push(arg.clone());
            cleaned.extend(iter.by_ref().cloned());
            break;
        }

        cleaned.push(arg.clone());
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

/// A command word (already expanded from any abbreviation) and its
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub command_args: Vec<String>,
    /// Text after the command word exactly as typed in the shell.
    line_tail: Option<String>,
}

impl Invocation {
    #[tracing::instrument(skip(cfg, rest))]
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> anyhow::Result<Self> {
        let tokens: Vec<String> = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();

        if tokens.is_empty() {
            let cmd = cfg
                .get("default.command")
                .unwrap_or_else(|| "list".to_string());
            debug!(command = %cmd, "no explicit command, using default");
            return Self::from_tokens(&[cmd]);
        }

        Self::from_tokens(&tokens)
    }

    /// Parses one shell line. Returns `None` for blank input.
    pub fn from_line(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        let Some(first) = tokens.first() else {
            return Ok(None);
        };

        let tail = line[first.len()..].trim_start().to_string();
        let mut inv = Self::from_tokens(&tokens)?;
        inv.line_tail = Some(tail);
        Ok(Some(inv))
    }

    pub fn from_tokens(tokens: &[String]) -> anyhow::Result<Self> {
        let (first, rest) = tokens
            .split_first()
            .ok_or_else(|| anyhow!("missing command"))?;

        let known = known_command_names();
        let command = expand_command_abbrev(first, &known)
            .ok_or_else(|| anyhow!("unknown command: {first} (try 'help')"))?;

        debug!(token = %first, expanded = %command, "resolved command token");
        Ok(Self {
            command: command.to_string(),
            command_args: rest.to_vec(),
            line_tail: None,
        })
    }

    /// Free text following the first `skip` arguments. Shell input keeps
    /// its interior whitespace; argv arguments are joined with one space.
    pub fn text_after(&self, skip: usize) -> String {
        match &self.line_tail {
            Some(tail) => {
                let mut rest = tail.as_str();
                for _ in 0..skip {
                    rest = rest.trim_start();
                    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                    rest = &rest[end..];
                }
                rest.trim().to_string()
            }
            None => self
                .command_args
                .get(skip..)
                .unwrap_or_default()
                .join(" "),
        }
    }
}
