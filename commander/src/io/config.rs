//! Commander configuration stored under `.commander/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = ".commander/config.toml";

/// Commander configuration (TOML).
///
/// Missing fields fall back to defaults, so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommanderConfig {
    /// Upper bound on turns in each step's sub-conversation.
    pub max_turns: u32,

    /// Optional cap on the iteration count requested by the interpreter.
    /// Unset means the requested count runs in full.
    pub max_iterations: Option<u32>,

    pub completion: CompletionConfig,
}

/// How to reach the text-completion service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompletionConfig {
    /// Command that reads a prompt on stdin and prints the reply on stdout.
    pub command: Vec<String>,

    /// Flag used to pass the system message (e.g. `-s`). When unset, the
    /// system message is prepended to stdin.
    pub system_flag: Option<String>,

    /// Wall-clock limit for one completion call.
    pub timeout_secs: u64,

    /// Truncate completion stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            command: vec!["llm".to_string(), "-m".to_string(), "gpt-4o-mini".to_string()],
            system_flag: Some("-s".to_string()),
            timeout_secs: 120,
            output_limit_bytes: 100_000,
        }
    }
}

impl Default for CommanderConfig {
    fn default() -> Self {
        Self {
            max_turns: 2,
            max_iterations: None,
            completion: CompletionConfig::default(),
        }
    }
}

impl CommanderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_turns == 0 {
            return Err(anyhow!("max_turns must be > 0"));
        }
        if self.max_iterations == Some(0) {
            return Err(anyhow!("max_iterations must be > 0"));
        }
        if self.completion.timeout_secs == 0 {
            return Err(anyhow!("completion.timeout_secs must be > 0"));
        }
        if self.completion.output_limit_bytes == 0 {
            return Err(anyhow!("completion.output_limit_bytes must be > 0"));
        }
        if self.completion.command.is_empty() || self.completion.command[0].trim().is_empty() {
            return Err(anyhow!("completion.command must be a non-empty array"));
        }
        if self
            .completion
            .system_flag
            .as_deref()
            .is_some_and(|flag| flag.trim().is_empty())
        {
            return Err(anyhow!("completion.system_flag must not be blank"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `CommanderConfig::default()`.
pub fn load_config(path: &Path) -> Result<CommanderConfig> {
    if !path.exists() {
        let cfg = CommanderConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: CommanderConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &CommanderConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
