//! Configuration for terminal sessions

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{DEFAULT_BLINK_INTERVAL, DEFAULT_SCROLLBACK};
use crate::pty::PtyCommand;

/// Shell used when neither the config nor `$SHELL` names one
pub const FALLBACK_SHELL: &str = "/bin/sh";

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Initial width in columns
    pub cols: usize,
    /// Initial height in rows
    pub rows: usize,
    /// Maximum scrollback lines
    pub scrollback_lines: usize,
    /// Program to run; `$SHELL` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    /// Arguments for the shell
    pub shell_args: Vec<String>,
    /// Variables set in the child's environment
    pub env: BTreeMap<String, String>,
    /// Starting directory; `$HOME` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
    /// Interval between polls of the PTY master
    pub poll_interval_ms: u64,
    /// Upper bound on bytes read per poll
    pub read_chunk_size: usize,
    /// Cursor blink half-period
    pub cursor_blink_ms: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        let env = [
            ("TERM", "xterm-256color"),
            ("COLORTERM", "truecolor"),
            ("LANG", "en_US.UTF-8"),
            ("LC_ALL", "en_US.UTF-8"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            cols: 80,
            rows: 24,
            scrollback_lines: DEFAULT_SCROLLBACK,
            shell: None,
            shell_args: vec!["-l".to_string()],
            env,
            working_directory: None,
            poll_interval_ms: 16,
            read_chunk_size: 64 * 1024,
            cursor_blink_ms: DEFAULT_BLINK_INTERVAL.as_millis() as u64,
        }
    }
}

impl TerminalConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: TerminalConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from `~/.config/pier/config.toml`, falling back to defaults
    pub fn load_or_default() -> Self {
        let Some(path) = default_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                Self::default()
            },
        }
    }

    /// Reject settings no session could run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cols == 0 || self.rows == 0 {
            return Err(ConfigError::Invalid(format!(
                "terminal size must be at least 1x1, got {}x{}",
                self.cols, self.rows
            )));
        }
        if self.read_chunk_size == 0 {
            return Err(ConfigError::Invalid("read_chunk_size must be non-zero".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be non-zero".into()));
        }
        Ok(())
    }

    /// The shell to launch
    pub fn resolved_shell(&self) -> String {
        self.shell
            .clone()
            .or_else(|| std::env::var("SHELL").ok().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| FALLBACK_SHELL.to_string())
    }

    /// Command for `program` with this config's environment and directory
    pub fn command_for(&self, program: &str, args: &[String]) -> PtyCommand {
        let mut command = PtyCommand::new(program).args(args.iter().cloned());
        for (key, value) in &self.env {
            command = command.env(key.clone(), value.clone());
        }
        let dir = self
            .working_directory
            .clone()
            .or_else(|| std::env::var_os("HOME").map(PathBuf::from));
        if let Some(dir) = dir {
            command = command.cwd(dir);
        }
        command
    }

    /// Command for the configured shell
    pub fn shell_command(&self) -> PtyCommand {
        self.command_for(&self.resolved_shell(), &self.shell_args)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cursor_blink_interval(&self) -> Duration {
        Duration::from_millis(self.cursor_blink_ms)
    }
}

/// Get the configuration file path
fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("pier")
            .join("config.toml")
    })
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
