// Helper configuration.
//
// Sources, lowest precedence first: built-in defaults, the TOML file
// (`~/.noteedit/config.toml` or an explicit path), `NOTEEDIT_*` environment
// variables, then command-line flags applied by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LISTEN_ADDR_ENV: &str = "NOTEEDIT_LISTEN_ADDR";
pub const BACKEND_URL_ENV: &str = "NOTEEDIT_BACKEND_URL";
pub const EDITOR_ENV: &str = "NOTEEDIT_EDITOR";

/// Root directory for noteedit user state: `~/.noteedit/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".noteedit"))
}

/// Path to the default config file: `~/.noteedit/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HelperConfig {
    /// Address the local HTTP API binds to.
    pub listen_addr: String,
    /// Base URL of the content backend.
    pub backend_url: String,
    pub editor: EditorConfig,
    pub watch: WatchConfig,
    pub http: HttpConfig,
    pub workspace: WorkspaceConfig,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5000".into(),
            backend_url: "http://localhost:8080".into(),
            editor: EditorConfig::default(),
            watch: WatchConfig::default(),
            http: HttpConfig::default(),
            workspace: WorkspaceConfig::default(),
        }
    }
}

impl HelperConfig {
    /// Load from `path`, or from the default location when `path` is `None`.
    /// A missing default file yields defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Apply `NOTEEDIT_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(addr) = non_empty(LISTEN_ADDR_ENV) {
            self.listen_addr = addr;
        }
        if let Some(url) = non_empty(BACKEND_URL_ENV) {
            self.backend_url = url;
        }
        if let Some(command) = non_empty(EDITOR_ENV) {
            self.editor.command = command;
            self.editor.args.clear();
        }
        self
    }
}

/// Which program opens a materialized document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    pub enabled: bool,
    pub command: String,
    /// Arguments placed before the document path.
    pub args: Vec<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        let (command, args) = platform_opener();
        Self { enabled: true, command: command.into(), args: args.iter().map(|a| a.to_string()).collect() }
    }
}

#[cfg(target_os = "macos")]
fn platform_opener() -> (&'static str, &'static [&'static str]) {
    ("open", &[])
}

#[cfg(windows)]
fn platform_opener() -> (&'static str, &'static [&'static str]) {
    ("cmd", &["/C", "start", ""])
}

#[cfg(not(any(target_os = "macos", windows)))]
fn platform_opener() -> (&'static str, &'static [&'static str]) {
    ("xdg-open", &[])
}

/// File-name globs deciding which workspace changes count as saves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    pub patterns: Vec<String>,
    /// Editor transient and backup files.
    pub ignore_patterns: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { patterns: vec!["*.md".into()], ignore_patterns: vec!["*.~*".into()] }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Allowed CORS origins; `"*"` allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { cors_origins: vec!["*".into()] }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Parent of the temporary workspace directory (system temp if unset).
    pub parent_dir: Option<PathBuf>,
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error at `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error in `{}`: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
