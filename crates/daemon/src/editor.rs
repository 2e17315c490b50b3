// Editor launcher: start the configured editor on a document, detached.
//
// The child is never awaited or monitored. Its lifetime belongs to the user;
// tokio reaps it in the background once it exits.

use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::EditorConfig;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("no editor command configured")]
    MissingCommand,

    #[error("failed to start editor `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct EditorLauncher {
    enabled: bool,
    command: String,
    args: Vec<String>,
}

impl EditorLauncher {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self { enabled: config.enabled, command: config.command.clone(), args: config.args.clone() }
    }

    /// A launcher that never starts anything.
    pub fn disabled() -> Self {
        Self { enabled: false, command: String::new(), args: Vec::new() }
    }

    /// Start the editor with `path` as its last argument and return at once.
    pub fn launch(&self, path: &Path) -> Result<(), EditorError> {
        if !self.enabled {
            debug!(path = %path.display(), "editor launch disabled");
            return Ok(());
        }
        if self.command.trim().is_empty() {
            return Err(EditorError::MissingCommand);
        }

        let child = Command::new(&self.command)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EditorError::Spawn { command: self.command.clone(), source })?;

        info!(command = %self.command, pid = ?child.id(), path = %path.display(), "launched editor");
        Ok(())
    }
}
