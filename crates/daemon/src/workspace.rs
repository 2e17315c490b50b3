// Process-scoped scratch directory holding materialized documents.
//
// Layout: `<root>/<document id>/<title>.md`. The whole tree is removed on
// `close()` or when the workspace is dropped.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;

use noteedit_common::path::{validate_component, ComponentError};
use noteedit_common::types::DocumentId;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

/// Extension given to every materialized document.
pub const DOCUMENT_EXTENSION: &str = "md";

const TEMP_DIR_PREFIX: &str = "noteedit-";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to allocate workspace directory: {0}")]
    Allocate(#[source] std::io::Error),

    #[error("invalid document {field} `{value}`: {source}")]
    InvalidName {
        field: &'static str,
        value: String,
        #[source]
        source: ComponentError,
    },

    #[error("failed to write `{}`: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read `{}`: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove workspace directory: {0}")]
    Remove(#[source] std::io::Error),

    #[error("workspace is closed")]
    Closed,
}

impl WorkspaceError {
    /// True when a read failed because the file no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Owner of the temporary directory tree.
///
/// Files inside are written by the edit request path and read back by the
/// watcher path; the workspace itself does not interpret their content.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    dir: StdMutex<Option<TempDir>>,
}

impl Workspace {
    /// Allocate a fresh directory under the system temp location.
    pub fn open() -> Result<Self, WorkspaceError> {
        let dir = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir()
            .map_err(WorkspaceError::Allocate)?;
        Self::from_temp_dir(dir)
    }

    /// Allocate a fresh directory under `parent`.
    pub fn open_in(parent: &Path) -> Result<Self, WorkspaceError> {
        let dir = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir_in(parent)
            .map_err(WorkspaceError::Allocate)?;
        Self::from_temp_dir(dir)
    }

    fn from_temp_dir(dir: TempDir) -> Result<Self, WorkspaceError> {
        // Watcher events carry resolved paths (e.g. /private/var on macOS),
        // so table keys must be built from the canonical root.
        let root = dir.path().canonicalize().map_err(WorkspaceError::Allocate)?;
        info!(path = %root.display(), "opened workspace directory");
        Ok(Self { root, dir: StdMutex::new(Some(dir)) })
    }

    /// Canonical root of the workspace tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_open(&self) -> bool {
        self.dir.lock().expect("workspace lock poisoned").is_some()
    }

    /// Write `content` to `<root>/<id>/<title>.md` and return its absolute path.
    ///
    /// The id directory is created if missing. An existing file with the same
    /// title under the same id is overwritten.
    pub fn write_document(
        &self,
        id: &DocumentId,
        title: &str,
        content: &str,
    ) -> Result<PathBuf, WorkspaceError> {
        if !self.is_open() {
            return Err(WorkspaceError::Closed);
        }

        let id_component = validate_component(id.as_str()).map_err(|source| {
            WorkspaceError::InvalidName { field: "id", value: id.to_string(), source }
        })?;
        let title_component = validate_component(title).map_err(|source| {
            WorkspaceError::InvalidName { field: "title", value: title.to_string(), source }
        })?;

        let dir_path = self.root.join(id_component);
        fs::create_dir_all(&dir_path)
            .map_err(|source| WorkspaceError::Write { path: dir_path.clone(), source })?;

        let file_path = dir_path.join(format!("{title_component}.{DOCUMENT_EXTENSION}"));
        fs::write(&file_path, content.as_bytes())
            .map_err(|source| WorkspaceError::Write { path: file_path.clone(), source })?;

        debug!(doc_id = %id, path = %file_path.display(), bytes = content.len(), "wrote document");
        Ok(file_path)
    }

    /// Current on-disk content of `path`, decoded as UTF-8.
    pub fn read_file(&self, path: &Path) -> Result<String, WorkspaceError> {
        fs::read_to_string(path)
            .map_err(|source| WorkspaceError::Read { path: path.to_path_buf(), source })
    }

    /// Remove the whole tree. Calling it again is a no-op.
    pub fn close(&self) -> Result<(), WorkspaceError> {
        let dir = self.dir.lock().expect("workspace lock poisoned").take();
        match dir {
            Some(dir) => {
                dir.close().map_err(WorkspaceError::Remove)?;
                info!(path = %self.root.display(), "removed workspace directory");
                Ok(())
            }
            None => Ok(()),
        }
    }
}
