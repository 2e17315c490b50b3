// Local editing session manager.
//
// Owns the workspace, backend client, editor launcher and session table, and
// exposes the two entry points that mutate them: `open_for_edit` (HTTP) and
// `on_save` (file watcher).

pub mod table;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use noteedit_common::protocol::api::ResultCode;
use noteedit_common::types::Document;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::BackendClient;
use crate::editor::{EditorError, EditorLauncher};
use crate::workspace::{Workspace, WorkspaceError};

pub use table::SessionTable;

/// Live editing state for one remote document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSession {
    /// Identity, title and latest known content.
    pub document: Document,
    /// Absolute path of the materialized file.
    pub local_path: PathBuf,
    /// Last content known to match the backend copy.
    pub synced_content: String,
}

impl DocumentSession {
    pub fn new(document: Document, local_path: PathBuf) -> Self {
        let synced_content = document.content.clone();
        Self { document, local_path, synced_content }
    }
}

/// What handling one save event amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No session is registered for the path.
    Untracked,
    /// The file matches what the backend already has.
    Unchanged,
    Pushed,
    /// The backend call failed; the local file keeps the edit.
    PushFailed,
    /// The file could not be read.
    ReadFailed,
    /// The file is gone; the session was dropped.
    Evicted,
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("document `{0}` could not be fetched")]
    NotFound(String),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Editor(#[from] EditorError),
}

impl EditError {
    pub fn code(&self) -> ResultCode {
        match self {
            Self::NotFound(_) => ResultCode::DocumentNotFound,
            Self::Workspace(_) => ResultCode::WorkspaceWriteFailed,
            Self::Editor(_) => ResultCode::EditorLaunchFailed,
        }
    }
}

pub struct SessionManager {
    workspace: Arc<Workspace>,
    backend: BackendClient,
    editor: EditorLauncher,
    sessions: SessionTable,
}

impl SessionManager {
    pub fn new(workspace: Arc<Workspace>, backend: BackendClient, editor: EditorLauncher) -> Self {
        Self { workspace, backend, editor, sessions: SessionTable::new() }
    }

    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.workspace
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// Fetch document `id`, materialize it, register it and open the editor.
    ///
    /// A failed fetch leaves the table and the workspace untouched. An editor
    /// launch failure is reported, but the session stays registered since the
    /// file can still be opened by hand.
    pub async fn open_for_edit(&self, id: &str) -> Result<DocumentSession, EditError> {
        let document = self
            .backend
            .fetch_document(id)
            .await
            .ok_or_else(|| EditError::NotFound(id.to_string()))?;

        let local_path =
            self.workspace.write_document(&document.id, &document.title, &document.content)?;
        let session = DocumentSession::new(document, local_path.clone());
        if self.sessions.register(session.clone()) {
            debug!(path = %local_path.display(), "replaced existing session");
        }
        info!(
            doc_id = %session.document.id,
            title = %session.document.title,
            path = %local_path.display(),
            "document opened for editing"
        );

        self.editor.launch(&local_path)?;
        Ok(session)
    }

    /// Handle a detected save of `path`: reload the file into its session and
    /// push it to the backend. Failures are logged, never raised.
    pub async fn on_save(&self, path: &Path) -> SaveOutcome {
        let Some(slot) = self.sessions.slot(path) else {
            debug!(path = %path.display(), "save of untracked file");
            return SaveOutcome::Untracked;
        };
        let mut session = slot.lock().await;

        let content = match self.workspace.read_file(path) {
            Ok(content) => content,
            Err(error) if error.is_not_found() => {
                drop(session);
                self.sessions.evict(path, &slot);
                info!(path = %path.display(), "document file removed, session dropped");
                return SaveOutcome::Evicted;
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "failed to reload saved document");
                return SaveOutcome::ReadFailed;
            }
        };

        session.document.content = content;
        if session.document.content == session.synced_content {
            debug!(doc_id = %session.document.id, "saved content already synced");
            return SaveOutcome::Unchanged;
        }

        if self.backend.push_update(&session.document).await {
            session.synced_content = session.document.content.clone();
            info!(
                doc_id = %session.document.id,
                title = %session.document.title,
                bytes = session.document.content.len(),
                "pushed saved document"
            );
            SaveOutcome::Pushed
        } else {
            warn!(
                doc_id = %session.document.id,
                path = %path.display(),
                "remote document left stale after failed update"
            );
            SaveOutcome::PushFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Query, State},
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::fs;
    use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;
    use tokio::net::TcpListener;
    use tokio::sync::Notify;

    #[derive(Clone, Default)]
    struct MockBackend {
        articles: Arc<StdMutex<HashMap<String, Value>>>,
        updates: Arc<StdMutex<Vec<Value>>>,
        update_status: Arc<AtomicU16>,
        hold_updates: Arc<AtomicBool>,
        update_started: Arc<Notify>,
        release_update: Arc<Notify>,
    }

    impl MockBackend {
        fn with_article(self, id: &str, title: &str, content: &str) -> Self {
            self.articles
                .lock()
                .unwrap()
                .insert(id.into(), json!({ "id": id, "title": title, "content": content }));
            self
        }

        fn updates(&self) -> Vec<Value> {
            self.updates.lock().unwrap().clone()
        }
    }

    async fn get_article(
        State(mock): State<MockBackend>,
        Query(params): Query<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        let id = params.get("id").cloned().unwrap_or_default();
        match mock.articles.lock().unwrap().get(&id) {
            Some(article) => (StatusCode::OK, Json(json!({ "data": { "article": article } }))),
            None => (StatusCode::NOT_FOUND, Json(json!({ "message": "not found" }))),
        }
    }

    async fn update_article(State(mock): State<MockBackend>, Json(body): Json<Value>) -> StatusCode {
        mock.updates.lock().unwrap().push(body);
        mock.update_started.notify_one();
        if mock.hold_updates.load(Ordering::SeqCst) {
            mock.release_update.notified().await;
        }
        match mock.update_status.load(Ordering::SeqCst) {
            0 => StatusCode::OK,
            code => StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    async fn spawn_backend(mock: MockBackend) -> String {
        let app = Router::new()
            .route("/api/article/get", get(get_article))
            .route("/api/article/update", post(update_article))
            .with_state(mock);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn manager_for(mock: &MockBackend, parent: &TempDir) -> SessionManager {
        let base = spawn_backend(mock.clone()).await;
        SessionManager::new(
            Arc::new(Workspace::open_in(parent.path()).unwrap()),
            BackendClient::new(&base).unwrap(),
            EditorLauncher::disabled(),
        )
    }

    #[tokio::test]
    async fn test_open_for_edit_registers_session() {
        let parent = TempDir::new().unwrap();
        let mock = MockBackend::default().with_article("42", "Notes", "hello");
        let manager = manager_for(&mock, &parent).await;

        let session = manager.open_for_edit("42").await.unwrap();

        assert_eq!(manager.sessions().len(), 1);
        assert!(session.local_path.is_file());
        assert!(session.local_path.ends_with("42/Notes.md"));
        assert_eq!(fs::read_to_string(&session.local_path).unwrap(), "hello");
        let found = manager.sessions().lookup(&session.local_path).await.unwrap();
        assert_eq!(found.document.content, "hello");
    }

    #[tokio::test]
    async fn test_failed_fetch_touches_nothing() {
        let parent = TempDir::new().unwrap();
        let mock = MockBackend::default();
        let manager = manager_for(&mock, &parent).await;

        let err = manager.open_for_edit("404").await.unwrap_err();

        assert!(matches!(err, EditError::NotFound(ref id) if id == "404"));
        assert_eq!(err.code(), ResultCode::DocumentNotFound);
        assert!(manager.sessions().is_empty());
        assert_eq!(fs::read_dir(manager.workspace().root()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_two_titles_same_id_get_two_sessions() {
        let parent = TempDir::new().unwrap();
        let mock = MockBackend::default().with_article("7", "First", "one");
        let manager = manager_for(&mock, &parent).await;

        let first = manager.open_for_edit("7").await.unwrap();
        mock.articles
            .lock()
            .unwrap()
            .insert("7".into(), json!({ "id": "7", "title": "Second", "content": "two" }));
        let second = manager.open_for_edit("7").await.unwrap();

        assert_ne!(first.local_path, second.local_path);
        assert_eq!(first.local_path.parent(), second.local_path.parent());
        assert_eq!(manager.sessions().len(), 2);
        assert_eq!(fs::read_to_string(&first.local_path).unwrap(), "one");
        assert_eq!(fs::read_to_string(&second.local_path).unwrap(), "two");
    }

    #[tokio::test]
    async fn test_invalid_title_is_workspace_error() {
        let parent = TempDir::new().unwrap();
        let mock = MockBackend::default().with_article("5", "../../escape", "x");
        let manager = manager_for(&mock, &parent).await;

        let err = manager.open_for_edit("5").await.unwrap_err();
        assert_eq!(err.code(), ResultCode::WorkspaceWriteFailed);
        assert!(manager.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_editor_failure_keeps_session() {
        let parent = TempDir::new().unwrap();
        let mock = MockBackend::default().with_article("42", "Notes", "hello");
        let base = spawn_backend(mock.clone()).await;
        let manager = SessionManager::new(
            Arc::new(Workspace::open_in(parent.path()).unwrap()),
            BackendClient::new(&base).unwrap(),
            EditorLauncher::from_config(&crate::config::EditorConfig {
                enabled: true,
                command: "noteedit-definitely-missing-editor".into(),
                args: Vec::new(),
            }),
        );

        let err = manager.open_for_edit("42").await.unwrap_err();
        assert_eq!(err.code(), ResultCode::EditorLaunchFailed);
        assert_eq!(manager.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_save_pushes_current_file_content() {
        let parent = TempDir::new().unwrap();
        let mock = MockBackend::default().with_article("42", "Notes", "hello");
        let manager = manager_for(&mock, &parent).await;
        let session = manager.open_for_edit("42").await.unwrap();

        fs::write(&session.local_path, "hello world").unwrap();
        let outcome = manager.on_save(&session.local_path).await;

        assert_eq!(outcome, SaveOutcome::Pushed);
        assert_eq!(mock.updates(), vec![json!({ "id": "42", "content": "hello world" })]);
        let stored = manager.sessions().lookup(&session.local_path).await.unwrap();
        assert_eq!(stored.document.content, "hello world");
        assert_eq!(stored.synced_content, "hello world");
    }

    #[tokio::test]
    async fn test_repeated_event_for_same_content_is_not_pushed() {
        let parent = TempDir::new().unwrap();
        let mock = MockBackend::default().with_article("42", "Notes", "hello");
        let manager = manager_for(&mock, &parent).await;
        let session = manager.open_for_edit("42").await.unwrap();

        assert_eq!(manager.on_save(&session.local_path).await, SaveOutcome::Unchanged);
        fs::write(&session.local_path, "v2").unwrap();
        assert_eq!(manager.on_save(&session.local_path).await, SaveOutcome::Pushed);
        assert_eq!(manager.on_save(&session.local_path).await, SaveOutcome::Unchanged);
        assert_eq!(mock.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_push_failure_is_reported_and_next_save_retries() {
        let parent = TempDir::new().unwrap();
        let mock = MockBackend::default().with_article("42", "Notes", "hello");
        let manager = manager_for(&mock, &parent).await;
        let session = manager.open_for_edit("42").await.unwrap();

        mock.update_status.store(500, Ordering::SeqCst);
        fs::write(&session.local_path, "edited").unwrap();
        assert_eq!(manager.on_save(&session.local_path).await, SaveOutcome::PushFailed);
        assert_eq!(fs::read_to_string(&session.local_path).unwrap(), "edited");

        mock.update_status.store(0, Ordering::SeqCst);
        assert_eq!(manager.on_save(&session.local_path).await, SaveOutcome::Pushed);
        assert_eq!(mock.updates().len(), 2);
    }

    #[tokio::test]
    async fn test_untracked_path() {
        let parent = TempDir::new().unwrap();
        let mock = MockBackend::default();
        let manager = manager_for(&mock, &parent).await;
        let stray = manager.workspace().root().join("stray.md");
        fs::write(&stray, "x").unwrap();

        assert_eq!(manager.on_save(&stray).await, SaveOutcome::Untracked);
        assert!(mock.updates().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_file_evicts_session() {
        let parent = TempDir::new().unwrap();
        let mock = MockBackend::default().with_article("42", "Notes", "hello");
        let manager = manager_for(&mock, &parent).await;
        let session = manager.open_for_edit("42").await.unwrap();

        fs::remove_file(&session.local_path).unwrap();
        assert_eq!(manager.on_save(&session.local_path).await, SaveOutcome::Evicted);
        assert!(manager.sessions().is_empty());
        assert!(mock.updates().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_on_different_paths() {
        let parent = TempDir::new().unwrap();
        let mut mock = MockBackend::default();
        for i in 0..8 {
            mock = mock.with_article(&i.to_string(), "Doc", "initial");
        }
        let manager = Arc::new(manager_for(&mock, &parent).await);

        let mut paths = Vec::new();
        for i in 0..8 {
            paths.push(manager.open_for_edit(&i.to_string()).await.unwrap().local_path);
        }

        let mut tasks = Vec::new();
        for (i, path) in paths.into_iter().enumerate() {
            let manager = Arc::clone(&manager);
            tasks.push(tokio::spawn(async move {
                fs::write(&path, format!("edit {i}")).unwrap();
                manager.on_save(&path).await
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap(), SaveOutcome::Pushed);
        }

        let mut contents: Vec<String> = mock
            .updates()
            .iter()
            .map(|u| u["content"].as_str().unwrap().to_string())
            .collect();
        contents.sort();
        assert_eq!(contents, (0..8).map(|i| format!("edit {i}")).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_saves_of_one_path_push_in_arrival_order() {
        let parent = TempDir::new().unwrap();
        let mock = MockBackend::default().with_article("42", "Notes", "v1");
        let manager = Arc::new(manager_for(&mock, &parent).await);
        let path = manager.open_for_edit("42").await.unwrap().local_path;

        mock.hold_updates.store(true, Ordering::SeqCst);
        fs::write(&path, "v2").unwrap();
        let first = tokio::spawn({
            let (manager, path) = (Arc::clone(&manager), path.clone());
            async move { manager.on_save(&path).await }
        });
        mock.update_started.notified().await;

        // Second save lands while the first push is still in flight.
        fs::write(&path, "v3").unwrap();
        let second = tokio::spawn({
            let (manager, path) = (Arc::clone(&manager), path.clone());
            async move { manager.on_save(&path).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(!second.is_finished());
        assert_eq!(mock.updates().len(), 1);

        mock.hold_updates.store(false, Ordering::SeqCst);
        mock.release_update.notify_one();
        assert_eq!(first.await.unwrap(), SaveOutcome::Pushed);
        assert_eq!(second.await.unwrap(), SaveOutcome::Pushed);

        let contents: Vec<Value> = mock.updates().iter().map(|u| u["content"].clone()).collect();
        assert_eq!(contents, vec![json!("v2"), json!("v3")]);
        let stored = manager.sessions().lookup(&path).await.unwrap();
        assert_eq!(stored.synced_content, "v3");
    }
}
