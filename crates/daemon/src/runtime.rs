// Process lifecycle: acquire workspace → watcher → listener, serve, then
// release in reverse order.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::BackendClient;
use crate::config::HelperConfig;
use crate::editor::EditorLauncher;
use crate::http::{build_router, cors::cors_layer};
use crate::session::SessionManager;
use crate::watcher::{FileWatcher, WatchFilter};
use crate::workspace::Workspace;

/// Resources held for the lifetime of the helper.
///
/// Dropping without `release()` still removes the workspace directory and
/// closes the watcher's dispatch gate (see their `Drop` impls).
struct Lifecycle {
    manager: Arc<SessionManager>,
    watcher: FileWatcher,
    workspace: Arc<Workspace>,
}

impl Lifecycle {
    async fn acquire(config: &HelperConfig) -> Result<Self> {
        let filter =
            WatchFilter::from_config(&config.watch).context("invalid watch configuration")?;
        let backend = BackendClient::new(&config.backend_url).context("invalid backend URL")?;

        let workspace = match &config.workspace.parent_dir {
            Some(parent) => Workspace::open_in(parent),
            None => Workspace::open(),
        }
        .context("failed to allocate workspace directory")?;
        let workspace = Arc::new(workspace);

        let manager = Arc::new(SessionManager::new(
            Arc::clone(&workspace),
            backend,
            EditorLauncher::from_config(&config.editor),
        ));

        let save_manager = Arc::clone(&manager);
        let watcher = FileWatcher::start(workspace.root(), filter, move |path: PathBuf| {
            let manager = Arc::clone(&save_manager);
            async move {
                let outcome = manager.on_save(&path).await;
                debug!(path = %path.display(), ?outcome, "handled save event");
            }
        })
        .context("failed to start file watcher")?;

        Ok(Self { manager, watcher, workspace })
    }

    fn router(&self, config: &HelperConfig) -> axum::Router {
        build_router(Arc::clone(&self.manager), cors_layer(&config.http.cors_origins))
    }

    async fn release(self) {
        self.watcher.stop().await;
        if let Err(error) = self.workspace.close() {
            warn!(error = %error, "failed to remove workspace directory");
        }
        info!("helper resources released");
    }
}

/// Handle to a helper started with [`start`].
pub struct HelperHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
    workspace_root: PathBuf,
}

impl HelperHandle {
    /// Address the HTTP API is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Signal shutdown and wait until the listener, watcher and workspace
    /// have all been released.
    pub async fn wait(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for HelperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start the helper in the background and return once it accepts requests.
pub async fn start(config: HelperConfig) -> Result<HelperHandle> {
    let lifecycle = Lifecycle::acquire(&config).await?;
    let listener = match bind_listener(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            lifecycle.release().await;
            return Err(error);
        }
    };
    let local_addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(error) => {
            lifecycle.release().await;
            return Err(error).context("failed to read listener address");
        }
    };
    let workspace_root = lifecycle.workspace.root().to_path_buf();
    let app = lifecycle.router(&config);

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(4);
    let task = tokio::spawn(async move {
        let signal = async move {
            let _ = shutdown_rx.recv().await;
        };
        if let Err(error) = serve(listener, app, signal).await {
            warn!(?error, "helper server terminated unexpectedly");
        }
        lifecycle.release().await;
    });

    info!(listen_addr = %local_addr, "helper started");
    Ok(HelperHandle { shutdown_tx, task: Some(task), local_addr, workspace_root })
}

/// Run in the foreground until Ctrl+C or SIGTERM, then release everything.
pub async fn run_standalone(config: HelperConfig) -> Result<()> {
    let lifecycle = Lifecycle::acquire(&config).await?;
    let listener = match bind_listener(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            lifecycle.release().await;
            return Err(error);
        }
    };

    info!(
        listen_addr = %config.listen_addr,
        backend_url = %config.backend_url,
        workspace = %lifecycle.workspace.root().display(),
        "standalone helper started"
    );
    let result = serve(listener, lifecycle.router(&config), shutdown_signal()).await;
    lifecycle.release().await;
    result.context("helper server exited with error")
}

async fn bind_listener(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).await.with_context(|| format!("failed to bind HTTP listener on {addr}"))
}

async fn serve(
    listener: TcpListener,
    app: axum::Router,
    signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(listener, app).with_graceful_shutdown(signal).await.context("HTTP server failed")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
