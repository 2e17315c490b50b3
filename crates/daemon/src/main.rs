// noteeditd: local editing helper entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use noteedit_daemon::config::HelperConfig;
use tracing::info;

#[derive(Parser)]
#[command(name = "noteeditd", about = "Edit remote notes in a local editor")]
struct Cli {
    /// Config file (defaults to ~/.noteedit/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address for the local HTTP API, e.g. 127.0.0.1:5000.
    #[arg(long)]
    listen: Option<String>,

    /// Base URL of the content backend.
    #[arg(long)]
    backend: Option<String>,

    /// Editor command; the document path is appended.
    #[arg(long, conflicts_with = "no_editor")]
    editor: Option<String>,

    /// Materialize documents without starting an editor.
    #[arg(long)]
    no_editor: bool,
}

impl Cli {
    fn apply(self, mut config: HelperConfig) -> HelperConfig {
        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(backend) = self.backend {
            config.backend_url = backend;
        }
        if let Some(editor) = self.editor {
            config.editor.command = editor;
            config.editor.args.clear();
        }
        if self.no_editor {
            config.editor.enabled = false;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = HelperConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?
        .with_env_overrides();
    let config = cli.apply(config);

    info!("starting noteedit helper");
    noteedit_daemon::runtime::run_standalone(config)
        .await
        .context("helper terminated unexpectedly")
}
