// noteedit-daemon library entry point.
//
// Startup order: workspace, then file watcher, then HTTP listener. Shutdown
// runs in reverse (see `runtime`).

pub mod backend;
pub mod config;
pub mod editor;
pub mod http;
pub mod runtime;
pub mod session;
pub mod watcher;
pub mod workspace;
