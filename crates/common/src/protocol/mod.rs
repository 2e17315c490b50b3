// Wire formats: the local HTTP API and the remote backend API.

pub mod api;
pub mod backend;
