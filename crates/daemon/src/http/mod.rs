// Local HTTP API: `/ping` and `/edit/{id}`.

pub mod cors;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header::HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use noteedit_common::protocol::api::{ApiResult, ResultCode};
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::session::{EditError, SessionManager};

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn build_router(manager: Arc<SessionManager>, cors: CorsLayer) -> Router {
    apply_middleware(
        Router::new()
            .route("/ping", get(ping))
            .route("/edit/{id}", get(edit))
            .with_state(manager),
    )
    .layer(cors)
}

fn apply_middleware(router: Router) -> Router {
    router
        .layer(middleware::from_fn(log_request))
        .layer(middleware::from_fn(catch_panic))
}

async fn ping() -> Json<&'static str> {
    Json("pong")
}

async fn edit(
    State(manager): State<Arc<SessionManager>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResult>, EditError> {
    manager.open_for_edit(&id).await?;
    Ok(Json(ApiResult::ok()))
}

fn status_for(code: ResultCode) -> StatusCode {
    match code {
        ResultCode::Ok => StatusCode::OK,
        ResultCode::DocumentNotFound => StatusCode::NOT_FOUND,
        ResultCode::WorkspaceWriteFailed | ResultCode::EditorLaunchFailed => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for EditError {
    fn into_response(self) -> Response {
        let code = self.code();
        match &self {
            EditError::NotFound(_) => warn!(error = %self, "edit request failed"),
            _ => error!(error = %self, "edit request failed"),
        }
        (status_for(code), Json(ApiResult::from_code(code))).into_response()
    }
}

/// Runs the handler on its own task; a panic there becomes a 500.
async fn catch_panic(request: Request<Body>, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    match tokio::spawn(next.run(request)).await {
        Ok(response) => response,
        Err(join_error) => {
            error!(path = %path, ?join_error, "request handler panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Tags each request with an id (taken from `x-request-id` when the page
/// sends one), echoes it back and logs the outcome once the response is
/// ready. Edit requests also log the document id.
async fn log_request(request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let doc_id = request.uri().path().strip_prefix("/edit/").map(ToOwned::to_owned);
    let started_at = Instant::now();

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let status = response.status().as_u16();
    let elapsed_ms = started_at.elapsed().as_millis() as u64;
    match doc_id {
        Some(doc_id) => {
            info!(request_id = %request_id, doc_id = %doc_id, status, elapsed_ms, "edit request served")
        }
        None => debug!(request_id = %request_id, status, elapsed_ms, "request served"),
    }
    response
}
