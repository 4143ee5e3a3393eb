//! Middleware pipeline: request logging and permissive CORS

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, Method};
use axum::middleware::Next;
use axum::response::Response;
use tower_http::cors::{Any, CorsLayer};
use tracing::debug;

use crate::routes::RouteContext;

/// Permissive CORS for the loopback surface: any origin, the standard
/// method set, Content-Type and Authorization headers.
pub(crate) fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Log every request to tracing and to the diagnostic log stream the UI
/// subscribes to.
pub(crate) async fn log_requests(
    State(ctx): State<Arc<RouteContext>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    debug!("{} {} -> {}", method, path, status);
    ctx.events.emit_log(format!("{method} {path} -> {status}"));

    response
}
