//! HTTP routes served by the embedded server

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Local;
use serde::Serialize;

use loopgate_core::ServerEvents;

use crate::middleware;

/// Shared context available to every handler.
pub(crate) struct RouteContext {
    /// The actually-bound port (resolved after bind, not the configured one)
    pub port: u16,
    pub cert_path: PathBuf,
    pub events: Arc<ServerEvents>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
struct HelloResponse {
    message: &'static str,
    timestamp: String,
}

/// Assemble the route table wrapped in the middleware pipeline:
/// request logging first, then permissive CORS on every response.
pub(crate) fn build_router(ctx: Arc<RouteContext>) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/api/status", get(status_handler))
        .route("/api/hello", get(hello_handler))
        .route("/cert", get(cert_handler))
        .layer(axum::middleware::from_fn_with_state(
            ctx.clone(),
            middleware::log_requests,
        ))
        .layer(middleware::cors_layer())
        .with_state(ctx)
}

async fn home_handler(State(ctx): State<Arc<RouteContext>>) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Local Server</title></head>\n<body>\n\
         <h1>Server is running</h1>\n\
         <p>Listening on port {}</p>\n\
         <p>Started page render at {}</p>\n\
         </body>\n</html>\n",
        ctx.port,
        Local::now().to_rfc3339(),
    ))
}

async fn status_handler() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running",
        timestamp: Local::now().to_rfc3339(),
    })
}

async fn hello_handler() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from Flutter Server!",
        timestamp: Local::now().to_rfc3339(),
    })
}

/// Stream the bundled certificate as a download so the OS browser can
/// trigger its trust-install flow.
async fn cert_handler(State(ctx): State<Arc<RouteContext>>) -> Response {
    match tokio::fs::read(&ctx.cert_path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "application/x-x509-ca-cert"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"localhost.crt\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to read certificate: {e}"),
        )
            .into_response(),
    }
}
