// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Echo server test fixture.
//!
//! Deployed behind every fixture Service; reflects each request's metadata
//! back as JSON so the harness can observe what the Ingress controller
//! actually forwarded. Identity comes from the environment:
//!
//! - `TEST_ID` (falling back to `POD_NAME`) - downstream service tag
//! - `NAMESPACE`, `INGRESS_NAME`, `SERVICE_NAME` - deployment context
//! - `PORT` - listen port, default 3000
//!
//! `/health` answers 200 for readiness probes; every other path echoes.

use anyhow::Result;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use ingress_conformance::capture::{collect_headers, proto_string, CapturedRequest};
use tracing::info;

#[derive(Debug, Clone)]
struct EchoContext {
    test_id: String,
    namespace: String,
    ingress: String,
    service: String,
}

impl EchoContext {
    fn from_env() -> Self {
        let env = |key: &str| std::env::var(key).unwrap_or_default();
        let test_id = std::env::var("TEST_ID").unwrap_or_else(|_| env("POD_NAME"));
        Self {
            test_id,
            namespace: env("NAMESPACE"),
            ingress: env("INGRESS_NAME"),
            service: env("SERVICE_NAME"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let context = EchoContext::from_env();

    let app = Router::new()
        .route("/health", get(health))
        .fallback(echo)
        .with_state(context);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    info!("echo server listening on port {port}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn echo(State(context): State<EchoContext>, request: Request) -> Response {
    info!(
        "echoing back request made to {} from {:?}",
        request.uri(),
        request.headers().get(header::HOST)
    );

    let host = request
        .headers()
        .get(header::HOST)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .or_else(|| request.uri().host().map(str::to_string))
        .unwrap_or_default();

    let reflection = CapturedRequest {
        downstream_service_id: context.test_id.clone(),
        path: request.uri().to_string(),
        host,
        method: request.method().to_string(),
        proto: proto_string(request.version()),
        headers: collect_headers(request.headers()),
        namespace: context.namespace.clone(),
        ingress: context.ingress.clone(),
        service: context.service.clone(),
    };

    (
        StatusCode::OK,
        [(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        )],
        Json(reflection),
    )
        .into_response()
}
