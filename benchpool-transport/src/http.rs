//! HTTP intake: `/run` (alias `/benchmark`) and `/fmt`

use crate::dispatcher::{Dispatcher, SubmitOutcome};
use crate::error::DispatchError;
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct HttpState {
    dispatcher: Arc<Dispatcher>,
}

impl HttpState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            hash: None,
            code: None,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::ok(message)
        }
    }

    fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

type Reply = (StatusCode, Json<ApiResponse>);

pub fn create_router(state: HttpState) -> Router {
    Router::new()
        .route("/run", post(handle_run))
        .route("/benchmark", post(handle_run))
        .route("/fmt", post(handle_fmt))
        .layer(middleware::from_fn(log_and_cors))
        .with_state(state)
}

pub async fn start_server(listener: tokio::net::TcpListener, state: HttpState) -> Result<()> {
    let app = create_router(state);

    let bind_addr = listener
        .local_addr()
        .context("Failed to obtain HTTP server bind address")?;
    info!("Starting HTTP server on {}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("HTTP server error")?;

    Ok(())
}

fn bad_body(rejection: JsonRejection) -> Reply {
    warn!("Rejected request body: {}", rejection.body_text());
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::failure(rejection.body_text())),
    )
}

async fn handle_run(
    State(state): State<HttpState>,
    body: Result<Json<CodeRequest>, JsonRejection>,
) -> Reply {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };

    match state.dispatcher.submit(&request.code).await {
        Ok(SubmitOutcome::Cached(text)) => (StatusCode::OK, Json(ApiResponse::ok(text))),
        Ok(SubmitOutcome::Submitted(hash)) => {
            let mut response = ApiResponse::ok("submitted");
            response.hash = Some(hash.to_string());
            (StatusCode::OK, Json(response))
        }
        Err(DispatchError::Format(e)) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::failure(e.to_string()).with_code(request.code)),
        ),
        Err(e) => {
            error!("Submission failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::failure(e.to_string())),
            )
        }
    }
}

async fn handle_fmt(
    State(state): State<HttpState>,
    body: Result<Json<CodeRequest>, JsonRejection>,
) -> Reply {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };

    match state.dispatcher.format(&request.code).await {
        Ok(code) => (
            StatusCode::OK,
            Json(ApiResponse::ok("reformatted code").with_code(code)),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::failure(e.to_string()).with_code(request.code)),
        ),
    }
}

/// Log every request and allow cross-origin calls from the browser client.
async fn log_and_cors(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.to_string())
        .unwrap_or_else(|| "-".to_string());
    let method = request.method().clone();
    let uri = request.uri().clone();

    let mut response = if method == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(
            "Content-Type, Content-Length, Accept-Encoding, X-CSRF-Token, Authorization, X-Max",
        ),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );

    info!(
        "{} {} {} {:?}",
        remote,
        method,
        uri,
        start.elapsed()
    );
    response
}
