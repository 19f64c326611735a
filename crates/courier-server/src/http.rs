//! HTTP endpoint for the remoting dispatcher.
//!
//! One POST route carries all invocations; the request body is an encoded
//! `InvocationRequest` and the `Content-Type` header selects the wire format,
//! which the reply echoes. Fault replies are ordinary 200 responses; only an
//! unsupported content type is refused at the HTTP level.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use courier_proto::WireFormat;
use tracing::info;

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::metrics::ServerMetricsSnapshot;

/// HTTP server exposing a dispatcher at `POST /remoting`.
pub struct RemotingServer {
    dispatcher: Arc<Dispatcher>,
    config: ServerConfig,
}

#[derive(Clone)]
struct EndpointState {
    dispatcher: Arc<Dispatcher>,
    default_format: WireFormat,
}

impl RemotingServer {
    /// Creates a server for `dispatcher` with the given configuration.
    pub fn new(dispatcher: Arc<Dispatcher>, config: ServerConfig) -> Self {
        Self { dispatcher, config }
    }

    /// Builds the axum router: the invocation route plus health and metrics.
    pub fn router(&self) -> Router {
        let state = EndpointState {
            dispatcher: self.dispatcher.clone(),
            default_format: self.config.default_format,
        };
        Router::new()
            .route("/remoting", post(invoke_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .with_state(state)
    }

    /// Serves on an already-bound listener until the task is aborted.
    pub async fn serve(self, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
        let addr = listener.local_addr()?;
        info!(addr = %addr, methods = self.dispatcher.registry().len(), "remoting endpoint listening");
        axum::serve(listener, self.router().into_make_service()).await?;
        Ok(())
    }

    /// Binds the configured address and serves.
    pub async fn bind_and_serve(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }
}

async fn invoke_handler(
    State(state): State<EndpointState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let format = match headers.get(header::CONTENT_TYPE) {
        None => state.default_format,
        Some(value) => {
            let parsed = value
                .to_str()
                .map_err(|_| ())
                .and_then(|s| WireFormat::from_content_type(s).map_err(|_| ()));
            match parsed {
                Ok(format) => format,
                Err(()) => {
                    return (
                        StatusCode::UNSUPPORTED_MEDIA_TYPE,
                        "unsupported content type",
                    )
                        .into_response();
                }
            }
        }
    };

    let reply = state.dispatcher.dispatch(&body, format).await;
    ([(header::CONTENT_TYPE, format.content_type())], reply).into_response()
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn metrics_handler(State(state): State<EndpointState>) -> Json<ServerMetricsSnapshot> {
    Json(state.dispatcher.metrics().snapshot())
}
