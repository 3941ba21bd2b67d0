//! HTTP surface of the ingress gateway.
//!
//! | Method | Path                   | Response                               |
//! |--------|------------------------|----------------------------------------|
//! | GET    | `/scanner/status`      | `{ hardwareAvailable }`                |
//! | GET    | `/scanner/diagnostics` | `{ hardwareAvailable, fatalError }`    |
//! | POST   | `/scanner/simulate`    | `{ accepted, message, source, mocked }`|
//!
//! Errors are returned as `{ "message": ... }`, including bodies that are
//! not valid JSON for the route.

use crate::gateway::{GatewayError, IngressGateway, SimulateRequest, SimulateResponse, StatusResponse};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tablelink_core::{ScanDispatcher, StatusSnapshot};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Policy(_) => StatusCode::BAD_REQUEST,
            Self::Dispatch(e) if e.is_cancelled() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Dispatch(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "message": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

type SharedGateway<P> = Arc<IngressGateway<P>>;

/// Build the scanner routes around `gateway`.
pub fn router<P>(gateway: SharedGateway<P>) -> Router
where
    P: ScanDispatcher + 'static,
{
    Router::new()
        .route("/scanner/status", get(status::<P>))
        .route("/scanner/diagnostics", get(diagnostics::<P>))
        .route("/scanner/simulate", post(simulate::<P>))
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

/// Serve `router` until `shutdown` is cancelled, then drain open requests.
///
/// # Errors
///
/// Returns the listener's I/O error if serving fails.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP gateway listening");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

async fn status<P: ScanDispatcher>(State(gateway): State<SharedGateway<P>>) -> Json<StatusResponse> {
    Json(gateway.status())
}

async fn diagnostics<P: ScanDispatcher>(
    State(gateway): State<SharedGateway<P>>,
) -> Json<StatusSnapshot> {
    Json(gateway.diagnostics())
}

async fn simulate<P: ScanDispatcher>(
    State(gateway): State<SharedGateway<P>>,
    body: Result<Json<SimulateRequest>, JsonRejection>,
) -> Result<Json<SimulateResponse>, GatewayError> {
    let Json(request) = body?;
    gateway.submit_simulated(request).await.map(Json)
}
