//! # REST API
//!
//! The axum router for the registry's HTTP interface. Handlers share
//! [`AppState`] through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                                     | Description                       |
//! |--------|------------------------------------------|-----------------------------------|
//! | GET    | `/health`                                | Liveness probe                    |
//! | GET    | `/status`                                | Version, record count, backend    |
//! | GET    | `/api/challenge/:identity`               | Fresh challenge to sign           |
//! | POST   | `/api/records`                           | Register content (signed)         |
//! | GET    | `/api/records/:id`                       | Record by id                      |
//! | GET    | `/api/records/by-owner/:identity`        | Records owned by a wallet         |
//! | GET    | `/api/records/by-address/:contentAddress`| Records for a content address     |
//! | POST   | `/api/records/verify-access`             | Owner-only fetch (signed)         |
//!
//! Every signature problem is answered with the same
//! `401 {"error": "Invalid signature"}`. The logs carry the detail.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use codesync_core::challenge::{now_ms, ChallengeBuilder};
use codesync_core::{AccessController, AccessError, Address, ContentRecord, IdentityProof};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone; everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Reported version string.
    pub version: String,
    /// Registration and access checks over the configured registry.
    pub controller: Arc<AccessController>,
    /// Prometheus handles for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/api/challenge/:identity", get(challenge_handler))
        .route("/api/records", post(register_handler))
        .route("/api/records/verify-access", post(verify_access_handler))
        .route("/api/records/by-owner/:identity", get(by_owner_handler))
        .route("/api/records/by-address/:content_address", get(by_address_handler))
        .route("/api/records/:id", get(record_by_id_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// `POST /api/records` body. Missing strings arrive empty and fail
/// validation with a 400.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub display_name: String,
    pub content_address: String,
    pub unit_count: u64,
    pub claimed_identity: String,
    pub signature: String,
    pub message: String,
}

/// `POST /api/records/verify-access` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyAccessRequest {
    pub content_address: String,
    pub claimed_identity: String,
    pub signature: String,
    pub message: String,
}

/// A record as served over HTTP: every stored field plus its gateway URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    #[serde(flatten)]
    pub record: ContentRecord,
    pub gateway_url: String,
}

impl From<ContentRecord> for RecordView {
    fn from(record: ContentRecord) -> Self {
        let gateway_url = record.gateway_url();
        Self {
            record,
            gateway_url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordResponse {
    pub record: RecordView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordListResponse {
    pub records: Vec<RecordView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessResponse {
    pub granted: bool,
    pub record: Option<RecordView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub identity: String,
    pub message: String,
    pub timestamp: u64,
}

/// Registry summary returned by `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub version: String,
    pub record_count: u64,
    pub storage: String,
    pub timestamp: String,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Handler error: a status code and the message clients see.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Map a core error to its HTTP answer, counting it on the way.
    fn from_access(err: AccessError, metrics: &SharedMetrics) -> Self {
        metrics
            .request_failures_total
            .with_label_values(&[err.kind()])
            .inc();

        match err {
            AccessError::Validation(e) => Self::bad_request(e.to_string()),
            AccessError::InvalidSignature(_) | AccessError::UnauthorizedSignature { .. } => {
                Self::new(StatusCode::UNAUTHORIZED, "Invalid signature")
            }
            AccessError::StaleChallenge(e) => Self::new(StatusCode::UNAUTHORIZED, e.to_string()),
            AccessError::RecordNotFound(_) => Self::new(StatusCode::NOT_FOUND, "Record not found"),
            AccessError::AccessDenied { .. } => Self::new(StatusCode::FORBIDDEN, "Access denied"),
            AccessError::Storage(e) => {
                tracing::error!(error = %e, "registry failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — 200 while the process is up.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — version, record count and storage backend.
async fn status_handler(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    let registry = state.controller.registry();
    let record_count = registry
        .len()
        .map_err(|e| ApiError::from_access(e.into(), &state.metrics))? as u64;
    state.metrics.records.set(record_count as i64);

    Ok(Json(StatusResponse {
        version: state.version.clone(),
        record_count,
        storage: registry.backend().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// `GET /api/challenge/:identity` — a fresh message for the wallet to sign.
async fn challenge_handler(Path(identity): Path<String>) -> ApiResult<Json<ChallengeResponse>> {
    let address = Address::parse(&identity)
        .map_err(|e| ApiError::bad_request(format!("invalid identity: {e}")))?;
    let timestamp = now_ms();

    Ok(Json(ChallengeResponse {
        identity: address.to_string(),
        message: ChallengeBuilder::default().build_at(&address, timestamp),
        timestamp,
    }))
}

/// `POST /api/records` — register content under the signer's wallet.
async fn register_handler(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RecordResponse>)> {
    let Json(req) = body?;
    let proof = IdentityProof::new(req.claimed_identity, req.message, req.signature);

    let record = state
        .controller
        .register_content(&req.display_name, &req.content_address, req.unit_count, &proof)
        .map_err(|e| ApiError::from_access(e, &state.metrics))?;

    state.metrics.records_registered_total.inc();
    state.metrics.records.inc();

    Ok((
        StatusCode::CREATED,
        Json(RecordResponse {
            record: record.into(),
        }),
    ))
}

/// `POST /api/records/verify-access` — the record, if the signer owns it.
///
/// A valid proof from someone else is a 200 with `granted: false` and a
/// null record.
async fn verify_access_handler(
    State(state): State<AppState>,
    body: Result<Json<VerifyAccessRequest>, JsonRejection>,
) -> ApiResult<Json<AccessResponse>> {
    let Json(req) = body?;
    let proof = IdentityProof::new(req.claimed_identity, req.message, req.signature);

    let decision = state
        .controller
        .verify_and_fetch(&req.content_address, &proof)
        .map_err(|e| ApiError::from_access(e, &state.metrics))?;

    let outcome = if decision.granted { "granted" } else { "denied" };
    state
        .metrics
        .access_checks_total
        .with_label_values(&[outcome])
        .inc();

    Ok(Json(AccessResponse {
        granted: decision.granted,
        record: decision.record.map(RecordView::from),
    }))
}

/// `GET /api/records/:id`
async fn record_by_id_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<RecordResponse>> {
    match state.controller.registry().find_by_id(&id) {
        Ok(Some(record)) => Ok(Json(RecordResponse {
            record: record.into(),
        })),
        Ok(None) => Err(ApiError::new(StatusCode::NOT_FOUND, "Record not found")),
        Err(e) => Err(ApiError::from_access(e.into(), &state.metrics)),
    }
}

/// `GET /api/records/by-owner/:identity` — always an array; an identity
/// that is not an address simply owns nothing.
async fn by_owner_handler(
    Path(identity): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<RecordListResponse>> {
    let records = state
        .controller
        .registry()
        .list_by_owner(&identity)
        .map_err(|e| ApiError::from_access(e.into(), &state.metrics))?;
    Ok(list_response(records))
}

/// `GET /api/records/by-address/:contentAddress`
async fn by_address_handler(
    Path(content_address): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<RecordListResponse>> {
    let records = state
        .controller
        .registry()
        .list_by_content_address(&content_address)
        .map_err(|e| ApiError::from_access(e.into(), &state.metrics))?;
    Ok(list_response(records))
}

fn list_response(records: Vec<ContentRecord>) -> Json<RecordListResponse> {
    Json(RecordListResponse {
        records: records.into_iter().map(RecordView::from).collect(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
