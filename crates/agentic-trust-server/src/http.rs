//! Axum HTTP handlers for the trust gateway.
//!
//! Provides REST endpoints for challenges, credential and presentation
//! verification, issuer/agent lookup, stats and health checks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use agentic_trust::presentation::{
    CredentialVerificationRequest, Presentation, PresentationVerifier, Rejection, Verdict,
};

use crate::error::ApiError;

/// Shared application state for Axum handlers.
pub struct AppState {
    pub verifier: Arc<PresentationVerifier>,
    /// Audience for challenges requested without one.
    pub default_audience: String,
    /// Verifications still running after this long are cancelled.
    pub request_timeout: Duration,
    pub started: Instant,
}

impl AppState {
    pub fn new(
        verifier: Arc<PresentationVerifier>,
        default_audience: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            verifier,
            default_audience: default_audience.into(),
            request_timeout,
            started: Instant::now(),
        }
    }

    fn ensure_ready(&self) -> Result<(), ApiError> {
        if self.verifier.index().is_synced() {
            Ok(())
        } else {
            Err(ApiError::NotReady)
        }
    }
}

/// Build the Axum router with all endpoints.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/challenge", post(handle_challenge))
        .route("/verify", post(handle_verify))
        .route("/present", post(handle_present))
        .route("/issuer/{did}", get(handle_issuer))
        .route("/agent/{did}", get(handle_agent))
        .route("/stats", get(handle_stats))
        .route("/health", get(handle_health))
        .fallback(handle_not_found)
        .with_state(state)
}

/// Challenge request body. Both the body and `audience` are optional.
#[derive(Debug, Default, Deserialize)]
struct ChallengeRequest {
    audience: Option<String>,
}

/// POST /challenge -- issue a single-use nonce
async fn handle_challenge(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let req: ChallengeRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ChallengeRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid challenge request: {e}")))?
    };
    let audience = req
        .audience
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| state.default_audience.clone());

    let challenge = state.verifier.challenges().issue_default(&audience)?;
    tracing::debug!(aud = %challenge.aud, exp = challenge.exp, "challenge issued");
    Ok((StatusCode::OK, Json(challenge)).into_response())
}

/// POST /verify -- credential-only verification
async fn handle_verify(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialVerificationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    let Json(req) = payload.map_err(|e| {
        tracing::warn!(%request_id, method = "POST /verify", error = %e, "malformed request");
        ApiError::BadRequest(e.body_text())
    })?;
    state.ensure_ready()?;

    tracing::info!(
        %request_id,
        method = "POST /verify",
        did = %req.issuer_did,
        credential_type = %req.credential_type,
        "verification request received"
    );
    let started = Instant::now();
    let verdict = state
        .verifier
        .verify_credential_until(&req, tokio::time::sleep(state.request_timeout))
        .await;
    let duration_ms = started.elapsed().as_millis() as u64;

    let response = match verdict {
        Verdict::Valid(verified) => {
            tracing::info!(%request_id, risk = %verified.risk_score, duration_ms, "verification complete");
            let mut body = serde_json::to_value(&verified).map_err(agentic_trust::TrustError::from)?;
            body["valid"] = serde_json::Value::Bool(true);
            (StatusCode::OK, Json(body)).into_response()
        }
        Verdict::Rejected(rejection) => {
            tracing::warn!(
                %request_id,
                method = "POST /verify",
                did = %req.issuer_did,
                credential_type = %req.credential_type,
                code = %rejection.error_code,
                duration_ms,
                "verification rejected"
            );
            rejected(rejection)
        }
    };
    Ok(response)
}

/// Presentation request body.
#[derive(Debug, Deserialize)]
struct PresentRequest {
    presentation: Presentation,
}

/// POST /present -- full presentation state machine
async fn handle_present(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PresentRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    let Json(PresentRequest { presentation }) = payload.map_err(|e| {
        tracing::warn!(%request_id, method = "POST /present", error = %e, "malformed request");
        ApiError::BadRequest(e.body_text())
    })?;
    state.ensure_ready()?;

    tracing::info!(
        %request_id,
        method = "POST /present",
        did = %presentation.receipt.issuer_did,
        credential_type = %presentation.receipt.credential_type,
        "presentation received"
    );
    let result = state
        .verifier
        .verify_until(&presentation, tokio::time::sleep(state.request_timeout))
        .await;

    let response = match result {
        Verdict::Valid(verified) => {
            (StatusCode::OK, Json(Verdict::Valid(verified))).into_response()
        }
        Verdict::Rejected(rejection) => {
            tracing::warn!(
                %request_id,
                method = "POST /present",
                did = %presentation.receipt.issuer_did,
                credential_type = %presentation.receipt.credential_type,
                code = %rejection.error_code,
                state = %rejection.state,
                "presentation rejected"
            );
            rejected(rejection)
        }
    };
    Ok(response)
}

/// GET /issuer/{did}
async fn handle_issuer(
    State(state): State<Arc<AppState>>,
    Path(did): Path<String>,
) -> Result<Response, ApiError> {
    let issuer = state.verifier.index().find_issuer(&did).await?;
    Ok(Json(issuer).into_response())
}

/// GET /agent/{did}
async fn handle_agent(
    State(state): State<Arc<AppState>>,
    Path(did): Path<String>,
) -> Result<Response, ApiError> {
    let agent = state.verifier.index().find_agent(&did).await?;
    Ok(Json(agent).into_response())
}

/// GET /stats -- index, challenge and uptime counters
async fn handle_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let index = state.verifier.index().stats();
    let challenges = state.verifier.challenges().stats();
    Json(serde_json::json!({
        "service": "trust-gateway",
        "uptimeSecs": state.started.elapsed().as_secs(),
        "synced": state.verifier.index().is_synced(),
        "index": index,
        "challenges": challenges,
    }))
}

/// GET /health -- liveness
async fn handle_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSecs": state.started.elapsed().as_secs(),
    }))
}

async fn handle_not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound(format!("route {method} {uri} not found"))
}

/// Render a rejection as `{valid:false, error, errorCode, statusCode, reason, flags, state}`.
fn rejected(rejection: Rejection) -> Response {
    let status = status_from(rejection.http_status());
    let body = serde_json::json!({
        "valid": false,
        "error": rejection.reason,
        "errorCode": rejection.error_code,
        "statusCode": status.as_u16(),
        "reason": rejection.reason,
        "flags": rejection.flags,
        "state": rejection.state,
    });
    (status, Json(body)).into_response()
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
