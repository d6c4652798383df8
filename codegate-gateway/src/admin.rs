//! Admin login and the token-gated archive endpoints.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection},
        Path, Request, State,
    },
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use codegate_archive::ArtifactEntry;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::{
    error::GatewayError,
    routes::{parse_json, AppState},
};

// ── Request / response types ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AuthBody {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteBody {
    pub files: Vec<String>,
}

/// Per-name outcome of `POST /runs/delete`.
#[derive(Debug, Default, Serialize)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub errors: Vec<DeleteFailure>,
}

#[derive(Debug, Serialize)]
pub struct DeleteFailure {
    pub name: String,
    pub error: String,
}

// ── Authentication ────────────────────────────────────────────────────────────

/// Extract the token from `Authorization: Bearer <token>`. A bare token
/// without the scheme is accepted as well.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

fn password_matches(password: &str, expected_hex: &str) -> bool {
    let digest = hex::encode(Sha256::digest(password.as_bytes()));
    digest.as_bytes().ct_eq(expected_hex.as_bytes()).into()
}

/// `POST /admin/auth`: exchange the admin password for a session token.
///
/// # Errors
/// - [`GatewayError::InvalidRequest`] if the body has no `password`.
/// - [`GatewayError::PasswordNotConfigured`] if no digest is configured.
/// - [`GatewayError::InvalidPassword`] if the password does not match.
pub async fn auth(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<AuthResponse>, GatewayError> {
    let request: AuthBody = parse_json(body)?;
    let expected = state
        .admin_password_hash
        .as_deref()
        .ok_or(GatewayError::PasswordNotConfigured)?;

    if !password_matches(&request.password, expected) {
        tracing::warn!("admin login rejected");
        return Err(GatewayError::InvalidPassword);
    }

    let token = state.sessions.issue();
    tracing::info!(active = state.sessions.len(), "admin session issued");
    Ok(Json(AuthResponse { success: true, token }))
}

/// `GET /admin/verify`: report whether the bearer token is still valid.
pub async fn verify(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let valid = bearer_token(&headers).is_some_and(|token| state.sessions.validate(token));
    let status = if valid { StatusCode::OK } else { StatusCode::UNAUTHORIZED };
    (status, Json(serde_json::json!({"valid": valid})))
}

/// Middleware rejecting requests without a live session token.
///
/// Runs before the wrapped handler, so no archive access happens for
/// unauthenticated callers.
///
/// # Errors
/// [`GatewayError::MissingToken`] or [`GatewayError::InvalidToken`].
pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let token = bearer_token(request.headers()).ok_or(GatewayError::MissingToken)?;
    if !state.sessions.validate(token) {
        return Err(GatewayError::InvalidToken);
    }
    Ok(next.run(request).await)
}

// ── Archive endpoints ─────────────────────────────────────────────────────────

/// `GET /runs`: list archived artifacts.
///
/// # Errors
/// [`GatewayError::Storage`] if the archive directory cannot be read.
pub async fn list_runs(State(state): State<AppState>) -> Result<Json<Vec<ArtifactEntry>>, GatewayError> {
    Ok(Json(state.artifacts.list().await?))
}

/// `GET /runs/{name}`: raw artifact bytes.
///
/// # Errors
/// [`GatewayError::InvalidFilename`] for anything but a bare file name,
/// including names that are not valid percent-encoded UTF-8.
/// [`GatewayError::NotFound`] if it does not exist.
pub async fn get_run(
    State(state): State<AppState>,
    name: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Path(name) = name.map_err(|_| GatewayError::InvalidFilename)?;
    let bytes = state.artifacts.read(&name).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], bytes))
}

/// `POST /runs/delete`: delete several artifacts, reporting each name.
///
/// # Errors
/// [`GatewayError::InvalidRequest`] if the body has no `files` list.
pub async fn delete_runs(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<DeleteReport>, GatewayError> {
    let request: DeleteBody = parse_json(body)?;

    let mut report = DeleteReport::default();
    for name in request.files {
        match state.artifacts.delete(&name).await {
            Ok(()) => report.deleted.push(name),
            Err(e) => {
                let error = GatewayError::from(e).to_string();
                report.errors.push(DeleteFailure { name, error });
            }
        }
    }
    Ok(Json(report))
}
