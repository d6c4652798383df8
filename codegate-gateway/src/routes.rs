//! Axum route handlers for the submission gateway.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderName, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use codegate_archive::{Archive, ArtifactStore, Submission};
use codegate_core::{CallerHash, Language};
use codegate_sandbox::{SandboxBackend, SandboxOutcome};
use rand::{rngs::OsRng, RngCore};
use serde::{de::DeserializeOwned, Deserialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{admin, caller::CallerAddress, config::GatewayConfig, error::GatewayError, session::SessionStore};

/// Largest accepted code payload, matching the sandbox's request limit.
pub const MAX_CODE_BYTES: usize = 1024 * 1024;

/// Largest accepted request body. JSON escaping can grow code up to six
/// times (`\u0001`), plus room for the other fields.
pub const MAX_BODY_BYTES: usize = 6 * MAX_CODE_BYTES + 64 * 1024;

// ── Shared state ─────────────────────────────────────────────────────────────

/// Handles shared by every request.
#[derive(Clone)]
pub struct AppState {
    /// Live admin sessions.
    pub sessions: Arc<SessionStore>,
    /// Submission allocator.
    pub archive: Arc<Archive>,
    /// Admin view of the archive directory.
    pub artifacts: ArtifactStore,
    /// Where code is executed.
    pub sandbox: Arc<dyn SandboxBackend>,
    /// Lowercase hex SHA-256 of the admin password.
    pub admin_password_hash: Option<Arc<str>>,
    /// Salt for caller-address hashes.
    pub caller_salt: Arc<[u8]>,
    /// Whether proxy headers name the caller.
    pub trust_forwarded_for: bool,
}

impl AppState {
    /// Assemble the state for `config`.
    ///
    /// Without a configured `IP_HASH_SALT` a random salt is drawn, so caller
    /// hashes only correlate within one process lifetime.
    #[must_use]
    pub fn from_config(
        config: &GatewayConfig,
        sandbox: Arc<dyn SandboxBackend>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        let caller_salt: Arc<[u8]> = match &config.ip_hash_salt {
            Some(salt) => Arc::from(salt.as_bytes()),
            None => {
                tracing::warn!("IP_HASH_SALT not set; using a random per-process salt");
                let mut salt = [0u8; 32];
                OsRng.fill_bytes(&mut salt);
                Arc::from(salt.as_slice())
            }
        };
        if config.admin_password_hash.is_none() {
            tracing::warn!("ADMIN_PASSWORD_HASH not set; admin login is disabled");
        }

        Self {
            sessions,
            archive: Arc::new(Archive::new(&config.runs_dir)),
            artifacts: ArtifactStore::new(&config.runs_dir),
            sandbox,
            admin_password_hash: config.admin_password_hash.as_deref().map(Arc::from),
            caller_salt,
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }
}

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExecuteBody {
    pub code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, rename = "clientSeed", alias = "clientId")]
    pub client_seed: Option<String>,
}

/// Decode a JSON body, reporting failures as [`GatewayError::InvalidRequest`]
/// and oversized bodies as [`GatewayError::BodyTooLarge`].
pub(crate) fn parse_json<T: DeserializeOwned>(body: Result<Bytes, BytesRejection>) -> Result<T, GatewayError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            GatewayError::BodyTooLarge
        } else {
            GatewayError::InvalidRequest(rejection.body_text())
        }
    })?;
    serde_json::from_slice(&body).map_err(|e| GatewayError::InvalidRequest(e.to_string()))
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the application router with the given state.
///
/// `/runs/delete` is a static POST route, so `GET /runs/delete` answers 405
/// rather than looking up an artifact named `delete`. Allocated names always
/// carry an extension and never collide with it.
pub fn create_router(state: AppState) -> Router {
    let runs = Router::new()
        .route("/runs", get(admin::list_runs))
        .route("/runs/{name}", get(admin::get_run))
        .route("/runs/delete", post(admin::delete_runs))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin::require_session));

    Router::new()
        .route("/health", get(health))
        .route("/execute", post(execute))
        .route("/admin/auth", post(admin::auth))
        .route("/admin/verify", get(admin::verify))
        .merge(runs)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("origin"),
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// `GET /health`: liveness probe.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

/// `POST /execute`: archive a submission, run it, relay the result.
///
/// # Errors
/// - [`GatewayError::InvalidRequest`] for a malformed body or empty code.
/// - [`GatewayError::Archival`] if the submission cannot be archived; the
///   sandbox is not called in that case.
/// - [`GatewayError::Sandbox`] if the sandbox is unreachable or answers
///   with something that is not a result.
pub async fn execute(
    State(state): State<AppState>,
    CallerAddress(address): CallerAddress,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SandboxOutcome>, GatewayError> {
    let request: ExecuteBody = parse_json(body)?;
    let code = request
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| GatewayError::InvalidRequest("code is required".to_owned()))?;
    if code.len() > MAX_CODE_BYTES {
        return Err(GatewayError::InvalidRequest(format!(
            "code exceeds {MAX_CODE_BYTES} bytes"
        )));
    }

    let language = Language::from_label(request.language.as_deref());
    let submission = Submission {
        code: &code,
        client_seed: request.client_seed.as_deref().unwrap_or_default(),
        caller_hash: CallerHash::compute(&state.caller_salt, &address),
        language,
    };
    let artifact = state.archive.archive(&submission).await.map_err(GatewayError::Archival)?;

    tracing::info!(%artifact, %language, "forwarding submission to sandbox");
    let outcome = state.sandbox.execute(&code).await?;
    Ok(Json(outcome))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use codegate_sandbox::{OutputLine, SandboxError};
    use tower::ServiceExt;

    /// In-process sandbox recording every submitted snippet.
    #[derive(Default)]
    pub(crate) struct FakeSandbox {
        pub(crate) calls: Mutex<Vec<String>>,
        pub(crate) unavailable: bool,
    }

    #[async_trait]
    impl SandboxBackend for FakeSandbox {
        async fn execute(&self, code: &str) -> Result<SandboxOutcome, SandboxError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(code.to_owned());
            }
            if self.unavailable {
                return Err(SandboxError::Unavailable("connection refused".to_owned()));
            }
            Ok(SandboxOutcome {
                success: true,
                output: vec![OutputLine { kind: "log".to_owned(), text: code.to_owned() }],
                error: None,
            })
        }

        async fn health_check(&self) -> Result<(), SandboxError> {
            Ok(())
        }
    }

    pub(crate) fn test_state(dir: &std::path::Path, sandbox: Arc<FakeSandbox>) -> AppState {
        let runs_dir = dir.display().to_string();
        let config = GatewayConfig::from_lookup(|key| match key {
            "RUNS_DIR" => Some(runs_dir.clone()),
            "IP_HASH_SALT" => Some("test-salt".to_owned()),
            _ => None,
        });
        let config = match config {
            Ok(c) => c,
            Err(e) => panic!("test config invalid: {e}"),
        };
        AppState::from_config(&config, sandbox, Arc::new(SessionStore::new()))
    }

    pub(crate) fn temp_dir() -> tempfile::TempDir {
        match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => panic!("failed to create temp dir: {e}"),
        }
    }

    pub(crate) async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = match app.oneshot(req).await {
            Ok(r) => r,
            Err(e) => panic!("handler error: {e}"),
        };
        let status = resp.status();
        let bytes = match axum::body::to_bytes(resp.into_body(), 16 * 1024 * 1024).await {
            Ok(b) => b,
            Err(e) => panic!("failed to read body: {e}"),
        };
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    pub(crate) fn post_json(uri: &str, body: &str) -> Request<Body> {
        match Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
        {
            Ok(r) => r,
            Err(e) => panic!("failed to build request: {e}"),
        }
    }

    #[tokio::test]
    async fn health_response_format_returns_ok_with_status_field() {
        let dir = temp_dir();
        let app = create_router(test_state(dir.path(), Arc::default()));
        let req = match Request::builder().uri("/health").body(Body::empty()) {
            Ok(r) => r,
            Err(e) => panic!("failed to build request: {e}"),
        };
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn execute_archives_then_relays_sandbox_result() {
        let dir = temp_dir();
        let sandbox = Arc::new(FakeSandbox::default());
        let app = create_router(test_state(dir.path(), Arc::clone(&sandbox)));

        let (status, body) = send(
            app,
            post_json("/execute", r#"{"code":"console.log(1)","language":"javascript","clientSeed":"alice"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["output"][0]["text"], "console.log(1)");
        assert!(body.get("error").is_none());

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .map(|rd| rd.filter_map(Result::ok).map(|e| e.file_name()).collect())
            .unwrap_or_default();
        assert_eq!(files.len(), 1);
        let name = files[0].to_string_lossy().into_owned();
        assert!(name.starts_with(codegate_core::ShortId::derive("alice").as_str()), "got {name}");
        assert!(name.ends_with(".js"));
    }

    #[tokio::test]
    async fn execute_accepts_legacy_client_id_field() {
        let dir = temp_dir();
        let app = create_router(test_state(dir.path(), Arc::default()));
        let (status, _) = send(app, post_json("/execute", r#"{"code":"1","clientId":"bob"}"#)).await;
        assert_eq!(status, StatusCode::OK);

        let bob = codegate_core::ShortId::derive("bob");
        let found = std::fs::read_dir(dir.path())
            .map(|rd| {
                rd.filter_map(Result::ok)
                    .any(|e| e.file_name().to_string_lossy().starts_with(bob.as_str()))
            })
            .unwrap_or(false);
        assert!(found);
    }

    #[tokio::test]
    async fn execute_rejects_missing_or_empty_code() {
        let dir = temp_dir();
        let sandbox = Arc::new(FakeSandbox::default());
        for body in [r#"{"language":"javascript"}"#, r#"{"code":""}"#, "not json", r#"{"code":5}"#] {
            let app = create_router(test_state(dir.path(), Arc::clone(&sandbox)));
            let (status, json) = send(app, post_json("/execute", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
            assert_eq!(json["success"], false);
            assert!(json["error"].as_str().is_some_and(|e| e.starts_with("Invalid request")));
        }
        let calls = sandbox.calls.lock().map(|c| c.len()).unwrap_or(usize::MAX);
        assert_eq!(calls, 0, "rejected requests never reach the sandbox");
    }

    #[tokio::test]
    async fn execute_archival_failure_skips_sandbox() {
        let dir = temp_dir();
        let blocker = dir.path().join("file");
        if let Err(e) = std::fs::write(&blocker, "x") {
            panic!("fixture write failed: {e}");
        }
        let sandbox = Arc::new(FakeSandbox::default());
        let app = create_router(test_state(&blocker.join("runs"), Arc::clone(&sandbox)));

        let (status, json) = send(app, post_json("/execute", r#"{"code":"1"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().is_some_and(|e| e.starts_with("Failed to save run")));
        let calls = sandbox.calls.lock().map(|c| c.len()).unwrap_or(usize::MAX);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn execute_unreachable_sandbox_is_503() {
        let dir = temp_dir();
        let sandbox = Arc::new(FakeSandbox { unavailable: true, ..FakeSandbox::default() });
        let app = create_router(test_state(dir.path(), sandbox));

        let (status, json) = send(app, post_json("/execute", r#"{"code":"1"}"#)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(json["error"].as_str().is_some_and(|e| e.contains("unavailable")));
    }

    #[test]
    fn execute_body_defaults_client_seed() {
        let body: ExecuteBody = match parse_json(Ok(Bytes::from_static(br#"{"code":"1"}"#))) {
            Ok(b) => b,
            Err(e) => panic!("must parse: {e}"),
        };
        assert!(body.client_seed.is_none());
        assert!(body.language.is_none());
    }

    #[tokio::test]
    async fn execute_accepts_null_seed_and_language() {
        let dir = temp_dir();
        let sandbox = Arc::new(FakeSandbox::default());
        let app = create_router(test_state(dir.path(), Arc::clone(&sandbox)));

        let (status, body) =
            send(app, post_json("/execute", r#"{"code":"1","language":null,"clientSeed":null}"#)).await;
        assert_eq!(status, StatusCode::OK, "got {body}");

        let anonymous = codegate_core::ShortId::derive("");
        let archived: Vec<String> = std::fs::read_dir(dir.path())
            .map(|rd| rd.filter_map(Result::ok).map(|e| e.file_name().to_string_lossy().into_owned()).collect())
            .unwrap_or_default();
        assert_eq!(archived.len(), 1);
        assert!(archived[0].starts_with(anonymous.as_str()), "got {archived:?}");
        assert!(archived[0].ends_with(".js"));
    }

    #[tokio::test]
    async fn heavily_escaped_code_under_the_limit_is_accepted() {
        let dir = temp_dir();
        let app = create_router(test_state(dir.path(), Arc::default()));

        // 400 KiB of control characters is ~2.4 MB of JSON.
        let code = "\u{1}".repeat(400 * 1024);
        let payload = serde_json::json!({ "code": code }).to_string();
        assert!(payload.len() > 2 * 1024 * 1024);

        let (status, body) = send(app, post_json("/execute", &payload)).await;
        assert_eq!(status, StatusCode::OK, "got {body}");
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn oversized_bodies_get_a_json_error() {
        let dir = temp_dir();
        let sandbox = Arc::new(FakeSandbox::default());
        let app = create_router(test_state(dir.path(), Arc::clone(&sandbox)));

        let payload = serde_json::json!({ "code": "x".repeat(MAX_BODY_BYTES) }).to_string();
        let (status, body) = send(app.clone(), post_json("/execute", &payload)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());

        // Fits the body limit but not the code limit.
        let payload = serde_json::json!({ "code": "x".repeat(MAX_CODE_BYTES + 1) }).to_string();
        let (status, body) = send(app, post_json("/execute", &payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let calls = sandbox.calls.lock().map(|c| c.len()).unwrap_or(usize::MAX);
        assert_eq!(calls, 0);
    }
}
