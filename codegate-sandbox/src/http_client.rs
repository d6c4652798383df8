//! HTTP client for the sandbox service.
//!
//! The sandbox runs next to the gateway on a private network, so a plain
//! HTTP/1.1 client over TCP is enough; TLS is terminated elsewhere. Every
//! exchange (connect, send, read body) is bounded by one wall-clock timeout
//! that is deliberately longer than the execution budget requested from the
//! sandbox, so the sandbox's own timeout fires first.

use std::{error::Error as StdError, time::Duration};

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::{body::Bytes, header, Method, Request, StatusCode, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::{ExecuteRequest, SandboxBackend, SandboxError, SandboxOutcome};

/// Default wall-clock bound for one sandbox exchange.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// [`SandboxBackend`] speaking JSON over HTTP to `<base>/execute`.
#[derive(Debug, Clone)]
pub struct HttpSandbox {
    client: Client<HttpConnector, Full<Bytes>>,
    execute_uri: Uri,
    health_uri: Uri,
    timeout: Duration,
}

impl HttpSandbox {
    /// Create a client for the sandbox at `base_url` with the default timeout.
    ///
    /// # Errors
    /// Returns [`SandboxError::InvalidUrl`] if `base_url` is not an
    /// `http://` URL with a host.
    pub fn new(base_url: &str) -> Result<Self, SandboxError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom per-exchange timeout.
    ///
    /// # Errors
    /// Returns [`SandboxError::InvalidUrl`] if `base_url` is not an
    /// `http://` URL with a host.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, SandboxError> {
        let base = base_url.trim_end_matches('/');
        let execute_uri = parse_endpoint(base_url, &format!("{base}/execute"))?;
        let health_uri = parse_endpoint(base_url, &format!("{base}/health"))?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self { client, execute_uri, health_uri, timeout })
    }

    /// The endpoint submissions are posted to.
    #[must_use]
    pub fn execute_uri(&self) -> &Uri {
        &self.execute_uri
    }

    async fn exchange(&self, req: Request<Full<Bytes>>) -> Result<(StatusCode, Bytes), SandboxError> {
        let uri = req.uri().clone();
        let round_trip = async {
            let resp = self
                .client
                .request(req)
                .await
                .map_err(|e| SandboxError::Unavailable(format!("{uri}: {}", error_chain(&e))))?;
            let status = resp.status();
            let body = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| SandboxError::Protocol {
                    reason: format!("read response body: {e}"),
                    body: String::new(),
                })?
                .to_bytes();
            Ok::<_, SandboxError>((status, body))
        };

        tokio::time::timeout(self.timeout, round_trip).await.map_err(|_| {
            SandboxError::Unavailable(format!("{uri}: no response within {:?}", self.timeout))
        })?
    }
}

#[async_trait]
impl SandboxBackend for HttpSandbox {
    async fn execute(&self, code: &str) -> Result<SandboxOutcome, SandboxError> {
        let payload = serde_json::to_vec(&ExecuteRequest::new(code)).map_err(|e| {
            SandboxError::Protocol { reason: format!("encode request: {e}"), body: String::new() }
        })?;

        let req = Request::builder()
            .method(Method::POST)
            .uri(self.execute_uri.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(payload)))
            .map_err(|e| SandboxError::Unavailable(format!("build request: {e}")))?;

        let (status, body) = self.exchange(req).await?;
        tracing::debug!(%status, bytes = body.len(), "sandbox responded");

        // Error statuses carry a result body too; decode regardless.
        serde_json::from_slice(&body).map_err(|e| SandboxError::Protocol {
            reason: e.to_string(),
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    async fn health_check(&self) -> Result<(), SandboxError> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(self.health_uri.clone())
            .body(Full::new(Bytes::new()))
            .map_err(|e| SandboxError::Unavailable(format!("build request: {e}")))?;

        let (status, _) = self.exchange(req).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(SandboxError::Unavailable(format!("health check returned {status}")))
        }
    }
}

fn parse_endpoint(base_url: &str, endpoint: &str) -> Result<Uri, SandboxError> {
    let invalid = |reason: String| SandboxError::InvalidUrl { url: base_url.to_owned(), reason };
    let uri: Uri = endpoint.parse().map_err(|e| invalid(format!("{e}")))?;
    if uri.scheme_str() != Some("http") {
        return Err(invalid("only http:// URLs are supported".to_owned()));
    }
    if uri.host().is_none() {
        return Err(invalid("missing host".to_owned()));
    }
    Ok(uri)
}

fn error_chain(err: &dyn StdError) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
