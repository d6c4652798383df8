//! Caller address extraction.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};

use crate::routes::AppState;

/// Network address of the client that sent the request.
///
/// Taken from the first `X-Forwarded-For` hop, then `X-Real-IP`, when the
/// gateway is configured to trust them; otherwise from the TCP peer.
/// Falls back to `unknown` when none is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerAddress(pub String);

impl FromRequestParts<AppState> for CallerAddress {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let forwarded = if state.trust_forwarded_for { forwarded_address(&parts.headers) } else { None };
        let address = forwarded
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_owned());
        Ok(Self(address))
    }
}

fn forwarded_address(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    header("x-forwarded-for")
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header("x-real-ip"))
        .map(str::to_owned)
}
