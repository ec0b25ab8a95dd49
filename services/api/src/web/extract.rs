//! services/api/src/web/extract.rs
//!
//! Request extractors whose rejections render as the API's JSON error body.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        ConnectInfo, FromRequest, FromRequestParts,
    },
    http::request::Parts,
};

use crate::error::ApiError;
use crate::web::state::AppState;

/// `axum::Json` with malformed bodies reported as 400 `{"error": ...}`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// `axum::extract::Path` with bad ids reported as 400 `{"error": ...}`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);

/// `axum::extract::Query` with bad query strings reported as 400 `{"error": ...}`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

/// The caller's address as recorded on signatures.
///
/// The socket peer, or `"unknown"` without connection info. The first
/// `X-Forwarded-For` hop is used only when `TRUST_FORWARDED_FOR` is set.
#[derive(Debug, Clone)]
pub struct ClientAddr(pub String);

impl FromRequestParts<Arc<AppState>> for ClientAddr {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(ClientAddr(client_addr(parts, state.config.trust_forwarded_for)))
    }
}

fn client_addr(parts: &Parts, trust_forwarded_for: bool) -> String {
    let forwarded = trust_forwarded_for
        .then(|| {
            parts
                .headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
        .flatten();
    forwarded
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(forwarded: Option<&str>, peer: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/sign-agreement/AGR-1");
        if let Some(value) = forwarded {
            builder = builder.header("x-forwarded-for", value);
        }
        if let Some(peer) = peer {
            builder = builder.extension(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn forwarded_header_is_ignored_by_default() {
        let parts = parts(Some("203.0.113.66"), Some("10.0.0.5:5555"));
        assert_eq!(client_addr(&parts, false), "10.0.0.5");
    }

    #[test]
    fn first_forwarded_hop_is_used_when_trusted() {
        let parts = parts(Some("203.0.113.66, 10.0.0.1"), Some("10.0.0.5:5555"));
        assert_eq!(client_addr(&parts, true), "203.0.113.66");
    }

    #[test]
    fn falls_back_to_peer_then_unknown() {
        assert_eq!(client_addr(&parts(Some(" "), Some("10.0.0.5:5555")), true), "10.0.0.5");
        assert_eq!(client_addr(&parts(Some("203.0.113.66"), None), false), "unknown");
    }
}
