//! Client identity extraction.
//!
//! Resolves the caller's IP address and user agent from request parts.
//! Proxy headers win over the socket peer address:
//! `X-Forwarded-For` (first entry), then `X-Real-IP`, then the
//! `ConnectInfo<SocketAddr>` recorded by the server.

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, header::USER_AGENT, request::Parts},
};
use std::convert::Infallible;
use std::net::SocketAddr;

/// Caller identity for a single request.
///
/// Missing values become empty strings, so this extractor never rejects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: String,
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let socket = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self::from_parts(&parts.headers, socket))
    }
}

impl ClientInfo {
    pub fn from_parts(headers: &HeaderMap, socket: Option<SocketAddr>) -> Self {
        let ip = extract_ip_from_headers(headers)
            .or_else(|| extract_ip_from_socket(socket))
            .unwrap_or_default();

        Self {
            ip,
            user_agent: extract_user_agent(headers).unwrap_or_default(),
        }
    }
}

/// Extract client IP address from proxy headers.
///
/// Checks `X-Forwarded-For` (first non-empty entry) then `X-Real-IP`.
pub fn extract_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
}

/// Extract client IP address from the socket address.
pub fn extract_ip_from_socket(socket: Option<SocketAddr>) -> Option<String> {
    socket.map(|addr| addr.ip().to_string())
}

/// Extract the user agent header.
///
/// Bytes outside visible ASCII are decoded lossily rather than discarding
/// the whole value.
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}
