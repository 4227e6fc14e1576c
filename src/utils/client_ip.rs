//! Client IP extraction for visit records.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Extracts the client IP for a visit event.
///
/// When `behind_proxy` is set, forwarded headers win: the first entry of
/// `X-Forwarded-For`, then `X-Real-IP`. Otherwise (or when neither header is
/// usable) the socket peer address is used. Forwarded headers are only
/// trusted behind a reverse proxy; a direct client can spoof them freely.
pub fn extract_client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    behind_proxy: bool,
) -> Option<String> {
    if behind_proxy {
        if let Some(forwarded) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return Some(forwarded.to_string());
        }

        if let Some(real_ip) = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return Some(real_ip.to_string());
        }
    }

    peer.map(|addr| addr.ip().to_string())
}
