//! Request metadata recorded on sessions.

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use super::AppState;
use crate::services::ClientContext;

const UNKNOWN_IP: &str = "unknown";

/// Client IP and user agent of the current request.
///
/// The IP is the socket peer, unless the peer is a configured trusted proxy,
/// in which case the first `X-Forwarded-For` entry is used.
#[derive(Debug, Clone)]
pub struct ClientMeta(pub ClientContext);

impl FromRequestParts<Arc<AppState>> for ClientMeta {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|ConnectInfo(addr)| addr.ip());

        let ip_address = resolve_client_ip(
            peer,
            &parts.headers,
            &state.shared.config.security.trusted_proxy_ips,
        );

        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        Ok(Self(ClientContext {
            ip_address,
            user_agent,
        }))
    }
}

fn resolve_client_ip(
    peer: Option<IpAddr>,
    headers: &HeaderMap,
    trusted_proxies: &[String],
) -> String {
    let Some(peer) = peer else {
        return UNKNOWN_IP.to_string();
    };

    let peer_is_trusted = trusted_proxies
        .iter()
        .filter_map(|p| p.parse::<IpAddr>().ok())
        .any(|p| p == peer);

    if peer_is_trusted
        && let Some(forwarded) = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok())
    {
        return forwarded.to_string();
    }

    peer.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn forwarded(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn untrusted_peer_ignores_forwarded_header() {
        let ip = resolve_client_ip(
            Some("203.0.113.9".parse().unwrap()),
            &forwarded("10.0.0.1"),
            &["127.0.0.1".to_string()],
        );
        assert_eq!(ip, "203.0.113.9");
    }

    #[test]
    fn trusted_peer_uses_first_forwarded_entry() {
        let ip = resolve_client_ip(
            Some("127.0.0.1".parse().unwrap()),
            &forwarded("198.51.100.4, 10.0.0.1"),
            &["127.0.0.1".to_string()],
        );
        assert_eq!(ip, "198.51.100.4");
    }

    #[test]
    fn garbage_forwarded_value_falls_back_to_peer() {
        let ip = resolve_client_ip(
            Some("127.0.0.1".parse().unwrap()),
            &forwarded("not-an-ip"),
            &["127.0.0.1".to_string()],
        );
        assert_eq!(ip, "127.0.0.1");
    }

    #[test]
    fn missing_peer_is_unknown() {
        assert_eq!(resolve_client_ip(None, &HeaderMap::new(), &[]), "unknown");
    }
}
