use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

const MAPPED_IPV4_PREFIX: &str = "::ffff:";
/// Stored when no address could be resolved.
pub const UNKNOWN_IP: &str = "0.0.0.0";

/// Client address as seen through the reverse proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl FromRequest for ClientIp {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(ClientIp(client_ip(req))))
    }
}

/// `X-Real-IP`, then the first `X-Forwarded-For` hop, then the peer address.
pub fn client_ip(req: &HttpRequest) -> String {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let raw = header("X-Real-IP")
        .or_else(|| {
            header("X-Forwarded-For")
                .and_then(|v| v.split(',').next().map(|first| first.trim().to_string()))
                .filter(|v| !v.is_empty())
        })
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()));

    match raw {
        Some(ip) => normalize_ip(&ip),
        None => UNKNOWN_IP.to_string(),
    }
}

pub fn normalize_ip(raw: &str) -> String {
    let raw = raw.trim();
    raw.strip_prefix(MAPPED_IPV4_PREFIX).unwrap_or(raw).to_string()
}
