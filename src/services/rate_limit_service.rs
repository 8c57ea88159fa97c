use axum::http::{Method, Request, StatusCode};
use ipnetwork::IpNetwork;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::net::IpAddr;
use tower_governor::GovernorError;
use tower_governor::key_extractor::KeyExtractor;

#[derive(Clone, Debug)]
struct Metrics {
    decisions_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("circle-server");
        Self {
            decisions_total: meter
                .u64_counter("circle_rate_limit_decisions_total")
                .with_description("Rate limit decisions by bucket and outcome")
                .build(),
        }
    }
}

/// Which governor bucket a request is charged against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitScope {
    Registration,
    Api,
}

impl RateLimitScope {
    /// Registration (`POST /v1/users`) has its own, stricter bucket.
    #[must_use]
    pub fn classify(method: &Method, path: &str) -> Self {
        if *method == Method::POST && path.trim_end_matches('/') == "/v1/users" {
            Self::Registration
        } else {
            Self::Api
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Api => "api",
        }
    }
}

/// Keys rate limits by client IP, honouring `X-Forwarded-For` only from trusted proxies.
#[derive(Clone, Debug)]
pub struct IpKeyExtractor {
    trusted_proxies: Vec<IpNetwork>,
}

impl IpKeyExtractor {
    #[must_use]
    pub const fn new(trusted_proxies: Vec<IpNetwork>) -> Self {
        Self { trusted_proxies }
    }

    #[must_use]
    pub fn identify_client_ip(&self, headers: &axum::http::HeaderMap, peer_addr: IpAddr) -> IpAddr {
        if !self.is_trusted(&peer_addr) {
            return peer_addr;
        }

        let xff = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok());

        // Rightmost untrusted hop is the real client.
        if let Some(xff_val) = xff
            && let Some(real_ip) =
                xff_val.rsplit(',').filter_map(|s| s.trim().parse::<IpAddr>().ok()).find(|ip| !self.is_trusted(ip))
        {
            return real_ip;
        }

        peer_addr
    }

    fn is_trusted(&self, ip: &IpAddr) -> bool {
        self.trusted_proxies.iter().any(|net| net.contains(*ip))
    }
}

impl KeyExtractor for IpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        use axum::extract::ConnectInfo;
        use std::net::SocketAddr;

        let peer_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)?;

        Ok(self.identify_client_ip(req.headers(), peer_ip))
    }
}

#[derive(Clone, Debug)]
pub struct RateLimitService {
    pub extractor: IpKeyExtractor,
    metrics: Metrics,
}

impl RateLimitService {
    #[must_use]
    pub fn new(trusted_proxies: Vec<IpNetwork>) -> Self {
        Self { extractor: IpKeyExtractor::new(trusted_proxies), metrics: Metrics::new() }
    }

    pub fn log_decision(&self, scope: RateLimitScope, status: StatusCode, retry_after: Option<&str>) {
        let outcome = if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(
                scope = scope.as_str(),
                retry_after_secs = retry_after.unwrap_or("unknown"),
                "Rate limit exceeded"
            );
            "throttled"
        } else {
            "allowed"
        };

        self.metrics
            .decisions_total
            .add(1, &[KeyValue::new("scope", scope.as_str()), KeyValue::new("outcome", outcome)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    fn extractor() -> IpKeyExtractor {
        IpKeyExtractor::new(vec!["10.0.0.0/8".parse().unwrap(), "127.0.0.1/32".parse().unwrap()])
    }

    #[test]
    fn test_untrusted_peer_ignores_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "1.2.3.4".parse().unwrap());
        let peer: IpAddr = "8.8.8.8".parse().unwrap();
        assert_eq!(extractor().identify_client_ip(&headers, peer), peer);
    }

    #[test]
    fn test_trusted_peer_uses_rightmost_untrusted_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "1.2.3.4, 5.6.7.8, 10.0.0.7".parse().unwrap());
        let peer: IpAddr = "127.0.0.1".parse().unwrap();
        let expected: IpAddr = "5.6.7.8".parse().unwrap();
        assert_eq!(extractor().identify_client_ip(&headers, peer), expected);
    }

    #[test]
    fn test_registration_scope_is_post_users_only() {
        assert_eq!(RateLimitScope::classify(&Method::POST, "/v1/users"), RateLimitScope::Registration);
        assert_eq!(RateLimitScope::classify(&Method::GET, "/v1/users/alice"), RateLimitScope::Api);
        assert_eq!(RateLimitScope::classify(&Method::POST, "/v1/messages/send"), RateLimitScope::Api);
    }

    #[test]
    fn test_trusted_peer_without_header_is_client() {
        let peer: IpAddr = "10.1.2.3".parse().unwrap();
        assert_eq!(extractor().identify_client_ip(&HeaderMap::new(), peer), peer);
    }
}
