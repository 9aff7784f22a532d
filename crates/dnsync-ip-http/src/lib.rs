// # HTTP Address Resolver
//
// This crate provides an HTTP-based `AddressResolver` for dnsync.
//
// ## Architecture
//
// Each lookup is a single GET against a plain-text "what is my IP" service
// (one endpoint per address family). The body is trimmed and parsed as an
// address of the expected family.
//
// ## Constraints
//
// - No caching: the reconciler keeps the last good desired value
// - No retries: the next refresh tick is the retry
// - No background tasks

use dnsync_core::traits::AddressResolver;
use dnsync_core::{AddressFamily, Error, Result};

use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::time::Duration;

/// Default IPv4 lookup service
pub const DEFAULT_IPV4_URL: &str = "https://api.ipify.org";

/// Default IPv6 lookup service
pub const DEFAULT_IPV6_URL: &str = "https://api6.ipify.org";

/// Default HTTP timeout for a lookup
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-based public address resolver
#[derive(Debug, Clone)]
pub struct HttpAddressResolver {
    /// URL returning the public IPv4 address as plain text
    ipv4_url: String,

    /// URL returning the public IPv6 address as plain text
    ipv6_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpAddressResolver {
    /// Create a resolver using the default lookup services
    pub fn new() -> Result<Self> {
        Self::with_urls(DEFAULT_IPV4_URL, DEFAULT_IPV6_URL)
    }

    /// Create a resolver with custom lookup services
    ///
    /// # Parameters
    ///
    /// - `ipv4_url`: URL returning the public IPv4 address (e.g., "https://api.ipify.org")
    /// - `ipv6_url`: URL returning the public IPv6 address (e.g., "https://api6.ipify.org")
    pub fn with_urls(ipv4_url: impl Into<String>, ipv6_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            ipv4_url: ipv4_url.into(),
            ipv6_url: ipv6_url.into(),
            client,
        })
    }

    /// URL used for IPv4 lookups
    pub fn ipv4_url(&self) -> &str {
        &self.ipv4_url
    }

    /// URL used for IPv6 lookups
    pub fn ipv6_url(&self) -> &str {
        &self.ipv6_url
    }

    /// Fetch and parse an address from a lookup service
    async fn fetch<T: FromStr>(&self, url: &str, family: AddressFamily) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::resolution(family, format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::resolution(
                family,
                format!("{} returned HTTP {}", url, status),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::resolution(family, format!("Failed to read response: {}", e)))?;

        let body = body.trim();
        let address = body.parse::<T>().map_err(|_| {
            Error::resolution(family, format!("Not an {} address: '{}'", family, body))
        })?;

        tracing::debug!(%family, url, address = body, "Resolved public address");
        Ok(address)
    }
}

#[async_trait::async_trait]
impl AddressResolver for HttpAddressResolver {
    async fn resolve_ipv4(&self) -> Result<Ipv4Addr> {
        self.fetch(&self.ipv4_url, AddressFamily::V4).await
    }

    async fn resolve_ipv6(&self) -> Result<Ipv6Addr> {
        self.fetch(&self.ipv6_url, AddressFamily::V6).await
    }

    fn resolver_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver_for(server: &MockServer) -> HttpAddressResolver {
        HttpAddressResolver::with_urls(
            format!("{}/v4", server.uri()),
            format!("{}/v6", server.uri()),
        )
        .expect("client builds")
    }

    #[test]
    fn test_default_urls() {
        let resolver = HttpAddressResolver::new().expect("client builds");
        assert_eq!(resolver.ipv4_url(), DEFAULT_IPV4_URL);
        assert_eq!(resolver.ipv6_url(), DEFAULT_IPV6_URL);
        assert_eq!(resolver.resolver_name(), "http");
    }

    #[tokio::test]
    async fn test_resolves_both_families() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v4"))
            .respond_with(ResponseTemplate::new(200).set_body_string("203.0.113.5\n"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v6"))
            .respond_with(ResponseTemplate::new(200).set_body_string("2001:db8::5"))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);

        assert_eq!(
            resolver.resolve_ipv4().await.expect("IPv4 resolves"),
            Ipv4Addr::new(203, 0, 113, 5)
        );
        assert_eq!(
            resolver.resolve_ipv6().await.expect("IPv6 resolves"),
            "2001:db8::5".parse::<Ipv6Addr>().unwrap()
        );
    }

    #[tokio::test]
    async fn test_wrong_family_is_a_resolution_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v4"))
            .respond_with(ResponseTemplate::new(200).set_body_string("2001:db8::5"))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        let err = resolver.resolve_ipv4().await.unwrap_err();

        assert!(matches!(
            err,
            Error::Resolution {
                family: AddressFamily::V4,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_http_error_is_a_resolution_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v6"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        let err = resolver.resolve_ipv6().await.unwrap_err();

        assert!(matches!(
            err,
            Error::Resolution {
                family: AddressFamily::V6,
                ..
            }
        ));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_a_resolution_error() {
        // Nothing listens on the discard port
        let resolver =
            HttpAddressResolver::with_urls("http://127.0.0.1:9/", "http://127.0.0.1:9/")
                .expect("client builds");

        assert!(matches!(
            resolver.resolve_ipv4().await,
            Err(Error::Resolution { .. })
        ));
    }
}
