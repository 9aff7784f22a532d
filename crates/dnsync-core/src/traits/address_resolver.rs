// # Address Resolver Trait
//
// Defines the interface for discovering the caller's public addresses.
//
// ## Implementations
//
// - HTTP-based: `dnsync-ip-http` crate (plain-text "what is my IP" services)
//
// ## Usage
//
// ```rust,ignore
// use dnsync_core::AddressResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* AddressResolver implementation */;
//
//     let v4 = resolver.resolve_ipv4().await?;
//     println!("public IPv4: {}", v4);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Trait for public address discovery
///
/// Each call is a best-effort, network-bound lookup. Implementations do not
/// cache: the reconciler keeps the last successful result between refreshes
/// and decides when to ask again.
///
/// # Forbidden Capabilities
/// - ❌ Retry or back off internally (the next scheduled refresh is the retry)
/// - ❌ Touch the DNS provider or reconciliation state
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The current public address
    /// - `Err(Error::Resolution)`: If no address could be determined
    async fn resolve_ipv4(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Resolve the current public IPv6 address
    ///
    /// Only called when IPv6 support is enabled.
    async fn resolve_ipv6(&self) -> Result<Ipv6Addr, crate::Error>;

    /// Resolver name (for logging)
    fn resolver_name(&self) -> &'static str;
}
