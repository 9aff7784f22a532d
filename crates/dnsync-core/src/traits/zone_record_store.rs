// # Zone Record Store Trait
//
// Defines the interface for reading and writing record values at a DNS
// provider.
//
// ## Implementations
//
// - Cloudflare: `dnsync-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use dnsync_core::{RecordType, ZoneRecordStore};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* ZoneRecordStore implementation */;
//
//     let published = store.list_value("Z1", "db.example.com", RecordType::A).await?;
//     if published.is_none() {
//         store
//             .upsert_value("Z1", "db.example.com", RecordType::A, 600, "203.0.113.5".parse()?)
//             .await?;
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

use crate::config::RecordType;

/// Trait for DNS provider record access
///
/// Both operations are remote calls with no ordering or atomicity guarantee
/// across records. The reconciler treats every record independently.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to the provider's endpoints
/// - ✅ Parse provider-specific responses
///
/// ## Forbidden Capabilities
/// - ❌ Retry, back off or rate limit (owned by the reconciler's timers)
/// - ❌ Cache values between calls (owned by `ReconciliationState`)
/// - ❌ Decide whether a write is needed (owned by `Reconciler`)
/// - ❌ Spawn tasks
#[async_trait]
pub trait ZoneRecordStore: Send + Sync {
    /// Read the currently published value of a record
    ///
    /// # Returns
    ///
    /// - `Ok(Some(IpAddr))`: The published value
    /// - `Ok(None)`: No matching record exists yet (not an error)
    /// - `Err(Error)`: The provider could not be queried
    async fn list_value(
        &self,
        zone_id: &str,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Option<IpAddr>, crate::Error>;

    /// Create or replace the value of a record
    ///
    /// Must be idempotent: writing the value a record already has is safe.
    async fn upsert_value(
        &self,
        zone_id: &str,
        domain: &str,
        record_type: RecordType,
        ttl: u32,
        value: IpAddr,
    ) -> Result<(), crate::Error>;

    /// Store name (for logging)
    fn store_name(&self) -> &'static str;
}
