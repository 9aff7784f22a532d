// # Cloudflare Zone Store
//
// This crate provides a Cloudflare implementation of `ZoneRecordStore`.
//
// ## Behavior
//
// - `list_value`: one GET filtered by name and type; the first match's
//   `content` is the published value, no match means absent
// - `upsert_value`: one GET to find the record id, then PUT to overwrite
//   it or POST to create it
// - Dry-run mode performs the lookups but only logs the write payload
//
// ## Constraints
//
// - No retry, backoff or caching: the reconciler retries on its next tick
// - No background tasks
// - The API token never appears in logs, errors or Debug output
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Overwrite DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dnsync_core::config::RecordType;
use dnsync_core::traits::ZoneRecordStore;
use dnsync_core::{Error, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Envelope of a list response
#[derive(Debug, Deserialize)]
struct ListResponse {
    result: Vec<DnsRecord>,
}

/// The subset of a DNS record the store needs
#[derive(Debug, Deserialize)]
struct DnsRecord {
    id: String,
    content: String,
}

/// Body of a create or overwrite request
#[derive(Debug, Serialize)]
struct RecordPayload<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: String,
    ttl: u32,
}

/// Cloudflare zone record store
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the store will:
/// - Perform all GET requests (record lookup)
/// - Log the intended PUT/POST payload
/// - **NOT** actually modify DNS records
///
/// # Security
///
/// The Debug implementation does NOT expose the API token.
pub struct CloudflareZoneStore {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL (overridable for tests)
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareZoneStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareZoneStore")
            .field("api_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareZoneStore {
    /// Create a new Cloudflare zone store
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `dry_run`: If true, perform lookups but skip writes
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the token is empty or the HTTP client
    /// cannot be built.
    pub fn new(api_token: impl Into<String>, dry_run: bool) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        if dry_run {
            tracing::warn!("Cloudflare store running in DRY-RUN mode - no changes will be made");
        }

        Ok(Self {
            api_token,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Point the store at a different API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether writes are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, zone_id)
    }

    /// Find the record matching a name and type
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=example.com&type=A
    /// Authorization: Bearer <token>
    /// ```
    async fn find_record(
        &self,
        zone_id: &str,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Option<DnsRecord>> {
        tracing::debug!(zone_id, domain, %record_type, "Looking up DNS record");

        let response = self
            .client
            .get(self.records_url(zone_id))
            .bearer_auth(&self.api_token)
            .query(&[("name", record_name(domain)), ("type", record_type.as_str())])
            .send()
            .await
            .map_err(|e| Error::http(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(map_status(status, &body, &format!("{} {}", record_type, domain)));
        }

        let list: ListResponse = response.json().await.map_err(|e| {
            Error::provider("cloudflare", format!("Failed to parse response: {}", e))
        })?;

        Ok(list.result.into_iter().next())
    }
}

#[async_trait]
impl ZoneRecordStore for CloudflareZoneStore {
    async fn list_value(
        &self,
        zone_id: &str,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Option<IpAddr>> {
        let Some(record) = self.find_record(zone_id, domain, record_type).await? else {
            tracing::debug!(zone_id, domain, %record_type, "No published record");
            return Ok(None);
        };

        let value = record.content.parse::<IpAddr>().map_err(|_| {
            Error::provider(
                "cloudflare",
                format!("Record content is not an address: '{}'", record.content),
            )
        })?;
        Ok(Some(value))
    }

    /// Create or overwrite a record
    ///
    /// # API Calls
    ///
    /// ```http
    /// # Find the record id
    /// GET /zones/:zone_id/dns_records?name=...&type=...
    ///
    /// # Overwrite when it exists (skipped in dry-run mode)
    /// PUT /zones/:zone_id/dns_records/:record_id
    ///
    /// # Create otherwise (skipped in dry-run mode)
    /// POST /zones/:zone_id/dns_records
    /// { "type": "A", "name": "...", "content": "1.2.3.4", "ttl": 600 }
    /// ```
    async fn upsert_value(
        &self,
        zone_id: &str,
        domain: &str,
        record_type: RecordType,
        ttl: u32,
        value: IpAddr,
    ) -> Result<()> {
        if value.is_ipv4() != (record_type == RecordType::A) {
            return Err(Error::invalid_input(format!(
                "{} is not a valid value for a {} record",
                value, record_type
            )));
        }

        let existing = self.find_record(zone_id, domain, record_type).await?;

        let payload = RecordPayload {
            record_type: record_type.as_str(),
            name: record_name(domain),
            content: value.to_string(),
            ttl,
        };

        let request = match &existing {
            Some(record) => self
                .client
                .put(format!("{}/{}", self.records_url(zone_id), record.id)),
            None => self.client.post(self.records_url(zone_id)),
        };

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would {} {} {} with payload: {}",
                if existing.is_some() { "overwrite" } else { "create" },
                record_type,
                domain,
                serde_json::to_string(&payload)?
            );
            return Ok(());
        }

        let response = request
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::http(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(map_status(status, &body, &format!("{} {}", record_type, domain)));
        }

        tracing::info!(
            zone_id,
            domain,
            %record_type,
            %value,
            created = existing.is_none(),
            "DNS record written"
        );
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Cloudflare stores names without the root label's trailing dot
fn record_name(domain: &str) -> &str {
    domain.strip_suffix('.').unwrap_or(domain)
}

async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string())
}

/// Map a non-success API status to an error
fn map_status(status: StatusCode, body: &str, target: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid API token or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("Zone or record not found for {}", target)),
        409 => Error::provider(
            "cloudflare",
            format!(
                "Conflict: {} is being modified elsewhere. Status: {}",
                target, status
            ),
        ),
        429 => Error::rate_limited(format!(
            "Cloudflare API rate limit exceeded. Status: {}",
            status
        )),
        500..=599 => Error::provider(
            "cloudflare",
            format!("Cloudflare server error (transient): {} - {}", status, body),
        ),
        _ => Error::provider(
            "cloudflare",
            format!("Request for {} failed: {} - {}", target, status, body),
        ),
    }
}
