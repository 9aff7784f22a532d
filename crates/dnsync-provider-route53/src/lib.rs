// # Route 53 Zone Store
//
// This crate provides an Amazon Route 53 implementation of `ZoneRecordStore`.
//
// ## Behavior
//
// - `list_value`: one ListResourceRecordSets call starting at the record's
//   name and type; the record is absent unless the first set returned is
//   that exact name and type
// - `upsert_value`: one ChangeResourceRecordSets call carrying a single
//   UPSERT change, so no lookup is needed before writing
// - Dry-run mode skips the change call and only logs it
//
// ## Constraints
//
// - SDK retries are disabled: the reconciler retries on its next tick
// - No background tasks
// - Credentials never appear in logs, errors or Debug output
//
// ## Credentials
//
// Either an explicit access key pair, or the standard AWS provider chain
// (environment, shared config files, instance metadata) via `aws-config`.
//
// ## API Reference
//
// - Route 53 API: https://docs.aws.amazon.com/Route53/latest/APIReference/
// - List: GET `/2013-04-01/hostedzone/:zone_id/rrset?name=...&type=...`
// - Change: POST `/2013-04-01/hostedzone/:zone_id/rrset/`

use async_trait::async_trait;
use aws_sdk_route53::config::retry::RetryConfig;
use aws_sdk_route53::config::timeout::TimeoutConfig;
use aws_sdk_route53::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_route53::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_route53::types::{
    Change, ChangeAction, ChangeBatch, ResourceRecord, ResourceRecordSet, RrType,
};
use dnsync_core::config::RecordType;
use dnsync_core::traits::ZoneRecordStore;
use dnsync_core::{Error, Result};
use std::net::IpAddr;
use std::time::Duration;

/// Region Route 53 requests are signed for
pub const ROUTE53_REGION: &str = "us-east-1";

/// Default timeout for one API operation (30 seconds)
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Comment attached to every change batch
const CHANGE_COMMENT: &str = "dnsync";

/// Amazon Route 53 zone record store
///
/// Zone ids are Route 53 hosted zone ids (e.g. `Z9MU7KVGUBNBY`).
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the store will:
/// - Perform all list requests
/// - Log the intended UPSERT
/// - **NOT** actually modify DNS records
pub struct Route53ZoneStore {
    client: aws_sdk_route53::Client,
    dry_run: bool,
}

// The SDK client carries credentials; keep it out of Debug output
impl std::fmt::Debug for Route53ZoneStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53ZoneStore")
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Route53ZoneStore {
    /// Start building a store
    pub fn builder() -> Route53ZoneStoreBuilder {
        Route53ZoneStoreBuilder::default()
    }

    /// Whether writes are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Builder for [`Route53ZoneStore`]
///
/// # Example
///
/// ```ignore
/// let store = Route53ZoneStore::builder()
///     .credentials(access_key, secret_key)
///     .dry_run(false)
///     .build()
///     .await?;
/// ```
#[derive(Default)]
pub struct Route53ZoneStoreBuilder {
    credentials: Option<(String, String)>,
    endpoint_url: Option<String>,
    dry_run: bool,
}

impl std::fmt::Debug for Route53ZoneStoreBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53ZoneStoreBuilder")
            .field("credentials", &self.credentials.as_ref().map(|_| "<REDACTED>"))
            .field("endpoint_url", &self.endpoint_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Route53ZoneStoreBuilder {
    /// Use an explicit access key pair instead of the AWS provider chain
    pub fn credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.credentials = Some((access_key.into(), secret_key.into()));
        self
    }

    /// Send requests to a different endpoint (overridable for tests)
    pub fn endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Only log writes
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Build the store
    ///
    /// Without explicit credentials this loads the shared AWS configuration,
    /// which may read files and the environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if an explicit key is empty.
    pub async fn build(self) -> Result<Route53ZoneStore> {
        let builder = match self.credentials {
            Some((access_key, secret_key)) => {
                if access_key.trim().is_empty() || secret_key.trim().is_empty() {
                    return Err(Error::config(
                        "Route 53 access key and secret key cannot be empty",
                    ));
                }
                aws_sdk_route53::Config::builder()
                    .behavior_version(BehaviorVersion::latest())
                    .credentials_provider(Credentials::new(
                        access_key, secret_key, None, None, "dnsync",
                    ))
            }
            None => {
                let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
                aws_sdk_route53::config::Builder::from(&shared)
            }
        };

        let mut builder = builder
            .region(Region::new(ROUTE53_REGION))
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(DEFAULT_OPERATION_TIMEOUT)
                    .build(),
            );
        if let Some(endpoint_url) = self.endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        if self.dry_run {
            tracing::warn!("Route 53 store running in DRY-RUN mode - no changes will be made");
        }

        Ok(Route53ZoneStore {
            client: aws_sdk_route53::Client::from_conf(builder.build()),
            dry_run: self.dry_run,
        })
    }
}

#[async_trait]
impl ZoneRecordStore for Route53ZoneStore {
    async fn list_value(
        &self,
        zone_id: &str,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Option<IpAddr>> {
        let name = record_name(domain);
        tracing::debug!(zone_id, domain = %name, %record_type, "Listing record sets");

        let output = self
            .client
            .list_resource_record_sets()
            .hosted_zone_id(zone_id)
            .start_record_name(&name)
            .start_record_type(rr_type(record_type))
            .send()
            .await
            .map_err(|e| map_sdk_error(&e, &format!("{} {}", record_type, name)))?;

        // Listing starts at the requested name and type, so a match is first
        let Some(set) = output
            .resource_record_sets()
            .first()
            .filter(|set| is_same_record(set, &name, record_type))
        else {
            tracing::debug!(zone_id, domain = %name, %record_type, "No published record");
            return Ok(None);
        };

        // Alias records carry no values
        let Some(record) = set.resource_records().first() else {
            return Ok(None);
        };

        let value = record.value().parse::<IpAddr>().map_err(|_| {
            Error::provider(
                "route53",
                format!("Record value is not an address: '{}'", record.value()),
            )
        })?;
        Ok(Some(value))
    }

    /// Create or overwrite a record with a single UPSERT change
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /2013-04-01/hostedzone/:zone_id/rrset/
    /// <ChangeBatch><Changes><Change><Action>UPSERT</Action>...</Change></Changes></ChangeBatch>
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

        let name = record_name(domain);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would UPSERT {} {} = {} (ttl {}) in zone {}",
                record_type,
                name,
                value,
                ttl,
                zone_id
            );
            return Ok(());
        }

        let batch = change_batch(&name, record_type, ttl, value)?;
        self.client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| map_sdk_error(&e, &format!("{} {}", record_type, name)))?;

        tracing::info!(
            zone_id,
            domain = %name,
            %record_type,
            %value,
            "DNS record written"
        );
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "route53"
    }
}

/// Record name as sent to Route 53: lowercase, no trailing dot
fn record_name(domain: &str) -> String {
    domain.trim_end_matches('.').to_ascii_lowercase()
}

fn rr_type(record_type: RecordType) -> RrType {
    match record_type {
        RecordType::A => RrType::A,
        RecordType::Aaaa => RrType::Aaaa,
    }
}

/// Route 53 answers with fully-qualified names
fn is_same_record(set: &ResourceRecordSet, name: &str, record_type: RecordType) -> bool {
    *set.r#type() == rr_type(record_type)
        && set.name().trim_end_matches('.').eq_ignore_ascii_case(name)
}

fn change_batch(
    name: &str,
    record_type: RecordType,
    ttl: u32,
    value: IpAddr,
) -> Result<ChangeBatch> {
    let record = ResourceRecord::builder()
        .value(value.to_string())
        .build()
        .map_err(build_error)?;

    let set = ResourceRecordSet::builder()
        .name(name)
        .r#type(rr_type(record_type))
        .ttl(i64::from(ttl))
        .resource_records(record)
        .build()
        .map_err(build_error)?;

    let change = Change::builder()
        .action(ChangeAction::Upsert)
        .resource_record_set(set)
        .build()
        .map_err(build_error)?;

    ChangeBatch::builder()
        .comment(CHANGE_COMMENT)
        .changes(change)
        .build()
        .map_err(build_error)
}

fn build_error(err: impl std::fmt::Display) -> Error {
    Error::provider("route53", format!("Failed to build change request: {}", err))
}

/// Map an SDK failure to an error
///
/// Service errors are classified by their AWS error code; anything without
/// a code never got an answer from Route 53.
fn map_sdk_error<E, R>(err: &SdkError<E, R>, target: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = err.message().unwrap_or("no message");
    match err.code() {
        Some(
            "AccessDenied"
            | "InvalidClientTokenId"
            | "SignatureDoesNotMatch"
            | "UnrecognizedClientException"
            | "ExpiredToken",
        ) => Error::auth(format!(
            "Invalid credentials or insufficient permissions: {}",
            message
        )),
        Some("NoSuchHostedZone") => {
            Error::not_found(format!("Hosted zone not found for {}", target))
        }
        Some("Throttling" | "ThrottlingException" | "PriorRequestNotComplete") => {
            Error::rate_limited(format!("Route 53 API rate limit exceeded: {}", message))
        }
        Some(code) => Error::provider(
            "route53",
            format!("Request for {} failed: {} - {}", target, code, message),
        ),
        None => Error::http(format!(
            "Request for {} failed: {}",
            target,
            DisplayErrorContext(err)
        )),
    }
}
