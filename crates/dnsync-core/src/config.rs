//! Configuration types for dnsync
//!
//! Records are static: they are loaded once at startup and never mutated.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Longest accepted timer period, in seconds (about 136 years)
pub const MAX_INTERVAL_SECS: u64 = u32::MAX as u64;

/// Main dnsync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// DNS records to manage
    pub records: Vec<RecordConfig>,

    /// Whether AAAA records are resolved and written
    #[serde(default)]
    pub ipv6_enabled: bool,

    /// Timer settings
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Capacity of the reconciler event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SyncConfig {
    /// Create a configuration for the given records with default settings
    pub fn new(records: Vec<RecordConfig>) -> Self {
        Self {
            records,
            ipv6_enabled: false,
            schedule: ScheduleConfig::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Enable or disable IPv6 support
    pub fn with_ipv6(mut self, enabled: bool) -> Self {
        self.ipv6_enabled = enabled;
        self
    }

    /// Replace the timer settings
    pub fn with_schedule(mut self, schedule: ScheduleConfig) -> Self {
        self.schedule = schedule;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.records.is_empty() {
            return Err(Error::config("No records configured"));
        }

        let mut seen = HashSet::new();
        for record in &self.records {
            record.validate()?;
            if !seen.insert((
                record.zone_id.as_str(),
                record.normalized_domain(),
                record.record_type,
            )) {
                return Err(Error::config(format!("Duplicate record: {}", record)));
            }
        }

        if self.event_channel_capacity == 0 {
            return Err(Error::config("Event channel capacity must be > 0"));
        }

        self.schedule.validate()
    }
}

/// Timer configuration for the reconciler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// How often public addresses are re-resolved (in seconds)
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// How often drift is checked and corrected (in seconds)
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// Re-read published values from the provider after every refresh
    ///
    /// When disabled, published values are only read once at startup and
    /// afterwards tracked from successful writes.
    #[serde(default = "default_repopulate_on_refresh")]
    pub repopulate_on_refresh: bool,
}

impl ScheduleConfig {
    /// Validate the timer configuration
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            return Err(Error::config("Refresh interval must be > 0"));
        }
        if self.update_interval_secs == 0 {
            return Err(Error::config("Update interval must be > 0"));
        }
        if self.refresh_interval_secs > MAX_INTERVAL_SECS {
            return Err(Error::config(format!(
                "Refresh interval ({}s) exceeds the maximum of {}s",
                self.refresh_interval_secs, MAX_INTERVAL_SECS
            )));
        }
        if self.refresh_interval_secs < self.update_interval_secs {
            return Err(Error::config(format!(
                "Refresh interval ({}s) must not be shorter than update interval ({}s)",
                self.refresh_interval_secs, self.update_interval_secs
            )));
        }
        Ok(())
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            update_interval_secs: default_update_interval_secs(),
            repopulate_on_refresh: default_repopulate_on_refresh(),
        }
    }
}

/// A DNS record kept in sync with the public address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Opaque identifier of the managed zone
    pub zone_id: String,

    /// Fully-qualified record name (e.g. "home.example.com")
    pub domain: String,

    /// Record type
    pub record_type: RecordType,

    /// Time-to-live in seconds
    pub ttl: u32,
}

impl RecordConfig {
    /// Create a new record configuration
    pub fn new(
        zone_id: impl Into<String>,
        domain: impl Into<String>,
        record_type: RecordType,
        ttl: u32,
    ) -> Self {
        Self {
            zone_id: zone_id.into(),
            domain: domain.into(),
            record_type,
            ttl,
        }
    }

    /// Domain without a trailing dot, lowercased
    pub fn normalized_domain(&self) -> String {
        self.domain.trim_end_matches('.').to_ascii_lowercase()
    }

    /// Validate the record configuration
    pub fn validate(&self) -> Result<()> {
        if self.zone_id.trim().is_empty() {
            return Err(Error::config(format!(
                "Zone id cannot be empty for record {}",
                self.domain
            )));
        }
        if self.ttl == 0 {
            return Err(Error::config(format!(
                "TTL must be a positive number of seconds for record {}",
                self.domain
            )));
        }
        validate_domain_name(&self.domain)
    }
}

impl fmt::Display for RecordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.domain, self.record_type, self.zone_id)
    }
}

/// Parses the compact descriptor `zone_id:domain:type:ttl`
impl FromStr for RecordConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split(':').map(str::trim).collect();
        let [zone_id, domain, record_type, ttl] = parts.as_slice() else {
            return Err(Error::config(format!(
                "Record descriptor '{}' must have the form zone_id:domain:type:ttl",
                s.trim()
            )));
        };

        let ttl = ttl.parse::<u32>().map_err(|_| {
            Error::config(format!("Invalid TTL '{}' in record descriptor '{}'", ttl, s.trim()))
        })?;

        let record = Self::new(*zone_id, *domain, record_type.parse()?, ttl);
        record.validate()?;
        Ok(record)
    }
}

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    #[serde(rename = "A")]
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Address family served by this record type
    pub fn family(self) -> AddressFamily {
        match self {
            RecordType::A => AddressFamily::V4,
            RecordType::Aaaa => AddressFamily::V6,
        }
    }

    /// Wire name of the record type
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            _ => Err(Error::config(format!(
                "Unsupported record type '{}'. Supported types: A, AAAA",
                s
            ))),
        }
    }
}

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    /// IPv4
    V4,
    /// IPv6
    V6,
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("IPv4"),
            AddressFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks: total length, label length, allowed characters.
/// A single trailing dot (fully-qualified form) is accepted.
pub fn validate_domain_name(domain: &str) -> Result<()> {
    let name = domain.strip_suffix('.').unwrap_or(domain);

    if name.is_empty() {
        return Err(Error::config("Domain name cannot be empty"));
    }

    if name.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            name.len(),
            domain
        )));
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err(Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

fn default_refresh_interval_secs() -> u64 {
    1200
}

fn default_update_interval_secs() -> u64 {
    1
}

fn default_repopulate_on_refresh() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    1000
}
