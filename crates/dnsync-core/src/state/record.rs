// # Record State
//
// Mutable, per-record view of what the provider publishes.
//
// ## Staleness Rule
//
// `published` always holds either the value last read from the provider
// or the value most recently written successfully. Reads and writes run
// without holding the record lock across the remote call, so a read that
// started before a successful write could otherwise land after it and
// overwrite the written value. Every successful write bumps `write_epoch`;
// a read result is only applied if the epoch it started with is still
// current.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::IpAddr;

use crate::config::RecordConfig;

/// Synchronization status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Never read from (or written to) the provider
    Unknown,
    /// Published value matches the desired value, or there is nothing to compare against
    InSync,
    /// Published value differs from the desired value
    OutOfSync,
}

/// Per-record reconciliation state
#[derive(Debug, Clone)]
pub struct RecordState {
    config: RecordConfig,
    published: Option<IpAddr>,
    last_read_at: Option<DateTime<Utc>>,
    last_written_at: Option<DateTime<Utc>>,
    write_epoch: u64,
    consecutive_write_failures: u32,
}

impl RecordState {
    /// Create the state for a freshly configured record
    pub fn new(config: RecordConfig) -> Self {
        Self {
            config,
            published: None,
            last_read_at: None,
            last_written_at: None,
            write_epoch: 0,
            consecutive_write_failures: 0,
        }
    }

    /// The record's static configuration
    pub fn config(&self) -> &RecordConfig {
        &self.config
    }

    /// Value last observed at (or written to) the provider
    pub fn published(&self) -> Option<IpAddr> {
        self.published
    }

    /// Number of successful writes so far
    pub fn write_epoch(&self) -> u64 {
        self.write_epoch
    }

    /// Number of failed writes since the last successful one
    pub fn consecutive_write_failures(&self) -> u32 {
        self.consecutive_write_failures
    }

    /// Apply the result of a provider read that started at `epoch`
    ///
    /// `None` covers both "no such record" and a failed read.
    /// Returns `false` if a write completed while the read was in flight,
    /// in which case the written value is kept.
    pub(crate) fn apply_read(&mut self, value: Option<IpAddr>, epoch: u64) -> bool {
        if self.write_epoch != epoch {
            return false;
        }
        self.published = value;
        self.last_read_at = Some(Utc::now());
        true
    }

    /// Record a successful write
    pub(crate) fn apply_write(&mut self, value: IpAddr) {
        self.published = Some(value);
        self.last_written_at = Some(Utc::now());
        self.write_epoch += 1;
        self.consecutive_write_failures = 0;
    }

    /// Record a failed write; the published value is left untouched
    pub(crate) fn note_write_failure(&mut self) -> u32 {
        self.consecutive_write_failures += 1;
        self.consecutive_write_failures
    }

    /// Status of this record against the given desired value
    pub fn status(&self, desired: Option<IpAddr>) -> SyncStatus {
        if self.last_read_at.is_none() && self.last_written_at.is_none() {
            return SyncStatus::Unknown;
        }
        match desired {
            Some(desired) if self.published != Some(desired) => SyncStatus::OutOfSync,
            _ => SyncStatus::InSync,
        }
    }

    /// Read-only snapshot for reporting
    pub fn snapshot(&self, desired: Option<IpAddr>) -> RecordSnapshot {
        RecordSnapshot {
            config: self.config.clone(),
            desired,
            published: self.published,
            status: self.status(desired),
            last_read_at: self.last_read_at,
            last_written_at: self.last_written_at,
            consecutive_write_failures: self.consecutive_write_failures,
        }
    }
}

/// Point-in-time view of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSnapshot {
    pub config: RecordConfig,
    pub desired: Option<IpAddr>,
    pub published: Option<IpAddr>,
    pub status: SyncStatus,
    pub last_read_at: Option<DateTime<Utc>>,
    pub last_written_at: Option<DateTime<Utc>>,
    pub consecutive_write_failures: u32,
}
