//! Test doubles and common utilities for reconciler contract tests
//!
//! The doubles record every call and let a test script failures per
//! record, without any network access.

#![allow(dead_code)]

use dnsync_core::config::{RecordConfig, RecordType, SyncConfig};
use dnsync_core::error::{Error, Result};
use dnsync_core::traits::{AddressResolver, ZoneRecordStore};
use dnsync_core::{AddressFamily, ReconcilerEvent};
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// An AddressResolver whose answers are set by the test
///
/// `None` makes the corresponding call fail.
pub struct ScriptedResolver {
    ipv4: Mutex<Option<Ipv4Addr>>,
    ipv6: Mutex<Option<Ipv6Addr>>,
    ipv4_calls: AtomicUsize,
    ipv6_calls: AtomicUsize,
}

impl ScriptedResolver {
    pub fn new(ipv4: Option<Ipv4Addr>, ipv6: Option<Ipv6Addr>) -> Arc<Self> {
        Arc::new(Self {
            ipv4: Mutex::new(ipv4),
            ipv6: Mutex::new(ipv6),
            ipv4_calls: AtomicUsize::new(0),
            ipv6_calls: AtomicUsize::new(0),
        })
    }

    pub fn ipv4_only(ip: &str) -> Arc<Self> {
        Self::new(Some(ip.parse().unwrap()), None)
    }

    pub fn set_ipv4(&self, ip: Option<Ipv4Addr>) {
        *self.ipv4.lock().unwrap() = ip;
    }

    pub fn set_ipv6(&self, ip: Option<Ipv6Addr>) {
        *self.ipv6.lock().unwrap() = ip;
    }

    pub fn ipv4_calls(&self) -> usize {
        self.ipv4_calls.load(Ordering::SeqCst)
    }

    pub fn ipv6_calls(&self) -> usize {
        self.ipv6_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressResolver for ScriptedResolver {
    async fn resolve_ipv4(&self) -> Result<Ipv4Addr> {
        self.ipv4_calls.fetch_add(1, Ordering::SeqCst);
        self.ipv4
            .lock()
            .unwrap()
            .ok_or_else(|| Error::resolution(AddressFamily::V4, "lookup service unreachable"))
    }

    async fn resolve_ipv6(&self) -> Result<Ipv6Addr> {
        self.ipv6_calls.fetch_add(1, Ordering::SeqCst);
        // Deliberately not a Resolution error: the reconciler must wrap it
        self.ipv6
            .lock()
            .unwrap()
            .ok_or_else(|| Error::http("connection reset"))
    }

    fn resolver_name(&self) -> &'static str {
        "scripted"
    }
}

/// One recorded upsert_value() call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertCall {
    pub zone_id: String,
    pub domain: String,
    pub record_type: RecordType,
    pub ttl: u32,
    pub value: IpAddr,
}

type RecordKey = (String, String, RecordType);

fn key(zone_id: &str, domain: &str, record_type: RecordType) -> RecordKey {
    (zone_id.to_string(), domain.to_string(), record_type)
}

/// An in-memory ZoneRecordStore that records calls and injects failures
pub struct RecordingZoneStore {
    published: Mutex<HashMap<RecordKey, IpAddr>>,
    failing_lists: Mutex<HashSet<RecordKey>>,
    failing_writes: Mutex<HashSet<RecordKey>>,
    write_delay: Mutex<Option<Duration>>,
    list_delay: Mutex<Option<Duration>>,
    upserts: Mutex<Vec<UpsertCall>>,
    upsert_attempts: AtomicUsize,
    list_calls: AtomicUsize,
}

impl RecordingZoneStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            published: Mutex::new(HashMap::new()),
            failing_lists: Mutex::new(HashSet::new()),
            failing_writes: Mutex::new(HashSet::new()),
            write_delay: Mutex::new(None),
            list_delay: Mutex::new(None),
            upserts: Mutex::new(Vec::new()),
            upsert_attempts: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
        })
    }

    /// Pretend the provider already publishes `value` for a record
    pub fn publish(&self, record: &RecordConfig, value: &str) {
        self.published.lock().unwrap().insert(
            key(&record.zone_id, &record.domain, record.record_type),
            value.parse().unwrap(),
        );
    }

    pub fn fail_lists_for(&self, record: &RecordConfig) {
        self.failing_lists
            .lock()
            .unwrap()
            .insert(key(&record.zone_id, &record.domain, record.record_type));
    }

    pub fn fail_writes_for(&self, record: &RecordConfig) {
        self.failing_writes
            .lock()
            .unwrap()
            .insert(key(&record.zone_id, &record.domain, record.record_type));
    }

    pub fn heal_writes_for(&self, record: &RecordConfig) {
        self.failing_writes
            .lock()
            .unwrap()
            .remove(&key(&record.zone_id, &record.domain, record.record_type));
    }

    /// Make every upsert hang for `delay` before answering
    pub fn delay_writes(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = Some(delay);
    }

    /// Make every list answer `delay` late, with the value it saw on arrival
    pub fn delay_lists(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    /// Successful upserts, in order
    pub fn upserts(&self) -> Vec<UpsertCall> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.lock().unwrap().len()
    }

    /// All upsert attempts, successful or not
    pub fn upsert_attempts(&self) -> usize {
        self.upsert_attempts.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ZoneRecordStore for RecordingZoneStore {
    async fn list_value(
        &self,
        zone_id: &str,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Option<IpAddr>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let key = key(zone_id, domain, record_type);
        if self.failing_lists.lock().unwrap().contains(&key) {
            return Err(Error::provider("recording", "503 Service Unavailable"));
        }
        let value = self.published.lock().unwrap().get(&key).copied();

        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(value)
    }

    async fn upsert_value(
        &self,
        zone_id: &str,
        domain: &str,
        record_type: RecordType,
        ttl: u32,
        value: IpAddr,
    ) -> Result<()> {
        self.upsert_attempts.fetch_add(1, Ordering::SeqCst);

        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let key = key(zone_id, domain, record_type);
        if self.failing_writes.lock().unwrap().contains(&key) {
            return Err(Error::rate_limited("429 Too Many Requests"));
        }

        self.published.lock().unwrap().insert(key, value);
        self.upserts.lock().unwrap().push(UpsertCall {
            zone_id: zone_id.to_string(),
            domain: domain.to_string(),
            record_type,
            ttl,
            value,
        });
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "recording"
    }
}

pub fn a_record(domain: &str) -> RecordConfig {
    RecordConfig::new("Z1", domain, RecordType::A, 600)
}

pub fn aaaa_record(domain: &str) -> RecordConfig {
    RecordConfig::new("Z1", domain, RecordType::Aaaa, 600)
}

/// Configuration for the given records with IPv6 disabled
pub fn config_for(records: &[RecordConfig]) -> SyncConfig {
    SyncConfig::new(records.to_vec())
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// Collect every event currently buffered in the channel
pub fn drain_events(rx: &mut mpsc::Receiver<ReconcilerEvent>) -> Vec<ReconcilerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
