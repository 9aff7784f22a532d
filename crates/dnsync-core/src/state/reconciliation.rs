// # Reconciliation State
//
// In-memory snapshot of desired vs. published addresses for every managed
// record, plus the readiness latch.
//
// ## Lifetime
//
// Created at startup from the static configuration and dropped at process
// exit. Nothing is persisted: after a restart `ready` is false and every
// published value is absent until the first populate pass completes.
//
// ## Concurrency
//
// - Each record sits behind its own mutex, so writers to one record are
//   serialized while different records proceed independently.
// - Desired addresses are shared per family behind a read-write lock.
// - `ready` is an atomic one-way latch; readers must tolerate it flipping
//   at any time.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};

use crate::config::{AddressFamily, SyncConfig};
use crate::state::record::{RecordSnapshot, RecordState};

/// Current public addresses, shared by every record of a family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DesiredAddresses {
    /// Last successfully resolved IPv4 address
    pub ipv4: Option<Ipv4Addr>,
    /// Last successfully resolved IPv6 address
    pub ipv6: Option<Ipv6Addr>,
}

impl DesiredAddresses {
    /// Desired address for a family
    pub fn for_family(&self, family: AddressFamily) -> Option<IpAddr> {
        match family {
            AddressFamily::V4 => self.ipv4.map(IpAddr::V4),
            AddressFamily::V6 => self.ipv6.map(IpAddr::V6),
        }
    }
}

/// Process-wide reconciliation state
#[derive(Debug)]
pub struct ReconciliationState {
    ipv6_enabled: bool,
    desired: RwLock<DesiredAddresses>,
    records: Vec<Mutex<RecordState>>,
    ready: AtomicBool,
}

impl ReconciliationState {
    /// Create the state for a configuration (one entry per record, in order)
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            ipv6_enabled: config.ipv6_enabled,
            desired: RwLock::new(DesiredAddresses::default()),
            records: config
                .records
                .iter()
                .cloned()
                .map(|record| Mutex::new(RecordState::new(record)))
                .collect(),
            ready: AtomicBool::new(false),
        }
    }

    /// IPv4 is always managed
    pub fn ipv4_enabled(&self) -> bool {
        true
    }

    /// Whether IPv6 support was enabled at startup
    pub fn ipv6_enabled(&self) -> bool {
        self.ipv6_enabled
    }

    /// Whether a family is managed at all
    pub fn family_enabled(&self, family: AddressFamily) -> bool {
        match family {
            AddressFamily::V4 => self.ipv4_enabled(),
            AddressFamily::V6 => self.ipv6_enabled(),
        }
    }

    /// Whether at least one full populate pass has completed
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Close the readiness latch
    ///
    /// Returns `true` only for the call that flipped it.
    pub(crate) fn mark_ready(&self) -> bool {
        !self.ready.swap(true, Ordering::AcqRel)
    }

    /// Current desired addresses
    pub async fn desired(&self) -> DesiredAddresses {
        *self.desired.read().await
    }

    /// Store a freshly resolved IPv4 address, returning the previous one
    pub(crate) async fn set_desired_ipv4(&self, ip: Ipv4Addr) -> Option<Ipv4Addr> {
        self.desired.write().await.ipv4.replace(ip)
    }

    /// Store a freshly resolved IPv6 address, returning the previous one
    pub(crate) async fn set_desired_ipv6(&self, ip: Ipv6Addr) -> Option<Ipv6Addr> {
        self.desired.write().await.ipv6.replace(ip)
    }

    /// Per-record state, in configuration order
    pub(crate) fn records(&self) -> &[Mutex<RecordState>] {
        &self.records
    }

    /// Number of managed records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are managed
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Snapshot of every record, in configuration order
    pub async fn snapshot(&self) -> Vec<RecordSnapshot> {
        let desired = self.desired().await;
        let mut snapshots = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let record = record.lock().await;
            let family = record.config().record_type.family();
            snapshots.push(record.snapshot(desired.for_family(family)));
        }
        snapshots
    }
}
