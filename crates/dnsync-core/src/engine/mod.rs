//! Reconciler
//!
//! The Reconciler keeps published DNS values converged on the current
//! public addresses. It is responsible for:
//! - Refreshing desired addresses via `AddressResolver`
//! - Populating published values via `ZoneRecordStore::list_value`
//! - Correcting drift via `ZoneRecordStore::upsert_value`
//! - Driving the refresh and update timers
//!
//! ## Architecture
//!
//! ```text
//!  refresh timer (minutes)              update timer (seconds)
//!          │                                     │
//!          ▼                                     ▼
//! ┌─────────────────┐                   ┌─────────────────┐
//! │ refresh         │                   │ update          │
//! │ (AddressResolver)│                  │ (gated on ready)│
//! └─────────────────┘                   └─────────────────┘
//!          │                                     │
//!          ▼                                     │
//! ┌─────────────────┐   ┌──────────────────────┐ │
//! │ populate        │──▶│ ReconciliationState  │◀┘
//! │ (list_value)    │   │ desired / published  │──▶ upsert_value
//! └─────────────────┘   └──────────────────────┘
//! ```
//!
//! ## Startup
//!
//! 1. refresh (resolve desired addresses)
//! 2. populate (read published values, close the readiness latch)
//! 3. start both timers; the update loop opens with an immediate pass that
//!    writes every drifted record
//!
//! The two timers are not synchronized. Each runs as its own loop, so a hung
//! remote call stalls only the loop that made it, and ticks of one loop never
//! overlap each other.

use crate::config::{AddressFamily, MAX_INTERVAL_SECS, SyncConfig};
use crate::error::{Error, Result};
use crate::state::{DesiredAddresses, ReconciliationState, RecordState};
use crate::traits::{AddressResolver, ZoneRecordStore};
use futures::future::join_all;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilerEvent {
    /// Reconciler started
    Started { records_count: usize },

    /// A desired address was resolved
    AddressResolved {
        family: AddressFamily,
        address: IpAddr,
        previous: Option<IpAddr>,
    },

    /// Address resolution failed; the previous desired value is kept
    ResolutionFailed { family: AddressFamily, error: String },

    /// A published value was read from the provider
    RecordPopulated {
        record: String,
        published: Option<IpAddr>,
    },

    /// Reading a published value failed; the record is marked absent
    ListFailed { record: String, error: String },

    /// The first populate pass completed
    Ready,

    /// A drifted record was written
    UpdateSucceeded {
        record: String,
        previous: Option<IpAddr>,
        new: IpAddr,
    },

    /// Writing a drifted record failed; it is retried next tick
    UpdateFailed {
        record: String,
        error: String,
        consecutive_failures: u32,
    },

    /// Reconciler stopped
    Stopped { reason: String },
}

/// Summary of a refresh pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Families resolved successfully
    pub resolved: usize,
    /// Families that failed to resolve
    pub failed: usize,
    /// Whether any desired address changed
    pub changed: bool,
}

/// Summary of a populate pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateOutcome {
    /// Records whose published value was read
    pub read: usize,
    /// Records whose read failed
    pub failed: usize,
    /// Reads discarded because a write completed meanwhile
    pub superseded: usize,
    /// Whether this pass closed the readiness latch
    pub became_ready: bool,
}

/// Summary of an update pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// The pass was skipped because the first populate had not completed
    pub gated: bool,
    /// Records written
    pub written: usize,
    /// Records already matching their desired value
    pub unchanged: usize,
    /// Records whose write failed
    pub failed: usize,
    /// Records not compared (family disabled or no desired value yet)
    pub skipped: usize,
}

/// Summary of the startup sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartupOutcome {
    pub refresh: RefreshOutcome,
    pub populate: PopulateOutcome,
    pub update: UpdateOutcome,
}

enum RecordRead {
    Read,
    Failed,
    Superseded,
}

enum RecordWrite {
    Written,
    Unchanged,
    Failed,
    Skipped,
}

/// Core reconciler
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Start with [`Reconciler::run()`]
/// 3. Runs until a shutdown signal is received
///
/// The phases ([`refresh`](Reconciler::refresh), [`populate`](Reconciler::populate),
/// [`update`](Reconciler::update)) are public so embedders can drive them on
/// their own schedule.
pub struct Reconciler {
    /// Public address discovery
    resolver: Arc<dyn AddressResolver>,

    /// Provider record access
    store: Arc<dyn ZoneRecordStore>,

    /// Desired vs. published state, shared with observers
    state: Arc<ReconciliationState>,

    /// Refresh timer period
    refresh_every: Duration,

    /// Update timer period
    update_every: Duration,

    /// Re-read published values after every refresh tick
    repopulate_on_refresh: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcilerEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields reconciler events
    pub fn new(
        resolver: Arc<dyn AddressResolver>,
        store: Arc<dyn ZoneRecordStore>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcilerEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let reconciler = Self {
            resolver,
            store,
            state: Arc::new(ReconciliationState::new(&config)),
            refresh_every: Duration::from_secs(config.schedule.refresh_interval_secs),
            update_every: Duration::from_secs(config.schedule.update_interval_secs),
            repopulate_on_refresh: config.schedule.repopulate_on_refresh,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Override the timer periods
    ///
    /// Allows sub-second periods, which the configuration does not. Periods
    /// are capped at [`MAX_INTERVAL_SECS`] like the configured ones.
    pub fn with_intervals(mut self, refresh: Duration, update: Duration) -> Result<Self> {
        if refresh.is_zero() || update.is_zero() {
            return Err(Error::config("Timer periods must be non-zero"));
        }
        let max = Duration::from_secs(MAX_INTERVAL_SECS);
        if refresh > max || update > max {
            return Err(Error::config(format!(
                "Timer periods must not exceed {}s",
                MAX_INTERVAL_SECS
            )));
        }
        self.refresh_every = refresh;
        self.update_every = update;
        Ok(self)
    }

    /// Shared handle to the reconciliation state
    pub fn state(&self) -> Arc<ReconciliationState> {
        Arc::clone(&self.state)
    }

    /// Run the reconciler until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the reconciler until the given signal fires (or its sender is dropped)
    pub async fn run_with_shutdown(&self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        self.run_internal(Some(shutdown_rx)).await
    }

    async fn run_internal(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.emit_event(ReconcilerEvent::Started {
            records_count: self.state.len(),
        });
        info!(
            records = self.state.len(),
            resolver = self.resolver.resolver_name(),
            store = self.store.store_name(),
            ipv6_enabled = self.state.ipv6_enabled(),
            refresh_every = ?self.refresh_every,
            update_every = ?self.update_every,
            "Starting reconciler"
        );

        let work = async {
            self.refresh().await;
            self.populate().await;
            // The startup update is the first pass of the update loop, so a
            // hung write cannot hold back the refresh timer
            tokio::join!(self.refresh_loop(), self.update_loop());
        };

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };

        tokio::select! {
            _ = work => {
                warn!("Reconciler timers stopped unexpectedly");
                self.emit_event(ReconcilerEvent::Stopped {
                    reason: "Timers stopped".to_string(),
                });
            }
            _ = shutdown => {
                info!("Shutdown signal received, reconciler stopped");
                self.emit_event(ReconcilerEvent::Stopped {
                    reason: "Shutdown signal".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Run refresh, populate and update once, in that order
    pub async fn startup(&self) -> StartupOutcome {
        let refresh = self.refresh().await;
        let populate = self.populate().await;
        let update = self.update().await;

        info!(
            written = update.written,
            unchanged = update.unchanged,
            failed = update.failed + populate.failed,
            "Startup pass complete"
        );

        StartupOutcome {
            refresh,
            populate,
            update,
        }
    }

    async fn refresh_loop(&self) {
        let mut ticks = ticker(self.refresh_every);
        while ticks.next().await.is_some() {
            let outcome = self.refresh().await;
            debug!(?outcome, "Refresh tick complete");

            if self.repopulate_on_refresh {
                self.populate().await;
            }
        }
    }

    async fn update_loop(&self) {
        let outcome = self.update().await;
        info!(
            written = outcome.written,
            unchanged = outcome.unchanged,
            failed = outcome.failed,
            "Startup update pass complete"
        );

        let mut ticks = ticker(self.update_every);
        while ticks.next().await.is_some() {
            self.update().await;
        }
    }

    /// Refresh phase: resolve the desired address for every enabled family
    ///
    /// A failed resolution keeps the previous desired value. There is no
    /// immediate retry; the next refresh tick is the retry.
    pub async fn refresh(&self) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::default();

        match self.resolver.resolve_ipv4().await {
            Ok(ip) => {
                let previous = self.state.set_desired_ipv4(ip).await;
                self.note_resolved(
                    AddressFamily::V4,
                    IpAddr::V4(ip),
                    previous.map(IpAddr::V4),
                    &mut outcome,
                );
            }
            Err(e) => self.note_resolution_failure(AddressFamily::V4, e, &mut outcome),
        }

        if self.state.ipv6_enabled() {
            match self.resolver.resolve_ipv6().await {
                Ok(ip) => {
                    let previous = self.state.set_desired_ipv6(ip).await;
                    self.note_resolved(
                        AddressFamily::V6,
                        IpAddr::V6(ip),
                        previous.map(IpAddr::V6),
                        &mut outcome,
                    );
                }
                Err(e) => self.note_resolution_failure(AddressFamily::V6, e, &mut outcome),
            }
        } else {
            debug!("IPv6 disabled, skipping IPv6 resolution");
        }

        outcome
    }

    fn note_resolved(
        &self,
        family: AddressFamily,
        address: IpAddr,
        previous: Option<IpAddr>,
        outcome: &mut RefreshOutcome,
    ) {
        outcome.resolved += 1;

        if previous == Some(address) {
            debug!(%family, %address, "Public address unchanged");
            return;
        }

        outcome.changed = true;
        info!(%family, %address, previous = ?previous, "Public address changed");
        self.emit_event(ReconcilerEvent::AddressResolved {
            family,
            address,
            previous,
        });
    }

    fn note_resolution_failure(
        &self,
        family: AddressFamily,
        err: Error,
        outcome: &mut RefreshOutcome,
    ) {
        outcome.failed += 1;

        let err = match err {
            err @ Error::Resolution { .. } => err,
            other => Error::resolution(family, other.to_string()),
        };
        warn!(%family, error = %err, "Keeping previous desired address");
        self.emit_event(ReconcilerEvent::ResolutionFailed {
            family,
            error: err.to_string(),
        });
    }

    /// Populate phase: read the published value of every record
    ///
    /// Records are read concurrently and independently; a failed read marks
    /// only that record absent. The readiness latch closes once every read
    /// has finished, whatever the individual results.
    pub async fn populate(&self) -> PopulateOutcome {
        let reads = join_all(
            self.state
                .records()
                .iter()
                .map(|record| self.populate_record(record)),
        )
        .await;

        let mut outcome = PopulateOutcome::default();
        for read in reads {
            match read {
                RecordRead::Read => outcome.read += 1,
                RecordRead::Failed => outcome.failed += 1,
                RecordRead::Superseded => outcome.superseded += 1,
            }
        }

        if self.state.mark_ready() {
            outcome.became_ready = true;
            info!(
                read = outcome.read,
                failed = outcome.failed,
                "First populate pass complete, updates enabled"
            );
            self.emit_event(ReconcilerEvent::Ready);
        }

        debug!(?outcome, "Populate pass complete");
        outcome
    }

    async fn populate_record(&self, record: &Mutex<RecordState>) -> RecordRead {
        let (config, epoch) = {
            let guard = record.lock().await;
            (guard.config().clone(), guard.write_epoch())
        };

        let result = self
            .store
            .list_value(&config.zone_id, &config.domain, config.record_type)
            .await;

        let mut guard = record.lock().await;
        match result {
            Ok(published) => {
                if !guard.apply_read(published, epoch) {
                    debug!(record = %config, "Write completed during read, keeping written value");
                    return RecordRead::Superseded;
                }
                debug!(record = %config, published = ?published, "Read published value");
                self.emit_event(ReconcilerEvent::RecordPopulated {
                    record: config.to_string(),
                    published,
                });
                RecordRead::Read
            }
            Err(e) => {
                let err = Error::provider_list(config.to_string(), e.to_string());
                let applied = guard.apply_read(None, epoch);
                warn!(record = %config, error = %err, marked_absent = applied, "Failed to read published value");
                self.emit_event(ReconcilerEvent::ListFailed {
                    record: config.to_string(),
                    error: err.to_string(),
                });
                RecordRead::Failed
            }
        }
    }

    /// Update phase: write every record whose published value drifted
    ///
    /// No-op until the first populate pass has completed. AAAA records are
    /// never compared while IPv6 is disabled. A failed write leaves the
    /// published value untouched so the next tick retries it.
    pub async fn update(&self) -> UpdateOutcome {
        if !self.state.is_ready() {
            debug!("Not ready yet, skipping update");
            return UpdateOutcome {
                gated: true,
                ..UpdateOutcome::default()
            };
        }

        let desired = self.state.desired().await;
        let writes = join_all(
            self.state
                .records()
                .iter()
                .map(|record| self.update_record(record, desired)),
        )
        .await;

        let mut outcome = UpdateOutcome::default();
        for write in writes {
            match write {
                RecordWrite::Written => outcome.written += 1,
                RecordWrite::Unchanged => outcome.unchanged += 1,
                RecordWrite::Failed => outcome.failed += 1,
                RecordWrite::Skipped => outcome.skipped += 1,
            }
        }
        outcome
    }

    async fn update_record(
        &self,
        record: &Mutex<RecordState>,
        desired: DesiredAddresses,
    ) -> RecordWrite {
        let (config, published) = {
            let guard = record.lock().await;
            (guard.config().clone(), guard.published())
        };

        let family = config.record_type.family();
        if !self.state.family_enabled(family) {
            return RecordWrite::Skipped;
        }

        let Some(target) = desired.for_family(family) else {
            debug!(record = %config, "No desired {} address yet, skipping", family);
            return RecordWrite::Skipped;
        };

        if published == Some(target) {
            return RecordWrite::Unchanged;
        }

        info!(record = %config, published = ?published, desired = %target, "Drift detected, writing desired value");

        let result = self
            .store
            .upsert_value(
                &config.zone_id,
                &config.domain,
                config.record_type,
                config.ttl,
                target,
            )
            .await;

        let mut guard = record.lock().await;
        match result {
            Ok(()) => {
                guard.apply_write(target);
                info!(record = %config, value = %target, "Record updated");
                self.emit_event(ReconcilerEvent::UpdateSucceeded {
                    record: config.to_string(),
                    previous: published,
                    new: target,
                });
                RecordWrite::Written
            }
            Err(e) => {
                let failures = guard.note_write_failure();
                let err = Error::provider_write(config.to_string(), e.to_string());
                error!(record = %config, error = %err, consecutive_failures = failures, "Record update failed, retrying next tick");
                self.emit_event(ReconcilerEvent::UpdateFailed {
                    record: config.to_string(),
                    error: err.to_string(),
                    consecutive_failures: failures,
                });
                RecordWrite::Failed
            }
        }
    }

    /// Emit a reconciler event
    fn emit_event(&self, event: ReconcilerEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Interval stream whose first tick fires one period from now
///
/// Missed ticks are delayed rather than bursted, so a slow pass never
/// causes a pile-up of back-to-back passes.
fn ticker(period: Duration) -> IntervalStream {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    IntervalStream::new(interval)
}
