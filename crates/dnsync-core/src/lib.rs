// # dnsync-core
//
// Core library for keeping DNS records in sync with the host's public
// addresses.
//
// ## Architecture Overview
//
// - **AddressResolver**: Trait for discovering the current public IPv4/IPv6 address
// - **ZoneRecordStore**: Trait for reading and writing record values at a DNS provider
// - **ReconciliationState**: Desired vs. published addresses per record, plus the readiness latch
// - **Reconciler**: Orchestrates the refresh → populate → update cycle and its two timers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Reconciliation logic is separate from provider/resolver implementations
// 2. **Injected State**: Records are owned by the reconciler instance, never module-level globals
// 3. **Idempotency**: Nothing is written while published and desired values match
// 4. **Per-Record Isolation**: One record's failure never blocks another
// 5. **Library-First**: All core functionality can be used as a library

pub mod config;
pub mod engine;
pub mod error;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{AddressFamily, RecordConfig, RecordType, ScheduleConfig, SyncConfig};
pub use engine::{Reconciler, ReconcilerEvent};
pub use error::{Error, Result};
pub use state::{ReconciliationState, RecordSnapshot, SyncStatus};
pub use traits::{AddressResolver, ZoneRecordStore};
