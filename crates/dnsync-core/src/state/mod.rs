// # Reconciliation State
//
// In-memory state owned by the reconciler: the readiness latch, the shared
// desired addresses and one `RecordState` per configured record.

pub mod reconciliation;
pub mod record;

pub use reconciliation::{DesiredAddresses, ReconciliationState};
pub use record::{RecordSnapshot, RecordState, SyncStatus};
