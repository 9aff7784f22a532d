//! Collaborator traits for dnsync
//!
//! The reconciler only talks to the outside world through these interfaces.
//!
//! - [`AddressResolver`]: discover the current public IPv4/IPv6 address
//! - [`ZoneRecordStore`]: read and write record values at the DNS provider

pub mod address_resolver;
pub mod zone_record_store;

pub use address_resolver::AddressResolver;
pub use zone_record_store::ZoneRecordStore;
