//! Persisted reconciliation state for the incident relay.
//!
//! The store is a small JSON snapshot keyed by incident id, rewritten
//! atomically after every mutation so a crash between cycles cannot lose a
//! confirmed delivery.

pub mod atomic_io;
pub mod reconciliation_store;

pub use atomic_io::replace_file_contents;
pub use reconciliation_store::{
    load_entries, read_snapshot, save_entries, ReconciliationEntries, ReconciliationEntry,
    ReconciliationStore,
};
