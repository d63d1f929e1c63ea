//! Snapshot codec
//!
//! A snapshot is the full serializable image of a model subtree. Observers
//! receive one on initial sync and merge it into their local tree; the
//! digest gives both sides a cheap way to compare state.
//!
//! Snapshots never contain owner back-references. Correlation tags are
//! process-local and are erased before digesting.

pub mod codec;
pub mod digest;
pub mod tree;

pub use codec::{export_snapshot, import_snapshot, ExportOptions, ImportOptions};
pub use digest::compute_snapshot_digest;
pub use tree::{CollectionSnapshot, Snapshot};
