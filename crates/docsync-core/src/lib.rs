//! docsync core - authoritative document trees kept in sync with observers
//!
//! This crate provides:
//! - A registry of nodes (models and ordered collections of models)
//! - The bubbling protocol that turns every mutation into one publish
//!   message at the root
//! - Snapshot export/import for initial sync and reconciliation
//! - An authorization gate for untrusted set/unset/delete/add/move/call
//!   requests, driven by per-type capability predicates
//! - Inbound command dispatch and an observer-side replica of published
//!   messages
//!
//! Everything is single-threaded and synchronous: a mutation and all the
//! publishes it causes complete before the call returns.

pub mod apply;
pub mod bubbling;
pub mod capability;
pub mod commands;
pub mod errors;
pub mod gate;
pub mod ids;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod registry;
pub mod snapshot;

pub use docsync_core_types;

// Re-export commonly used types
pub use apply::{apply_command, apply_published};
pub use bubbling::{Outbox, PublishMessage};
pub use capability::{CollectionType, ModelType, Requester};
pub use commands::Command;
pub use errors::{DocSyncError, ExError, ExErrorKind, Result};
pub use gate::{Denial, DenialKind, DenialSink, IgnoreDenials};
pub use ids::{IdSource, SequentialIdSource, Side, UuidV7IdSource};
pub use model::{Attributes, NodeId, NodeRef, TypeTag};
pub use registry::Registry;
pub use snapshot::{ExportOptions, ImportOptions, Snapshot};
