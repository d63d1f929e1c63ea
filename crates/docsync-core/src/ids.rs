//! Identifier generation
//!
//! Only the authoritative side mints identifiers. Observers adopt whatever
//! identifiers arrive in snapshots and publish messages.

use crate::model::NodeId;

/// Which end of a synchronised tree this registry is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Owns the tree and assigns identifiers on registration
    #[default]
    Authoritative,
    /// Mirrors a remote tree; never generates identifiers
    Observer,
}

/// Source of fresh node identifiers
pub trait IdSource {
    /// Produce an identifier never produced before by this source
    fn next_id(&mut self) -> NodeId;
}

/// Time-ordered UUIDv7 identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV7IdSource;

impl IdSource for UuidV7IdSource {
    fn next_id(&mut self) -> NodeId {
        NodeId::new(uuid::Uuid::now_v7().to_string())
    }
}

/// Deterministic `prefix-<n>` identifiers, for tests and fixtures
#[derive(Debug, Clone)]
pub struct SequentialIdSource {
    prefix: String,
    next: u64,
}

impl SequentialIdSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl IdSource for SequentialIdSource {
    fn next_id(&mut self) -> NodeId {
        let id = NodeId::new(format!("{}-{}", self.prefix, self.next));
        self.next += 1;
        id
    }
}
