//! Digest computation for snapshots.
//!
//! Two trees hold the same state exactly when their digests match. The
//! digest covers identifiers, attributes, and member order; it ignores
//! correlation tags.

use sha2::{Digest, Sha256};

use super::tree::Snapshot;
use crate::errors::Result;

/// Compute the state digest of a snapshot.
///
/// Hex-encoded SHA-256 (64 characters) of the canonical JSON of the
/// snapshot with correlation tags erased. Attribute maps are ordered by key,
/// so insertion order never affects the result.
///
/// # Errors
///
/// Returns `DocSyncError::Serialization` if JSON serialization fails.
///
/// ```
/// use docsync_core::snapshot::{compute_snapshot_digest, Snapshot};
///
/// let digest = compute_snapshot_digest(&Snapshot::default()).unwrap();
/// assert_eq!(digest.len(), 64);
/// ```
pub fn compute_snapshot_digest(snapshot: &Snapshot) -> Result<String> {
    let canonical = serde_json::to_string(&snapshot.without_correlation())?;
    Ok(hash_string(&canonical))
}

fn hash_string(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
