use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::Result;
use crate::model::{Attributes, NodeId};

/// Serializable image of a model and, optionally, its descendants
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Option<NodeId>,

    /// Ephemeral correlation tag of the exporting node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,

    #[serde(default)]
    pub attrs: Attributes,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub collections: BTreeMap<String, CollectionSnapshot>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub models: BTreeMap<String, Snapshot>,
}

/// Serializable image of a child collection, members in position order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub id: Option<NodeId>,
    #[serde(default)]
    pub models: Vec<Snapshot>,
}

impl Snapshot {
    /// Copy with every correlation tag removed, recursively
    pub fn without_correlation(&self) -> Snapshot {
        Snapshot {
            id: self.id.clone(),
            cid: None,
            attrs: self.attrs.clone(),
            collections: self
                .collections
                .iter()
                .map(|(label, coll)| {
                    (
                        label.clone(),
                        CollectionSnapshot {
                            id: coll.id.clone(),
                            models: coll.models.iter().map(Snapshot::without_correlation).collect(),
                        },
                    )
                })
                .collect(),
            models: self
                .models
                .iter()
                .map(|(label, child)| (label.clone(), child.without_correlation()))
                .collect(),
        }
    }

    /// SHA-256 digest of the correlation-free canonical JSON
    ///
    /// # Errors
    /// * `Serialization` - JSON encoding failed
    pub fn digest(&self) -> Result<String> {
        super::digest::compute_snapshot_digest(self)
    }

    /// Total number of models in this snapshot, itself included
    pub fn model_count(&self) -> usize {
        1 + self
            .collections
            .values()
            .flat_map(|coll| coll.models.iter())
            .map(Snapshot::model_count)
            .sum::<usize>()
            + self.models.values().map(Snapshot::model_count).sum::<usize>()
    }
}
