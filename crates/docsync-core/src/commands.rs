//! Inbound command messages
//!
//! Observers ask the authoritative side for changes with these messages;
//! [`crate::apply::apply_command`] routes each one through the gate. The
//! constructors are what an observer uses to build requests against its
//! local mirror.

use serde::{Deserialize, Serialize};

use crate::errors::{DocSyncError, Result};
use crate::model::{Attributes, NodeId, NodeRef};
use crate::registry::Registry;

/// Request from an untrusted party, tagged by `event` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Command {
    /// Set attributes on a model
    Set { id: NodeId, change: Attributes },
    /// Remove one attribute from a model
    Unset { id: NodeId, property: String },
    /// Delete a model from its collection
    Delete { id: NodeId },
    /// Create a member; `id` names the collection
    Add { id: NodeId, data: Attributes },
    /// Reorder a collection
    Move {
        collection: NodeId,
        id: NodeId,
        #[serde(rename = "newPosition")]
        new_position: usize,
    },
    /// Invoke an exposed zero-argument method
    Method { id: NodeId, method: String },
}

impl Command {
    pub fn set(id: impl Into<NodeId>, change: Attributes) -> Self {
        Command::Set {
            id: id.into(),
            change,
        }
    }

    pub fn unset(id: impl Into<NodeId>, property: impl Into<String>) -> Self {
        Command::Unset {
            id: id.into(),
            property: property.into(),
        }
    }

    pub fn delete(id: impl Into<NodeId>) -> Self {
        Command::Delete { id: id.into() }
    }

    pub fn add(collection: impl Into<NodeId>, data: Attributes) -> Self {
        Command::Add {
            id: collection.into(),
            data,
        }
    }

    pub fn move_item(
        collection: impl Into<NodeId>,
        id: impl Into<NodeId>,
        new_position: usize,
    ) -> Self {
        Command::Move {
            collection: collection.into(),
            id: id.into(),
            new_position,
        }
    }

    pub fn method(id: impl Into<NodeId>, method: impl Into<String>) -> Self {
        Command::Method {
            id: id.into(),
            method: method.into(),
        }
    }

    /// Request flipping `attribute` on a mirrored model
    ///
    /// Reads the local value, so the request carries the negation of what
    /// this side currently sees.
    ///
    /// # Errors
    /// * `NodeNotFound` - the model has no identifier yet
    pub fn toggle(registry: &Registry, model: NodeRef, attribute: &str) -> Result<Self> {
        let id = registry
            .identifier(model)
            .cloned()
            .ok_or_else(|| DocSyncError::NodeNotFound {
                id: model.to_string(),
            })?;
        let next = !registry.attributes(model)?.is_truthy(attribute);
        Ok(Command::set(id, Attributes::new().with(attribute, next)))
    }

    /// Wire tag of the command
    pub fn event(&self) -> &'static str {
        match self {
            Command::Set { .. } => "set",
            Command::Unset { .. } => "unset",
            Command::Delete { .. } => "delete",
            Command::Add { .. } => "add",
            Command::Move { .. } => "move",
            Command::Method { .. } => "method",
        }
    }

    /// Identifier of the node the command targets
    pub fn target(&self) -> &NodeId {
        match self {
            Command::Set { id, .. }
            | Command::Unset { id, .. }
            | Command::Delete { id }
            | Command::Add { id, .. }
            | Command::Method { id, .. } => id,
            Command::Move { collection, .. } => collection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shapes() {
        assert_eq!(
            serde_json::to_value(Command::set("p1", Attributes::new().with("title", "x"))).unwrap(),
            json!({"event": "set", "id": "p1", "change": {"title": "x"}})
        );
        assert_eq!(
            serde_json::to_value(Command::move_item("c1", "p1", 0)).unwrap(),
            json!({"event": "move", "collection": "c1", "id": "p1", "newPosition": 0})
        );
        assert_eq!(
            serde_json::to_value(Command::method("u1", "dance")).unwrap(),
            json!({"event": "method", "id": "u1", "method": "dance"})
        );
    }

    #[test]
    fn test_parses_add_and_unset() {
        let add: Command =
            serde_json::from_value(json!({"event": "add", "id": "posts", "data": {"title": "t"}}))
                .unwrap();
        assert_eq!(add.event(), "add");
        assert_eq!(add.target(), &NodeId::new("posts"));

        let unset: Command =
            serde_json::from_value(json!({"event": "unset", "id": "p1", "property": "title"}))
                .unwrap();
        assert_eq!(unset, Command::unset("p1", "title"));
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let parsed: std::result::Result<Command, _> =
            serde_json::from_value(json!({"event": "explode", "id": "x"}));
        assert!(parsed.is_err());
    }
}
