//! Bubbling protocol
//!
//! Every mutation raises exactly one [`LocalEvent`] on the node it touched.
//! [`raise`] turns that event into a [`PublishMessage`] and delivers it on
//! each node from the origin up to the root, unchanged. A transport
//! subscribes at the root and forwards what it receives.
//!
//! Collections never publish their own structural events. The model owning
//! a collection converts `Add`/`Remove`/`Move` into publish messages, so a
//! collection without an owner publishes nothing.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::errors::Result;
use crate::model::{Attributes, NodeId, NodeRef};
use crate::registry::Registry;
use crate::snapshot::{self, ExportOptions, Snapshot};

/// Outbound message, as delivered to the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum PublishMessage {
    /// Full attribute set of a model after a change
    Change {
        id: Option<NodeId>,
        data: Attributes,
    },
    /// A model was appended to a collection
    Add {
        data: Snapshot,
        collection: Option<NodeId>,
    },
    /// A model was taken out of its collection
    Remove { id: Option<NodeId> },
    /// A model changed position within its collection
    Move {
        collection: Option<NodeId>,
        id: NodeId,
        #[serde(rename = "newPosition")]
        new_position: usize,
    },
}

impl PublishMessage {
    /// Wire tag of the message
    pub fn event(&self) -> &'static str {
        match self {
            PublishMessage::Change { .. } => "change",
            PublishMessage::Add { .. } => "add",
            PublishMessage::Remove { .. } => "remove",
            PublishMessage::Move { .. } => "move",
        }
    }
}

/// Event raised on the node a mutation touched
#[derive(Debug, Clone, PartialEq)]
pub enum LocalEvent {
    Change {
        node: NodeRef,
    },
    Add {
        collection: NodeRef,
        model: NodeRef,
    },
    Remove {
        collection: NodeRef,
        id: Option<NodeId>,
    },
    Move {
        collection: NodeRef,
        id: NodeId,
        new_position: usize,
    },
}

type Listener = Box<dyn FnMut(&PublishMessage)>;

/// Publish listeners of one node
#[derive(Default)]
pub struct PublishChannel {
    listeners: Vec<Listener>,
}

impl PublishChannel {
    pub fn subscribe(&mut self, listener: impl FnMut(&PublishMessage) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub(crate) fn emit(&mut self, message: &PublishMessage) {
        for listener in &mut self.listeners {
            listener(message);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for PublishChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishChannel")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Listen to every message published on `node`
///
/// # Errors
/// * `StaleHandle` - the handle is not live
pub fn subscribe(
    registry: &mut Registry,
    node: NodeRef,
    listener: impl FnMut(&PublishMessage) + 'static,
) -> Result<()> {
    registry.channel_mut(node)?.subscribe(listener);
    Ok(())
}

/// Collector of the messages published on one node
///
/// Clones share the same buffer, so one clone can be handed to the registry
/// while another is kept for draining.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    messages: Rc<RefCell<Vec<PublishMessage>>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an outbox subscribed to `node`
    ///
    /// # Errors
    /// * `StaleHandle` - the handle is not live
    pub fn attach(registry: &mut Registry, node: NodeRef) -> Result<Self> {
        let outbox = Self::new();
        let sink = outbox.clone();
        subscribe(registry, node, move |message| sink.push(message.clone()))?;
        Ok(outbox)
    }

    fn push(&self, message: PublishMessage) {
        self.messages.borrow_mut().push(message);
    }

    /// Take every collected message
    pub fn drain(&self) -> Vec<PublishMessage> {
        std::mem::take(&mut *self.messages.borrow_mut())
    }

    /// Copy of every collected message
    pub fn messages(&self) -> Vec<PublishMessage> {
        self.messages.borrow().clone()
    }

    pub fn last(&self) -> Option<PublishMessage> {
        self.messages.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }
}

/// Convert a local event and deliver it up to the root
///
/// Returns the message delivered at the top of the chain, or `None` when
/// the event has nowhere to go (a collection without an owner).
///
/// # Errors
/// * `StaleHandle` - a node named by the event is not live
pub fn raise(registry: &mut Registry, event: LocalEvent) -> Result<Option<PublishMessage>> {
    let Some((origin, message)) = convert(registry, event)? else {
        return Ok(None);
    };
    let chain = registry.ancestry(origin);
    tracing::debug!(
        event = message.event(),
        origin = %origin,
        hops = chain.len(),
        "Publishing"
    );
    for node in chain {
        registry.channel_mut(node)?.emit(&message);
    }
    Ok(Some(message))
}

fn convert(
    registry: &Registry,
    event: LocalEvent,
) -> Result<Option<(NodeRef, PublishMessage)>> {
    let converted = match event {
        LocalEvent::Change { node } => {
            let model = registry.model(node)?;
            Some((
                node,
                PublishMessage::Change {
                    id: model.id.clone(),
                    data: model.attributes.clone(),
                },
            ))
        }
        LocalEvent::Add { collection, model } => {
            let Some(owner) = registry.owning_model(collection) else {
                return Ok(None);
            };
            let data = snapshot::export_snapshot(registry, model, ExportOptions::default())?;
            Some((
                owner,
                PublishMessage::Add {
                    data,
                    collection: registry.identifier(collection).cloned(),
                },
            ))
        }
        LocalEvent::Remove { collection, id } => registry
            .owning_model(collection)
            .map(|owner| (owner, PublishMessage::Remove { id })),
        LocalEvent::Move {
            collection,
            id,
            new_position,
        } => registry.owning_model(collection).map(|owner| {
            (
                owner,
                PublishMessage::Move {
                    collection: registry.identifier(collection).cloned(),
                    id,
                    new_position,
                },
            )
        }),
    };
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_move_serializes_camel_case_position() {
        let msg = PublishMessage::Move {
            collection: Some(NodeId::new("c1")),
            id: NodeId::new("m1"),
            new_position: 2,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"event": "move", "collection": "c1", "id": "m1", "newPosition": 2})
        );
    }

    #[test]
    fn test_change_serializes_attributes_as_data() {
        let msg = PublishMessage::Change {
            id: Some(NodeId::new("m1")),
            data: Attributes::new().with("title", "x"),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"event": "change", "id": "m1", "data": {"title": "x"}})
        );
        assert_eq!(msg.event(), "change");
    }

    #[test]
    fn test_outbox_clones_share_buffer() {
        let outbox = Outbox::new();
        let other = outbox.clone();
        other.push(PublishMessage::Remove { id: None });
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox.drain().len(), 1);
        assert!(other.is_empty());
    }
}
