use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use super::attributes::Attributes;
use crate::bubbling::PublishChannel;
use crate::capability::{CollectionType, ModelType};

/// Process-local handle of a node
///
/// Handles are never reused within a registry. The display form (`c<n>`) is
/// the node's ephemeral correlation tag: meaningful only inside this process
/// and never used as identity on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub(crate) u64);

impl NodeRef {
    /// Correlation tag as carried in snapshots
    pub fn correlation_tag(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Globally unique, immutable node identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Non-owning back-reference from a model to whatever holds it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    /// Element of a collection (or pending insertion into it)
    Collection(NodeRef),
    /// Named child model of a parent model
    Model { parent: NodeRef, label: String },
}

/// A labelled attribute bag with optional nested children
pub struct ModelNode {
    pub(crate) id: Option<NodeId>,
    pub(crate) kind: Arc<dyn ModelType>,
    pub(crate) attributes: Attributes,
    pub(crate) child_collections: Vec<(String, NodeRef)>,
    pub(crate) child_models: Vec<(String, NodeRef)>,
    pub(crate) owner: Option<Owner>,
    pub(crate) channel: PublishChannel,
}

impl ModelNode {
    pub(crate) fn new(kind: Arc<dyn ModelType>) -> Self {
        Self {
            id: None,
            kind,
            attributes: Attributes::new(),
            child_collections: Vec::new(),
            child_models: Vec::new(),
            owner: None,
            channel: PublishChannel::default(),
        }
    }

    pub fn id(&self) -> Option<&NodeId> {
        self.id.as_ref()
    }

    pub fn kind(&self) -> &Arc<dyn ModelType> {
        &self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Named child collections in declaration order
    pub fn child_collections(&self) -> &[(String, NodeRef)] {
        &self.child_collections
    }

    /// Named child models in declaration order
    pub fn child_models(&self) -> &[(String, NodeRef)] {
        &self.child_models
    }

    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }
}

impl fmt::Debug for ModelNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelNode")
            .field("id", &self.id)
            .field("type", &self.kind.type_name())
            .field("attributes", &self.attributes)
            .field("child_collections", &self.child_collections)
            .field("child_models", &self.child_models)
            .field("owner", &self.owner)
            .finish()
    }
}

/// An ordered sequence of models
pub struct CollectionNode {
    pub(crate) id: Option<NodeId>,
    pub(crate) kind: Arc<dyn CollectionType>,
    pub(crate) items: Vec<NodeRef>,
    pub(crate) owner: Option<(NodeRef, String)>,
    pub(crate) channel: PublishChannel,
}

impl CollectionNode {
    pub(crate) fn new(kind: Arc<dyn CollectionType>) -> Self {
        Self {
            id: None,
            kind,
            items: Vec::new(),
            owner: None,
            channel: PublishChannel::default(),
        }
    }

    pub fn id(&self) -> Option<&NodeId> {
        self.id.as_ref()
    }

    pub fn kind(&self) -> &Arc<dyn CollectionType> {
        &self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Items in position order
    pub fn items(&self) -> &[NodeRef] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position_of(&self, node: NodeRef) -> Option<usize> {
        self.items.iter().position(|n| *n == node)
    }

    /// Owning model and the label it holds this collection under
    pub fn owner(&self) -> Option<(NodeRef, &str)> {
        self.owner
            .as_ref()
            .map(|(parent, label)| (*parent, label.as_str()))
    }
}

impl fmt::Debug for CollectionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionNode")
            .field("id", &self.id)
            .field("type", &self.kind.type_name())
            .field("items", &self.items)
            .field("owner", &self.owner)
            .finish()
    }
}

/// Either variant of a tree node
#[derive(Debug)]
pub enum Node {
    Model(ModelNode),
    Collection(CollectionNode),
}

impl Node {
    pub fn id(&self) -> Option<&NodeId> {
        match self {
            Node::Model(m) => m.id.as_ref(),
            Node::Collection(c) => c.id.as_ref(),
        }
    }

    pub(crate) fn set_id(&mut self, id: NodeId) {
        match self {
            Node::Model(m) => m.id = Some(id),
            Node::Collection(c) => c.id = Some(id),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Model(m) => m.type_name(),
            Node::Collection(c) => c.type_name(),
        }
    }

    pub fn is_model(&self) -> bool {
        matches!(self, Node::Model(_))
    }

    pub(crate) fn channel_mut(&mut self) -> &mut PublishChannel {
        match self {
            Node::Model(m) => &mut m.channel,
            Node::Collection(c) => &mut c.channel,
        }
    }

    /// Whether some parent still holds this node
    pub fn is_attached(&self) -> bool {
        match self {
            Node::Model(m) => m.owner.is_some(),
            Node::Collection(c) => c.owner.is_some(),
        }
    }
}
