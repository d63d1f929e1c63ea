use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::bubbling::PublishChannel;
use crate::errors::{DocSyncError, Result};
use crate::ids::{IdSource, Side, UuidV7IdSource};
use crate::model::{Attributes, CollectionNode, ModelNode, Node, NodeId, NodeRef, Owner};

/// Fresh identifiers drawn per registration before giving up
const MAX_MINT_ATTEMPTS: usize = 1024;

/// Arena of every live node plus the identifier index
///
/// The registry owns all nodes; parents and children refer to each other
/// through [`NodeRef`] handles only. Single-threaded: publish listeners are
/// plain closures, so a registry never crosses threads.
pub struct Registry {
    side: Side,
    id_source: Option<Box<dyn IdSource>>,
    nodes: HashMap<NodeRef, Node>,
    ids: HashMap<NodeId, NodeRef>,
    reserved: HashSet<NodeId>,
    next_ref: u64,
}

impl Registry {
    /// Registry of the tree owner, minting UUIDv7 identifiers
    pub fn authoritative() -> Self {
        Self::with_id_source(Side::Authoritative, UuidV7IdSource)
    }

    /// Registry of a mirror; identifiers only arrive from the owner
    pub fn observer() -> Self {
        Self {
            side: Side::Observer,
            id_source: None,
            nodes: HashMap::new(),
            ids: HashMap::new(),
            reserved: HashSet::new(),
            next_ref: 1,
        }
    }

    pub fn with_id_source(side: Side, source: impl IdSource + 'static) -> Self {
        Self {
            side,
            id_source: Some(Box::new(source)),
            nodes: HashMap::new(),
            ids: HashMap::new(),
            reserved: HashSet::new(),
            next_ref: 1,
        }
    }

    /// Registry for `side` with the default identifier source
    pub fn for_side(side: Side) -> Self {
        match side {
            Side::Authoritative => Self::authoritative(),
            Side::Observer => Self::observer(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn is_authoritative(&self) -> bool {
        self.side == Side::Authoritative
    }

    /// Number of live nodes, registered or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: NodeRef) -> bool {
        self.nodes.contains_key(&node)
    }

    // ===== Registration =====

    /// Place a fresh node into the arena without registering it
    pub(crate) fn allocate(&mut self, node: Node) -> NodeRef {
        let handle = NodeRef(self.next_ref);
        self.next_ref += 1;
        self.nodes.insert(handle, node);
        handle
    }

    /// Register a node under its identifier
    ///
    /// On the authoritative side a node without an identifier is given a
    /// fresh one. On the observer side such a node stays unregistered until
    /// [`Registry::assign_id`] adopts one.
    ///
    /// # Errors
    /// Minting skips identifiers already indexed or reserved by an import
    /// in progress.
    ///
    /// # Errors
    /// * `StaleHandle` - the handle is not live
    /// * `DuplicateIdentifier` - another node holds the identifier
    /// * `IdSourceExhausted` - the source kept returning taken identifiers
    pub fn register(&mut self, node: NodeRef) -> Result<Option<NodeId>> {
        if let Some(id) = self.get(node)?.id().cloned() {
            self.index(node, &id)?;
            return Ok(Some(id));
        }
        if self.side != Side::Authoritative {
            return Ok(None);
        }
        let Some(id) = self.mint()? else {
            return Ok(None);
        };
        self.index(node, &id)?;
        self.node_mut(node)?.set_id(id.clone());
        tracing::debug!(node = %node, node_id = %id, "Registered node");
        Ok(Some(id))
    }

    fn mint(&mut self) -> Result<Option<NodeId>> {
        let Some(source) = self.id_source.as_mut() else {
            return Ok(None);
        };
        for _ in 0..MAX_MINT_ATTEMPTS {
            let id = source.next_id();
            if self.ids.contains_key(id.as_str()) || self.reserved.contains(id.as_str()) {
                tracing::debug!(node_id = %id, "Skipping taken identifier");
                continue;
            }
            return Ok(Some(id));
        }
        Err(DocSyncError::IdSourceExhausted {
            attempts: MAX_MINT_ATTEMPTS,
        })
    }

    /// Keep identifiers away from [`Registry::register`] until released
    pub(crate) fn reserve_ids(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        for id in ids {
            if !self.ids.contains_key(id.as_str()) {
                self.reserved.insert(id);
            }
        }
    }

    pub(crate) fn release_reserved(&mut self) {
        self.reserved.clear();
    }

    /// Give a node an identifier and index it
    ///
    /// Assigning the identifier a node already has is a no-op. A different
    /// identifier re-keys the node; identifiers are meant to be immutable,
    /// so this is logged.
    ///
    /// # Errors
    /// * `StaleHandle` - the handle is not live
    /// * `DuplicateIdentifier` - another node holds the identifier
    pub fn assign_id(&mut self, node: NodeRef, id: NodeId) -> Result<()> {
        let current = self.get(node)?.id().cloned();
        if let Some(holder) = self.ids.get(id.as_str()) {
            if *holder != node {
                return Err(DocSyncError::DuplicateIdentifier { id: id.to_string() });
            }
        }
        match current {
            Some(current) if current == id => {
                self.ids.insert(id, node);
                return Ok(());
            }
            Some(current) => {
                tracing::warn!(
                    node = %node,
                    old_id = %current,
                    new_id = %id,
                    "Re-keying node to a different identifier"
                );
                self.ids.remove(current.as_str());
            }
            None => {}
        }
        self.ids.insert(id.clone(), node);
        self.node_mut(node)?.set_id(id);
        Ok(())
    }

    fn index(&mut self, node: NodeRef, id: &NodeId) -> Result<()> {
        match self.ids.get(id.as_str()) {
            Some(holder) if *holder != node => {
                Err(DocSyncError::DuplicateIdentifier { id: id.to_string() })
            }
            Some(_) => Ok(()),
            None => {
                self.ids.insert(id.clone(), node);
                Ok(())
            }
        }
    }

    /// Find the node registered under an identifier
    pub fn lookup(&self, id: &str) -> Option<NodeRef> {
        self.ids.get(id).copied()
    }

    /// Like [`Registry::lookup`], failing with `NodeNotFound`
    ///
    /// # Errors
    /// * `NodeNotFound` - nothing is registered under `id`
    pub fn resolve(&self, id: &str) -> Result<NodeRef> {
        self.lookup(id).ok_or_else(|| DocSyncError::NodeNotFound {
            id: id.to_string(),
        })
    }

    /// Evict a detached node and its whole subtree
    ///
    /// Returns the number of nodes evicted.
    ///
    /// # Errors
    /// * `StaleHandle` - the handle is not live
    /// * `StillAttached` - the node still has an owner
    pub fn unregister(&mut self, node: NodeRef) -> Result<usize> {
        if self.get(node)?.is_attached() {
            return Err(DocSyncError::StillAttached {
                node: self.describe(node),
            });
        }
        let evicted = self.evict(node);
        tracing::debug!(node = %node, evicted, "Unregistered subtree");
        Ok(evicted)
    }

    /// Drop a node that never made it into the tree
    pub(crate) fn discard(&mut self, node: NodeRef) {
        self.evict(node);
    }

    fn evict(&mut self, node: NodeRef) -> usize {
        let Some(removed) = self.nodes.remove(&node) else {
            return 0;
        };
        if let Some(id) = removed.id() {
            if self.ids.get(id.as_str()) == Some(&node) {
                self.ids.remove(id.as_str());
            }
        }
        let children: Vec<NodeRef> = match &removed {
            Node::Model(m) => m
                .child_collections
                .iter()
                .chain(m.child_models.iter())
                .map(|(_, child)| *child)
                .collect(),
            Node::Collection(c) => c.items.clone(),
        };
        1 + children
            .into_iter()
            .map(|child| self.evict(child))
            .sum::<usize>()
    }

    // ===== Accessors =====

    /// # Errors
    /// * `StaleHandle` - the handle is not live
    pub fn get(&self, node: NodeRef) -> Result<&Node> {
        self.nodes
            .get(&node)
            .ok_or_else(|| DocSyncError::StaleHandle {
                node: node.to_string(),
            })
    }

    pub(crate) fn node_mut(&mut self, node: NodeRef) -> Result<&mut Node> {
        self.nodes
            .get_mut(&node)
            .ok_or_else(|| DocSyncError::StaleHandle {
                node: node.to_string(),
            })
    }

    /// # Errors
    /// * `StaleHandle` - the handle is not live
    /// * `WrongNodeKind` - the node is a collection
    pub fn model(&self, node: NodeRef) -> Result<&ModelNode> {
        match self.get(node)? {
            Node::Model(m) => Ok(m),
            Node::Collection(_) => Err(DocSyncError::WrongNodeKind {
                node: self.describe(node),
                expected: "model",
            }),
        }
    }

    /// # Errors
    /// * `StaleHandle` - the handle is not live
    /// * `WrongNodeKind` - the node is a collection
    pub fn model_mut(&mut self, node: NodeRef) -> Result<&mut ModelNode> {
        match self.nodes.get_mut(&node) {
            Some(Node::Model(m)) => Ok(m),
            Some(Node::Collection(_)) => Err(DocSyncError::WrongNodeKind {
                node: node.to_string(),
                expected: "model",
            }),
            None => Err(DocSyncError::StaleHandle {
                node: node.to_string(),
            }),
        }
    }

    /// # Errors
    /// * `StaleHandle` - the handle is not live
    /// * `WrongNodeKind` - the node is a model
    pub fn collection(&self, node: NodeRef) -> Result<&CollectionNode> {
        match self.get(node)? {
            Node::Collection(c) => Ok(c),
            Node::Model(_) => Err(DocSyncError::WrongNodeKind {
                node: self.describe(node),
                expected: "collection",
            }),
        }
    }

    /// # Errors
    /// * `StaleHandle` - the handle is not live
    /// * `WrongNodeKind` - the node is a model
    pub fn collection_mut(&mut self, node: NodeRef) -> Result<&mut CollectionNode> {
        match self.nodes.get_mut(&node) {
            Some(Node::Collection(c)) => Ok(c),
            Some(Node::Model(_)) => Err(DocSyncError::WrongNodeKind {
                node: node.to_string(),
                expected: "collection",
            }),
            None => Err(DocSyncError::StaleHandle {
                node: node.to_string(),
            }),
        }
    }

    pub(crate) fn channel_mut(&mut self, node: NodeRef) -> Result<&mut PublishChannel> {
        Ok(self.node_mut(node)?.channel_mut())
    }

    pub fn identifier(&self, node: NodeRef) -> Option<&NodeId> {
        self.nodes.get(&node).and_then(Node::id)
    }

    /// Correlation tag of a live node
    pub fn correlation_tag(&self, node: NodeRef) -> Option<String> {
        self.nodes
            .contains_key(&node)
            .then(|| node.correlation_tag())
    }

    /// Identifier if assigned, correlation tag otherwise
    pub fn describe(&self, node: NodeRef) -> String {
        self.identifier(node)
            .map_or_else(|| node.to_string(), NodeId::to_string)
    }

    /// # Errors
    /// * `StaleHandle` / `WrongNodeKind` - `model` is not a live model
    pub fn attributes(&self, model: NodeRef) -> Result<&Attributes> {
        Ok(&self.model(model)?.attributes)
    }

    /// # Errors
    /// * `StaleHandle` / `WrongNodeKind` - `collection` is not a live collection
    pub fn items(&self, collection: NodeRef) -> Result<&[NodeRef]> {
        Ok(&self.collection(collection)?.items)
    }

    /// Child model declared under `label`
    pub fn child_model(&self, parent: NodeRef, label: &str) -> Option<NodeRef> {
        find_label(&self.model(parent).ok()?.child_models, label)
    }

    /// Child collection declared under `label`
    pub fn child_collection(&self, parent: NodeRef, label: &str) -> Option<NodeRef> {
        find_label(&self.model(parent).ok()?.child_collections, label)
    }

    /// Collection a model belongs to or is being inserted into
    pub fn owning_collection(&self, model: NodeRef) -> Option<NodeRef> {
        match self.model(model).ok()?.owner.as_ref()? {
            Owner::Collection(c) => Some(*c),
            Owner::Model { .. } => None,
        }
    }

    /// Model holding a collection or child model under a label
    pub fn owning_model(&self, node: NodeRef) -> Option<NodeRef> {
        match self.get(node).ok()? {
            Node::Collection(c) => c.owner.as_ref().map(|(parent, _)| *parent),
            Node::Model(m) => match m.owner.as_ref()? {
                Owner::Model { parent, .. } => Some(*parent),
                Owner::Collection(_) => None,
            },
        }
    }

    /// Next node up the publish chain
    ///
    /// A model's owning collection only counts once the model is a member.
    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        match self.get(node).ok()? {
            Node::Collection(c) => c.owner.as_ref().map(|(parent, _)| *parent),
            Node::Model(m) => match m.owner.as_ref()? {
                Owner::Model { parent, .. } => Some(*parent),
                Owner::Collection(c) => self
                    .collection(*c)
                    .ok()
                    .filter(|coll| coll.items.contains(&node))
                    .map(|_| *c),
            },
        }
    }

    /// Topmost node reachable through [`Registry::parent`]
    pub fn root_of(&self, node: NodeRef) -> NodeRef {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Nodes from `node` (inclusive) up to its root
    pub fn ancestry(&self, node: NodeRef) -> Vec<NodeRef> {
        let mut chain = vec![node];
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }
}

fn find_label(children: &[(String, NodeRef)], label: &str) -> Option<NodeRef> {
    children
        .iter()
        .find(|(l, _)| l == label)
        .map(|(_, child)| *child)
}

impl Default for Registry {
    fn default() -> Self {
        Self::authoritative()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("side", &self.side)
            .field("nodes", &self.nodes.len())
            .field("registered", &self.ids.len())
            .finish()
    }
}
