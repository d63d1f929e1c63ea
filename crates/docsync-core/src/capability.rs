//! Node type contracts and capability predicates
//!
//! Application code describes its document shape by implementing
//! [`ModelType`] and [`CollectionType`]. Besides the schema (required
//! attributes, client-editable whitelist, exposed methods, child layout),
//! each type must answer the capability questions the authorization gate
//! asks. The predicates are required trait methods, so a node type without
//! them does not compile.

use std::sync::Arc;

use crate::errors::{DocSyncError, Result};
use crate::model::{NodeId, NodeRef, TypeTag};
use crate::registry::Registry;

/// Principal on whose behalf an untrusted command is executed
///
/// Principals are usually user models living in the same registry, so a
/// requester is identified by a node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Requester(NodeId);

impl Requester {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self(id.into())
    }

    /// Requester standing for the given node, if it has an identifier
    pub fn for_node(registry: &Registry, node: NodeRef) -> Option<Self> {
        registry.identifier(node).cloned().map(Self)
    }

    pub fn id(&self) -> &NodeId {
        &self.0
    }

    /// Whether this requester is the given node
    pub fn is_node(&self, registry: &Registry, node: NodeRef) -> bool {
        registry.identifier(node) == Some(&self.0)
    }
}

impl std::fmt::Display for Requester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Behaviour and schema of one kind of model
pub trait ModelType: Send + Sync {
    /// Name used in error messages and logs
    fn type_name(&self) -> &'static str;

    /// Required attributes and their type tags
    fn required(&self) -> &[(&'static str, TypeTag)] {
        &[]
    }

    /// Attributes an untrusted requester may set
    fn client_editable(&self) -> &[&'static str] {
        &[]
    }

    /// Methods an untrusted requester may invoke
    fn exposed_methods(&self) -> &[&'static str] {
        &[]
    }

    /// Declare child collections and models
    ///
    /// Runs once, right after the node is registered and its initial
    /// attributes are applied.
    fn initialize(&self, _registry: &mut Registry, _this: NodeRef) -> Result<()> {
        Ok(())
    }

    /// Run a zero-argument method on `this`
    ///
    /// # Errors
    /// * `UnknownMethod` - default for types without methods
    fn call(&self, method: &str, _registry: &mut Registry, _this: NodeRef) -> Result<()> {
        Err(DocSyncError::UnknownMethod {
            type_name: self.type_name().to_string(),
            method: method.to_string(),
        })
    }

    /// May `requester` edit, delete, or call methods on `this`?
    fn can_edit(&self, registry: &Registry, this: NodeRef, requester: &Requester) -> bool;
}

/// Behaviour of one kind of collection
pub trait CollectionType: Send + Sync {
    /// Name used in error messages and logs
    fn type_name(&self) -> &'static str;

    /// Type of the models created by `add_new`, `safe_add`, and import
    fn element_type(&self) -> Arc<dyn ModelType>;

    /// Boolean attributes that at most one member may have set
    fn radio_attributes(&self) -> &[&'static str] {
        &[]
    }

    /// May `requester` add new members to `this`?
    fn can_add(&self, registry: &Registry, this: NodeRef, requester: &Requester) -> bool;

    /// May `requester` reorder `this`?
    fn can_move(&self, registry: &Registry, this: NodeRef, requester: &Requester) -> bool;
}

/// Model type that only the node itself may edit
///
/// Useful for user/principal models.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfEditable {
    pub type_name: &'static str,
}

impl ModelType for SelfEditable {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn can_edit(&self, registry: &Registry, this: NodeRef, requester: &Requester) -> bool {
        requester.is_node(registry, this)
    }
}

/// Model type that refuses every untrusted edit
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnly {
    pub type_name: &'static str,
}

impl ModelType for ReadOnly {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn can_edit(&self, _: &Registry, _: NodeRef, _: &Requester) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::model_ops;
    use crate::model::Attributes;

    #[test]
    fn test_self_editable_only_allows_itself() {
        let mut registry = Registry::authoritative();
        let kind: Arc<dyn ModelType> = Arc::new(SelfEditable { type_name: "person" });
        let alice = model_ops::create_model(&mut registry, kind.clone(), Attributes::new()).unwrap();
        let bob = model_ops::create_model(&mut registry, kind.clone(), Attributes::new()).unwrap();

        let as_alice = Requester::for_node(&registry, alice).unwrap();
        assert!(kind.can_edit(&registry, alice, &as_alice));
        assert!(!kind.can_edit(&registry, bob, &as_alice));
    }

    #[test]
    fn test_read_only_denies_everyone() {
        let mut registry = Registry::authoritative();
        let kind: Arc<dyn ModelType> = Arc::new(ReadOnly { type_name: "config" });
        let node = model_ops::create_model(&mut registry, kind.clone(), Attributes::new()).unwrap();
        let me = Requester::for_node(&registry, node).unwrap();
        assert!(!kind.can_edit(&registry, node, &me));
    }

    #[test]
    fn test_default_call_is_unknown_method() {
        let mut registry = Registry::authoritative();
        let kind = ReadOnly { type_name: "config" };
        let node =
            model_ops::create_model(&mut registry, Arc::new(kind), Attributes::new()).unwrap();
        let err = kind.call("dance", &mut registry, node).unwrap_err();
        assert!(matches!(err, DocSyncError::UnknownMethod { .. }));
    }
}
