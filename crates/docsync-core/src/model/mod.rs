pub mod attributes;
pub mod node;
pub mod schema;

pub use attributes::{truthy, Attributes, ID_ATTRIBUTE};
pub use node::{CollectionNode, ModelNode, Node, NodeId, NodeRef, Owner};
pub use schema::TypeTag;
