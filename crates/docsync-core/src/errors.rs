use docsync_core_types::{RequestId, TraceId};
use thiserror::Error;

use crate::model::TypeTag;

/// Result type alias using DocSyncError
pub type Result<T> = std::result::Result<T, DocSyncError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that transports can hand back to
/// an observer, and that tests can match on without caring about messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Lookup
    NotFound,
    WrongNodeKind,

    // Identity
    DuplicateIdentifier,
    ReservedAttribute,

    // Validation
    TypeMismatch,
    InvalidInput,

    // Structure
    DuplicateLabel,
    UnknownLabel,
    AlreadyAttached,
    StillAttached,
    CycleDetected,

    // Invocation
    UnknownMethod,

    // Integration
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::WrongNodeKind => "ERR_WRONG_NODE_KIND",
            ExErrorKind::DuplicateIdentifier => "ERR_DUPLICATE_IDENTIFIER",
            ExErrorKind::ReservedAttribute => "ERR_RESERVED_ATTRIBUTE",
            ExErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::DuplicateLabel => "ERR_DUPLICATE_LABEL",
            ExErrorKind::UnknownLabel => "ERR_UNKNOWN_LABEL",
            ExErrorKind::AlreadyAttached => "ERR_ALREADY_ATTACHED",
            ExErrorKind::StillAttached => "ERR_STILL_ATTACHED",
            ExErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            ExErrorKind::UnknownMethod => "ERR_UNKNOWN_METHOD",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification of a [`DocSyncError`] plus the correlation
/// context of the request that produced it.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    node_id: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            node_id: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add node identifier context
    pub fn with_node_id(mut self, id: impl Into<String>) -> Self {
        self.node_id = Some(id.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(node_id) = &self.node_id {
            write!(f, " (node_id: {})", node_id)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (request_id: {})", request_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for registry, tree, codec and gate operations
///
/// Authorization denials are deliberately absent: the gate reports those to a
/// [`crate::gate::DenialSink`] and never fails.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocSyncError {
    // ===== Lookup Errors =====
    /// No node is registered under this identifier
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// The handle does not point at a live node (discarded or unregistered)
    #[error("Stale node handle: {node}")]
    StaleHandle { node: String },

    /// The node exists but is not of the expected variant
    #[error("Node {node} is not a {expected}")]
    WrongNodeKind { node: String, expected: &'static str },

    // ===== Identity Errors =====
    /// Another node already holds this identifier
    #[error("Identifier {id} is already registered to another node")]
    DuplicateIdentifier { id: String },

    /// The identifier source kept producing identifiers already in use
    #[error("No free identifier after {attempts} attempts")]
    IdSourceExhausted { attempts: usize },

    /// The identifier attribute cannot be written through the attribute API
    #[error("Attribute '{attribute}' is reserved")]
    ReservedAttribute { attribute: String },

    // ===== Validation Errors =====
    /// A required attribute has the wrong runtime type
    #[error("The '{attribute}' attribute of a '{type_name}' must be a '{expected}'. Got '{found}'.")]
    TypeMismatch {
        attribute: String,
        type_name: String,
        expected: TypeTag,
        found: String,
    },

    /// A type tag string outside the supported set
    #[error("Unknown type tag: {tag}")]
    UnknownTypeTag { tag: String },

    // ===== Structural Errors =====
    /// A child with this label already exists on the parent model
    #[error("Model {node} already has a child labelled '{label}'")]
    DuplicateChildLabel { node: String, label: String },

    /// A snapshot names a child the local model does not declare
    #[error("Model {node} has no child labelled '{label}'")]
    UnknownChildLabel { node: String, label: String },

    /// The model already belongs to a collection or parent model
    #[error("Model {node} is already attached to another parent")]
    AlreadyAttached { node: String },

    /// Only detached nodes can be unregistered
    #[error("Node {node} is still attached to its parent")]
    StillAttached { node: String },

    /// Adding the model would make it its own ancestor
    #[error("Cycle detected: model {node} is an ancestor of collection {collection}")]
    CycleDetected { node: String, collection: String },

    // ===== Invocation Errors =====
    /// The model type does not implement this method
    #[error("Model type '{type_name}' has no method '{method}'")]
    UnknownMethod { type_name: String, method: String },

    // ===== Generic Errors =====
    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serde_json::Error> for DocSyncError {
    fn from(err: serde_json::Error) -> Self {
        DocSyncError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<DocSyncError> for ExError {
    fn from(err: DocSyncError) -> Self {
        let message = err.to_string();
        let base = match &err {
            DocSyncError::NodeNotFound { id } => {
                ExError::new(ExErrorKind::NotFound).with_node_id(id.clone())
            }
            DocSyncError::StaleHandle { node } => {
                ExError::new(ExErrorKind::NotFound).with_node_id(node.clone())
            }
            DocSyncError::WrongNodeKind { node, .. } => {
                ExError::new(ExErrorKind::WrongNodeKind).with_node_id(node.clone())
            }
            DocSyncError::DuplicateIdentifier { id } => {
                ExError::new(ExErrorKind::DuplicateIdentifier).with_node_id(id.clone())
            }
            DocSyncError::IdSourceExhausted { .. } => ExError::new(ExErrorKind::DuplicateIdentifier),
            DocSyncError::ReservedAttribute { .. } => ExError::new(ExErrorKind::ReservedAttribute),
            DocSyncError::TypeMismatch { .. } => ExError::new(ExErrorKind::TypeMismatch),
            DocSyncError::UnknownTypeTag { .. } => ExError::new(ExErrorKind::InvalidInput),
            DocSyncError::DuplicateChildLabel { node, .. } => {
                ExError::new(ExErrorKind::DuplicateLabel).with_node_id(node.clone())
            }
            DocSyncError::UnknownChildLabel { node, .. } => {
                ExError::new(ExErrorKind::UnknownLabel).with_node_id(node.clone())
            }
            DocSyncError::AlreadyAttached { node } => {
                ExError::new(ExErrorKind::AlreadyAttached).with_node_id(node.clone())
            }
            DocSyncError::StillAttached { node } => {
                ExError::new(ExErrorKind::StillAttached).with_node_id(node.clone())
            }
            DocSyncError::CycleDetected { node, .. } => {
                ExError::new(ExErrorKind::CycleDetected).with_node_id(node.clone())
            }
            DocSyncError::UnknownMethod { .. } => ExError::new(ExErrorKind::UnknownMethod),
            DocSyncError::Serialization { .. } => ExError::new(ExErrorKind::Serialization),
            DocSyncError::Internal { .. } => ExError::new(ExErrorKind::Internal),
        };
        base.with_message(message)
    }
}
