//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names identical across the registry, the
//! gate and any transport that logs on top of them.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Node identifiers
pub const FIELD_NODE_ID: &str = "node_id";
pub const FIELD_COLLECTION_ID: &str = "collection_id";
pub const FIELD_CORRELATION_TAG: &str = "cid";

// Gate
pub const FIELD_REQUESTER: &str = "requester";
pub const FIELD_DENIAL_KIND: &str = "denial_kind";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
