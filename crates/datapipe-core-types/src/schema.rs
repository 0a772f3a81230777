//! Canonical schema constants for structured logging
//!
//! Every `tracing` event emitted by datapipe uses these keys so that log
//! pipelines can filter on them without knowing which crate produced the event.
//! `tracing` macros take field names as identifiers, so emitting code spells
//! the names out; readers of events (the test capture layer, log assertions)
//! go through these constants.

// Operation envelope
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";

// Pipeline identifiers
pub const FIELD_REPOSITORY: &str = "repository";
pub const FIELD_ENTITY: &str = "entity";

// Shape fingerprint
pub const FIELD_PROPERTY_HASH: &str = "property_hash";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";
pub const FIELD_ERR_MESSAGE: &str = "err.message";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_SHAPE_CHANGED: &str = "shape_changed";
pub const EVENT_QUARANTINED: &str = "quarantined";
