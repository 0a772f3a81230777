//! Core types shared across datapipe crates
//!
//! Kept free of domain logic so that the error facility, the logging
//! facility and plugin contexts can all depend on it:
//!
//! - **Correlation**: `RequestId`, `RequestContext`
//! - **Secrets**: `Sensitive<T>` for API tokens that must never reach a log line
//! - **Schema constants**: canonical structured-logging field keys and event names

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::{RequestContext, RequestId};
pub use sensitive::Sensitive;
