//! Migration framework
//!
//! - Embedded SQL migrations, applied in order inside a transaction each
//! - Idempotent: applied migrations are recorded in `schema_version`
//! - A recorded checksum that no longer matches the embedded SQL is an error

mod checksums;
mod embedded;
mod runner;

pub use runner::{applied_migrations, apply_migrations};
