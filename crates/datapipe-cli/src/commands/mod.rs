//! CLI subcommands

pub mod ingest;
pub mod shape;
pub mod shapes;
