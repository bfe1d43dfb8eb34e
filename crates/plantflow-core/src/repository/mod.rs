//! Repository trait definitions (ports).
//!
//! The infrastructure layer (plantflow-infra) implements these traits. The
//! core crate never depends on a specific storage technology.

pub mod definition;

pub use definition::DefinitionStore;
