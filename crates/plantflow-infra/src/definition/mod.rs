//! `DefinitionStore` implementations.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileDefinitionStore;
pub use memory::InMemoryDefinitionStore;
