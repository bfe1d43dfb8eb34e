//! Infrastructure layer for PlantFlow.
//!
//! Contains implementations of the store traits defined in `plantflow-core`
//! (in-memory and JSON-file definition stores), the `config.toml` loader,
//! data directory resolution, the built-in action handlers, and the wiring
//! that assembles a ready-to-use controller.

pub mod actions;
pub mod config;
pub mod definition;
pub mod engine;
pub mod filesystem;
