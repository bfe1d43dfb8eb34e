//! Shared domain types for PlantFlow.
//!
//! This crate contains the types exchanged between the diagram parser, the
//! workflow state machine, and the storage/UI collaborators: the definition
//! graph, state payloads, instance variables, engine configuration and the
//! repository error type.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, thiserror.

pub mod config;
pub mod error;
pub mod variables;
pub mod workflow;
