//! Workflow engine core for PlantFlow.
//!
//! Turns diagram text into a `WorkflowDefinition` graph and drives one
//! current node per workflow instance over it. Storage is abstracted behind
//! the traits in [`repository`] and [`state`]; the infrastructure layer
//! (plantflow-infra) provides persistent implementations. This crate depends
//! only on `plantflow-types` -- never on any database/IO crate.

pub mod action;
pub mod diagram;
pub mod repository;
pub mod state;
pub mod workflow;
