//! Per-instance runtime state: current node and variables.
//!
//! An instance is keyed by its workflow id. The store is the only place the
//! current node and variables live; the controller never caches them.

pub mod memory;

use plantflow_types::error::RepositoryError;
use plantflow_types::variables::{Variables, VariableUpdates};
use serde::Serialize;

pub use memory::InMemoryInstanceStore;

/// Current node and variables of one instance, read together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstanceSnapshot {
    pub current_node_id: Option<String>,
    pub variables: Variables,
}

/// Storage for instance state.
///
/// Implementations must create an instance's state atomically on first
/// touch: two racing writers for the same id never end up with two maps.
pub trait InstanceStateStore: Send + Sync {
    fn get_current_node(
        &self,
        instance_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, RepositoryError>> + Send;

    fn set_current_node(
        &self,
        instance_id: &str,
        node_id: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn clear_current_node(
        &self,
        instance_id: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// A copy of the instance's variables (empty for unknown instances).
    fn get_variables(
        &self,
        instance_id: &str,
    ) -> impl std::future::Future<Output = Result<Variables, RepositoryError>> + Send;

    fn set_variable(
        &self,
        instance_id: &str,
        key: &str,
        value: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Apply several writes so no reader sees only part of them.
    fn set_variables(
        &self,
        instance_id: &str,
        updates: &VariableUpdates,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Current node and variables from one consistent read.
    fn snapshot(
        &self,
        instance_id: &str,
    ) -> impl std::future::Future<Output = Result<InstanceSnapshot, RepositoryError>> + Send;

    /// Drop the current node and all variables.
    fn clear(
        &self,
        instance_id: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
