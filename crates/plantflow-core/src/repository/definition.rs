//! Workflow definition store trait.

use plantflow_types::error::RepositoryError;
use plantflow_types::workflow::WorkflowDefinition;

/// Persistence for parsed workflow definitions, keyed by definition id.
///
/// Implementations live in plantflow-infra (`InMemoryDefinitionStore`,
/// `JsonFileDefinitionStore`). Uses native async fn in traits (Rust 2024
/// edition, no async_trait macro).
pub trait DefinitionStore: Send + Sync {
    /// Store a new definition. Fails with `Conflict` if the id is taken.
    fn create(
        &self,
        definition: &WorkflowDefinition,
    ) -> impl std::future::Future<Output = Result<WorkflowDefinition, RepositoryError>> + Send;

    fn get_by_id(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowDefinition>, RepositoryError>> + Send;

    /// Every stored definition, ordered by id.
    fn get_all(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<WorkflowDefinition>, RepositoryError>> + Send;

    /// Replace an existing definition. Fails with `NotFound` if absent.
    fn update(
        &self,
        definition: &WorkflowDefinition,
    ) -> impl std::future::Future<Output = Result<WorkflowDefinition, RepositoryError>> + Send;

    /// Remove a definition. Fails with `NotFound` if absent.
    fn delete(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
