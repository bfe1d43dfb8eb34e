//! Workflow state machine over parsed definitions.
//!
//! - `validate` -- structural checks run on import
//! - `payload` -- renderable view of a node, and choice matching
//! - `controller` -- import/start/advance operations, serialized per instance

pub mod controller;
pub mod payload;
pub mod validate;

use plantflow_types::error::RepositoryError;

pub use controller::WorkflowController;
pub use payload::{compute_payload, match_choice};
pub use validate::validate_definition;

/// Errors raised by controller operations.
///
/// Invalid choices and action failures are not errors: they are reported
/// through return values so callers keep going.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// No definition is stored under this id.
    #[error("unknown workflow: {0}")]
    UnknownWorkflow(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A definition broke a structural invariant.
    #[error("validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_error_display() {
        let err = WorkflowError::UnknownWorkflow("checkout".to_string());
        assert_eq!(err.to_string(), "unknown workflow: checkout");

        let err: WorkflowError = RepositoryError::Io("disk full".to_string()).into();
        assert!(err.to_string().contains("disk full"));
    }
}
