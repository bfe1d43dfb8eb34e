//! Built-in action handlers.
//!
//! | action         | params                                  | effect                    |
//! |----------------|-----------------------------------------|---------------------------|
//! | `set_variable` | `name` + `value`, or any `key: value`   | writes instance variables |
//! | `log`          | `message`, optional `level`             | emits a tracing event     |
//! | `wait`         | `ms` or `seconds`                       | sleeps, honoring cancel   |

pub mod log;
pub mod set_variable;
pub mod wait;

use plantflow_core::action::{ActionHandlerRegistry, handler_factory};

pub use log::LogHandler;
pub use set_variable::SetVariableHandler;
pub use wait::WaitHandler;

/// Register every built-in handler under its action name.
pub fn register_builtin_actions(registry: &dyn ActionHandlerRegistry) {
    registry.register(SetVariableHandler::NAME, handler_factory(|| SetVariableHandler));
    registry.register(LogHandler::NAME, handler_factory(|| LogHandler));
    registry.register(WaitHandler::NAME, handler_factory(WaitHandler::default));
}

#[cfg(test)]
pub(crate) fn test_context() -> plantflow_core::action::ActionContext {
    use std::sync::Arc;

    use plantflow_types::variables::Variables;
    use plantflow_types::workflow::{NodeKind, WorkflowDefinition, WorkflowNode};

    plantflow_core::action::ActionContext {
        workflow_id: "wf".to_string(),
        node: WorkflowNode::new("A", "A", NodeKind::Action),
        definition: Arc::new(WorkflowDefinition {
            id: "wf".to_string(),
            name: "wf".to_string(),
            nodes: vec![],
            transitions: vec![],
            start_points: vec![],
        }),
        variables: Variables::new(),
        scope_id: None,
    }
}
