//! Executable actions attached to nodes.
//!
//! A node note holding `{"action": name, "params": {...}}` names a handler in
//! the [`ActionHandlerRegistry`]. The [`ActionDispatcher`] resolves `{{key}}`
//! placeholders against instance variables, runs the handler and reports an
//! [`ActionOutcome`].

pub mod dispatcher;
pub mod handler;
pub mod registry;
pub mod spec;
pub mod template;

pub use dispatcher::{ActionDispatcher, ActionOutcome, ActionScope, NotExecutedReason};
pub use handler::{
    ActionContext, ActionError, ActionHandlerDyn, ActionHandlerFactory, ActionParams,
    BoxActionHandler, WorkflowActionHandler, handler_factory,
};
pub use registry::{ActionHandlerRegistry, InMemoryActionRegistry};
pub use spec::ActionSpec;
