//! Action handler trait and its type-erased wrapper.
//!
//! Follows the same pattern as the other RPITIT ports in this crate:
//! 1. `WorkflowActionHandler` uses native async fn in traits
//! 2. `ActionHandlerDyn` is the object-safe mirror with boxed futures
//! 3. `BoxActionHandler` wraps `Box<dyn ActionHandlerDyn>` and delegates

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use plantflow_types::variables::{VariableUpdates, Variables};
use plantflow_types::workflow::{WorkflowDefinition, WorkflowNode};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Resolved parameters passed to a handler: placeholders already replaced.
pub type ActionParams = BTreeMap<String, String>;

/// Produces a handler instance. Called once per invocation when scoping is
/// enabled, once per action name otherwise.
pub type ActionHandlerFactory = Arc<dyn Fn() -> BoxActionHandler + Send + Sync>;

/// Build a factory from a closure returning a concrete handler.
pub fn handler_factory<H, F>(make: F) -> ActionHandlerFactory
where
    H: WorkflowActionHandler + 'static,
    F: Fn() -> H + Send + Sync + 'static,
{
    Arc::new(move || BoxActionHandler::new(make()))
}

/// Everything a handler may read about the invocation.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub workflow_id: String,
    /// The node whose note carried the action.
    pub node: WorkflowNode,
    pub definition: Arc<WorkflowDefinition>,
    /// Instance variables as of dispatch. Writes go through the returned
    /// updates, never through this copy.
    pub variables: Variables,
    /// Set when the handler runs inside an `ActionScope`.
    pub scope_id: Option<Uuid>,
}

/// Errors a handler reports. The dispatcher turns them into outcomes.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The handler observed cancellation and stopped.
    #[error("action cancelled")]
    Cancelled,

    #[error("invalid action parameter '{name}': {reason}")]
    InvalidParam { name: String, reason: String },

    #[error("action failed: {0}")]
    Failed(String),
}

/// A named operation invoked from a node note.
pub trait WorkflowActionHandler: Send + Sync {
    /// The action name this handler answers to.
    fn name(&self) -> &str;

    /// Run the action. `Ok(Some(updates))` is applied to the instance
    /// variables; `Ok(None)` changes nothing.
    ///
    /// Handlers doing I/O or waiting must watch `cancel` and return
    /// [`ActionError::Cancelled`] when it fires.
    fn handle(
        &self,
        ctx: &ActionContext,
        params: &ActionParams,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<Option<VariableUpdates>, ActionError>> + Send;
}

/// Object-safe version of [`WorkflowActionHandler`] with boxed futures.
pub trait ActionHandlerDyn: Send + Sync {
    fn name(&self) -> &str;

    fn handle_boxed<'a>(
        &'a self,
        ctx: &'a ActionContext,
        params: &'a ActionParams,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<Option<VariableUpdates>, ActionError>> + Send + 'a>>;
}

impl<T: WorkflowActionHandler> ActionHandlerDyn for T {
    fn name(&self) -> &str {
        WorkflowActionHandler::name(self)
    }

    fn handle_boxed<'a>(
        &'a self,
        ctx: &'a ActionContext,
        params: &'a ActionParams,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<Option<VariableUpdates>, ActionError>> + Send + 'a>>
    {
        Box::pin(self.handle(ctx, params, cancel))
    }
}

/// Type-erased action handler, as produced by an [`ActionHandlerFactory`].
pub struct BoxActionHandler {
    inner: Box<dyn ActionHandlerDyn>,
}

impl BoxActionHandler {
    pub fn new<T: WorkflowActionHandler + 'static>(handler: T) -> Self {
        Self {
            inner: Box::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn handle(
        &self,
        ctx: &ActionContext,
        params: &ActionParams,
        cancel: CancellationToken,
    ) -> Result<Option<VariableUpdates>, ActionError> {
        self.inner.handle_boxed(ctx, params, cancel).await
    }
}

impl std::fmt::Debug for BoxActionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxActionHandler")
            .field("name", &self.name())
            .finish()
    }
}
