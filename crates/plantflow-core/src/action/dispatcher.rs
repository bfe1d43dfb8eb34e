//! Runs the action attached to a node.
//!
//! Dispatch never fails: every handler fault (unknown name, error, panic,
//! timeout, cancellation) comes back as an [`ActionOutcome`] so the state
//! machine keeps going. Variable updates are returned, not applied; the
//! controller applies them for [`ActionOutcome::Executed`] only.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::FutureExt;
use plantflow_types::config::EngineConfig;
use plantflow_types::variables::{VariableUpdates, Variables};
use plantflow_types::workflow::{WorkflowDefinition, WorkflowNode};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::handler::{
    ActionContext, ActionError, ActionHandlerFactory, ActionParams, BoxActionHandler,
};
use super::registry::ActionHandlerRegistry;
use super::spec::ActionSpec;
use super::template::resolve_params;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Why an action did not run to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotExecutedReason {
    /// No factory is registered under the action name.
    UnknownHandler(String),
    Cancelled,
    TimedOut,
    Failed(String),
    Panicked,
}

impl std::fmt::Display for NotExecutedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotExecutedReason::UnknownHandler(name) => write!(f, "no handler for action '{name}'"),
            NotExecutedReason::Cancelled => write!(f, "cancelled"),
            NotExecutedReason::TimedOut => write!(f, "timed out"),
            NotExecutedReason::Failed(msg) => write!(f, "failed: {msg}"),
            NotExecutedReason::Panicked => write!(f, "handler panicked"),
        }
    }
}

/// Result of dispatching a node's action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The handler finished. `updates` may be empty.
    Executed { updates: VariableUpdates },
    /// The node carries no action.
    NoAction,
    NotExecuted(NotExecutedReason),
}

impl ActionOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, ActionOutcome::Executed { .. })
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Resources owned by one handler invocation.
///
/// The scope's token is a child of the caller's token. Dropping the scope
/// cancels it, so anything the handler spawned with it stops with the call.
pub struct ActionScope {
    id: Uuid,
    token: CancellationToken,
    span: tracing::Span,
}

impl ActionScope {
    pub fn new(parent: &CancellationToken, action: &str, workflow_id: &str) -> Self {
        let id = Uuid::now_v7();
        let span = tracing::info_span!(
            "action_scope",
            scope_id = %id,
            action,
            workflow_id,
        );
        tracing::debug!(parent: &span, "action scope opened");
        Self {
            id,
            token: parent.child_token(),
            span,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

impl Drop for ActionScope {
    fn drop(&mut self) {
        self.token.cancel();
        tracing::debug!(parent: &self.span, "action scope closed");
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Resolves, instantiates and runs action handlers.
pub struct ActionDispatcher {
    registry: Arc<dyn ActionHandlerRegistry>,
    /// Fresh handler and `ActionScope` per invocation.
    scoped: bool,
    timeout: Option<Duration>,
    /// Unscoped mode: one handler per lowercased action name, tagged with
    /// the factory that built it.
    cached: DashMap<String, CachedHandler>,
}

struct CachedHandler {
    factory: ActionHandlerFactory,
    handler: Arc<BoxActionHandler>,
}

impl ActionDispatcher {
    pub fn new(registry: Arc<dyn ActionHandlerRegistry>, config: &EngineConfig) -> Self {
        Self::with_options(
            registry,
            config.action_scopes,
            config.action_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn with_options(
        registry: Arc<dyn ActionHandlerRegistry>,
        scoped: bool,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            scoped,
            timeout,
            cached: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<dyn ActionHandlerRegistry> {
        &self.registry
    }

    /// Run the action in `node`'s note, if it has one.
    pub async fn dispatch(
        &self,
        workflow_id: &str,
        node: &WorkflowNode,
        definition: Arc<WorkflowDefinition>,
        variables: Variables,
        cancel: &CancellationToken,
    ) -> ActionOutcome {
        let Some(spec) = node.note_markdown.as_deref().and_then(ActionSpec::from_note) else {
            return ActionOutcome::NoAction;
        };

        let Some(factory) = self.registry.try_get_factory(&spec.name) else {
            tracing::warn!(
                workflow_id,
                node_id = %node.id,
                action = %spec.name,
                "no handler registered for action"
            );
            return ActionOutcome::NotExecuted(NotExecutedReason::UnknownHandler(spec.name));
        };

        if cancel.is_cancelled() {
            return ActionOutcome::NotExecuted(NotExecutedReason::Cancelled);
        }

        let params = resolve_params(&spec.params, &variables);
        let (handler, scope) = if self.scoped {
            (
                Arc::new(factory()),
                Some(ActionScope::new(cancel, &spec.name, workflow_id)),
            )
        } else {
            (self.cached_handler(&spec.name, &factory), None)
        };

        let token = scope
            .as_ref()
            .map(|s| s.token().clone())
            .unwrap_or_else(|| cancel.clone());
        let span = scope.as_ref().map(|s| s.span().clone()).unwrap_or_else(|| {
            tracing::info_span!("action", action = %spec.name, workflow_id)
        });

        let ctx = ActionContext {
            workflow_id: workflow_id.to_string(),
            node: node.clone(),
            definition,
            variables,
            scope_id: scope.as_ref().map(ActionScope::id),
        };

        let outcome = self
            .run(&handler, &ctx, &params, token)
            .instrument(span)
            .await;
        drop(scope);

        match &outcome {
            ActionOutcome::Executed { updates } => tracing::info!(
                workflow_id,
                node_id = %node.id,
                action = %spec.name,
                updates = updates.len(),
                "action executed"
            ),
            ActionOutcome::NotExecuted(reason) => tracing::warn!(
                workflow_id,
                node_id = %node.id,
                action = %spec.name,
                %reason,
                "action not executed"
            ),
            ActionOutcome::NoAction => {}
        }
        outcome
    }

    /// The reused handler for `name`, rebuilt when the registry now hands
    /// out a different factory.
    fn cached_handler(&self, name: &str, factory: &ActionHandlerFactory) -> Arc<BoxActionHandler> {
        let mut entry = self
            .cached
            .entry(name.trim().to_lowercase())
            .or_insert_with(|| CachedHandler {
                factory: Arc::clone(factory),
                handler: Arc::new(factory()),
            });
        if !Arc::ptr_eq(&entry.factory, factory) {
            tracing::debug!(action = name, "action re-registered, replacing cached handler");
            *entry = CachedHandler {
                factory: Arc::clone(factory),
                handler: Arc::new(factory()),
            };
        }
        Arc::clone(&entry.handler)
    }

    async fn run(
        &self,
        handler: &BoxActionHandler,
        ctx: &ActionContext,
        params: &ActionParams,
        token: CancellationToken,
    ) -> ActionOutcome {
        let call = AssertUnwindSafe(handler.handle(ctx, params, token.clone())).catch_unwind();
        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, call).await.ok(),
                None => Some(call.await),
            }
        };

        let result = tokio::select! {
            biased;

            () = token.cancelled() => {
                return ActionOutcome::NotExecuted(NotExecutedReason::Cancelled);
            }

            result = bounded => result,
        };

        match result {
            None => ActionOutcome::NotExecuted(NotExecutedReason::TimedOut),
            Some(Err(_panic)) => {
                tracing::error!(action = %handler.name(), "action handler panicked");
                ActionOutcome::NotExecuted(NotExecutedReason::Panicked)
            }
            Some(Ok(Err(ActionError::Cancelled))) => {
                ActionOutcome::NotExecuted(NotExecutedReason::Cancelled)
            }
            Some(Ok(Err(err))) => ActionOutcome::NotExecuted(NotExecutedReason::Failed(err.to_string())),
            // A handler that returns after cancellation may hold partial work.
            Some(Ok(Ok(_))) if token.is_cancelled() => {
                ActionOutcome::NotExecuted(NotExecutedReason::Cancelled)
            }
            Some(Ok(Ok(updates))) => ActionOutcome::Executed {
                updates: updates.unwrap_or_default(),
            },
        }
    }
}

impl std::fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("scoped", &self.scoped)
            .field("timeout", &self.timeout)
            .field("cached", &self.cached.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use plantflow_types::workflow::NodeKind;

    use super::super::handler::{WorkflowActionHandler, handler_factory};
    use super::super::registry::InMemoryActionRegistry;
    use super::*;

    // -- test handlers ---------------------------------------------------

    /// Records the params it was called with.
    struct Recorder {
        seen: Arc<Mutex<Vec<ActionParams>>>,
    }

    impl WorkflowActionHandler for Recorder {
        fn name(&self) -> &str {
            "noop"
        }

        async fn handle(
            &self,
            _ctx: &ActionContext,
            params: &ActionParams,
            _cancel: CancellationToken,
        ) -> Result<Option<VariableUpdates>, ActionError> {
            self.seen.lock().unwrap().push(params.clone());
            Ok(Some(
                [("done".to_string(), "yes".to_string())].into_iter().collect(),
            ))
        }
    }

    struct Sleeper;

    impl WorkflowActionHandler for Sleeper {
        fn name(&self) -> &str {
            "sleep"
        }

        async fn handle(
            &self,
            _ctx: &ActionContext,
            _params: &ActionParams,
            cancel: CancellationToken,
        ) -> Result<Option<VariableUpdates>, ActionError> {
            tokio::select! {
                () = cancel.cancelled() => Err(ActionError::Cancelled),
                () = tokio::time::sleep(Duration::from_secs(60)) => Ok(None),
            }
        }
    }

    struct Exploder;

    impl WorkflowActionHandler for Exploder {
        fn name(&self) -> &str {
            "explode"
        }

        async fn handle(
            &self,
            _ctx: &ActionContext,
            _params: &ActionParams,
            _cancel: CancellationToken,
        ) -> Result<Option<VariableUpdates>, ActionError> {
            panic!("boom");
        }
    }

    struct Failing;

    impl WorkflowActionHandler for Failing {
        fn name(&self) -> &str {
            "fail"
        }

        async fn handle(
            &self,
            _ctx: &ActionContext,
            _params: &ActionParams,
            _cancel: CancellationToken,
        ) -> Result<Option<VariableUpdates>, ActionError> {
            Err(ActionError::Failed("upstream refused".to_string()))
        }
    }

    /// Reports whether it saw a scope, and counts instances.
    struct ScopeWitness {
        scope_seen: Arc<Mutex<Vec<Option<Uuid>>>>,
    }

    impl WorkflowActionHandler for ScopeWitness {
        fn name(&self) -> &str {
            "witness"
        }

        async fn handle(
            &self,
            ctx: &ActionContext,
            _params: &ActionParams,
            _cancel: CancellationToken,
        ) -> Result<Option<VariableUpdates>, ActionError> {
            self.scope_seen.lock().unwrap().push(ctx.scope_id);
            Ok(None)
        }
    }

    // -- helpers ---------------------------------------------------------

    fn action_node(note: &str) -> WorkflowNode {
        let mut node = WorkflowNode::new("A", "A", NodeKind::Action);
        node.note_markdown = Some(note.to_string());
        node
    }

    fn definition() -> Arc<WorkflowDefinition> {
        Arc::new(WorkflowDefinition {
            id: "wf".to_string(),
            name: "wf".to_string(),
            nodes: vec![],
            transitions: vec![],
            start_points: vec![],
        })
    }

    /// Writes a fixed `x`.
    struct Stamp(&'static str);

    impl WorkflowActionHandler for Stamp {
        fn name(&self) -> &str {
            "stamp"
        }

        async fn handle(
            &self,
            _ctx: &ActionContext,
            _params: &ActionParams,
            _cancel: CancellationToken,
        ) -> Result<Option<VariableUpdates>, ActionError> {
            Ok(Some([("x".to_string(), self.0.to_string())].into_iter().collect()))
        }
    }

    async fn dispatch(dispatcher: &ActionDispatcher, note: &str, vars: Variables) -> ActionOutcome {
        dispatcher
            .dispatch("wf", &action_node(note), definition(), vars, &CancellationToken::new())
            .await
    }

    // -- tests -----------------------------------------------------------

    #[tokio::test]
    async fn resolves_placeholders_before_dispatch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let registry = Arc::new(InMemoryActionRegistry::new());
        let recorder_seen = seen.clone();
        registry.register(
            "noop",
            handler_factory(move || Recorder {
                seen: recorder_seen.clone(),
            }),
        );
        let dispatcher = ActionDispatcher::with_options(registry, true, None);

        let vars: Variables = [("y", "5")].into_iter().collect();
        let outcome = dispatch(&dispatcher, r#"{"action":"noop","params":{"x":"{{y}}"}}"#, vars).await;

        assert!(outcome.is_executed());
        let calls = seen.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].get("x").map(String::as_str), Some("5"));
    }

    #[tokio::test]
    async fn unregistered_action_is_not_executed() {
        let dispatcher = ActionDispatcher::with_options(Arc::new(InMemoryActionRegistry::new()), true, None);
        let outcome = dispatch(&dispatcher, r#"{"action":"missing"}"#, Variables::new()).await;
        assert_eq!(
            outcome,
            ActionOutcome::NotExecuted(NotExecutedReason::UnknownHandler("missing".to_string()))
        );
        assert!(!outcome.is_executed());
    }

    #[tokio::test]
    async fn plain_notes_are_no_action() {
        let dispatcher = ActionDispatcher::with_options(Arc::new(InMemoryActionRegistry::new()), true, None);
        assert_eq!(
            dispatch(&dispatcher, "Some *markdown*", Variables::new()).await,
            ActionOutcome::NoAction
        );
        let bare = WorkflowNode::new("B", "B", NodeKind::Action);
        let outcome = dispatcher
            .dispatch("wf", &bare, definition(), Variables::new(), &CancellationToken::new())
            .await;
        assert_eq!(outcome, ActionOutcome::NoAction);
    }

    #[tokio::test]
    async fn failures_and_panics_are_contained() {
        let registry = Arc::new(InMemoryActionRegistry::new());
        registry.register("fail", handler_factory(|| Failing));
        registry.register("explode", handler_factory(|| Exploder));
        let dispatcher = ActionDispatcher::with_options(registry, true, None);

        let outcome = dispatch(&dispatcher, r#"{"action":"fail"}"#, Variables::new()).await;
        assert!(matches!(
            outcome,
            ActionOutcome::NotExecuted(NotExecutedReason::Failed(ref msg)) if msg.contains("upstream refused")
        ));

        let outcome = dispatch(&dispatcher, r#"{"action":"explode"}"#, Variables::new()).await;
        assert_eq!(outcome, ActionOutcome::NotExecuted(NotExecutedReason::Panicked));
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let registry = Arc::new(InMemoryActionRegistry::new());
        registry.register("sleep", handler_factory(|| Sleeper));
        let dispatcher = ActionDispatcher::with_options(registry, true, Some(Duration::from_millis(20)));

        let outcome = dispatch(&dispatcher, r#"{"action":"sleep"}"#, Variables::new()).await;
        assert_eq!(outcome, ActionOutcome::NotExecuted(NotExecutedReason::TimedOut));
    }

    #[tokio::test]
    async fn caller_cancellation_stops_handler() {
        let registry = Arc::new(InMemoryActionRegistry::new());
        registry.register("sleep", handler_factory(|| Sleeper));
        let dispatcher = ActionDispatcher::with_options(registry, true, None);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let outcome = dispatcher
            .dispatch(
                "wf",
                &action_node(r#"{"action":"sleep"}"#),
                definition(),
                Variables::new(),
                &cancel,
            )
            .await;
        assert_eq!(outcome, ActionOutcome::NotExecuted(NotExecutedReason::Cancelled));
    }

    #[tokio::test]
    async fn already_cancelled_token_skips_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let registry = Arc::new(InMemoryActionRegistry::new());
        let recorder_seen = seen.clone();
        registry.register(
            "noop",
            handler_factory(move || Recorder {
                seen: recorder_seen.clone(),
            }),
        );
        let dispatcher = ActionDispatcher::with_options(registry, true, None);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = dispatcher
            .dispatch("wf", &action_node(r#"{"action":"noop"}"#), definition(), Variables::new(), &cancel)
            .await;

        assert_eq!(outcome, ActionOutcome::NotExecuted(NotExecutedReason::Cancelled));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn scoped_mode_builds_handler_per_call() {
        let created = Arc::new(AtomicUsize::new(0));
        let scope_seen = Arc::new(Mutex::new(Vec::new()));
        let registry = Arc::new(InMemoryActionRegistry::new());
        {
            let created = created.clone();
            let scope_seen = scope_seen.clone();
            registry.register(
                "witness",
                handler_factory(move || {
                    created.fetch_add(1, Ordering::SeqCst);
                    ScopeWitness {
                        scope_seen: scope_seen.clone(),
                    }
                }),
            );
        }
        let dispatcher = ActionDispatcher::with_options(registry, true, None);

        for _ in 0..3 {
            dispatch(&dispatcher, r#"{"action":"witness"}"#, Variables::new()).await;
        }

        assert_eq!(created.load(Ordering::SeqCst), 3);
        let scopes = scope_seen.lock().unwrap();
        assert!(scopes.iter().all(Option::is_some));
        assert_ne!(scopes[0], scopes[1]);
    }

    #[tokio::test]
    async fn unscoped_mode_reuses_handler() {
        let created = Arc::new(AtomicUsize::new(0));
        let scope_seen = Arc::new(Mutex::new(Vec::new()));
        let registry = Arc::new(InMemoryActionRegistry::new());
        {
            let created = created.clone();
            let scope_seen = scope_seen.clone();
            registry.register(
                "witness",
                handler_factory(move || {
                    created.fetch_add(1, Ordering::SeqCst);
                    ScopeWitness {
                        scope_seen: scope_seen.clone(),
                    }
                }),
            );
        }
        let dispatcher = ActionDispatcher::with_options(registry, false, None);

        for _ in 0..3 {
            dispatch(&dispatcher, r#"{"action":"WITNESS"}"#, Variables::new()).await;
        }

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(scope_seen.lock().unwrap().iter().all(Option::is_none));
    }

    #[tokio::test]
    async fn unscoped_mode_follows_re_registration() {
        let registry = Arc::new(InMemoryActionRegistry::new());
        registry.register("stamp", handler_factory(|| Stamp("1")));
        let dispatcher = ActionDispatcher::with_options(registry.clone(), false, None);
        let first = dispatch(&dispatcher, r#"{"action":"stamp"}"#, Variables::new()).await;

        registry.register("stamp", handler_factory(|| Stamp("2")));
        let second = dispatch(&dispatcher, r#"{"action":"Stamp"}"#, Variables::new()).await;
        let third = dispatch(&dispatcher, r#"{"action":"stamp"}"#, Variables::new()).await;

        let stamped = |outcome: ActionOutcome| match outcome {
            ActionOutcome::Executed { updates } => updates.get("x").cloned(),
            other => panic!("unexpected outcome {other:?}"),
        };
        assert_eq!(stamped(first).as_deref(), Some("1"));
        assert_eq!(stamped(second).as_deref(), Some("2"));
        assert_eq!(stamped(third).as_deref(), Some("2"));
        assert_eq!(dispatcher.cached.len(), 1);
    }

    #[test]
    fn scope_cancels_token_on_drop() {
        let parent = CancellationToken::new();
        let scope = ActionScope::new(&parent, "noop", "wf");
        let token = scope.token().clone();
        assert!(!token.is_cancelled());
        drop(scope);
        assert!(token.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn dispatcher_reads_config() {
        let config = EngineConfig {
            action_scopes: false,
            action_timeout_secs: Some(2),
            ..EngineConfig::default()
        };
        let dispatcher = ActionDispatcher::new(Arc::new(InMemoryActionRegistry::new()), &config);
        assert!(!dispatcher.scoped);
        assert_eq!(dispatcher.timeout, Some(Duration::from_secs(2)));
    }
}
