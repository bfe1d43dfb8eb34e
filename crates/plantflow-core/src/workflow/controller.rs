//! Workflow controller: the public face of the engine.
//!
//! Imports diagrams, starts instances and advances them by choice value.
//! One instance exists per workflow id. Every operation on an id, reads
//! included, runs under that id's async mutex, so readers never see a new
//! current node before its action's updates are applied. Different ids run
//! in parallel. Mutex entries live only while an operation holds or awaits
//! them.
//!
//! Entering a node runs its action (if any) after the current node has been
//! stored. Action failures are logged and never undo the move.

use std::sync::Arc;

use dashmap::DashMap;
use plantflow_types::variables::Variables;
use plantflow_types::workflow::{WorkflowDefinition, WorkflowNode, WorkflowStatePayload};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use super::payload::{compute_payload, match_choice};
use super::validate::validate_definition;
use super::WorkflowError;
use crate::action::{ActionDispatcher, ActionOutcome};
use crate::diagram::parse_with_report;
use crate::repository::DefinitionStore;
use crate::state::{InstanceSnapshot, InstanceStateStore};

/// Drives workflow instances over stored definitions.
pub struct WorkflowController<D, S> {
    definitions: Arc<D>,
    state: Arc<S>,
    dispatcher: Arc<ActionDispatcher>,
    /// Per-instance operation locks, present while an operation uses them.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<D, S> WorkflowController<D, S>
where
    D: DefinitionStore,
    S: InstanceStateStore,
{
    pub fn new(definitions: Arc<D>, state: Arc<S>, dispatcher: Arc<ActionDispatcher>) -> Self {
        Self {
            definitions,
            state,
            dispatcher,
            locks: DashMap::new(),
        }
    }

    pub fn definitions(&self) -> &Arc<D> {
        &self.definitions
    }

    pub fn state(&self) -> &Arc<S> {
        &self.state
    }

    // -----------------------------------------------------------------------
    // Definitions
    // -----------------------------------------------------------------------

    /// Parse, validate and store a diagram. Re-importing an id replaces the
    /// stored definition; the instance keeps its state.
    pub async fn import_workflow(
        &self,
        text: &str,
        id: Option<&str>,
        name: Option<&str>,
    ) -> Result<WorkflowDefinition, WorkflowError> {
        let parsed = parse_with_report(text, id, name);
        if !parsed.report.skipped.is_empty() {
            tracing::debug!(
                skipped = parsed.report.skipped.len(),
                "diagram lines skipped during import"
            );
        }
        self.store_definition(parsed.definition).await
    }

    /// Validate and store an already parsed definition.
    pub async fn store_definition(
        &self,
        definition: WorkflowDefinition,
    ) -> Result<WorkflowDefinition, WorkflowError> {
        validate_definition(&definition)?;

        let _lock = self.lock_instance(&definition.id).await;

        let exists = self.definitions.get_by_id(&definition.id).await?.is_some();
        let stored = if exists {
            self.definitions.update(&definition).await?
        } else {
            self.definitions.create(&definition).await?
        };

        tracing::info!(
            workflow_id = %stored.id,
            name = %stored.name,
            nodes = stored.nodes.len(),
            transitions = stored.transitions.len(),
            replaced = exists,
            "workflow imported"
        );
        Ok(stored)
    }

    pub async fn workflow_exists(&self, id: &str) -> Result<bool, WorkflowError> {
        Ok(self.definitions.get_by_id(id).await?.is_some())
    }

    pub async fn get_workflow(&self, id: &str) -> Result<Option<WorkflowDefinition>, WorkflowError> {
        Ok(self.definitions.get_by_id(id).await?)
    }

    pub async fn list_workflows(&self) -> Result<Vec<WorkflowDefinition>, WorkflowError> {
        Ok(self.definitions.get_all().await?)
    }

    /// Remove a definition and its instance state. Returns `false` if no
    /// definition was stored under `id`.
    pub async fn delete_workflow(&self, id: &str) -> Result<bool, WorkflowError> {
        let _lock = self.lock_instance(id).await;

        if self.definitions.get_by_id(id).await?.is_none() {
            return Ok(false);
        }
        self.definitions.delete(id).await?;
        self.state.clear(id).await?;

        tracing::info!(workflow_id = id, "workflow deleted");
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Instance lifecycle
    // -----------------------------------------------------------------------

    /// Start the instance, or resume it if it already sits on a valid node.
    ///
    /// A fresh start moves to the first start point and runs that node's
    /// action. Returns the current node id, or `None` when the definition
    /// has no start point.
    pub async fn start_instance(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, WorkflowError> {
        let _lock = self.lock_instance(id).await;

        let definition = self.load(id).await?;
        if let Some(current) = self.state.get_current_node(id).await? {
            if definition.node(&current).is_some() {
                tracing::info!(workflow_id = id, node_id = %current, "resuming workflow instance");
                return Ok(Some(current));
            }
            tracing::debug!(
                workflow_id = id,
                node_id = %current,
                "stored node no longer exists, starting over"
            );
        }
        self.start_fresh(id, definition, cancel).await
    }

    /// Clear the instance's node and variables, then start it again.
    pub async fn restart_instance(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, WorkflowError> {
        let _lock = self.lock_instance(id).await;

        let definition = self.load(id).await?;
        self.state.clear(id).await?;
        tracing::info!(workflow_id = id, "workflow instance reset");
        self.start_fresh(id, definition, cancel).await
    }

    /// Follow the outgoing transition selected by `value`.
    ///
    /// Returns `false`, leaving the instance untouched, when the instance is
    /// not started or nothing matches.
    pub async fn advance_by_choice_value(
        &self,
        id: &str,
        value: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<bool, WorkflowError> {
        let _lock = self.lock_instance(id).await;

        let definition = self.load(id).await?;
        let Some(current) = self.state.get_current_node(id).await? else {
            tracing::debug!(workflow_id = id, "advance on an unstarted instance");
            return Ok(false);
        };
        let Some(transition) = match_choice(&definition, &current, value) else {
            tracing::debug!(
                workflow_id = id,
                node_id = %current,
                value = value.unwrap_or_default(),
                "choice value matches no transition"
            );
            return Ok(false);
        };
        let target_id = transition.to_node_id.clone();

        self.state.set_current_node(id, &target_id).await?;
        tracing::info!(
            workflow_id = id,
            from = %current,
            to = %target_id,
            "workflow advanced"
        );

        if let Some(node) = definition.node(&target_id).cloned() {
            self.enter_node(id, &definition, &node, cancel).await?;
        }
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Renderable view of the current node. Empty when not started.
    pub async fn get_current_state_payload(
        &self,
        id: &str,
    ) -> Result<WorkflowStatePayload, WorkflowError> {
        let _lock = self.lock_instance(id).await;
        let definition = self.load(id).await?;
        let payload = match self.state.get_current_node(id).await? {
            Some(current) => compute_payload(&definition, &current),
            None => WorkflowStatePayload::default(),
        };
        Ok(payload)
    }

    pub async fn get_current_node_id(&self, id: &str) -> Result<Option<String>, WorkflowError> {
        let _lock = self.lock_instance(id).await;
        Ok(self.state.get_current_node(id).await?)
    }

    pub async fn get_variables(&self, id: &str) -> Result<Variables, WorkflowError> {
        let _lock = self.lock_instance(id).await;
        Ok(self.state.get_variables(id).await?)
    }

    /// Current node and variables from one consistent read.
    pub async fn snapshot(&self, id: &str) -> Result<InstanceSnapshot, WorkflowError> {
        let _lock = self.lock_instance(id).await;
        Ok(self.state.snapshot(id).await?)
    }

    pub async fn set_variable(&self, id: &str, key: &str, value: &str) -> Result<(), WorkflowError> {
        let _lock = self.lock_instance(id).await;
        self.state.set_variable(id, key, value).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals (callers hold the instance lock)
    // -----------------------------------------------------------------------

    /// Wait for exclusive access to the instance `id`.
    async fn lock_instance(&self, id: &str) -> InstanceLock<'_> {
        let mutex = self
            .locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        InstanceLock {
            locks: &self.locks,
            id: id.to_string(),
            guard: Some(mutex.lock_owned().await),
        }
    }

    async fn load(&self, id: &str) -> Result<Arc<WorkflowDefinition>, WorkflowError> {
        self.definitions
            .get_by_id(id)
            .await?
            .map(Arc::new)
            .ok_or_else(|| WorkflowError::UnknownWorkflow(id.to_string()))
    }

    async fn start_fresh(
        &self,
        id: &str,
        definition: Arc<WorkflowDefinition>,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, WorkflowError> {
        let Some(start) = definition.first_start_node().cloned() else {
            tracing::warn!(workflow_id = id, "workflow has no start point; instance not started");
            return Ok(None);
        };

        self.state.set_current_node(id, &start.id).await?;
        tracing::info!(workflow_id = id, node_id = %start.id, "workflow instance started");

        self.enter_node(id, &definition, &start, cancel).await?;
        Ok(Some(start.id))
    }

    /// Run `node`'s action and apply its updates.
    async fn enter_node(
        &self,
        id: &str,
        definition: &Arc<WorkflowDefinition>,
        node: &WorkflowNode,
        cancel: &CancellationToken,
    ) -> Result<ActionOutcome, WorkflowError> {
        let variables = self.state.get_variables(id).await?;
        let outcome = self
            .dispatcher
            .dispatch(id, node, Arc::clone(definition), variables, cancel)
            .await;

        if let ActionOutcome::Executed { updates } = &outcome {
            self.state.set_variables(id, updates).await?;
        }
        Ok(outcome)
    }
}

/// Held for the duration of one controller operation.
///
/// On drop the map entry is removed unless another operation holds or
/// awaits the same mutex. Clones are only taken under the map's shard lock,
/// so a count of one means nobody else can reach this mutex.
struct InstanceLock<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for InstanceLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl<D, S> std::fmt::Debug for WorkflowController<D, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowController")
            .field("dispatcher", &self.dispatcher)
            .field("instances_locked", &self.locks.len())
            .finish()
    }
}
