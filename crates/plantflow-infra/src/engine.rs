//! Engine wiring.
//!
//! Pins the generic [`WorkflowController`] to concrete stores, registers the
//! built-in actions and loads `config.toml` from the data directory. Used by
//! the CLI and by embedders that want the stock setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use plantflow_core::action::{ActionDispatcher, ActionHandlerRegistry, InMemoryActionRegistry};
use plantflow_core::repository::DefinitionStore;
use plantflow_core::state::InMemoryInstanceStore;
use plantflow_core::workflow::WorkflowController;
use plantflow_types::config::EngineConfig;

use crate::actions::register_builtin_actions;
use crate::config::load_engine_config;
use crate::definition::{InMemoryDefinitionStore, JsonFileDefinitionStore};
use crate::filesystem::{config_path, workflows_dir};

/// Controller persisting definitions as JSON files.
pub type FileWorkflowController = WorkflowController<JsonFileDefinitionStore, InMemoryInstanceStore>;

/// Controller keeping everything in memory.
pub type MemoryWorkflowController =
    WorkflowController<InMemoryDefinitionStore, InMemoryInstanceStore>;

/// A controller together with the pieces it was built from.
#[derive(Clone)]
pub struct Engine {
    pub controller: Arc<FileWorkflowController>,
    /// Register custom handlers here; the dispatcher reads it on every call.
    pub registry: Arc<InMemoryActionRegistry>,
    pub config: EngineConfig,
    pub data_dir: PathBuf,
}

impl Engine {
    /// Build the engine over `data_dir`. `config_file` overrides
    /// `{data_dir}/config.toml`.
    pub async fn open(data_dir: PathBuf, config_file: Option<&Path>) -> std::io::Result<Self> {
        let config = match config_file {
            Some(path) => load_engine_config(path).await,
            None => load_engine_config(&config_path(&data_dir)).await,
        };
        Self::with_config(data_dir, config).await
    }

    /// Build the engine over `data_dir` with an already loaded config.
    pub async fn with_config(data_dir: PathBuf, config: EngineConfig) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(workflows_dir(&data_dir)).await?;

        let registry = builtin_registry();
        let definitions = Arc::new(JsonFileDefinitionStore::new(workflows_dir(&data_dir)));
        let controller = Arc::new(build_controller(
            definitions,
            Arc::clone(&registry),
            &config,
        ));

        tracing::debug!(data_dir = %data_dir.display(), "engine initialized");
        Ok(Self {
            controller,
            registry,
            config,
            data_dir,
        })
    }
}

/// A registry holding the built-in handlers.
pub fn builtin_registry() -> Arc<InMemoryActionRegistry> {
    let registry = Arc::new(InMemoryActionRegistry::new());
    register_builtin_actions(registry.as_ref());
    registry
}

/// Fully in-memory controller with the built-in handlers registered.
pub fn in_memory_controller(config: &EngineConfig) -> MemoryWorkflowController {
    build_controller(
        Arc::new(InMemoryDefinitionStore::new()),
        builtin_registry(),
        config,
    )
}

fn build_controller<D>(
    definitions: Arc<D>,
    registry: Arc<InMemoryActionRegistry>,
    config: &EngineConfig,
) -> WorkflowController<D, InMemoryInstanceStore>
where
    D: DefinitionStore,
{
    let registry: Arc<dyn ActionHandlerRegistry> = registry;
    let dispatcher = Arc::new(ActionDispatcher::new(registry, config));
    WorkflowController::new(
        definitions,
        Arc::new(InMemoryInstanceStore::new()),
        dispatcher,
    )
}
