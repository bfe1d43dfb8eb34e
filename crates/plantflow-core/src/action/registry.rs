//! Name-indexed registry of handler factories.

use dashmap::DashMap;

use super::handler::ActionHandlerFactory;

/// Maps action names to handler factories. Names are case-insensitive.
///
/// Populated by application wiring; the dispatcher only reads it.
pub trait ActionHandlerRegistry: Send + Sync {
    /// Register a factory. An existing entry under the same name is replaced.
    fn register(&self, name: &str, factory: ActionHandlerFactory);

    fn try_get_factory(&self, name: &str) -> Option<ActionHandlerFactory>;
}

/// `DashMap`-backed registry; safe to register into while dispatching.
#[derive(Default)]
pub struct InMemoryActionRegistry {
    /// Lowercased name -> (name as registered, factory).
    factories: DashMap<String, (String, ActionHandlerFactory)>,
}

impl InMemoryActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered names as given at registration, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .iter()
            .map(|entry| entry.value().0.clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl ActionHandlerRegistry for InMemoryActionRegistry {
    fn register(&self, name: &str, factory: ActionHandlerFactory) {
        let name = name.trim();
        if self
            .factories
            .insert(name.to_lowercase(), (name.to_string(), factory))
            .is_some()
        {
            tracing::debug!(action = name, "replaced action handler registration");
        }
    }

    fn try_get_factory(&self, name: &str) -> Option<ActionHandlerFactory> {
        self.factories
            .get(&name.trim().to_lowercase())
            .map(|entry| entry.value().1.clone())
    }
}

impl std::fmt::Debug for InMemoryActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryActionRegistry")
            .field("names", &self.names())
            .finish()
    }
}
