//! Process-local definition store.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use plantflow_core::repository::DefinitionStore;
use plantflow_types::error::RepositoryError;
use plantflow_types::workflow::WorkflowDefinition;

/// `DashMap`-backed store. Cloning shares the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDefinitionStore {
    inner: Arc<DashMap<String, WorkflowDefinition>>,
}

impl InMemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DefinitionStore for InMemoryDefinitionStore {
    async fn create(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<WorkflowDefinition, RepositoryError> {
        match self.inner.entry(definition.id.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::Conflict(definition.id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(definition.clone());
                Ok(definition.clone())
            }
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<WorkflowDefinition>, RepositoryError> {
        Ok(self.inner.get(id).map(|d| d.value().clone()))
    }

    async fn get_all(&self) -> Result<Vec<WorkflowDefinition>, RepositoryError> {
        let mut all: Vec<WorkflowDefinition> =
            self.inner.iter().map(|d| d.value().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn update(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<WorkflowDefinition, RepositoryError> {
        match self.inner.get_mut(&definition.id) {
            Some(mut slot) => {
                *slot = definition.clone();
                Ok(definition.clone())
            }
            None => Err(RepositoryError::NotFound(definition.id.clone())),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.inner
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use plantflow_core::diagram::parse_diagram;

    use super::*;

    #[tokio::test]
    async fn crud_cycle() {
        let store = InMemoryDefinitionStore::new();
        let def = parse_diagram(":A;\n:B;", Some("wf"), Some("First"));

        store.create(&def).await.unwrap();
        assert!(matches!(
            store.create(&def).await,
            Err(RepositoryError::Conflict(_))
        ));

        let mut changed = def.clone();
        changed.name = "Second".to_string();
        store.update(&changed).await.unwrap();
        assert_eq!(store.get_by_id("wf").await.unwrap().unwrap().name, "Second");

        store.delete("wf").await.unwrap();
        assert!(store.get_by_id("wf").await.unwrap().is_none());
        assert!(matches!(
            store.delete("wf").await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(matches!(
            store.update(&changed).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn get_all_is_sorted_by_id() {
        let store = InMemoryDefinitionStore::new();
        for id in ["b", "c", "a"] {
            store.create(&parse_diagram(":X;", Some(id), None)).await.unwrap();
        }
        let ids: Vec<String> = store.get_all().await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
