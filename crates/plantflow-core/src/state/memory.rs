//! `DashMap`-backed instance store.
//!
//! Each instance's node and variables share one map entry, so writes go
//! through a single shard lock and `snapshot` is consistent. Guards are never
//! held across an `.await`.

use std::sync::Arc;

use dashmap::DashMap;
use plantflow_types::error::RepositoryError;
use plantflow_types::variables::{Variables, VariableUpdates};

use super::{InstanceSnapshot, InstanceStateStore};

/// In-process instance state, cloneable as a shared handle.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInstanceStore {
    inner: Arc<DashMap<String, InstanceSnapshot>>,
}

impl InMemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instances with any state.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl InstanceStateStore for InMemoryInstanceStore {
    async fn get_current_node(
        &self,
        instance_id: &str,
    ) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .inner
            .get(instance_id)
            .and_then(|state| state.current_node_id.clone()))
    }

    async fn set_current_node(
        &self,
        instance_id: &str,
        node_id: &str,
    ) -> Result<(), RepositoryError> {
        self.inner
            .entry(instance_id.to_string())
            .or_default()
            .current_node_id = Some(node_id.to_string());
        Ok(())
    }

    async fn clear_current_node(&self, instance_id: &str) -> Result<(), RepositoryError> {
        if let Some(mut state) = self.inner.get_mut(instance_id) {
            state.current_node_id = None;
        }
        Ok(())
    }

    async fn get_variables(&self, instance_id: &str) -> Result<Variables, RepositoryError> {
        Ok(self
            .inner
            .get(instance_id)
            .map(|state| state.variables.clone())
            .unwrap_or_default())
    }

    async fn set_variable(
        &self,
        instance_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), RepositoryError> {
        self.inner
            .entry(instance_id.to_string())
            .or_default()
            .variables
            .set(key, value);
        Ok(())
    }

    async fn set_variables(
        &self,
        instance_id: &str,
        updates: &VariableUpdates,
    ) -> Result<(), RepositoryError> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut state = self.inner.entry(instance_id.to_string()).or_default();
        state
            .variables
            .extend(updates.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        Ok(())
    }

    async fn snapshot(&self, instance_id: &str) -> Result<InstanceSnapshot, RepositoryError> {
        Ok(self
            .inner
            .get(instance_id)
            .map(|state| state.value().clone())
            .unwrap_or_default())
    }

    async fn clear(&self, instance_id: &str) -> Result<(), RepositoryError> {
        self.inner.remove(instance_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn current_node_roundtrip() {
        let store = InMemoryInstanceStore::new();
        assert_eq!(store.get_current_node("wf").await.unwrap(), None);

        store.set_current_node("wf", "A").await.unwrap();
        assert_eq!(store.get_current_node("wf").await.unwrap().as_deref(), Some("A"));

        store.clear_current_node("wf").await.unwrap();
        assert_eq!(store.get_current_node("wf").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clearing_node_keeps_variables() {
        let store = InMemoryInstanceStore::new();
        store.set_current_node("wf", "A").await.unwrap();
        store.set_variable("wf", "name", "ada").await.unwrap();
        store.clear_current_node("wf").await.unwrap();
        assert_eq!(store.get_variables("wf").await.unwrap().get("NAME"), Some("ada"));
    }

    #[tokio::test]
    async fn unknown_instance_reads_empty_without_creating_state() {
        let store = InMemoryInstanceStore::new();
        assert!(store.get_variables("nope").await.unwrap().is_empty());
        assert_eq!(store.snapshot("nope").await.unwrap(), InstanceSnapshot::default());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn batch_update_and_snapshot() {
        let store = InMemoryInstanceStore::new();
        store.set_current_node("wf", "B").await.unwrap();
        let updates: VariableUpdates = [
            ("x".to_string(), "1".to_string()),
            ("Y".to_string(), "2".to_string()),
        ]
        .into_iter()
        .collect();
        store.set_variables("wf", &updates).await.unwrap();

        let snap = store.snapshot("wf").await.unwrap();
        assert_eq!(snap.current_node_id.as_deref(), Some("B"));
        assert_eq!(snap.variables.get("y"), Some("2"));
        assert_eq!(snap.variables.len(), 2);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = InMemoryInstanceStore::new();
        store.set_current_node("wf", "A").await.unwrap();
        store.set_variable("wf", "k", "v").await.unwrap();
        store.clear("wf").await.unwrap();
        assert_eq!(store.snapshot("wf").await.unwrap(), InstanceSnapshot::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_set_variable_on_one_instance() {
        let store = InMemoryInstanceStore::new();
        let mut handles = Vec::new();

        for i in 0..100 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .set_variable("shared", &format!("key-{i}"), &i.to_string())
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let vars = store.get_variables("shared").await.unwrap();
        assert_eq!(vars.len(), 100);
        for i in 0..100 {
            assert_eq!(vars.get(&format!("KEY-{i}")), Some(i.to_string().as_str()));
        }
        assert_eq!(store.len(), 1);
    }
}
