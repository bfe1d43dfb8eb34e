//! JSON-file definition store.
//!
//! One pretty-printed JSON file per definition under `{dir}/{id}.json`.
//! Ids are escaped into safe file names. Writes go to a temporary file that
//! is renamed into place, so readers never see a half-written definition.

use std::path::{Path, PathBuf};

use plantflow_core::repository::DefinitionStore;
use plantflow_types::error::RepositoryError;
use plantflow_types::workflow::WorkflowDefinition;
use tokio::sync::Mutex;

const EXTENSION: &str = "json";

/// Filesystem-backed definition store.
#[derive(Debug)]
pub struct JsonFileDefinitionStore {
    dir: PathBuf,
    /// Serializes the exists-check and write of `create`/`update`/`delete`.
    write_lock: Mutex<()>,
}

impl JsonFileDefinitionStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the definition with this id.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{EXTENSION}", file_stem(id)))
    }

    async fn read(&self, path: &Path) -> Result<Option<WorkflowDefinition>, RepositoryError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, definition: &WorkflowDefinition) -> Result<(), RepositoryError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&definition.id);
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        let body = serde_json::to_string_pretty(definition)?;
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// Escape an id into a file stem: ASCII alphanumerics, `-` and `_` are kept,
/// every other byte becomes `%XX`.
fn file_stem(id: &str) -> String {
    let mut stem = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

impl DefinitionStore for JsonFileDefinitionStore {
    async fn create(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<WorkflowDefinition, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        if tokio::fs::try_exists(self.path_for(&definition.id)).await? {
            return Err(RepositoryError::Conflict(definition.id.clone()));
        }
        self.write(definition).await?;
        tracing::debug!(workflow_id = %definition.id, "definition file created");
        Ok(definition.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<WorkflowDefinition>, RepositoryError> {
        self.read(&self.path_for(id)).await
    }

    async fn get_all(&self) -> Result<Vec<WorkflowDefinition>, RepositoryError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut all = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            match self.read(&path).await {
                Ok(Some(definition)) => all.push(definition),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable definition file");
                }
            }
        }
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn update(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<WorkflowDefinition, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        if !tokio::fs::try_exists(self.path_for(&definition.id)).await? {
            return Err(RepositoryError::NotFound(definition.id.clone()));
        }
        self.write(definition).await?;
        tracing::debug!(workflow_id = %definition.id, "definition file replaced");
        Ok(definition.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(RepositoryError::NotFound(id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use plantflow_core::diagram::parse_diagram;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_file_stem_escapes_unsafe_bytes() {
        assert_eq!(file_stem("order-flow_2"), "order-flow_2");
        assert_eq!(file_stem("../etc/passwd"), "%2E%2E%2Fetc%2Fpasswd");
        assert_eq!(file_stem("a b"), "a%20b");
    }

    #[tokio::test]
    async fn test_roundtrip_through_disk() {
        let dir = tempdir().unwrap();
        let store = JsonFileDefinitionStore::new(dir.path().join("workflows"));
        let text = "start\n:Pick;\nnote right\n{\"icon\":\"pin\"} | Choose\nend note\nif (ok?) then (yes)\n:Go;\nendif\nstop";
        let def = parse_diagram(text, Some("onboarding flow"), Some("Onboarding"));

        store.create(&def).await.unwrap();
        assert!(store.path_for("onboarding flow").exists());

        let loaded = store.get_by_id("onboarding flow").await.unwrap().unwrap();
        assert_eq!(loaded, def);
    }

    #[tokio::test]
    async fn test_missing_dir_reads_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileDefinitionStore::new(dir.path().join("nope"));
        assert!(store.get_all().await.unwrap().is_empty());
        assert!(store.get_by_id("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let dir = tempdir().unwrap();
        let store = JsonFileDefinitionStore::new(dir.path());
        let def = parse_diagram(":A;", Some("wf"), Some("v1"));

        store.create(&def).await.unwrap();
        assert!(matches!(
            store.create(&def).await,
            Err(RepositoryError::Conflict(_))
        ));

        let mut v2 = def.clone();
        v2.name = "v2".to_string();
        store.update(&v2).await.unwrap();
        assert_eq!(store.get_by_id("wf").await.unwrap().unwrap().name, "v2");

        store.delete("wf").await.unwrap();
        assert!(matches!(
            store.delete("wf").await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(matches!(
            store.update(&v2).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_all_skips_foreign_and_corrupt_files() {
        let dir = tempdir().unwrap();
        let store = JsonFileDefinitionStore::new(dir.path());
        store.create(&parse_diagram(":B;", Some("b"), None)).await.unwrap();
        store.create(&parse_diagram(":A;", Some("a"), None)).await.unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), "hello").await.unwrap();
        tokio::fs::write(dir.path().join("broken.json"), "{not json").await.unwrap();

        let ids: Vec<String> = store.get_all().await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_serialization_error() {
        let dir = tempdir().unwrap();
        let store = JsonFileDefinitionStore::new(dir.path());
        tokio::fs::write(store.path_for("bad"), "[]").await.unwrap();
        assert!(matches!(
            store.get_by_id("bad").await,
            Err(RepositoryError::Serialization(_))
        ));
    }
}
