//! Durable key-value storage for the session blob.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::SessionError;
use crate::models::SessionData;

/// Key under which the session blob is stored.
pub const SESSION_KEY: &str = "coverforme_auth";

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;
    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), SessionError>;
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key under `dir`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        // Write then rename so a crash never leaves a half-written blob.
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, self.path_for(key)).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), SessionError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub async fn load_session(store: &dyn KeyValueStore) -> Result<Option<SessionData>, SessionError> {
    match store.get(SESSION_KEY).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn save_session(store: &dyn KeyValueStore, session: &SessionData) -> Result<(), SessionError> {
    let raw = serde_json::to_string(session)?;
    store.set(SESSION_KEY, &raw).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserProfile;

    fn session() -> SessionData {
        SessionData {
            firebase_id_token: "id-1".to_string(),
            refresh_token: Some("refresh-1".to_string()),
            user: UserProfile {
                email: "ada@example.com".to_string(),
                full_name: None,
                firebase_uid: "uid-1".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_file_store_persists_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        assert!(load_session(&store).await.unwrap().is_none());
        save_session(&store, &session()).await.unwrap();

        let reopened = FileStore::new(dir.path().join("nested"));
        assert_eq!(load_session(&reopened).await.unwrap(), Some(session()));
    }

    #[tokio::test]
    async fn test_file_store_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        save_session(&store, &session()).await.unwrap();

        store.remove(SESSION_KEY).await.unwrap();
        store.remove(SESSION_KEY).await.unwrap();
        assert!(store.get(SESSION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_reported() {
        let store = MemoryStore::new();
        store.set(SESSION_KEY, "{not json").await.unwrap();
        assert!(matches!(
            load_session(&store).await,
            Err(SessionError::Corrupt(_))
        ));
    }
}
