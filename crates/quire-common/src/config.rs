use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{ParseError, QuireError};
use crate::models::StoredSession;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000";
/// Environment variable overriding the default endpoint.
pub const ENDPOINT_ENV: &str = "QUIRE_API_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the blog server.
    pub endpoint: String,
}

impl Config {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// Default endpoint, unless `QUIRE_API_URL` says otherwise.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup(ENDPOINT_ENV).filter(|v| !v.trim().is_empty()) {
            Some(endpoint) => Self::new(endpoint.trim()),
            None => Self::default(),
        }
    }

    /// Replace the endpoint when an override is present.
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        if let Some(endpoint) = endpoint.filter(|v| !v.trim().is_empty()) {
            self.endpoint = endpoint.trim().to_string();
        }
        self
    }

    /// `<user config dir>/quire`, if the platform has one.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("quire"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

/// Where the logged-in session lives between runs.
pub trait SessionPersistence {
    /// `Ok(None)` when nothing is stored.
    fn load(&self) -> impl Future<Output = Result<Option<StoredSession>, QuireError>> + Send;

    fn save(&self, session: &StoredSession) -> impl Future<Output = Result<(), QuireError>> + Send;

    /// Remove the stored session. Clearing an empty store is not an error.
    fn clear(&self) -> impl Future<Output = Result<(), QuireError>> + Send;
}

/// Session kept as a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `<user config dir>/quire/session.json`
    pub fn default_location() -> Option<Self> {
        Config::default_dir().map(|dir| Self::new(dir.join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionPersistence for FileSessionStore {
    async fn load(&self) -> Result<Option<StoredSession>, QuireError> {
        let body = match tokio::fs::read_to_string(&self.path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session = serde_json::from_str(&body)
            .map_err(|e| ParseError::from_file(&self.path, body.clone(), e))?;
        Ok(Some(session))
    }

    async fn save(&self, session: &StoredSession) -> Result<(), QuireError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_string_pretty(session)
            .map_err(|e| QuireError::Config(format!("could not encode session: {e}")))?;
        tokio::fs::write(&self.path, body).await?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    async fn clear(&self) -> Result<(), QuireError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store, for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<StoredSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: StoredSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl SessionPersistence for MemorySessionStore {
    async fn load(&self) -> Result<Option<StoredSession>, QuireError> {
        Ok(self.session.lock().await.clone())
    }

    async fn save(&self, session: &StoredSession) -> Result<(), QuireError> {
        *self.session.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), QuireError> {
        self.session.lock().await.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn stored() -> StoredSession {
        StoredSession {
            user: User {
                id: "u1".into(),
                name: "Ada".into(),
                email: "ada@x.io".into(),
                verified: None,
            },
            credential: Some("token=abc".into()),
        }
    }

    #[test]
    fn test_endpoint_overrides() {
        assert_eq!(Config::from_lookup(|_| None).endpoint, DEFAULT_ENDPOINT);
        let config = Config::from_lookup(|_| Some(" https://blog.example ".into()));
        assert_eq!(config.endpoint, "https://blog.example");
        assert_eq!(Config::from_lookup(|_| Some("  ".into())).endpoint, DEFAULT_ENDPOINT);

        let config = config.with_endpoint(Some("http://cli".into()));
        assert_eq!(config.endpoint, "http://cli");
        assert_eq!(config.clone().with_endpoint(None), config);
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));
        assert_eq!(store.load().await.unwrap(), None);

        store.save(&stored()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(stored()));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = FileSessionStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, QuireError::Parse(_)));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySessionStore::new();
        assert_eq!(store.load().await.unwrap(), None);
        store.save(&stored()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(stored()));
        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }
}
