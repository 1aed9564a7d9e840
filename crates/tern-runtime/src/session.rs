//! JSON file session persistence.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use tern_core::{Session, SessionResult, SessionStore};

/// [`SessionStore`] that keeps the session in a JSON file.
///
/// Parent directories are created on [`store`](SessionStore::store). A
/// missing file reads as "no session".
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> SessionResult<Option<Session>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session = serde_json::from_str(&raw)?;
        debug!(path = %self.path.display(), "Session loaded");
        Ok(Some(session))
    }

    async fn store(&self, session: &Session) -> SessionResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(session)?;
        tokio::fs::write(&self.path, raw).await?;
        debug!(path = %self.path.display(), "Session stored");
        Ok(())
    }

    async fn clear(&self) -> SessionResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tern_core::SessionError;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_roundtrip_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested/tern/session.json"));

        assert_eq!(assert_ok!(store.load().await), None);

        let session = Session::new("token").with_user_id(7).with_expires_at(4_000_000_000);
        assert_ok!(store.store(&session).await);
        assert!(store.path().exists());
        assert_eq!(assert_ok!(store.load().await), Some(session));

        assert_ok!(store.clear().await);
        assert!(!store.path().exists());
        assert_eq!(assert_ok!(store.load().await), None);
        // Clearing twice is fine.
        assert_ok!(store.clear().await);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = assert_err!(FileSessionStore::new(path).load().await);
        assert!(matches!(err, SessionError::Serialization(_)));
    }
}
