//! OAuth token persistence.
//!
//! The token cache is a small JSON file holding the access token, refresh
//! token, and expiry. It is created on first authorization, read on later
//! runs, and overwritten whenever a new token is issued.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use super::auth::StoredToken;
use super::error::AuthError;

/// Load/save capability for the OAuth token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the cached token, or `None` if nothing has been cached yet.
    async fn load(&self) -> Result<Option<StoredToken>, AuthError>;

    /// Persist a token, replacing any previous one.
    async fn save(&self, token: &StoredToken) -> Result<(), AuthError>;
}

/// Token store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store for `path`. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Token cache path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> AuthError {
        AuthError::TokenStoreIo {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<StoredToken>, AuthError> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cached token");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let token = serde_json::from_slice(&contents)?;
        debug!(path = %self.path.display(), "Loaded cached token");
        Ok(Some(token))
    }

    async fn save(&self, token: &StoredToken) -> Result<(), AuthError> {
        info!(path = %self.path.display(), "Saving credential file");

        let contents = serde_json::to_vec_pretty(token)?;
        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|e| self.io_error(e))?;

        // Tokens grant spreadsheet access; keep them owner-only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| self.io_error(e))?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn token() -> StoredToken {
        StoredToken {
            access_token: "ya29.a0AfH6SMB".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("1//0gLq-refresh".to_string()),
            expiry: Some(Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token.json"));

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token.json"));

        store.save(&token()).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();

        assert_eq!(loaded.access_token, "ya29.a0AfH6SMB");
        assert_eq!(loaded.refresh_token.as_deref(), Some("1//0gLq-refresh"));
        assert_eq!(loaded.expiry, token().expiry);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token.json"));

        store.save(&token()).await.unwrap();
        let mut newer = token();
        newer.access_token = "ya29.newer".to_string();
        store.save(&newer).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "ya29.newer");
    }

    #[tokio::test]
    async fn test_malformed_file_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();

        let err = FileTokenStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, AuthError::TokenFormat(_)));
    }

    #[tokio::test]
    async fn test_unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("missing-dir").join("token.json"));

        let err = store.save(&token()).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenStoreIo { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token.json"));
        store.save(&token()).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
