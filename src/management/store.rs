use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::{
    error::StoreError,
    types::{Credentials, Session},
};

/// File-backed storage for client credentials and the OAuth session.
///
/// Both files are written as a whole (temp file, chmod 0600, rename), never
/// appended to, so a concurrent reader sees either the old or the new content.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
    token_path: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let token_path = dir.join("token.json");
        Self { dir, token_path }
    }

    pub fn with_token_path(dir: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            token_path: token_path.into(),
        }
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.dir.join("credentials.json")
    }

    /// A missing token file is an empty session, not an error.
    pub async fn load_session(&self) -> Result<Session, StoreError> {
        match async_fs::read_to_string(&self.token_path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Session::default()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    pub async fn save_session(&self, session: &Session) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(session)?;
        write_private(&self.token_path, json).await
    }

    pub async fn load_credentials(&self) -> Result<Credentials, StoreError> {
        match async_fs::read_to_string(self.credentials_path()).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Credentials::default()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    pub async fn save_credentials(&self, credentials: &Credentials) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(credentials)?;
        write_private(&self.credentials_path(), json).await
    }

    /// Credentials present and at least one token stored.
    pub async fn is_configured(&self) -> bool {
        let credentials = self.load_credentials().await.unwrap_or_default();
        let session = self.load_session().await.unwrap_or_default();
        credentials.is_complete() && session.has_any_token()
    }
}

async fn write_private(path: &Path, contents: String) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    async_fs::write(&tmp, contents).await?;
    restrict_permissions(&tmp).await?;
    async_fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<(), StoreError> {
    use std::{fs::Permissions, os::unix::fs::PermissionsExt};

    async_fs::set_permissions(path, Permissions::from_mode(0o600)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}
