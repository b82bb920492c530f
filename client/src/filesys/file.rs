//! JSON files on disk: settings, plans and the stored access token

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::ClientError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Read and decode the file, `None` when it does not exist. A file that
    /// exists but does not decode is a `ConfigError` naming the path.
    pub async fn read_json_opt<T: DeserializeOwned>(&self) -> Result<Option<T>, ClientError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&contents).map(Some).map_err(|e| {
            ClientError::ConfigError(format!("Malformed {}: {}", self.path.display(), e))
        })
    }

    /// Read and decode a file that must exist
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        self.read_json_opt().await?.ok_or_else(|| {
            ClientError::ConfigError(format!("File not found: {}", self.path.display()))
        })
    }

    /// Write pretty JSON, creating parent directories
    pub async fn write_json<T: Serialize>(&self, value: &T) -> Result<(), ClientError> {
        let contents = serde_json::to_string_pretty(value)?;
        self.write_via_sibling(contents.as_bytes(), false).await
    }

    /// Write pretty JSON readable by the owner only. The content lands in a
    /// sibling file first, so readers never see a half-written token.
    pub async fn write_private_json<T: Serialize>(&self, value: &T) -> Result<(), ClientError> {
        let contents = serde_json::to_string_pretty(value)?;
        self.write_via_sibling(contents.as_bytes(), true).await
    }

    /// Remove the file; a missing file is not an error
    pub async fn delete(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn sibling(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_via_sibling(&self, contents: &[u8], private: bool) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp = self.sibling();
        let mut file = fs::File::create(&tmp).await?;
        if private {
            restrict_to_owner(&tmp).await?;
        }
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(unix)]
async fn restrict_to_owner(path: &Path) -> Result<(), ClientError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_to_owner(_path: &Path) -> Result<(), ClientError> {
    Ok(())
}
