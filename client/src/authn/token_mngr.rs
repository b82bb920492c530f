//! Token manager for backend authentication

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::authn::token::AccessToken;
use crate::errors::ClientError;
use crate::filesys::file::File;

/// Source of bearer tokens, backed by the identity provider
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Get a usable token, failing with `AuthError` when there is none
    async fn bearer(&self) -> Result<AccessToken, ClientError>;
}

/// On-disk token file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
}

/// Token manager reading the token the identity provider left on disk
pub struct TokenManager {
    token_file: Arc<File>,
    cached_token: RwLock<Option<AccessToken>>,
}

impl TokenManager {
    /// Create a new token manager; the file is read lazily
    pub fn new(token_file: Arc<File>) -> Self {
        Self {
            token_file,
            cached_token: RwLock::new(None),
        }
    }

    /// Re-read the token file, replacing the cached token
    pub async fn reload(&self) -> Result<Option<AccessToken>, ClientError> {
        let stored: Option<StoredToken> = self.token_file.read_json_opt().await?;
        let token = stored.map(|stored| AccessToken::from_raw(stored.access_token));
        if token.is_none() {
            debug!("No token file at {}", self.token_file.path().display());
        }

        let mut cached = self.cached_token.write().await;
        *cached = token.clone();
        Ok(token)
    }

    /// Persist a token obtained from the identity provider
    pub async fn store(&self, token: AccessToken) -> Result<(), ClientError> {
        let stored = StoredToken {
            access_token: token.raw.expose_secret().to_string(),
        };
        self.token_file.write_private_json(&stored).await?;

        let mut cached = self.cached_token.write().await;
        *cached = Some(token);
        info!("Access token stored");
        Ok(())
    }

    /// Forget the token, e.g. after the backend rejected it
    pub async fn clear(&self) -> Result<(), ClientError> {
        self.token_file.delete().await?;
        let mut cached = self.cached_token.write().await;
        *cached = None;
        Ok(())
    }
}

#[async_trait]
impl TokenSource for TokenManager {
    async fn bearer(&self) -> Result<AccessToken, ClientError> {
        let cached = { self.cached_token.read().await.clone() };
        let token = match cached {
            Some(token) => Some(token),
            None => self.reload().await?,
        };

        match token {
            Some(token) if token.is_usable() => Ok(token),
            Some(_) => Err(ClientError::AuthError(
                "Access token expired, please sign in again".to_string(),
            )),
            None => Err(ClientError::AuthError(
                "No access token, please sign in".to_string(),
            )),
        }
    }
}

/// A fixed token supplied on the command line or by tests
#[derive(Debug, Clone)]
pub struct StaticToken(Option<AccessToken>);

impl StaticToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(Some(AccessToken::from_raw(raw)))
    }

    /// A source that never yields a token
    pub fn none() -> Self {
        Self(None)
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn bearer(&self) -> Result<AccessToken, ClientError> {
        match &self.0 {
            Some(token) if token.is_usable() => Ok(token.clone()),
            _ => Err(ClientError::AuthError("No usable access token".to_string())),
        }
    }
}
