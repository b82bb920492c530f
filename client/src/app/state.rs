//! Application state management

use std::sync::Arc;

use tracing::{info, warn};

use crate::app::options::AppOptions;
use crate::authn::token::AccessToken;
use crate::authn::token_mngr::{StaticToken, TokenManager, TokenSource};
use crate::cache::catalog::TemplateCatalog;
use crate::cache::roster::RosterCache;
use crate::errors::ClientError;
use crate::http::client::HttpClient;
use crate::tasks::tracker::TaskStatusTracker;
use crate::wizard::variables::BackendVariableResolver;

/// Application caches
#[derive(Default)]
pub struct Caches {
    pub templates: Arc<TemplateCatalog>,
    pub rosters: Arc<RosterCache>,
}

/// Main application state
pub struct AppState {
    /// HTTP client for backend communication
    pub http_client: Arc<HttpClient>,

    /// Bearer token source
    pub tokens: Arc<dyn TokenSource>,

    /// Token file manager, absent when a token was given on the command line
    pub token_mngr: Option<Arc<TokenManager>>,

    /// Application caches
    pub caches: Caches,

    /// Variable resolver used by wizard sessions
    pub resolver: Arc<BackendVariableResolver>,

    /// Latest deploy task per deployment
    pub tracker: Arc<TaskStatusTracker>,
}

impl AppState {
    /// Initialize application state
    pub async fn init(options: &AppOptions) -> Result<Self, ClientError> {
        info!("Initializing application state...");

        let http_client = Arc::new(HttpClient::with_timeout(
            &options.backend_base_url,
            options.request_timeout,
        )?);

        let token_mngr = match &options.token_override {
            Some(_) => None,
            None => Some(Arc::new(TokenManager::new(Arc::new(
                options.layout.token_file(),
            )))),
        };
        let tokens: Arc<dyn TokenSource> = match (&options.token_override, &token_mngr) {
            (_, Some(token_mngr)) => token_mngr.clone(),
            (Some(raw), None) => Arc::new(StaticToken::new(raw.clone())),
            (None, None) => Arc::new(StaticToken::none()),
        };

        let resolver = Arc::new(BackendVariableResolver::new(
            http_client.clone(),
            tokens.clone(),
        ));
        let tracker = Arc::new(TaskStatusTracker::new(http_client.clone(), tokens.clone()));

        Ok(Self {
            http_client,
            tokens,
            token_mngr,
            caches: Caches::default(),
            resolver,
            tracker,
        })
    }

    /// Current bearer token
    pub async fn bearer(&self) -> Result<AccessToken, ClientError> {
        self.tokens.bearer().await
    }

    /// React to a failed backend call. Only an authentication failure drops
    /// the stored token; a 403 means the token is valid but lacks the role.
    /// Returns whether the token was cleared.
    pub async fn handle_rejection(&self, err: &ClientError) -> Result<bool, ClientError> {
        match (err, &self.token_mngr) {
            (ClientError::AuthError(_), Some(token_mngr)) => {
                warn!("Backend rejected the stored access token, clearing it");
                token_mngr.clear().await?;
                Ok(true)
            }
            (ClientError::Forbidden(detail), _) => {
                warn!("Access token lacks permission: {}", detail);
                Ok(false)
            }
            _ => Ok(false),
        }
    }
}
