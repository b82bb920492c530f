//! Application template API client

use openapi_client::{App, AppVariable};
use secrecy::SecretString;

use crate::errors::ClientError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// List the templates visible to the caller
    pub async fn list_apps(&self, token: &SecretString) -> Result<Vec<App>, ClientError> {
        self.get("/apps", token).await
    }

    /// Get a single template by ID
    pub async fn get_app(&self, app_id: &str, token: &SecretString) -> Result<App, ClientError> {
        let path = format!("/apps/{}", app_id);
        self.get(&path, token).await
    }

    /// Get the variables a template declares at one release tag
    pub async fn get_app_variables(
        &self,
        app_id: &str,
        version: &str,
        token: &SecretString,
    ) -> Result<Vec<AppVariable>, ClientError> {
        let path = format!("/apps/{}/variables", app_id);
        self.get_with_query(&path, token, &[("version", version)]).await
    }
}
