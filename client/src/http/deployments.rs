//! Deployment API client

use async_trait::async_trait;
use openapi_client::{Deployment, DeploymentCreate};
use secrecy::SecretString;

use crate::errors::ClientError;
use crate::http::client::HttpClient;

/// Write seam used by the wizard to create deployments
#[async_trait]
pub trait DeploymentCreator: Send + Sync {
    async fn create_deployment(
        &self,
        request: &DeploymentCreate,
        token: &SecretString,
    ) -> Result<Deployment, ClientError>;
}

impl HttpClient {
    /// Get a deployment by ID
    pub async fn get_deployment(
        &self,
        deployment_id: &str,
        token: &SecretString,
    ) -> Result<Deployment, ClientError> {
        let path = format!("/deployments/{}", deployment_id);
        self.get(&path, token).await
    }

    /// List deployments visible to the caller
    pub async fn list_deployments(
        &self,
        token: &SecretString,
    ) -> Result<Vec<Deployment>, ClientError> {
        self.get("/deployments", token).await
    }
}

#[async_trait]
impl DeploymentCreator for HttpClient {
    async fn create_deployment(
        &self,
        request: &DeploymentCreate,
        token: &SecretString,
    ) -> Result<Deployment, ClientError> {
        self.post("/deployments", token, request).await
    }
}
