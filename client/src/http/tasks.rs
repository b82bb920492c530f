//! Task API client

use async_trait::async_trait;
use openapi_client::Task;
use secrecy::SecretString;
use serde_json::Value;
use tracing::warn;

use crate::errors::ClientError;
use crate::http::client::HttpClient;

/// Read seam used by the task status tracker
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Fetch the raw task list body; the shape is checked by the caller.
    /// A body that is not JSON at all comes back as `Value::Null`.
    async fn list_deployment_tasks(
        &self,
        deployment_id: &str,
        token: &SecretString,
    ) -> Result<Value, ClientError>;
}

impl HttpClient {
    /// Get a task by ID
    pub async fn get_task(&self, task_id: &str, token: &SecretString) -> Result<Task, ClientError> {
        let path = format!("/tasks/{}", task_id);
        self.get(&path, token).await
    }
}

#[async_trait]
impl TaskSource for HttpClient {
    async fn list_deployment_tasks(
        &self,
        deployment_id: &str,
        token: &SecretString,
    ) -> Result<Value, ClientError> {
        let path = format!("/tasks/deployment/{}", deployment_id);
        let body = self.get_text(&path, token).await?;
        Ok(serde_json::from_str(&body).unwrap_or_else(|e| {
            warn!(
                "Task list for deployment {} is not JSON: {}",
                deployment_id, e
            );
            Value::Null
        }))
    }
}
