//! Task status tracker
//!
//! Keeps, per deployment, the most recent task of kind deploy. This is an
//! in-memory projection only; the backend keeps the full history.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use openapi_client::Task;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::authn::token_mngr::TokenSource;
use crate::errors::ClientError;
use crate::http::tasks::TaskSource;
use crate::models::task::{TaskKind, TaskRecord};

/// What a refresh did to the projection
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The entry now holds this record
    Updated(TaskRecord),

    /// The backend reported no deploy task; the entry is unchanged
    NoDeployTasks,

    /// No usable token; nothing was fetched
    Unauthenticated,

    /// The fetch failed; the entry is unchanged
    Failed(String),
}

pub struct TaskStatusTracker {
    source: Arc<dyn TaskSource>,
    tokens: Arc<dyn TokenSource>,
    latest: RwLock<HashMap<String, TaskRecord>>,
}

impl TaskStatusTracker {
    pub fn new(source: Arc<dyn TaskSource>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            tokens,
            latest: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the tasks of a deployment and retain its latest deploy task.
    ///
    /// Never fails: auth and HTTP errors are logged and leave the projection
    /// as it was. Concurrent refreshes of the same id are not cancelled; the
    /// last response to arrive wins.
    pub async fn refresh(&self, deployment_id: &str) -> RefreshOutcome {
        let token = match self.tokens.bearer().await {
            Ok(token) => token,
            Err(e) => {
                warn!(
                    "Skipping task refresh for deployment {}: {}",
                    deployment_id, e
                );
                return RefreshOutcome::Unauthenticated;
            }
        };

        let body = match self
            .source
            .list_deployment_tasks(deployment_id, &token.raw)
            .await
        {
            Ok(body) => body,
            Err(ClientError::AuthError(e) | ClientError::Forbidden(e)) => {
                warn!(
                    "Task refresh for deployment {} rejected: {}",
                    deployment_id, e
                );
                return RefreshOutcome::Unauthenticated;
            }
            Err(e) => {
                error!(
                    "Failed to fetch tasks for deployment {}: {}",
                    deployment_id, e
                );
                return RefreshOutcome::Failed(e.to_string());
            }
        };

        let Some(record) = latest_deploy_task(parse_task_list(body, deployment_id)) else {
            debug!("No deploy task for deployment {}", deployment_id);
            return RefreshOutcome::NoDeployTasks;
        };

        debug!(
            "Deployment {} latest deploy task {} is {:?}",
            deployment_id, record.task_id, record.status
        );
        self.latest
            .write()
            .await
            .insert(deployment_id.to_string(), record.clone());
        RefreshOutcome::Updated(record)
    }

    /// Refresh several deployments concurrently
    pub async fn refresh_all(&self, deployment_ids: &[String]) -> Vec<(String, RefreshOutcome)> {
        let outcomes = join_all(deployment_ids.iter().map(|id| self.refresh(id))).await;
        deployment_ids.iter().cloned().zip(outcomes).collect()
    }

    /// Latest deploy task known for a deployment
    pub async fn latest(&self, deployment_id: &str) -> Option<TaskRecord> {
        self.latest.read().await.get(deployment_id).cloned()
    }

    /// Copy of the whole projection
    pub async fn snapshot(&self) -> HashMap<String, TaskRecord> {
        self.latest.read().await.clone()
    }

    /// Stop tracking a deployment
    pub async fn forget(&self, deployment_id: &str) {
        self.latest.write().await.remove(deployment_id);
    }
}

/// Decode a task list body. A non-list body counts as no tasks; entries that
/// do not decode are skipped.
pub fn parse_task_list(body: Value, deployment_id: &str) -> Vec<TaskRecord> {
    let Value::Array(items) = body else {
        warn!(
            "Task list for deployment {} is not a list, treating as empty",
            deployment_id
        );
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Task>(item) {
            Ok(task) => Some(TaskRecord::from_wire(task, deployment_id)),
            Err(e) => {
                warn!("Skipping malformed task for deployment {}: {}", deployment_id, e);
                None
            }
        })
        .collect()
}

/// Most recent deploy task. Walking the list in order, a later deploy task
/// replaces the current pick unless both carry a timestamp and the later one
/// is older; a record without a timestamp never outranks list position.
pub fn latest_deploy_task(records: Vec<TaskRecord>) -> Option<TaskRecord> {
    records
        .into_iter()
        .filter(|r| r.kind == TaskKind::Deploy)
        .reduce(|current, next| {
            match (current.ordering_time(), next.ordering_time()) {
                (Some(picked), Some(candidate)) if candidate < picked => current,
                _ => next,
            }
        })
}
