//! API models
//!
//! Field names follow the backend JSON exactly: identifiers and release tags
//! are camelCase, timestamps are snake_case.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Application template record (`GET /apps`, `GET /apps/{id}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    #[serde(rename = "appId")]
    pub app_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub git_link: Option<String>,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(rename = "releaseTag", default)]
    pub release_tag: Option<String>,
}

/// Declared template variable (`GET /apps/{id}/variables?version=`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppVariable {
    pub name: String,
    #[serde(rename = "type", default)]
    pub var_type: Option<String>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

/// User role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Teacher,
    Admin,
    #[serde(other)]
    Unknown,
}

/// User record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(rename = "courseId", default)]
    pub course_id: Option<String>,
}

/// Course record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "courseId")]
    pub course_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Course with enrolled users (`GET /courses/{id}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseWithUsers {
    #[serde(flatten)]
    pub course: Course,
    #[serde(default)]
    pub users: Vec<User>,
}

/// Deployment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Pending,
    Running,
    Success,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Deployment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    #[serde(rename = "deploymentId")]
    pub deployment_id: String,
    pub name: String,
    #[serde(rename = "appId")]
    pub app_id: String,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    pub status: DeploymentStatus,
    #[serde(rename = "releaseTag", default)]
    pub release_tag: Option<String>,
    #[serde(rename = "userInputVar", default)]
    pub user_input_var: Option<serde_json::Value>,
}

/// Variable values grouped by the provisioning engine that consumes them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInputVar {
    #[serde(default)]
    pub terraform: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub packer: BTreeMap<String, serde_json::Value>,
}

/// Team entry of a deployment create request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamCreate {
    pub name: String,
    #[serde(rename = "userIds")]
    pub user_ids: Vec<String>,
}

/// Deployment create request (`POST /deployments`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentCreate {
    pub name: String,
    #[serde(rename = "appId")]
    pub app_id: String,
    #[serde(rename = "releaseTag")]
    pub release_tag: String,
    #[serde(rename = "userInputVar")]
    pub user_input_var: UserInputVar,
    pub teams: Vec<TeamCreate>,
}

/// Provisioning task record (`GET /tasks/deployment/{id}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "taskId")]
    pub task_id: String,
    #[serde(rename = "deploymentId", default)]
    pub deployment_id: Option<String>,
    #[serde(rename = "type")]
    pub task_type: String,
    pub status: String,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub logs: Option<serde_json::Value>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: serde_json::Value,
}

impl ErrorResponse {
    /// Human readable detail; FastAPI validation errors carry a list here
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
