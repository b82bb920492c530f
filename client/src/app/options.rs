//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::ClientError;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::workers::poller;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Backend API base URL
    pub backend_base_url: String,

    /// Transport timeout applied to every request
    pub request_timeout: Duration,

    /// Storage layout paths
    pub layout: StorageLayout,

    /// Bearer token given on the command line, overrides the token file
    pub token_override: Option<String>,

    /// Poller worker options
    pub poller: poller::Options,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            backend_base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            layout: StorageLayout::default(),
            token_override: None,
            poller: poller::Options::default(),
        }
    }
}

impl AppOptions {
    /// Options from the settings file
    pub fn from_settings(settings: &Settings, layout: StorageLayout) -> Self {
        Self {
            backend_base_url: settings.backend.base_url.clone(),
            request_timeout: Duration::from_secs(settings.backend.timeout_secs),
            layout,
            token_override: None,
            poller: poller::Options::from(&settings.poller),
        }
    }
}

/// What the binary was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// List the template catalog
    Templates,

    /// Show the variables of one template version
    Variables {
        app_id: String,
        release: Option<String>,
    },

    /// Build the payload of a plan without submitting it
    Preview { plan: PathBuf },

    /// Submit a plan, optionally watching the resulting deployment
    Deploy { plan: PathBuf, watch: bool },

    /// Refresh the latest deploy task of some deployments once
    Status { deployment_ids: Vec<String> },

    /// Poll deployments until their deploy tasks finish or shutdown
    Watch { deployment_ids: Vec<String> },

    /// List visible deployments, or show one
    Deployments { deployment_id: Option<String> },

    /// Show one task with its logs
    Task { task_id: String },
}

impl Command {
    /// Pick the command from parsed `--key[=value]` arguments
    pub fn from_args(args: &std::collections::HashMap<String, String>) -> Result<Self, ClientError> {
        let flag = |key: &str| args.contains_key(key);
        let value = |key: &str| {
            args.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && v != "true")
        };
        let required = |key: &str| {
            value(key).ok_or_else(|| ClientError::ConfigError(format!("--{}=<value> is required", key)))
        };
        let deployment_ids = || -> Result<Vec<String>, ClientError> {
            let ids: Vec<String> = required("deployment")?
                .split(',')
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect();
            Ok(ids)
        };

        if flag("templates") {
            Ok(Command::Templates)
        } else if flag("variables") {
            Ok(Command::Variables {
                app_id: required("app")?,
                release: value("release"),
            })
        } else if flag("preview") {
            Ok(Command::Preview {
                plan: PathBuf::from(required("plan")?),
            })
        } else if flag("deploy") {
            Ok(Command::Deploy {
                plan: PathBuf::from(required("plan")?),
                watch: flag("watch"),
            })
        } else if flag("deployments") {
            Ok(Command::Deployments {
                deployment_id: value("deployment"),
            })
        } else if flag("task") {
            Ok(Command::Task {
                task_id: required("task")?,
            })
        } else if flag("status") {
            Ok(Command::Status {
                deployment_ids: deployment_ids()?,
            })
        } else if flag("watch") {
            Ok(Command::Watch {
                deployment_ids: deployment_ids()?,
            })
        } else {
            Err(ClientError::ConfigError(
                "No command given, try --templates, --variables, --preview, --deploy, --deployments, --task, --status or --watch".to_string(),
            ))
        }
    }
}
