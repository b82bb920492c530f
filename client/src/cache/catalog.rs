//! Template catalog

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tracing::{debug, info};

use crate::errors::ClientError;
use crate::http::client::HttpClient;
use crate::models::template::TemplateVersion;

/// Read-only cache of the templates the backend offers.
///
/// Entries are immutable once fetched; a refetch replaces them wholesale.
#[derive(Default)]
pub struct TemplateCatalog {
    entries: RwLock<Vec<TemplateVersion>>,
    fetched_at: RwLock<Option<DateTime<Utc>>>,
}

impl TemplateCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch all templates and replace the cached list
    pub async fn refresh(
        &self,
        http_client: &HttpClient,
        token: &SecretString,
    ) -> Result<usize, ClientError> {
        let apps = http_client.list_apps(token).await?;
        let templates: Vec<TemplateVersion> = apps.into_iter().map(TemplateVersion::from).collect();
        let count = templates.len();
        self.replace_all(templates);
        info!("Template catalog refreshed: {} templates", count);
        Ok(count)
    }

    /// Fetch one template and replace its cached entry
    pub async fn refresh_one(
        &self,
        http_client: &HttpClient,
        template_id: &str,
        token: &SecretString,
    ) -> Result<TemplateVersion, ClientError> {
        let template = TemplateVersion::from(http_client.get_app(template_id, token).await?);
        self.upsert(template.clone());
        Ok(template)
    }

    /// Replace the cached list
    pub fn replace_all(&self, templates: Vec<TemplateVersion>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        *entries = templates;
        let mut fetched_at = self.fetched_at.write().unwrap_or_else(|e| e.into_inner());
        *fetched_at = Some(Utc::now());
    }

    /// Insert or replace a single template
    pub fn upsert(&self, template: TemplateVersion) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.iter_mut().find(|t| t.template_id == template.template_id) {
            Some(existing) => *existing = template,
            None => entries.push(template),
        }
        debug!("Catalog now holds {} templates", entries.len());
    }

    /// Get a template by ID
    pub fn get(&self, template_id: &str) -> Option<TemplateVersion> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.iter().find(|t| t.template_id == template_id).cloned()
    }

    /// All cached templates in backend order
    pub fn list(&self) -> Vec<TemplateVersion> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.clone()
    }

    /// When the catalog was last refreshed
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        *self.fetched_at.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Get cache size
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(|e| e.into_inner()).clear();
        *self.fetched_at.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
