//! Variable resolution and reconciliation

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::authn::token_mngr::TokenSource;
use crate::errors::ClientError;
use crate::http::client::HttpClient;
use crate::models::template::VariableDeclaration;
use crate::wizard::draft::VariableValue;

/// Fetches the variables a template declares at one release tag.
///
/// Fails with `NotFound` when the template/version pair does not exist and
/// with `TransientFetchError` when the backend is unreachable. Never retries.
#[async_trait]
pub trait VariableResolver: Send + Sync {
    async fn resolve(
        &self,
        template_id: &str,
        version_tag: &str,
    ) -> Result<Vec<VariableDeclaration>, ClientError>;
}

/// Resolver backed by `GET /apps/{id}/variables`
pub struct BackendVariableResolver {
    http_client: Arc<HttpClient>,
    tokens: Arc<dyn TokenSource>,
}

impl BackendVariableResolver {
    pub fn new(http_client: Arc<HttpClient>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http_client,
            tokens,
        }
    }
}

#[async_trait]
impl VariableResolver for BackendVariableResolver {
    async fn resolve(
        &self,
        template_id: &str,
        version_tag: &str,
    ) -> Result<Vec<VariableDeclaration>, ClientError> {
        let token = self.tokens.bearer().await?;
        let variables = self
            .http_client
            .get_app_variables(template_id, version_tag, &token.raw)
            .await?;

        debug!(
            "Resolved {} variables for {}@{}",
            variables.len(),
            template_id,
            version_tag
        );
        Ok(dedup_declarations(
            variables.into_iter().map(VariableDeclaration::from).collect(),
        ))
    }
}

/// Keep the first declaration of each name
pub fn dedup_declarations(declarations: Vec<VariableDeclaration>) -> Vec<VariableDeclaration> {
    let mut seen = HashSet::new();
    declarations
        .into_iter()
        .filter(|d| {
            let first = seen.insert(d.name.clone());
            if !first {
                warn!("Duplicate variable declaration '{}' ignored", d.name);
            }
            first
        })
        .collect()
}

/// Reconcile supplied values against a new declaration list.
///
/// Values for names no longer declared are dropped. A kept value that no
/// longer fits the declared type is reseeded. Newly declared names get the
/// declaration default, or [`VariableValue::Missing`] when required without
/// a default, or stay unset.
pub fn reconcile(
    values: &BTreeMap<String, VariableValue>,
    declarations: &[VariableDeclaration],
) -> BTreeMap<String, VariableValue> {
    let mut reconciled = BTreeMap::new();

    for decl in declarations {
        let kept = match values.get(&decl.name) {
            Some(VariableValue::Set(value)) => decl.coerce_value(value.clone()).ok(),
            _ => None,
        };

        let value = match (kept, &decl.default) {
            (Some(value), _) => Some(VariableValue::Set(value)),
            (None, Some(default)) => Some(VariableValue::Set(default.clone())),
            (None, None) if decl.required => Some(VariableValue::Missing),
            (None, None) => None,
        };

        if let Some(value) = value {
            reconciled.insert(decl.name.clone(), value);
        }
    }

    for name in values.keys() {
        if !reconciled.contains_key(name) && !declarations.iter().any(|d| &d.name == name) {
            debug!("Dropping value for undeclared variable '{}'", name);
        }
    }

    reconciled
}
