//! Template models

use openapi_client::{App, AppVariable};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ClientError;

/// One deployable template at one release tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateVersion {
    pub template_id: String,
    pub name: String,
    pub release_tag: String,
    pub description: Option<String>,
    /// Declared variables, empty until resolved for this release tag
    pub variables: Vec<VariableDeclaration>,
}

impl From<App> for TemplateVersion {
    fn from(app: App) -> Self {
        Self {
            template_id: app.app_id,
            name: app.name,
            release_tag: app.release_tag.unwrap_or_default(),
            description: app.description,
            variables: Vec::new(),
        }
    }
}

/// Value type of a declared variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    String,
    Number,
    Bool,
    Enum,
}

impl VariableType {
    /// Unrecognised type names (e.g. complex terraform types) are treated as strings
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("number" | "int" | "integer" | "float" | "double") => VariableType::Number,
            Some("bool" | "boolean") => VariableType::Bool,
            Some("enum") => VariableType::Enum,
            _ => VariableType::String,
        }
    }
}

/// Provisioning engine that consumes a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableSource {
    Terraform,
    Packer,
    Unknown,
}

impl VariableSource {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("terraform") => VariableSource::Terraform,
            Some("packer") => VariableSource::Packer,
            _ => VariableSource::Unknown,
        }
    }
}

/// A named, typed configuration input a template version exposes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: String,
    pub var_type: VariableType,
    pub default: Option<Value>,
    pub required: bool,
    pub source: VariableSource,
    pub description: Option<String>,
    /// Allowed values for enum variables
    pub options: Vec<String>,
}

impl From<AppVariable> for VariableDeclaration {
    fn from(var: AppVariable) -> Self {
        Self {
            name: var.name,
            var_type: VariableType::parse(var.var_type.as_deref()),
            // an explicit JSON null is the same as no default
            default: var.default.filter(|v| !v.is_null()),
            required: var.required.unwrap_or(false),
            source: VariableSource::parse(var.source.as_deref()),
            description: var.description,
            options: var.options,
        }
    }
}

impl VariableDeclaration {
    /// Coerce text input to a JSON value of the declared type
    pub fn coerce(&self, raw: &str) -> Result<Value, ClientError> {
        let trimmed = raw.trim();
        match self.var_type {
            VariableType::String => Ok(Value::String(raw.to_string())),
            VariableType::Number => {
                if let Ok(n) = trimmed.parse::<i64>() {
                    return Ok(Value::from(n));
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| self.type_error(raw))
            }
            VariableType::Bool => match trimmed.to_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(Value::Bool(true)),
                "false" | "no" | "0" | "off" => Ok(Value::Bool(false)),
                _ => Err(self.type_error(raw)),
            },
            VariableType::Enum => {
                if self.options.is_empty() || self.options.iter().any(|o| o == trimmed) {
                    Ok(Value::String(trimmed.to_string()))
                } else {
                    Err(ClientError::ValidationError(format!(
                        "Variable '{}' must be one of [{}], got '{}'",
                        self.name,
                        self.options.join(", "),
                        trimmed
                    )))
                }
            }
        }
    }

    /// Check a JSON value against the declared type. Strings go through
    /// [`coerce`](Self::coerce); scalars are converted for string variables.
    pub fn coerce_value(&self, value: Value) -> Result<Value, ClientError> {
        match (self.var_type, value) {
            (_, Value::String(s)) => self.coerce(&s),
            (VariableType::Number, v @ Value::Number(_)) => Ok(v),
            (VariableType::Bool, v @ Value::Bool(_)) => Ok(v),
            (VariableType::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (VariableType::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),
            (VariableType::String, v @ (Value::Array(_) | Value::Object(_))) => Ok(v),
            (_, v) => Err(self.type_error(&v.to_string())),
        }
    }

    fn type_error(&self, raw: &str) -> ClientError {
        ClientError::ValidationError(format!(
            "Variable '{}' expects a {:?} value, got '{}'",
            self.name, self.var_type, raw
        ))
    }
}
