//! Non-interactive wizard input
//!
//! A [`DraftPlan`] is a JSON document using the draft's wire field names.
//! Applying it walks a session through every step up to the review.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::ClientError;
use crate::filesys::file::File;
use crate::models::template::TemplateVersion;
use crate::wizard::draft::{GroupMode, VersionSelection};
use crate::wizard::session::WizardSession;
use crate::wizard::steps::WizardStep;
use crate::wizard::variables::VariableResolver;

/// Identifier accepted as a JSON string or number, always held as a string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for CanonicalId {
    fn from(id: &str) -> Self {
        Self(id.trim().to_string())
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CanonicalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Ok(CanonicalId(s.trim().to_string())),
            RawId::Number(n) => Ok(CanonicalId(n.to_string())),
        }
    }
}

fn strings(ids: &[CanonicalId]) -> Vec<String> {
    ids.iter().map(|id| id.0.clone()).collect()
}

/// Wizard input read from a file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftPlan {
    pub app_id: Option<CanonicalId>,
    pub name: String,
    pub release_tag: Option<VersionSelection>,
    pub course_ids: Vec<CanonicalId>,
    pub student_ids: Vec<CanonicalId>,
    pub group_mode: GroupMode,
    pub group_count: Option<usize>,
    pub group_names: Vec<String>,
    /// Group index to member ids
    pub assignments: BTreeMap<usize, Vec<CanonicalId>>,
    /// Variable name to value; values are checked against the declarations
    pub user_input_var: BTreeMap<String, Value>,
}

impl DraftPlan {
    /// Read a plan from a JSON file
    pub async fn load(file: &File) -> Result<Self, ClientError> {
        file.read_json_opt().await?.ok_or_else(|| {
            ClientError::ConfigError(format!("Plan file not found: {}", file.path().display()))
        })
    }

    pub fn template_id(&self) -> Result<&str, ClientError> {
        self.app_id
            .as_ref()
            .map(CanonicalId::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ClientError::ValidationError("Plan has no appId".to_string()))
    }

    pub fn student_ids(&self) -> Vec<String> {
        strings(&self.student_ids)
    }

    pub fn course_ids(&self) -> Vec<String> {
        strings(&self.course_ids)
    }

    /// Drive a fresh or reset session from the template step to the review
    /// step. Variables are resolved against the backend before the supplied
    /// values are applied.
    pub async fn apply<R, F>(
        &self,
        session: &mut WizardSession,
        template: &TemplateVersion,
        resolver: &R,
        display_name: F,
    ) -> Result<(), ClientError>
    where
        R: VariableResolver + ?Sized,
        F: Fn(&str) -> Option<String>,
    {
        if session.step() != WizardStep::Template {
            session.reset();
        }

        // template
        session.select_template(template);
        if let Some(selection) = &self.release_tag {
            session.select_version(selection);
        }
        session.next()?;

        // basics
        session.set_name(&self.name);
        session.select_courses(&self.course_ids());
        session.select_students(&self.student_ids());
        session.next()?;

        // grouping
        let count = self.group_count.unwrap_or(1);
        session.set_grouping(self.group_mode, count)?;
        if self.group_mode != GroupMode::EachUser && !self.group_names.is_empty() {
            session.set_group_names(&self.group_names)?;
        }
        session.next()?;

        // assignment
        if self.assignments.is_empty() {
            session.auto_assign(display_name)?;
            if self.group_mode == GroupMode::EachUser && !self.group_names.is_empty() {
                session.set_group_names(&self.group_names)?;
            }
        } else {
            for (index, members) in &self.assignments {
                for member in members {
                    session.assign_student(member.as_str(), *index)?;
                }
            }
        }
        session.next()?;

        // variables
        session.resolve_variables(resolver).await?;
        for (name, value) in &self.user_input_var {
            session.set_variable_value(name, value.clone())?;
        }
        session.next()?;

        debug!(
            "Plan '{}' applied to session {}",
            self.name,
            session.id()
        );
        Ok(())
    }
}
