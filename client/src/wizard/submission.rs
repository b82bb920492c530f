//! Submission payload construction

use std::collections::HashSet;

use openapi_client::{DeploymentCreate, TeamCreate, UserInputVar};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::ClientError;
use crate::models::template::VariableSource;
use crate::wizard::draft::{Draft, VariableValue, LATEST};
use crate::wizard::partition::{partition, unique_ids, Group};

/// The normalized, backend-ready create request built from a draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub name: String,
    pub template_id: String,
    /// Always a plain tag, never an object
    pub release_tag: String,
    pub teams: Vec<Group>,
    /// Supplied values bucketed by the engine that consumes them
    pub variables: UserInputVar,
}

impl SubmissionPayload {
    /// Wire body of `POST /deployments`
    pub fn to_request(&self) -> DeploymentCreate {
        DeploymentCreate {
            name: self.name.clone(),
            app_id: self.template_id.clone(),
            release_tag: self.release_tag.clone(),
            user_input_var: self.variables.clone(),
            teams: self
                .teams
                .iter()
                .map(|team| TeamCreate {
                    name: team.name.clone(),
                    user_ids: team.member_ids.clone(),
                })
                .collect(),
        }
    }

    /// Total number of team members
    pub fn member_count(&self) -> usize {
        self.teams.iter().map(|t| t.member_ids.len()).sum()
    }
}

/// Build the create request from a draft.
///
/// Pure: safe to call repeatedly for previews, and the same draft always
/// yields the same payload.
pub fn build(draft: &Draft) -> Result<SubmissionPayload, ClientError> {
    let template_id = draft
        .template_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ClientError::ValidationError("A template must be selected".to_string()))?;

    let name = draft.name.trim();
    if name.is_empty() {
        return Err(ClientError::ValidationError(
            "A deployment name is required".to_string(),
        ));
    }

    Ok(SubmissionPayload {
        name: name.to_string(),
        template_id: template_id.to_string(),
        release_tag: release_tag(draft),
        teams: derive_teams(draft)?,
        variables: bundle_variables(draft)?,
    })
}

fn release_tag(draft: &Draft) -> String {
    draft
        .release_tag
        .as_deref()
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .unwrap_or(LATEST)
        .to_string()
}

/// Teams from explicit assignments, or synthesized from the selected
/// students when nothing was assigned
fn derive_teams(draft: &Draft) -> Result<Vec<Group>, ClientError> {
    let selected = unique_ids(&draft.student_ids);

    if !draft.has_assignments() {
        if selected.is_empty() {
            return Ok(Vec::new());
        }
        return partition(
            &selected,
            draft.group_mode,
            draft.group_count,
            &draft.group_names,
            |_| None,
        );
    }

    let selected_set: HashSet<&str> = selected.iter().map(String::as_str).collect();
    let last_index = draft.assignments.keys().next_back().copied().unwrap_or(0);
    let count = draft.group_count.max(last_index + 1);

    let mut placed: HashSet<String> = HashSet::new();
    let mut teams = Vec::with_capacity(count);
    for index in 0..count {
        let members = draft
            .assignments
            .get(&index)
            .map(|m| unique_ids(m))
            .unwrap_or_default();

        for member in &members {
            if !selected_set.contains(member.as_str()) {
                return Err(ClientError::ValidationError(format!(
                    "Student {} is assigned to {} but not selected",
                    member,
                    draft.group_name(index)
                )));
            }
            if !placed.insert(member.clone()) {
                return Err(ClientError::ValidationError(format!(
                    "Student {} is assigned to more than one group",
                    member
                )));
            }
        }

        teams.push(Group {
            name: draft.group_name(index),
            member_ids: members,
        });
    }

    let unassigned: Vec<&str> = selected
        .iter()
        .map(String::as_str)
        .filter(|id| !placed.contains(*id))
        .collect();
    if !unassigned.is_empty() {
        return Err(ClientError::ValidationError(format!(
            "Selected students without a group: {}",
            unassigned.join(", ")
        )));
    }

    Ok(teams)
}

/// Route every supplied value into the bucket of its declaration's source
fn bundle_variables(draft: &Draft) -> Result<UserInputVar, ClientError> {
    let missing = draft.missing_required();
    if !missing.is_empty() {
        return Err(ClientError::ValidationError(format!(
            "Required variables missing: {}",
            missing.join(", ")
        )));
    }

    let mut bundle = UserInputVar::default();
    for (name, value) in &draft.variables {
        let VariableValue::Set(value) = value else {
            continue;
        };

        match draft.declaration(name).map(|d| d.source) {
            Some(VariableSource::Terraform) => {
                bundle.terraform.insert(name.clone(), value.clone());
            }
            Some(VariableSource::Packer) => {
                bundle.packer.insert(name.clone(), value.clone());
            }
            Some(VariableSource::Unknown) | None => {
                warn!("Variable '{}' has no known source and is not submitted", name);
            }
        }
    }

    Ok(bundle)
}
