//! Wizard session
//!
//! A session exclusively owns one [`Draft`]. Step handlers mutate it in
//! navigation order; `reset` replaces it with a fresh default value.

use std::collections::BTreeMap;

use openapi_client::Deployment;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::authn::token_mngr::TokenSource;
use crate::errors::ClientError;
use crate::http::deployments::DeploymentCreator;
use crate::models::template::{TemplateVersion, VariableDeclaration};
use crate::wizard::draft::{Draft, GroupMode, VariableValue, VersionSelection, LATEST};
use crate::wizard::partition::{partition, team_label, unique_ids, Group};
use crate::wizard::steps::{WizardEvent, WizardFsm, WizardStep};
use crate::wizard::submission::{build, SubmissionPayload};
use crate::wizard::variables::{dedup_declarations, reconcile, VariableResolver};

/// Identifies the selection a variable fetch was started for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionTicket {
    pub template_id: String,
    pub release_tag: String,
    generation: u64,
}

/// Summary shown on the review step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WizardSummary {
    pub template_name: Option<String>,
    pub deployment_name: String,
    pub release_tag: String,
    pub total_students: usize,
    pub total_groups: usize,
    pub variable_count: usize,
}

/// One wizard run
#[derive(Debug)]
pub struct WizardSession {
    id: Uuid,
    draft: Draft,
    fsm: WizardFsm,
    /// Bumped whenever a pending variable fetch becomes stale
    generation: u64,
    last_error: Option<String>,
}

impl WizardSession {
    /// Start a session from a fresh default draft
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            draft: Draft::default(),
            fsm: WizardFsm::new(),
            generation: 0,
            last_error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Read-only view of the draft
    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn step(&self) -> WizardStep {
        self.fsm.step()
    }

    /// Error of the last failed fetch or submission
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Discard the draft and start over
    pub fn reset(&mut self) {
        self.draft = Draft::default();
        self.generation += 1;
        self.last_error = None;
        // Reset is valid from every step
        let _ = self.fsm.process(WizardEvent::Reset);
        debug!("Wizard session {} reset", self.id);
    }

    // =============================== NAVIGATION ================================== //

    /// Advance to the next step once the current one is complete
    pub fn next(&mut self) -> Result<WizardStep, ClientError> {
        self.check_step_complete()?;
        self.fsm.process(WizardEvent::Next)
    }

    /// Go back one step; the draft is kept as is
    pub fn back(&mut self) -> Result<WizardStep, ClientError> {
        self.fsm.process(WizardEvent::Back)
    }

    fn check_step_complete(&self) -> Result<(), ClientError> {
        match self.fsm.step() {
            WizardStep::Template if self.draft.template_id.is_none() => Err(
                ClientError::ValidationError("A template must be selected".to_string()),
            ),
            WizardStep::Basics if self.draft.name.trim().is_empty() => Err(
                ClientError::ValidationError("A deployment name is required".to_string()),
            ),
            WizardStep::Grouping if self.draft.group_names.len() != self.draft.group_count => {
                Err(ClientError::ValidationError(format!(
                    "Expected {} group names, got {}",
                    self.draft.group_count,
                    self.draft.group_names.len()
                )))
            }
            WizardStep::Variables => {
                let missing = self.draft.missing_required();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(ClientError::ValidationError(format!(
                        "Required variables missing: {}",
                        missing.join(", ")
                    )))
                }
            }
            _ => Ok(()),
        }
    }

    // =============================== TEMPLATE ================================== //

    /// Choose the template. Switching templates drops every variable value
    /// and declaration of the previous one; reselecting the current one only
    /// updates its release tag.
    pub fn select_template(&mut self, template: &TemplateVersion) {
        let release_tag = Some(template.release_tag.trim().to_string()).filter(|t| !t.is_empty());

        if self.draft.template_id.as_deref() == Some(template.template_id.as_str()) {
            if release_tag.is_some() && release_tag != self.draft.release_tag {
                self.draft.release_tag = release_tag;
                self.generation += 1;
            }
            return;
        }

        self.draft.template_id = Some(template.template_id.clone());
        self.draft.release_tag = release_tag;
        self.draft.declarations = dedup_declarations(template.variables.clone());
        self.draft.variables = reconcile(&BTreeMap::new(), &self.draft.declarations);
        self.generation += 1;
    }

    /// Choose the release tag; the widget value is normalized here
    pub fn select_version(&mut self, selection: &VersionSelection) {
        let tag = selection.normalize();
        if self.draft.release_tag.as_deref() != Some(tag.as_str()) {
            self.draft.release_tag = Some(tag);
            self.generation += 1;
        }
    }

    /// Release tag the variables should be resolved for
    pub fn release_tag(&self) -> String {
        self.draft
            .release_tag
            .clone()
            .unwrap_or_else(|| LATEST.to_string())
    }

    // =============================== BASICS ================================== //

    pub fn set_name(&mut self, name: &str) {
        self.draft.name = name.trim().to_string();
    }

    pub fn select_courses(&mut self, course_ids: &[String]) {
        self.draft.course_ids = unique_ids(course_ids);
    }

    /// Replace the student selection. Assignments of deselected students are
    /// removed; per-user groups are re-derived.
    pub fn select_students(&mut self, student_ids: &[String]) {
        self.draft.student_ids = unique_ids(student_ids);

        if self.draft.group_mode == GroupMode::EachUser {
            self.apply_each_user(|_| None);
            return;
        }

        let selected = &self.draft.student_ids;
        for members in self.draft.assignments.values_mut() {
            members.retain(|m| selected.contains(m));
        }
    }

    // =============================== GROUPING ================================== //

    /// Set the grouping strategy. Any previous assignment is discarded.
    pub fn set_grouping(&mut self, mode: GroupMode, group_count: usize) -> Result<(), ClientError> {
        self.draft.group_mode = mode;
        self.draft.assignments.clear();

        match mode {
            GroupMode::Single => self.resize_group_names(1),
            GroupMode::Custom => {
                if group_count == 0 {
                    return Err(ClientError::ValidationError(
                        "Group count must be at least 1".to_string(),
                    ));
                }
                self.resize_group_names(group_count);
            }
            GroupMode::EachUser => self.apply_each_user(|_| None),
        }
        Ok(())
    }

    fn resize_group_names(&mut self, count: usize) {
        self.draft.group_count = count;
        let names = &mut self.draft.group_names;
        names.truncate(count);
        while names.len() < count {
            names.push(team_label(names.len()));
        }
    }

    fn apply_each_user<F: Fn(&str) -> Option<String>>(&mut self, display_name: F) {
        // per-user partitioning cannot fail
        if let Ok(groups) = partition(
            &self.draft.student_ids,
            GroupMode::EachUser,
            0,
            &[],
            display_name,
        ) {
            self.apply_groups(groups);
        }
    }

    /// Rename groups; one name per group
    pub fn set_group_names(&mut self, names: &[String]) -> Result<(), ClientError> {
        if names.len() != self.draft.group_count {
            return Err(ClientError::ValidationError(format!(
                "Expected {} group names, got {}",
                self.draft.group_count,
                names.len()
            )));
        }
        self.draft.group_names = names
            .iter()
            .enumerate()
            .map(|(i, n)| match n.trim() {
                "" => team_label(i),
                n => n.to_string(),
            })
            .collect();
        Ok(())
    }

    // =============================== ASSIGNMENT ================================== //

    /// Partition the selected students with the current strategy, replacing
    /// any previous assignment
    pub fn auto_assign<F>(&mut self, display_name: F) -> Result<(), ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let custom_names = match self.draft.group_mode {
            // per-user names come from the students unless set explicitly later
            GroupMode::EachUser => Vec::new(),
            _ => self.draft.group_names.clone(),
        };
        let groups = partition(
            &self.draft.student_ids,
            self.draft.group_mode,
            self.draft.group_count,
            &custom_names,
            display_name,
        )?;
        self.apply_groups(groups);
        Ok(())
    }

    fn apply_groups(&mut self, groups: Vec<Group>) {
        self.draft.group_count = groups.len();
        self.draft.group_names = groups.iter().map(|g| g.name.clone()).collect();
        self.draft.assignments = groups
            .into_iter()
            .enumerate()
            .map(|(index, group)| (index, group.member_ids))
            .collect();
    }

    /// Move one student into a group, removing them from any other
    pub fn assign_student(&mut self, student_id: &str, group_index: usize) -> Result<(), ClientError> {
        let student_id = student_id.trim();
        if !self.draft.student_ids.iter().any(|s| s == student_id) {
            return Err(ClientError::ValidationError(format!(
                "Student {} is not selected",
                student_id
            )));
        }
        if group_index >= self.draft.group_count {
            return Err(ClientError::ValidationError(format!(
                "Group {} does not exist ({} groups)",
                group_index + 1,
                self.draft.group_count
            )));
        }

        self.unassign_student(student_id);
        self.draft
            .assignments
            .entry(group_index)
            .or_default()
            .push(student_id.to_string());
        Ok(())
    }

    /// Remove a student from whichever group holds them
    pub fn unassign_student(&mut self, student_id: &str) {
        for members in self.draft.assignments.values_mut() {
            members.retain(|m| m != student_id);
        }
    }

    // =============================== VARIABLES ================================== //

    /// Capture the current selection before fetching its variables
    pub fn begin_variable_resolution(&self) -> Result<ResolutionTicket, ClientError> {
        let template_id = self.draft.template_id.clone().ok_or_else(|| {
            ClientError::ValidationError("A template must be selected".to_string())
        })?;
        Ok(ResolutionTicket {
            template_id,
            release_tag: self.release_tag(),
            generation: self.generation,
        })
    }

    /// Apply fetched declarations. Returns `false` and leaves the draft
    /// untouched when the selection changed or the session was reset since
    /// the ticket was issued.
    pub fn apply_variable_resolution(
        &mut self,
        ticket: &ResolutionTicket,
        declarations: Vec<VariableDeclaration>,
    ) -> bool {
        let current = self.draft.template_id.as_deref();
        if ticket.generation != self.generation || current != Some(ticket.template_id.as_str()) {
            debug!(
                "Discarding stale variables for {}@{}",
                ticket.template_id, ticket.release_tag
            );
            return false;
        }

        self.draft.declarations = dedup_declarations(declarations);
        self.draft.variables = reconcile(&self.draft.variables, &self.draft.declarations);
        true
    }

    /// Fetch and apply the declarations of the selected template version
    pub async fn resolve_variables<R>(&mut self, resolver: &R) -> Result<bool, ClientError>
    where
        R: VariableResolver + ?Sized,
    {
        let ticket = self.begin_variable_resolution()?;
        match resolver.resolve(&ticket.template_id, &ticket.release_tag).await {
            Ok(declarations) => {
                self.last_error = None;
                Ok(self.apply_variable_resolution(&ticket, declarations))
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn declared(&self, name: &str) -> Result<&VariableDeclaration, ClientError> {
        self.draft.declaration(name).ok_or_else(|| {
            ClientError::ValidationError(format!(
                "Variable '{}' is not declared by this template version",
                name
            ))
        })
    }

    /// Set a variable from text input, coerced to the declared type
    pub fn set_variable(&mut self, name: &str, raw: &str) -> Result<(), ClientError> {
        let value = self.declared(name)?.coerce(raw)?;
        self.draft
            .variables
            .insert(name.to_string(), VariableValue::Set(value));
        Ok(())
    }

    /// Set a variable from a JSON value, checked against the declared type
    pub fn set_variable_value(&mut self, name: &str, value: Value) -> Result<(), ClientError> {
        let value = self.declared(name)?.coerce_value(value)?;
        self.draft
            .variables
            .insert(name.to_string(), VariableValue::Set(value));
        Ok(())
    }

    /// Clear a variable; required ones fall back to missing
    pub fn clear_variable(&mut self, name: &str) -> Result<(), ClientError> {
        if self.declared(name)?.required {
            self.draft
                .variables
                .insert(name.to_string(), VariableValue::Missing);
        } else {
            self.draft.variables.remove(name);
        }
        Ok(())
    }

    // =============================== REVIEW ================================== //

    pub fn summary(&self, template: Option<&TemplateVersion>) -> WizardSummary {
        WizardSummary {
            template_name: template.map(|t| t.name.clone()),
            deployment_name: self.draft.name.clone(),
            release_tag: self.release_tag(),
            total_students: self.draft.student_ids.len(),
            total_groups: self.draft.group_count,
            variable_count: self
                .draft
                .variables
                .values()
                .filter(|v| matches!(v, VariableValue::Set(_)))
                .count(),
        }
    }

    /// Build the payload without submitting it
    pub fn preview(&self) -> Result<SubmissionPayload, ClientError> {
        build(&self.draft)
    }

    /// Submit the draft from the review step.
    ///
    /// On success the draft is reset and the created deployment returned. On
    /// failure the draft is kept, the error recorded and returned.
    pub async fn submit<C, T>(&mut self, creator: &C, tokens: &T) -> Result<Deployment, ClientError>
    where
        C: DeploymentCreator + ?Sized,
        T: TokenSource + ?Sized,
    {
        let payload = build(&self.draft).inspect_err(|e| {
            self.last_error = Some(e.to_string());
        })?;
        self.fsm.process(WizardEvent::Submit)?;

        let result = match tokens.bearer().await {
            Ok(token) => creator.create_deployment(&payload.to_request(), &token.raw).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(deployment) => {
                info!(
                    "Deployment {} created from session {} ({} teams, {} members)",
                    deployment.deployment_id,
                    self.id,
                    payload.teams.len(),
                    payload.member_count()
                );
                self.fsm.process(WizardEvent::SubmitSucceeded)?;
                self.reset();
                Ok(deployment)
            }
            Err(e) => {
                warn!("Submission from session {} failed: {}", self.id, e);
                self.last_error = Some(e.to_string());
                self.fsm.process(WizardEvent::SubmitFailed(e.to_string()))?;
                Err(e)
            }
        }
    }
}

impl Default for WizardSession {
    fn default() -> Self {
        Self::new()
    }
}
