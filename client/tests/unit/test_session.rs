//! Wizard session tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use openapi_client::{Deployment, DeploymentCreate, DeploymentStatus};
use secrecy::SecretString;
use serde_json::json;

use vmlab::authn::token_mngr::StaticToken;
use vmlab::errors::ClientError;
use vmlab::http::deployments::DeploymentCreator;
use vmlab::models::template::{TemplateVersion, VariableDeclaration, VariableSource, VariableType};
use vmlab::wizard::draft::{GroupMode, VariableValue, VersionSelection};
use vmlab::wizard::plan::DraftPlan;
use vmlab::wizard::session::WizardSession;
use vmlab::wizard::steps::WizardStep;
use vmlab::wizard::variables::VariableResolver;

// =============================== FAKES ================================== //

#[derive(Default)]
struct FakeResolver {
    declarations: HashMap<String, Vec<VariableDeclaration>>,
}

impl FakeResolver {
    fn with(mut self, template_id: &str, declarations: Vec<VariableDeclaration>) -> Self {
        self.declarations.insert(template_id.to_string(), declarations);
        self
    }
}

#[async_trait]
impl VariableResolver for FakeResolver {
    async fn resolve(
        &self,
        template_id: &str,
        version_tag: &str,
    ) -> Result<Vec<VariableDeclaration>, ClientError> {
        self.declarations
            .get(template_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("{}@{}", template_id, version_tag)))
    }
}

struct FakeCreator {
    fail_with: Option<ClientError>,
    requests: Mutex<Vec<DeploymentCreate>>,
}

impl FakeCreator {
    fn ok() -> Self {
        Self {
            fail_with: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing(error: ClientError) -> Self {
        Self {
            fail_with: Some(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<DeploymentCreate> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeploymentCreator for FakeCreator {
    async fn create_deployment(
        &self,
        request: &DeploymentCreate,
        _token: &SecretString,
    ) -> Result<Deployment, ClientError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(error) = &self.fail_with {
            return Err(ClientError::TransientFetchError(error.to_string()));
        }
        Ok(Deployment {
            deployment_id: "dep-1".to_string(),
            name: request.name.clone(),
            app_id: request.app_id.clone(),
            user_id: None,
            status: DeploymentStatus::Pending,
            release_tag: Some(request.release_tag.clone()),
            user_input_var: None,
        })
    }
}

// =============================== HELPERS ================================== //

fn decl(name: &str, var_type: VariableType, source: VariableSource, required: bool) -> VariableDeclaration {
    VariableDeclaration {
        name: name.to_string(),
        var_type,
        default: None,
        required,
        source,
        description: None,
        options: Vec::new(),
    }
}

fn template(id: &str, release_tag: &str) -> TemplateVersion {
    TemplateVersion {
        template_id: id.to_string(),
        name: format!("Template {}", id),
        release_tag: release_tag.to_string(),
        description: None,
        variables: Vec::new(),
    }
}

fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn lab_resolver() -> FakeResolver {
    FakeResolver::default()
        .with(
            "app-1",
            vec![
                decl("cpus", VariableType::Number, VariableSource::Terraform, true),
                decl("image", VariableType::String, VariableSource::Packer, false),
            ],
        )
        .with(
            "app-2",
            vec![decl("flavor", VariableType::String, VariableSource::Terraform, false)],
        )
}

/// A session at the review step for app-1 with three students in two groups
async fn reviewed_session(resolver: &FakeResolver) -> WizardSession {
    let mut session = WizardSession::new();
    session.select_template(&template("app-1", "v1"));
    session.next().unwrap();

    session.set_name("Lab");
    session.select_students(&ids(&["u1", "u2", "u3"]));
    session.next().unwrap();

    session.set_grouping(GroupMode::Custom, 2).unwrap();
    session.next().unwrap();

    session.auto_assign(|_| None).unwrap();
    session.next().unwrap();

    assert!(session.resolve_variables(resolver).await.unwrap());
    session.set_variable("cpus", "4").unwrap();
    session.next().unwrap();
    assert_eq!(session.step(), WizardStep::Review);
    session
}

// =============================== TESTS ================================== //

#[test]
fn test_new_session_and_reset_yield_defaults() {
    let mut session = WizardSession::new();
    assert_eq!(session.step(), WizardStep::Template);
    assert_eq!(session.draft().group_mode, GroupMode::Single);

    session.select_template(&template("app-1", "v1"));
    session.select_students(&ids(&["u1", "u2"]));
    session.set_grouping(GroupMode::Custom, 2).unwrap();
    session.auto_assign(|_| None).unwrap();
    assert!(session.draft().has_assignments());

    session.reset();
    let draft = session.draft();
    assert!(draft.assignments.is_empty());
    assert!(draft.student_ids.is_empty());
    assert!(draft.course_ids.is_empty());
    assert!(draft.template_id.is_none());
    assert_eq!(draft.group_mode, GroupMode::Single);
    assert_eq!(draft.group_count, 1);
    assert_eq!(session.step(), WizardStep::Template);
}

#[test]
fn test_sessions_do_not_share_drafts() {
    let mut first = WizardSession::new();
    let second = WizardSession::new();
    first.set_name("mine");

    assert_ne!(first.id(), second.id());
    assert!(second.draft().name.is_empty());
}

#[test]
fn test_navigation_requires_completed_steps() {
    let mut session = WizardSession::new();
    assert!(matches!(session.next(), Err(ClientError::ValidationError(_))));

    session.select_template(&template("app-1", ""));
    assert_eq!(session.next().unwrap(), WizardStep::Basics);
    assert!(session.next().is_err());

    session.set_name("  Lab  ");
    assert_eq!(session.draft().name, "Lab");
    assert_eq!(session.next().unwrap(), WizardStep::Grouping);
    assert_eq!(session.back().unwrap(), WizardStep::Basics);
    assert_eq!(session.draft().name, "Lab");
}

#[test]
fn test_grouping_replaces_previous_assignment() {
    let mut session = WizardSession::new();
    session.select_students(&ids(&["u1", "u2", "u3", "u4"]));

    session.set_grouping(GroupMode::Custom, 3).unwrap();
    session.auto_assign(|_| None).unwrap();
    assert_eq!(session.draft().assignments.len(), 3);

    session.set_grouping(GroupMode::Custom, 2).unwrap();
    assert!(session.draft().assignments.is_empty());
    assert_eq!(session.draft().group_names, ids(&["Team #1", "Team #2"]));

    session.auto_assign(|_| None).unwrap();
    assert_eq!(session.draft().assignments.len(), 2);
    assert_eq!(session.draft().assignments[&0], ids(&["u1", "u2"]));
    assert_eq!(session.draft().group_of("u4"), Some(1));
}

#[test]
fn test_grouping_rules_per_mode() {
    let mut session = WizardSession::new();
    session.select_students(&ids(&["u1", "u2", "u3"]));

    assert!(session.set_grouping(GroupMode::Custom, 0).is_err());

    session.set_grouping(GroupMode::Single, 5).unwrap();
    assert_eq!(session.draft().group_count, 1);
    assert_eq!(session.draft().group_names.len(), 1);

    session.set_grouping(GroupMode::EachUser, 0).unwrap();
    assert_eq!(session.draft().group_count, 3);
    assert_eq!(session.draft().group_names.len(), 3);
    assert_eq!(session.draft().assignments[&2], ids(&["u3"]));

    // per-user groups follow the selection
    session.select_students(&ids(&["u1", "u2"]));
    assert_eq!(session.draft().group_count, 2);
}

#[test]
fn test_group_names_must_match_count() {
    let mut session = WizardSession::new();
    session.set_grouping(GroupMode::Custom, 2).unwrap();

    assert!(session.set_group_names(&ids(&["only one"])).is_err());
    session.set_group_names(&ids(&["Red", ""])).unwrap();
    assert_eq!(session.draft().group_names, ids(&["Red", "Team #2"]));
}

#[test]
fn test_manual_assignment_keeps_groups_disjoint() {
    let mut session = WizardSession::new();
    session.select_students(&ids(&["u1", "u2"]));
    session.set_grouping(GroupMode::Custom, 2).unwrap();

    session.assign_student("u1", 0).unwrap();
    session.assign_student("u1", 1).unwrap();
    assert_eq!(session.draft().group_of("u1"), Some(1));
    assert!(session.draft().assignments[&0].is_empty());

    assert!(session.assign_student("nobody", 0).is_err());
    assert!(session.assign_student("u2", 2).is_err());

    // deselected students lose their assignment
    session.select_students(&ids(&["u2"]));
    assert_eq!(session.draft().group_of("u1"), None);
}

#[tokio::test]
async fn test_variables_reconciled_on_template_change() {
    let resolver = lab_resolver();
    let mut session = WizardSession::new();

    session.select_template(&template("app-1", "v1"));
    session.resolve_variables(&resolver).await.unwrap();
    assert_eq!(
        session.draft().variables.get("cpus"),
        Some(&VariableValue::Missing)
    );
    session.set_variable("image", "ubuntu").unwrap();
    assert!(session.set_variable("cpus", "many").is_err());
    assert!(session.set_variable("undeclared", "x").is_err());

    session.select_template(&template("app-2", "v1"));
    assert!(session.draft().variables.is_empty());
    session.resolve_variables(&resolver).await.unwrap();

    let names: Vec<&String> = session.draft().variables.keys().collect();
    assert!(names.is_empty());
    assert_eq!(session.draft().declarations.len(), 1);
    assert_eq!(session.draft().declarations[0].name, "flavor");
}

#[tokio::test]
async fn test_resolution_not_found_is_recorded() {
    let resolver = FakeResolver::default();
    let mut session = WizardSession::new();
    session.select_template(&template("ghost", "v1"));

    let result = session.resolve_variables(&resolver).await;
    assert!(matches!(result, Err(ClientError::NotFound(_))));
    assert!(session.last_error().is_some());
}

#[test]
fn test_stale_variable_response_is_discarded() {
    let mut session = WizardSession::new();
    session.select_template(&template("app-1", "v1"));
    let ticket = session.begin_variable_resolution().unwrap();
    assert_eq!(ticket.release_tag, "v1");

    session.select_template(&template("app-2", "v1"));
    let stale = vec![decl("cpus", VariableType::Number, VariableSource::Terraform, true)];
    assert!(!session.apply_variable_resolution(&ticket, stale.clone()));
    assert!(session.draft().declarations.is_empty());

    // a reset also invalidates pending fetches, even for the same template
    session.select_template(&template("app-1", "v1"));
    let ticket = session.begin_variable_resolution().unwrap();
    session.reset();
    session.select_template(&template("app-1", "v1"));
    assert!(!session.apply_variable_resolution(&ticket, stale.clone()));

    let fresh = session.begin_variable_resolution().unwrap();
    assert!(session.apply_variable_resolution(&fresh, stale));
    assert_eq!(session.draft().declarations.len(), 1);
}

#[test]
fn test_version_selection_normalized_on_ingestion() {
    let mut session = WizardSession::new();
    session.select_template(&template("app-1", ""));
    assert_eq!(session.release_tag(), "latest");

    session.select_version(&VersionSelection::Selection {
        version: None,
        name: Some("v2.3".to_string()),
    });
    assert_eq!(session.draft().release_tag.as_deref(), Some("v2.3"));

    session.select_version(&VersionSelection::Selection {
        version: None,
        name: None,
    });
    assert_eq!(session.release_tag(), "latest");
}

#[tokio::test]
async fn test_submit_success_resets_draft() {
    let resolver = lab_resolver();
    let mut session = reviewed_session(&resolver).await;
    let summary = session.summary(None);
    assert_eq!(summary.total_students, 3);
    assert_eq!(summary.total_groups, 2);
    assert_eq!(summary.release_tag, "v1");

    let creator = FakeCreator::ok();
    let deployment = session
        .submit(&creator, &StaticToken::new("token"))
        .await
        .unwrap();
    assert_eq!(deployment.deployment_id, "dep-1");

    let requests = creator.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].release_tag, "v1");
    assert_eq!(requests[0].teams.len(), 2);
    assert_eq!(requests[0].user_input_var.terraform.get("cpus"), Some(&json!(4)));

    assert_eq!(session.step(), WizardStep::Template);
    assert!(session.draft().template_id.is_none());
    assert!(session.draft().student_ids.is_empty());
}

#[tokio::test]
async fn test_submit_without_token_keeps_draft() {
    let resolver = lab_resolver();
    let mut session = reviewed_session(&resolver).await;
    let creator = FakeCreator::ok();

    let result = session.submit(&creator, &StaticToken::none()).await;
    assert!(matches!(result, Err(ClientError::AuthError(_))));
    assert!(creator.requests().is_empty());
    assert_eq!(session.step(), WizardStep::Review);
    assert_eq!(session.draft().name, "Lab");
    assert!(session.last_error().is_some());
}

#[tokio::test]
async fn test_submit_failure_records_error_and_allows_retry() {
    let resolver = lab_resolver();
    let mut session = reviewed_session(&resolver).await;

    let failing = FakeCreator::failing(ClientError::TransientFetchError("503".to_string()));
    let result = session.submit(&failing, &StaticToken::new("token")).await;
    assert!(matches!(result, Err(ClientError::TransientFetchError(_))));
    assert!(session.last_error().is_some());
    assert_eq!(session.step(), WizardStep::Review);

    let creator = FakeCreator::ok();
    assert!(session.submit(&creator, &StaticToken::new("token")).await.is_ok());
}

#[tokio::test]
async fn test_submit_blocked_by_missing_required_variable() {
    let resolver = lab_resolver();
    let mut session = reviewed_session(&resolver).await;
    session.back().unwrap();
    session.clear_variable("cpus").unwrap();
    assert!(session.next().is_err());

    assert!(matches!(session.preview(), Err(ClientError::ValidationError(_))));
}

#[tokio::test]
async fn test_plan_drives_session_to_review() {
    let resolver = lab_resolver();
    let plan: DraftPlan = serde_json::from_value(json!({
        "appId": "app-1",
        "name": "Plan lab",
        "releaseTag": {"version": "v3"},
        "studentIds": ["u1", 2, "u3"],
        "groupMode": "eachUser",
        "userInputVar": {"cpus": "2", "image": "debian"}
    }))
    .unwrap();

    let mut session = WizardSession::new();
    plan.apply(&mut session, &template("app-1", "v1"), &resolver, |id| {
        (id == "2").then(|| "bob".to_string())
    })
    .await
    .unwrap();

    assert_eq!(session.step(), WizardStep::Review);
    let payload = session.preview().unwrap();
    assert_eq!(payload.release_tag, "v3");
    assert_eq!(payload.teams.len(), 3);
    assert_eq!(payload.teams[1].name, "bob");
    assert_eq!(payload.teams[1].member_ids, ids(&["2"]));
    assert_eq!(payload.variables.terraform.get("cpus"), Some(&json!(2)));
    assert_eq!(payload.variables.packer.get("image"), Some(&json!("debian")));
}
