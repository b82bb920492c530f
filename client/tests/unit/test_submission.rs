//! Submission builder tests

use std::collections::BTreeMap;

use serde_json::json;
use vmlab::errors::ClientError;
use vmlab::models::template::{VariableDeclaration, VariableSource, VariableType};
use vmlab::wizard::draft::{Draft, GroupMode, VariableValue};
use vmlab::wizard::submission::build;

fn decl(name: &str, source: VariableSource, required: bool) -> VariableDeclaration {
    VariableDeclaration {
        name: name.to_string(),
        var_type: VariableType::String,
        default: None,
        required,
        source,
        description: None,
        options: Vec::new(),
    }
}

fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn base_draft() -> Draft {
    Draft {
        template_id: Some("app-1".to_string()),
        name: "Networking lab".to_string(),
        student_ids: ids(&["u1", "u2", "u3"]),
        ..Default::default()
    }
}

#[test]
fn test_missing_template_or_name_is_validation_error() {
    let mut draft = base_draft();
    draft.template_id = None;
    assert!(matches!(build(&draft), Err(ClientError::ValidationError(_))));

    let mut draft = base_draft();
    draft.name = "   ".to_string();
    assert!(matches!(build(&draft), Err(ClientError::ValidationError(_))));
}

#[test]
fn test_release_tag_defaults_to_latest() {
    let mut draft = base_draft();
    assert_eq!(build(&draft).unwrap().release_tag, "latest");

    draft.release_tag = Some(" ".to_string());
    assert_eq!(build(&draft).unwrap().release_tag, "latest");

    draft.release_tag = Some("v2.3".to_string());
    assert_eq!(build(&draft).unwrap().release_tag, "v2.3");
}

#[test]
fn test_build_is_idempotent() {
    let mut draft = base_draft();
    draft.declarations = vec![decl("region", VariableSource::Terraform, false)];
    draft
        .variables
        .insert("region".to_string(), VariableValue::Set(json!("eu")));

    let first = build(&draft).unwrap();
    let second = build(&draft).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_request(), second.to_request());
}

#[test]
fn test_unassigned_students_fall_back_to_partition() {
    let mut draft = base_draft();
    draft.group_mode = GroupMode::Custom;
    draft.group_count = 2;
    draft.group_names = ids(&["Red", "Blue"]);

    let payload = build(&draft).unwrap();
    assert_eq!(payload.teams.len(), 2);
    assert_eq!(payload.teams[0].name, "Red");
    assert_eq!(payload.teams[0].member_ids, ids(&["u1", "u2"]));
    assert_eq!(payload.teams[1].member_ids, ids(&["u3"]));
    assert_eq!(payload.member_count(), 3);
}

#[test]
fn test_explicit_assignments_used_directly() {
    let mut draft = base_draft();
    draft.group_mode = GroupMode::Custom;
    draft.group_count = 2;
    draft.group_names = ids(&["A", "B"]);
    draft.assignments = BTreeMap::from([(0, ids(&["u3"])), (1, ids(&["u1", "u2"]))]);

    let payload = build(&draft).unwrap();
    assert_eq!(payload.teams[0].member_ids, ids(&["u3"]));
    assert_eq!(payload.teams[1].member_ids, ids(&["u1", "u2"]));
}

#[test]
fn test_assignments_must_cover_selection_without_overlap() {
    let mut draft = base_draft();
    draft.group_count = 2;
    draft.group_names = ids(&["A", "B"]);

    // u3 left out
    draft.assignments = BTreeMap::from([(0, ids(&["u1"])), (1, ids(&["u2"]))]);
    assert!(matches!(build(&draft), Err(ClientError::ValidationError(_))));

    // u1 twice
    draft.assignments = BTreeMap::from([(0, ids(&["u1", "u3"])), (1, ids(&["u1", "u2"]))]);
    assert!(matches!(build(&draft), Err(ClientError::ValidationError(_))));

    // not selected
    draft.assignments = BTreeMap::from([(0, ids(&["u1", "u2", "u3", "x9"]))]);
    assert!(matches!(build(&draft), Err(ClientError::ValidationError(_))));
}

#[test]
fn test_variables_routed_by_source() {
    let mut draft = base_draft();
    draft.declarations = vec![
        decl("image", VariableSource::Packer, false),
        decl("region", VariableSource::Terraform, false),
        decl("mystery", VariableSource::Unknown, false),
    ];
    draft
        .variables
        .insert("image".to_string(), VariableValue::Set(json!("ubuntu-22")));
    draft
        .variables
        .insert("region".to_string(), VariableValue::Set(json!("eu")));
    draft
        .variables
        .insert("mystery".to_string(), VariableValue::Set(json!(1)));

    let payload = build(&draft).unwrap();
    assert_eq!(payload.variables.packer.get("image"), Some(&json!("ubuntu-22")));
    assert!(!payload.variables.terraform.contains_key("image"));
    assert_eq!(payload.variables.terraform.get("region"), Some(&json!("eu")));
    assert!(!payload.variables.packer.contains_key("mystery"));
    assert!(!payload.variables.terraform.contains_key("mystery"));
}

#[test]
fn test_missing_required_variable_blocks_build() {
    let mut draft = base_draft();
    draft.declarations = vec![decl("password", VariableSource::Terraform, true)];
    draft
        .variables
        .insert("password".to_string(), VariableValue::Missing);

    assert!(matches!(build(&draft), Err(ClientError::ValidationError(_))));
}

#[test]
fn test_request_wire_shape() {
    let mut draft = base_draft();
    draft.group_names = ids(&["All"]);
    draft.release_tag = Some("v1".to_string());

    let body = serde_json::to_value(build(&draft).unwrap().to_request()).unwrap();
    assert_eq!(body["appId"], json!("app-1"));
    assert_eq!(body["releaseTag"], json!("v1"));
    assert_eq!(body["teams"][0]["name"], json!("All"));
    assert_eq!(body["teams"][0]["userIds"], json!(["u1", "u2", "u3"]));
    assert!(body["userInputVar"]["terraform"].is_object());
    assert!(body["userInputVar"]["packer"].is_object());
}
