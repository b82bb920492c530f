//! Wizard draft state

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::template::VariableDeclaration;
use crate::wizard::partition::team_label;

/// Release tag used when the draft carries none
pub const LATEST: &str = "latest";

/// How selected students are split into groups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupMode {
    /// One group holding every selected student
    #[default]
    #[serde(rename = "one", alias = "single")]
    Single,

    /// One group per student
    #[serde(rename = "eachUser")]
    EachUser,

    /// A requested number of near-equal groups
    #[serde(rename = "custom")]
    Custom,
}

/// Version as delivered by a selection widget: either a plain tag or an
/// object carrying `version` and/or `name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VersionSelection {
    Tag(String),
    Selection {
        #[serde(default)]
        version: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
}

impl VersionSelection {
    /// Extract the release tag: the tag itself, else `version`, else `name`,
    /// else [`LATEST`]. Blank strings count as absent.
    pub fn normalize(&self) -> String {
        let candidate = match self {
            VersionSelection::Tag(tag) => non_blank(Some(tag)),
            VersionSelection::Selection { version, name } => {
                non_blank(version.as_ref()).or_else(|| non_blank(name.as_ref()))
            }
        };
        candidate.unwrap_or_else(|| LATEST.to_string())
    }
}

/// Normalize an optional selection; nothing selected means [`LATEST`]
pub fn normalize_version(selection: Option<&VersionSelection>) -> String {
    selection
        .map(VersionSelection::normalize)
        .unwrap_or_else(|| LATEST.to_string())
}

fn non_blank(s: Option<&String>) -> Option<String> {
    s.map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A supplied variable value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum VariableValue {
    Set(Value),
    /// Required by the declaration but not yet supplied
    Missing,
}

/// The in-progress selection of one wizard session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub template_id: Option<String>,
    pub name: String,
    pub course_ids: Vec<String>,
    pub student_ids: Vec<String>,
    pub group_mode: GroupMode,
    pub group_count: usize,
    pub group_names: Vec<String>,
    /// Group index -> member student ids
    pub assignments: BTreeMap<usize, Vec<String>>,
    /// Variable name -> supplied value
    pub variables: BTreeMap<String, VariableValue>,
    /// Declarations in effect for the selected template version
    pub declarations: Vec<VariableDeclaration>,
    /// Normalized release tag, `None` until a template or version is chosen
    pub release_tag: Option<String>,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            template_id: None,
            name: String::new(),
            course_ids: Vec::new(),
            student_ids: Vec::new(),
            group_mode: GroupMode::Single,
            group_count: 1,
            group_names: vec![team_label(0)],
            assignments: BTreeMap::new(),
            variables: BTreeMap::new(),
            declarations: Vec::new(),
            release_tag: None,
        }
    }
}

impl Draft {
    /// Look up the declaration for a variable name
    pub fn declaration(&self, name: &str) -> Option<&VariableDeclaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    /// Name of a group, falling back to its positional label
    pub fn group_name(&self, index: usize) -> String {
        self.group_names
            .get(index)
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| team_label(index))
    }

    /// Whether any student has been placed in a group
    pub fn has_assignments(&self) -> bool {
        self.assignments.values().any(|members| !members.is_empty())
    }

    /// Group index a student is assigned to
    pub fn group_of(&self, student_id: &str) -> Option<usize> {
        self.assignments
            .iter()
            .find(|(_, members)| members.iter().any(|m| m == student_id))
            .map(|(index, _)| *index)
    }

    /// Selected students not placed in any group
    pub fn unassigned_students(&self) -> Vec<String> {
        self.student_ids
            .iter()
            .filter(|id| self.group_of(id).is_none())
            .cloned()
            .collect()
    }

    /// Names of required variables that have no value yet
    pub fn missing_required(&self) -> Vec<String> {
        self.declarations
            .iter()
            .filter(|d| d.required)
            .filter(|d| !matches!(self.variables.get(&d.name), Some(VariableValue::Set(_))))
            .map(|d| d.name.clone())
            .collect()
    }
}
