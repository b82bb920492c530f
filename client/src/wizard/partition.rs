//! Group partitioning

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::ClientError;
use crate::wizard::draft::GroupMode;

/// A named group of students provisioned as one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub member_ids: Vec<String>,
}

/// Positional label of a group
pub fn team_label(index: usize) -> String {
    format!("Team #{}", index + 1)
}

/// Split students into named groups.
///
/// Input order is preserved and duplicate ids are dropped, so identical
/// input always yields identical groups. `custom_names[i]` overrides the
/// default name of group `i` when non-blank; under [`GroupMode::EachUser`]
/// the default is the student's display identity, else their id.
///
/// Under [`GroupMode::Custom`] the first `n % group_count` groups receive one
/// extra member and surplus groups stay empty. `group_count` is ignored
/// under [`GroupMode::EachUser`] and must be non-zero otherwise.
pub fn partition<F>(
    student_ids: &[String],
    mode: GroupMode,
    group_count: usize,
    custom_names: &[String],
    display_name: F,
) -> Result<Vec<Group>, ClientError>
where
    F: Fn(&str) -> Option<String>,
{
    if group_count == 0 && mode != GroupMode::EachUser {
        return Err(ClientError::ValidationError(
            "Group count must be at least 1".to_string(),
        ));
    }

    let students = unique_ids(student_ids);
    let name_at = |index: usize, fallback: String| {
        custom_names
            .get(index)
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or(fallback)
    };

    let groups = match mode {
        GroupMode::Single => vec![Group {
            name: name_at(0, team_label(0)),
            member_ids: students,
        }],
        GroupMode::EachUser => students
            .into_iter()
            .enumerate()
            .map(|(index, id)| {
                let fallback = display_name(id.as_str()).unwrap_or_else(|| id.clone());
                Group {
                    name: name_at(index, fallback),
                    member_ids: vec![id],
                }
            })
            .collect(),
        GroupMode::Custom => {
            let base = students.len() / group_count;
            let remainder = students.len() % group_count;
            let mut remaining = students.into_iter();
            let mut groups = Vec::with_capacity(group_count);
            for index in 0..group_count {
                let size = if index < remainder { base + 1 } else { base };
                groups.push(Group {
                    name: name_at(index, team_label(index)),
                    member_ids: remaining.by_ref().take(size).collect(),
                });
            }
            groups
        }
    };

    Ok(groups)
}

/// Trimmed, non-empty ids in first-seen order
pub fn unique_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}
