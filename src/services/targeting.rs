use serde::Deserialize;

use crate::db::types::TargetType;
use crate::repositories::assignments::{TargetSpec, TargetView};

/// A target as supplied by the admin creating an assignment. The tagged
/// representation makes a `group` entry without a group id unrepresentable
/// after deserialization, except through the explicit `Option` which
/// `normalize` rejects.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum TargetInput {
    All,
    Group {
        group_id: Option<String>,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum TargetError {
    #[error("group target requires a group_id")]
    MissingGroupId,
}

/// Turns the request-level targets into persistence rows. An empty list is
/// an implicit everyone-assignment, so it becomes a single `all` row rather
/// than an assignment nobody can see.
pub(crate) fn normalize(inputs: &[TargetInput]) -> Result<Vec<TargetSpec>, TargetError> {
    if inputs.is_empty() {
        return Ok(vec![TargetSpec { target_type: TargetType::All, group_id: None }]);
    }

    inputs
        .iter()
        .map(|input| match input {
            TargetInput::All => {
                Ok(TargetSpec { target_type: TargetType::All, group_id: None })
            }
            TargetInput::Group { group_id: Some(group_id) } => Ok(TargetSpec {
                target_type: TargetType::Group,
                group_id: Some(group_id.clone()),
            }),
            TargetInput::Group { group_id: None } => Err(TargetError::MissingGroupId),
        })
        .collect()
}

/// Whether a user belonging to `user_group_ids` can see an assignment with
/// these targets.
pub(crate) fn is_visible(targets: &[TargetView], user_group_ids: &[String]) -> bool {
    targets.iter().any(|target| match target.target_type {
        TargetType::All => true,
        TargetType::Group => target
            .group_id
            .as_deref()
            .is_some_and(|group_id| user_group_ids.iter().any(|id| id == group_id)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(target_type: TargetType, group_id: Option<&str>) -> TargetView {
        TargetView {
            target_type,
            group_id: group_id.map(str::to_owned),
            group_name: None,
        }
    }

    #[test]
    fn empty_target_list_becomes_all() {
        let specs = normalize(&[]).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].target_type, TargetType::All);
        assert!(specs[0].group_id.is_none());
    }

    #[test]
    fn group_target_without_id_is_rejected() {
        let inputs = vec![TargetInput::Group { group_id: None }];
        assert_eq!(normalize(&inputs), Err(TargetError::MissingGroupId));
    }

    #[test]
    fn mixed_targets_normalize_in_order() {
        let inputs = vec![
            TargetInput::All,
            TargetInput::Group { group_id: Some("g1".into()) },
        ];
        let specs = normalize(&inputs).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].target_type, TargetType::All);
        assert_eq!(specs[1].group_id.as_deref(), Some("g1"));
    }

    #[test]
    fn all_target_is_visible_to_anyone() {
        let targets = vec![view(TargetType::All, None)];
        assert!(is_visible(&targets, &[]));
    }

    #[test]
    fn group_target_requires_membership() {
        let targets = vec![view(TargetType::Group, Some("g1"))];
        assert!(is_visible(&targets, &["g1".into(), "g2".into()]));
        assert!(!is_visible(&targets, &["g3".into()]));
        assert!(!is_visible(&targets, &[]));
    }

    #[test]
    fn no_targets_means_invisible() {
        assert!(!is_visible(&[], &["g1".into()]));
    }
}
