//! Alias name normalization and merge planning.

use crate::models::AliasGroup;

/// Trims and uppercases a group name; `None` when nothing is left.
pub fn normalize_alias_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

/// Case-insensitive comparison ignoring surrounding whitespace.
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

pub fn find_exact<'a>(groups: &'a [AliasGroup], name: &str) -> Option<&'a AliasGroup> {
    groups.iter().find(|group| names_match(&group.alias_name, name))
}

/// How a merge changes alias membership. Stock and BOM lines are untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergePlan {
    /// Neither part is aliased: link both into a group with this name.
    CreateGroup { alias_name: String },
    /// One side is aliased: link `part_id` into `alias_id`.
    JoinGroup { alias_id: i64, part_id: i64 },
    /// Move every link of `from` into `into` and drop `from`.
    FoldGroups { from: i64, into: i64 },
    AlreadyMerged { alias_id: i64 },
}

pub fn plan_merge(
    source_part_id: i64,
    source_alias: Option<i64>,
    target_part_id: i64,
    target_part_name: &str,
    target_alias: Option<i64>,
) -> Option<MergePlan> {
    let plan = match (source_alias, target_alias) {
        (None, None) => MergePlan::CreateGroup {
            alias_name: normalize_alias_name(target_part_name)?,
        },
        (Some(alias_id), None) => MergePlan::JoinGroup {
            alias_id,
            part_id: target_part_id,
        },
        (None, Some(alias_id)) => MergePlan::JoinGroup {
            alias_id,
            part_id: source_part_id,
        },
        (Some(from), Some(into)) if from == into => MergePlan::AlreadyMerged { alias_id: into },
        (Some(from), Some(into)) => MergePlan::FoldGroups { from, into },
    };
    Some(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_trims_and_uppercases() {
        assert_eq!(normalize_alias_name("  lm358 dual "), Some("LM358 DUAL".into()));
        assert_eq!(normalize_alias_name("   "), None);
    }

    #[test]
    fn exact_match_ignores_case_but_not_substrings() {
        let groups = vec![
            AliasGroup { id: 1, alias_name: "NE555P".into() },
            AliasGroup { id: 2, alias_name: "NE555".into() },
        ];
        assert_eq!(find_exact(&groups, "ne555").map(|g| g.id), Some(2));
        assert!(find_exact(&groups, "ne55").is_none());
    }

    #[test]
    fn merge_cases() {
        assert_eq!(
            plan_merge(1, None, 2, "bc547", None),
            Some(MergePlan::CreateGroup { alias_name: "BC547".into() })
        );
        assert_eq!(
            plan_merge(1, Some(9), 2, "bc547", None),
            Some(MergePlan::JoinGroup { alias_id: 9, part_id: 2 })
        );
        assert_eq!(
            plan_merge(1, None, 2, "bc547", Some(4)),
            Some(MergePlan::JoinGroup { alias_id: 4, part_id: 1 })
        );
        assert_eq!(
            plan_merge(1, Some(9), 2, "bc547", Some(4)),
            Some(MergePlan::FoldGroups { from: 9, into: 4 })
        );
        assert_eq!(
            plan_merge(1, Some(4), 2, "bc547", Some(4)),
            Some(MergePlan::AlreadyMerged { alias_id: 4 })
        );
    }
}
