use serde::{Deserialize, Serialize};
use validator::Validate;

/// A named set of interchangeable parts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasGroup {
    pub id: i64,
    pub alias_name: String,
}

/// Membership of a part in an alias group, joined with the part's name and stock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasLink {
    pub link_id: i64,
    pub alias_id: i64,
    pub part_id: i64,
    pub part_name: String,
    #[serde(default)]
    pub quantity: i64,
}

/// Body for creating or renaming a group.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct AliasNameRequest {
    #[validate(length(min = 1, max = 200))]
    pub alias_name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLinkRequest {
    pub part_id: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasSearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

impl Default for AliasSearchQuery {
    fn default() -> Self {
        Self {
            q: String::new(),
            limit: default_search_limit(),
        }
    }
}

fn default_search_limit() -> usize {
    10
}
