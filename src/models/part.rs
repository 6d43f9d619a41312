use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A stocked electronic part. `quantity` is free (unallocated) stock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: i64,
    pub part_name: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub category_large: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub create_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_date: Option<DateTime<Utc>>,
}

impl Part {
    /// Case-insensitive, whitespace-tolerant name comparison used for matching.
    pub fn name_matches(&self, name: &str) -> bool {
        crate::ledger::alias::names_match(&self.part_name, name)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct CreatePartRequest {
    #[validate(length(min = 1, max = 200))]
    pub part_name: String,
    #[serde(default)]
    #[validate(range(min = 0, max = 1000000000))]
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl CreatePartRequest {
    pub fn named(part_name: impl Into<String>, quantity: i64) -> Self {
        Self {
            part_name: part_name.into(),
            quantity,
            ..Self::default()
        }
    }
}

/// Partial edit of a part. `quantity` overwrites free stock, for stock counts.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdatePartRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub part_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, max = 1000000000))]
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_large: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DeletePartsRequest {
    #[validate(length(min = 1))]
    pub ids: Vec<i64>,
}
