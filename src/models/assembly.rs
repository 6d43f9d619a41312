use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::Validate;

/// Build status of an assembly, derived from its allocation percentage.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum AssemblyStatus {
    #[default]
    #[serde(rename = "Planned")]
    #[strum(serialize = "Planned")]
    Planned,
    #[serde(rename = "In Progress")]
    #[strum(serialize = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    #[strum(serialize = "Completed")]
    Completed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assembly {
    pub id: i64,
    pub assembly_name: String,
    pub quantity_to_build: i64,
    #[serde(default)]
    pub status: AssemblyStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub create_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_date: Option<DateTime<Utc>>,
}

/// Assembly with its overall allocation percentage, as listed by the low stock report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssemblySummary {
    pub id: i64,
    pub assembly_name: String,
    pub quantity_to_build: i64,
    pub status: AssemblyStatus,
    pub allocation_percent: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct CreateAssemblyRequest {
    #[validate(length(min = 1, max = 200))]
    pub assembly_name: String,
    /// Values below 1 are clamped to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(max = 1000000000))]
    pub quantity_to_build: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateAssemblyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub assembly_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 1000000000))]
    pub quantity_to_build: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_uses_display_names_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&AssemblyStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
        let parsed: AssemblyStatus = serde_json::from_str("\"Completed\"").unwrap();
        assert_eq!(parsed, AssemblyStatus::Completed);
        assert_eq!(
            AssemblyStatus::from_str("Planned").unwrap(),
            AssemblyStatus::Planned
        );
        assert_eq!(AssemblyStatus::InProgress.to_string(), "In Progress");
    }

    #[test]
    fn update_rejects_zero_build_quantity() {
        let req = UpdateAssemblyRequest {
            quantity_to_build: Some(0),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }
}
