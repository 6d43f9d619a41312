use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Stock ordered from a supplier and not yet received.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartOrder {
    pub id: i64,
    pub part_id: i64,
    #[serde(default)]
    pub part_name: String,
    pub order_date: NaiveDate,
    pub quantity_ordered: i64,
}

/// Orders for the same part and date are merged into one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CreatePartOrderRequest {
    pub part_id: i64,
    pub order_date: NaiveDate,
    #[validate(range(min = 1, max = 1000000000))]
    pub quantity_ordered: i64,
}
