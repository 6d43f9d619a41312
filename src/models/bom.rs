use serde::{Deserialize, Serialize};
use validator::Validate;

use super::assembly::Assembly;
use crate::ledger::quantities::{self, AllocationSummary};

/// One row of an assembly's bill of materials, joined with the part it consumes.
///
/// `quantity` is the part's free stock at the time the detail was read, not a
/// property of the line itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomLine {
    pub part_id: i64,
    pub part_name: String,
    #[serde(default)]
    pub reference: Option<String>,
    pub quantity_per: i64,
    #[serde(default)]
    pub allocated_quantity: i64,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub alias_id: Option<i64>,
    #[serde(default)]
    pub alias_name: Option<String>,
}

impl BomLine {
    pub fn required(&self, quantity_to_build: i64) -> i64 {
        quantities::required(quantity_to_build, self.quantity_per)
    }

    pub fn current_total(&self) -> i64 {
        quantities::current_total(self.quantity, self.allocated_quantity)
    }

    pub fn is_short(&self, quantity_to_build: i64) -> bool {
        quantities::is_short(
            self.quantity,
            self.allocated_quantity,
            self.required(quantity_to_build),
        )
    }

    pub fn remaining(&self, quantity_to_build: i64) -> i64 {
        quantities::remaining(self.required(quantity_to_build), self.allocated_quantity)
    }

    pub fn max_allocatable(&self, quantity_to_build: i64) -> i64 {
        quantities::max_allocatable(self.remaining(quantity_to_build), self.quantity)
    }
}

/// Response of `GET /api/assemblies/:id/detail`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssemblyDetail {
    pub assembly: Assembly,
    pub parts: Vec<BomLine>,
}

impl AssemblyDetail {
    pub fn line(&self, part_id: i64) -> Option<&BomLine> {
        self.parts.iter().find(|line| line.part_id == part_id)
    }

    pub fn summary(&self) -> AllocationSummary {
        AllocationSummary::from_lines(
            self.assembly.quantity_to_build,
            self.parts
                .iter()
                .map(|line| (line.quantity_per, line.allocated_quantity)),
        )
    }
}

/// Body of the allocate and deallocate endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountRequest {
    pub amount: i64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct AddBomItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub part_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 1000000000))]
    pub quantity_per: Option<i64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateBomItemRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 1000000000))]
    pub quantity_per: Option<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SwapQuantityRequest {
    pub source_part_id: i64,
    pub target_part_id: i64,
    #[validate(range(min = 1, max = 1000000000))]
    pub swap_quantity: i64,
}

/// Outcome of a quantity swap as reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResponse {
    pub message: String,
    #[serde(default)]
    pub returned_to_stock: i64,
    #[serde(default)]
    pub target_created: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacePartRequest {
    pub new_part_id: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePartsRequest {
    pub source_part_id: i64,
    pub target_part_id: i64,
    /// Accepted for compatibility; merging never rewrites BOM lines.
    #[serde(default)]
    pub swap_assemblies: bool,
}
