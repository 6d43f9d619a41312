//! Derived quantities for BOM lines and assemblies.
//!
//! Everything here is recomputed from current stock and allocation figures;
//! nothing is stored.

use crate::models::AssemblyStatus;

/// Upper bound accepted for any single stock, build or per-unit quantity.
///
/// Also caps a part's total holdings (free stock plus every allocation), so
/// stock credits can never overflow.
pub const MAX_QUANTITY: i64 = 1_000_000_000;

/// Units a line needs for the whole build.
pub fn required(quantity_to_build: i64, quantity_per: i64) -> i64 {
    quantity_to_build.saturating_mul(quantity_per)
}

/// Free stock plus what is already reserved for the line.
pub fn current_total(free_stock: i64, allocated: i64) -> i64 {
    free_stock.saturating_add(allocated)
}

pub fn is_short(free_stock: i64, allocated: i64, required: i64) -> bool {
    current_total(free_stock, allocated) < required
}

pub fn remaining(required: i64, allocated: i64) -> i64 {
    required - allocated
}

/// Largest amount an allocate request may carry, never negative.
pub fn max_allocatable(remaining: i64, free_stock: i64) -> i64 {
    remaining.min(free_stock).max(0)
}

/// Aggregate allocation over every line of one assembly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocationSummary {
    pub total_needed: i64,
    pub total_allocated: i64,
}

impl AllocationSummary {
    /// Builds the summary from `(quantity_per, allocated_quantity)` pairs.
    pub fn from_lines<I>(quantity_to_build: i64, lines: I) -> Self
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        lines
            .into_iter()
            .fold(Self::default(), |acc, (quantity_per, allocated)| Self {
                total_needed: acc
                    .total_needed
                    .saturating_add(required(quantity_to_build, quantity_per)),
                total_allocated: acc.total_allocated.saturating_add(allocated),
            })
    }

    pub fn percent(&self) -> f64 {
        if self.total_needed <= 0 {
            return 0.0;
        }
        self.total_allocated as f64 / self.total_needed as f64 * 100.0
    }

    /// Percentage rounded for display.
    pub fn rounded_percent(&self) -> i64 {
        self.percent().round() as i64
    }

    pub fn status(&self) -> AssemblyStatus {
        if self.total_needed <= 0 || self.total_allocated <= 0 {
            AssemblyStatus::Planned
        } else if self.total_allocated >= self.total_needed {
            AssemblyStatus::Completed
        } else {
            AssemblyStatus::InProgress
        }
    }
}
