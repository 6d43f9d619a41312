//! Quantity-partitioned substitution of one BOM part by another.
//!
//! The target line gains `swap_quantity` on its per-unit requirement and is
//! never allocated as part of the swap. The source line keeps whatever
//! allocation still fits its reduced requirement; the excess goes back to the
//! source part's free stock. A source reduced to zero per unit is removed and
//! all of its allocation is returned.

use crate::errors::{LedgerError, LedgerOperation};
use crate::ledger::allocation::check_bounds;
use crate::ledger::quantities::required;
use crate::models::BomLine;

/// Client-side check: `1 <= swap_quantity <= source.quantity_per`.
pub fn validate_swap_quantity(source: &BomLine, swap_quantity: i64) -> Result<i64, LedgerError> {
    check_bounds(
        LedgerOperation::Swap,
        swap_quantity,
        1,
        source.quantity_per,
    )
}

/// What happens to the source line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceOutcome {
    Keep {
        quantity_per: i64,
        allocated_quantity: i64,
    },
    Remove,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapPlan {
    pub source: SourceOutcome,
    /// Units credited back to the source part's free stock.
    pub returned_to_stock: i64,
    pub target_quantity_per: i64,
    pub target_created: bool,
}

/// Computes the swap outcome from the two lines' current figures.
///
/// `target_quantity_per` is `None` when the assembly has no line for the target yet.
pub fn plan_swap(
    quantity_to_build: i64,
    source_quantity_per: i64,
    source_allocated: i64,
    target_quantity_per: Option<i64>,
    swap_quantity: i64,
) -> Result<SwapPlan, LedgerError> {
    check_bounds(
        LedgerOperation::Swap,
        swap_quantity,
        1,
        source_quantity_per,
    )?;

    let new_source_per = source_quantity_per - swap_quantity;
    let (source, returned_to_stock) = if new_source_per > 0 {
        let needed = required(quantity_to_build, new_source_per);
        if source_allocated > needed {
            (
                SourceOutcome::Keep {
                    quantity_per: new_source_per,
                    allocated_quantity: needed,
                },
                source_allocated - needed,
            )
        } else {
            (
                SourceOutcome::Keep {
                    quantity_per: new_source_per,
                    allocated_quantity: source_allocated,
                },
                0,
            )
        }
    } else {
        (SourceOutcome::Remove, source_allocated.max(0))
    };

    Ok(SwapPlan {
        source,
        returned_to_stock,
        target_quantity_per: target_quantity_per.unwrap_or(0).saturating_add(swap_quantity),
        target_created: target_quantity_per.is_none(),
    })
}
