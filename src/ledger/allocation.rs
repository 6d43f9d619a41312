//! Bounds checks for allocate/deallocate and the auto-allocation planner.

use crate::errors::{LedgerError, LedgerOperation};
use crate::models::BomLine;

/// One allocate request to issue: `amount` units of `part_id` onto its line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocationRequest {
    pub part_id: i64,
    pub amount: i64,
}

/// Which lines an auto-allocation considers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    All,
    Parts(Vec<i64>),
}

impl Selection {
    fn includes(&self, part_id: i64) -> bool {
        match self {
            Selection::All => true,
            Selection::Parts(ids) => ids.contains(&part_id),
        }
    }
}

/// Amount pre-filled for an allocate prompt.
pub fn default_allocate_amount(line: &BomLine, quantity_to_build: i64) -> i64 {
    line.max_allocatable(quantity_to_build)
}

/// Amount pre-filled for a deallocate prompt.
pub fn default_deallocate_amount(line: &BomLine) -> i64 {
    line.allocated_quantity
}

pub fn validate_allocate(
    line: &BomLine,
    quantity_to_build: i64,
    amount: i64,
) -> Result<i64, LedgerError> {
    check_bounds(
        LedgerOperation::Allocate,
        amount,
        0,
        line.max_allocatable(quantity_to_build),
    )
}

pub fn validate_deallocate(line: &BomLine, amount: i64) -> Result<i64, LedgerError> {
    check_bounds(
        LedgerOperation::Deallocate,
        amount,
        0,
        line.allocated_quantity.max(0),
    )
}

pub(crate) fn check_bounds(
    operation: LedgerOperation,
    requested: i64,
    min: i64,
    max: i64,
) -> Result<i64, LedgerError> {
    if requested < min || requested > max {
        return Err(LedgerError::OutOfRange {
            operation,
            requested,
            min,
            max,
        });
    }
    Ok(requested)
}

/// Plans one allocate request per selected line that can still take stock.
///
/// Lines with nothing remaining or no free stock are left out entirely.
pub fn plan_auto_allocation(
    lines: &[BomLine],
    quantity_to_build: i64,
    selection: &Selection,
) -> Result<Vec<AllocationRequest>, LedgerError> {
    if matches!(selection, Selection::Parts(ids) if ids.is_empty()) {
        return Err(LedgerError::Validation(
            "no lines selected for auto-allocation".into(),
        ));
    }

    let plan: Vec<AllocationRequest> = lines
        .iter()
        .filter(|line| selection.includes(line.part_id))
        .filter_map(|line| {
            let remaining = line.remaining(quantity_to_build);
            if remaining <= 0 || line.quantity <= 0 {
                return None;
            }
            Some(AllocationRequest {
                part_id: line.part_id,
                amount: remaining.min(line.quantity),
            })
        })
        .collect();

    if plan.is_empty() {
        return Err(LedgerError::NothingToAllocate);
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn line(part_id: i64, quantity_per: i64, allocated: i64, stock: i64) -> BomLine {
        BomLine {
            part_id,
            part_name: format!("P{part_id}"),
            reference: None,
            quantity_per,
            allocated_quantity: allocated,
            quantity: stock,
            package: None,
            alias_id: None,
            alias_name: None,
        }
    }

    #[test]
    fn allocate_rejects_above_remaining_or_stock() {
        let l = line(1, 3, 20, 5);
        assert_eq!(validate_allocate(&l, 10, 5).unwrap(), 5);
        assert_matches!(
            validate_allocate(&l, 10, 6),
            Err(LedgerError::OutOfRange { max: 5, requested: 6, .. })
        );
        assert_matches!(
            validate_allocate(&l, 10, -1),
            Err(LedgerError::OutOfRange { .. })
        );
    }

    #[test]
    fn deallocate_is_bounded_by_allocation() {
        let l = line(1, 3, 7, 0);
        assert_eq!(validate_deallocate(&l, 7).unwrap(), 7);
        let err = validate_deallocate(&l, 8).unwrap_err();
        assert_eq!(err.to_string(), "Invalid deallocate amount 8: maximum is 7");
    }

    #[test]
    fn defaults_are_the_maximums() {
        let l = line(1, 3, 20, 5);
        assert_eq!(default_allocate_amount(&l, 10), 5);
        assert_eq!(default_deallocate_amount(&l), 20);
    }

    #[test]
    fn auto_allocation_skips_full_and_empty_lines() {
        let lines = vec![
            line(1, 2, 0, 100), // needs 20
            line(2, 2, 20, 50), // already full
            line(3, 2, 5, 0),   // no stock
            line(4, 2, 5, 3),   // capped by stock
        ];
        let plan = plan_auto_allocation(&lines, 10, &Selection::All).unwrap();
        assert_eq!(
            plan,
            vec![
                AllocationRequest { part_id: 1, amount: 20 },
                AllocationRequest { part_id: 4, amount: 3 },
            ]
        );
        assert!(plan.iter().all(|r| r.amount > 0));
    }

    #[test]
    fn auto_allocation_respects_selection() {
        let lines = vec![line(1, 1, 0, 5), line(2, 1, 0, 5)];
        let plan = plan_auto_allocation(&lines, 1, &Selection::Parts(vec![2])).unwrap();
        assert_eq!(plan, vec![AllocationRequest { part_id: 2, amount: 1 }]);

        assert_matches!(
            plan_auto_allocation(&lines, 1, &Selection::Parts(vec![])),
            Err(LedgerError::Validation(_))
        );
    }

    #[test]
    fn nothing_to_allocate_is_reported() {
        let lines = vec![line(1, 1, 1, 5)];
        assert_matches!(
            plan_auto_allocation(&lines, 1, &Selection::All),
            Err(LedgerError::NothingToAllocate)
        );
    }
}
