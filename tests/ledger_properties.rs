//! Property-based tests for the allocation ledger.
//!
//! Random sequences of allocate, deallocate, swap and restock requests are
//! applied to the store. Whatever gets accepted or rejected, stock only
//! changes by what fulfilled orders deliver.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use inventory_ledger::{
    ledger::{
        plan_auto_allocation, validate_allocate, validate_deallocate, AllocationSummary, Selection,
    },
    models::{
        AddBomItemRequest, AssemblyStatus, BomLine, CreateAssemblyRequest,
        CreatePartOrderRequest, CreatePartRequest, MergePartsRequest, SwapQuantityRequest,
    },
    store::InventoryStore,
};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Allocate { line: usize, amount: i64 },
    Deallocate { line: usize, amount: i64 },
    Swap { quantity: i64 },
    Restock { part: usize, quantity: i64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..2, -2i64..40).prop_map(|(line, amount)| Op::Allocate { line, amount }),
        3 => (0usize..2, -2i64..40).prop_map(|(line, amount)| Op::Deallocate { line, amount }),
        1 => (0i64..5).prop_map(|quantity| Op::Swap { quantity }),
        1 => (0usize..3, -1i64..20).prop_map(|(part, quantity)| Op::Restock { part, quantity }),
    ]
}

fn line_strategy() -> impl Strategy<Value = BomLine> {
    (1i64..6, 0i64..40, 0i64..60).prop_map(|(quantity_per, allocated, stock)| BomLine {
        part_id: 1,
        part_name: "P".into(),
        reference: None,
        quantity_per,
        allocated_quantity: allocated,
        quantity: stock,
        package: None,
        alias_id: None,
        alias_name: None,
    })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

struct Setup {
    store: InventoryStore,
    assembly_id: i64,
    /// Part ids of the two BOM lines, then the alternate.
    parts: [i64; 3],
}

async fn setup(build: i64, per: (i64, i64), stock: (i64, i64, i64)) -> Setup {
    let store = InventoryStore::new();
    let mut parts = [0; 3];
    for (slot, (name, quantity)) in [("A", stock.0), ("B", stock.1), ("A-ALT", stock.2)]
        .into_iter()
        .enumerate()
    {
        parts[slot] = store
            .create_part(CreatePartRequest::named(name, quantity))
            .await
            .unwrap()
            .id;
    }
    let assembly_id = store
        .create_assembly(CreateAssemblyRequest {
            assembly_name: "Board".into(),
            quantity_to_build: Some(build),
            ..Default::default()
        })
        .await
        .unwrap()
        .id;
    for (name, quantity_per) in [("A", per.0), ("B", per.1)] {
        store
            .add_bom_item(
                assembly_id,
                AddBomItemRequest {
                    part_name: name.into(),
                    reference: None,
                    quantity_per: Some(quantity_per),
                },
            )
            .await
            .unwrap();
    }
    store
        .merge_parts(MergePartsRequest {
            source_part_id: parts[0],
            target_part_id: parts[2],
            swap_assemblies: false,
        })
        .await
        .unwrap();
    Setup {
        store,
        assembly_id,
        parts,
    }
}

/// Free stock plus everything allocated on the assembly, per part.
async fn totals(setup: &Setup) -> BTreeMap<i64, i64> {
    let detail = setup.store.assembly_detail(setup.assembly_id).await.unwrap();
    let mut totals = BTreeMap::new();
    for part_id in setup.parts {
        totals.insert(part_id, setup.store.get_part(part_id).await.unwrap().quantity);
    }
    for line in &detail.parts {
        *totals.entry(line.part_id).or_insert(0) += line.allocated_quantity;
    }
    totals
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn stock_is_conserved_under_any_request_sequence(
        build in 1i64..6,
        per in (1i64..4, 1i64..4),
        stock in (0i64..30, 0i64..30, 0i64..30),
        ops in prop::collection::vec(op_strategy(), 1..25),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let setup = setup(build, per, stock).await;
            let mut expected = totals(&setup).await;

            for op in ops {
                // Rejected requests are expected; only the resulting state matters.
                let _ = match op {
                    Op::Allocate { line, amount } => setup
                        .store
                        .allocate(setup.assembly_id, setup.parts[line], amount)
                        .await
                        .map(|_| ()),
                    Op::Deallocate { line, amount } => setup
                        .store
                        .deallocate(setup.assembly_id, setup.parts[line], amount)
                        .await
                        .map(|_| ()),
                    Op::Swap { quantity } => setup
                        .store
                        .swap_quantity(
                            setup.assembly_id,
                            SwapQuantityRequest {
                                source_part_id: setup.parts[0],
                                target_part_id: setup.parts[2],
                                swap_quantity: quantity,
                            },
                        )
                        .await
                        .map(|_| ()),
                    Op::Restock { part, quantity } => {
                        let part_id = setup.parts[part];
                        let order = CreatePartOrderRequest {
                            part_id,
                            order_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
                            quantity_ordered: quantity,
                        };
                        if let Ok(order) = setup.store.place_order(order).await {
                            let received = order.quantity_ordered;
                            setup.store.fulfill_order(order.id).await.unwrap();
                            *expected.entry(part_id).or_insert(0) += received;
                        }
                        Ok(())
                    }
                };

                prop_assert_eq!(&totals(&setup).await, &expected);
                let detail = setup.store.assembly_detail(setup.assembly_id).await.unwrap();
                let build = detail.assembly.quantity_to_build;
                for line in &detail.parts {
                    prop_assert!(line.quantity >= 0);
                    prop_assert!(line.allocated_quantity >= 0);
                    prop_assert!(line.allocated_quantity <= line.required(build));
                }
                prop_assert_eq!(detail.assembly.status, detail.summary().status());
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn merging_never_touches_stock_or_lines(
        build in 1i64..6,
        per in (1i64..4, 1i64..4),
        stock in (0i64..30, 0i64..30, 0i64..30),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let setup = setup(build, per, stock).await;
            let before = setup.store.assembly_detail(setup.assembly_id).await.unwrap();
            let stock_before = totals(&setup).await;

            setup
                .store
                .merge_parts(MergePartsRequest {
                    source_part_id: setup.parts[1],
                    target_part_id: setup.parts[2],
                    swap_assemblies: true,
                })
                .await
                .unwrap();

            let after = setup.store.assembly_detail(setup.assembly_id).await.unwrap();
            prop_assert_eq!(stock_before, totals(&setup).await);
            prop_assert_eq!(before.parts.len(), after.parts.len());
            for (b, a) in before.parts.iter().zip(&after.parts) {
                prop_assert_eq!(
                    (b.part_id, b.quantity_per, b.allocated_quantity),
                    (a.part_id, a.quantity_per, a.allocated_quantity)
                );
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn allocate_bounds_match_remaining_and_stock(
        line in line_strategy(),
        build in 1i64..10,
        amount in -5i64..80,
    ) {
        let max = (line.required(build) - line.allocated_quantity).min(line.quantity).max(0);
        let accepted = validate_allocate(&line, build, amount).is_ok();
        prop_assert_eq!(accepted, (0..=max).contains(&amount));
    }

    #[test]
    fn deallocate_bounds_match_allocation(line in line_strategy(), amount in -5i64..80) {
        let accepted = validate_deallocate(&line, amount).is_ok();
        prop_assert_eq!(accepted, (0..=line.allocated_quantity).contains(&amount));
    }

    #[test]
    fn auto_allocation_never_plans_empty_requests(
        lines in prop::collection::vec(line_strategy(), 1..8),
        build in 1i64..10,
    ) {
        let lines: Vec<BomLine> = lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| BomLine { part_id: i as i64 + 1, ..line })
            .collect();
        match plan_auto_allocation(&lines, build, &Selection::All) {
            Ok(plan) => {
                for request in &plan {
                    let line = lines.iter().find(|l| l.part_id == request.part_id).unwrap();
                    prop_assert!(request.amount > 0);
                    prop_assert_eq!(request.amount, line.max_allocatable(build));
                }
                let eligible = lines
                    .iter()
                    .filter(|l| l.remaining(build) > 0 && l.quantity > 0)
                    .count();
                prop_assert_eq!(plan.len(), eligible);
            }
            Err(_) => {
                prop_assert!(lines.iter().all(|l| l.max_allocatable(build) == 0));
            }
        }
    }

    #[test]
    fn status_follows_allocation_totals(needed in 0i64..100, allocated in 0i64..150) {
        let summary = AllocationSummary { total_needed: needed, total_allocated: allocated };
        let expected = if needed == 0 || allocated == 0 {
            AssemblyStatus::Planned
        } else if allocated >= needed {
            AssemblyStatus::Completed
        } else {
            AssemblyStatus::InProgress
        };
        prop_assert_eq!(summary.status(), expected);
    }
}
