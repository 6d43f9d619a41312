//! Allocation ledger rules: pure functions and state machines with no I/O.
//!
//! The store applies these rules authoritatively; the services apply the same
//! rules before a request is sent so out-of-range input never reaches the wire.

pub mod alias;
pub mod allocation;
pub mod quantities;
pub mod removal;
pub mod swap;

pub use allocation::{
    default_allocate_amount, default_deallocate_amount, plan_auto_allocation, validate_allocate,
    validate_deallocate, AllocationRequest, Selection,
};
pub use quantities::AllocationSummary;
pub use removal::{LineRemoval, RemovalState, RemovalStep};
pub use swap::{plan_swap, validate_swap_quantity, SourceOutcome, SwapPlan};
