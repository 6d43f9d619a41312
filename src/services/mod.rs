//! Operations that span several backend requests, written once against
//! [`crate::client::InventoryApi`].

pub mod alias;
pub mod allocation;
pub mod confirm;

pub use alias::AliasService;
pub use allocation::{AllocationService, BatchReport, RemovalOutcome};
pub use confirm::{AutoConfirm, Confirmation, Decline};

use crate::errors::LedgerError;
use crate::models::AssemblyDetail;

/// Outcome of a request that reached the backend, plus the detail re-fetched
/// afterwards whether or not the request succeeded.
///
/// `detail` is `None` only when the re-fetch itself failed.
#[derive(Debug)]
pub struct Resynced<T> {
    pub outcome: Result<T, LedgerError>,
    pub detail: Option<AssemblyDetail>,
}

impl<T> Resynced<T> {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn into_result(self) -> Result<T, LedgerError> {
        self.outcome
    }
}
