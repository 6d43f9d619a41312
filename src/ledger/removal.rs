//! State machine for deleting a BOM line that may still hold allocated stock.
//!
//! The allocation is returned first; the line delete is only attempted once the
//! deallocate has succeeded. A failed delete leaves the removal parked with
//! `pending_compensation` set, and [`LineRemoval::resume`] picks it up again from
//! `Deallocated` so the stock is never returned twice.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::errors::LedgerError;
use crate::models::BomLine;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum RemovalState {
    Allocated,
    Deallocating,
    Deallocated,
    Deleting,
    Deleted,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum RemovalStep {
    #[strum(serialize = "deallocate")]
    Deallocate,
    #[strum(serialize = "delete")]
    Delete,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRemoval {
    pub assembly_id: i64,
    pub part_id: i64,
    /// Units to return to stock before the line can go.
    pub amount: i64,
    state: RemovalState,
    failed_at: Option<RemovalStep>,
    last_error: Option<String>,
    pending_compensation: bool,
}

impl LineRemoval {
    pub fn new(assembly_id: i64, line: &BomLine) -> Self {
        let amount = line.allocated_quantity.max(0);
        Self {
            assembly_id,
            part_id: line.part_id,
            amount,
            state: if amount > 0 {
                RemovalState::Allocated
            } else {
                RemovalState::Deallocated
            },
            failed_at: None,
            last_error: None,
            pending_compensation: false,
        }
    }

    pub fn state(&self) -> RemovalState {
        self.state
    }

    pub fn failed_at(&self) -> Option<RemovalStep> {
        self.failed_at
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Set when the stock was returned but the line itself could not be deleted.
    pub fn pending_compensation(&self) -> bool {
        self.pending_compensation
    }

    pub fn is_deleted(&self) -> bool {
        self.state == RemovalState::Deleted
    }

    /// The request that should be issued next, if any.
    pub fn next_step(&self) -> Option<RemovalStep> {
        match self.state {
            RemovalState::Allocated => Some(RemovalStep::Deallocate),
            RemovalState::Deallocated => Some(RemovalStep::Delete),
            _ => None,
        }
    }

    pub fn begin(&mut self, step: RemovalStep) -> Result<(), LedgerError> {
        self.state = match (self.state, step) {
            (RemovalState::Allocated, RemovalStep::Deallocate) => RemovalState::Deallocating,
            (RemovalState::Deallocated, RemovalStep::Delete) => RemovalState::Deleting,
            (state, step) => return Err(self.invalid(format!("cannot start {step} from {state}"))),
        };
        Ok(())
    }

    pub fn succeed(&mut self) -> Result<(), LedgerError> {
        self.state = match self.state {
            RemovalState::Deallocating => RemovalState::Deallocated,
            RemovalState::Deleting => {
                self.pending_compensation = false;
                RemovalState::Deleted
            }
            state => return Err(self.invalid(format!("no step in flight in {state}"))),
        };
        self.failed_at = None;
        self.last_error = None;
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), LedgerError> {
        let step = match self.state {
            RemovalState::Deallocating => RemovalStep::Deallocate,
            RemovalState::Deleting => {
                self.pending_compensation = true;
                RemovalStep::Delete
            }
            state => return Err(self.invalid(format!("no step in flight in {state}"))),
        };
        self.state = RemovalState::Failed;
        self.failed_at = Some(step);
        self.last_error = Some(error.into());
        Ok(())
    }

    /// Rewinds a failed removal to the state before its failed step.
    pub fn resume(&mut self) -> Result<(), LedgerError> {
        self.state = match (self.state, self.failed_at) {
            (RemovalState::Failed, Some(RemovalStep::Deallocate)) => RemovalState::Allocated,
            (RemovalState::Failed, Some(RemovalStep::Delete)) => RemovalState::Deallocated,
            (state, _) => return Err(self.invalid(format!("cannot resume from {state}"))),
        };
        Ok(())
    }

    fn invalid(&self, detail: String) -> LedgerError {
        LedgerError::InvalidTransition(format!(
            "removal of part {} from assembly {}: {}",
            self.part_id, self.assembly_id, detail
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn line(allocated: i64) -> BomLine {
        BomLine {
            part_id: 11,
            part_name: "U1".into(),
            reference: Some("U1".into()),
            quantity_per: 1,
            allocated_quantity: allocated,
            quantity: 0,
            package: None,
            alias_id: None,
            alias_name: None,
        }
    }

    #[test]
    fn unallocated_line_starts_at_delete() {
        let removal = LineRemoval::new(1, &line(0));
        assert_eq!(removal.state(), RemovalState::Deallocated);
        assert_eq!(removal.next_step(), Some(RemovalStep::Delete));
    }

    #[test]
    fn happy_path_walks_every_state() {
        let mut removal = LineRemoval::new(1, &line(7));
        assert_eq!(removal.amount, 7);
        assert_eq!(removal.next_step(), Some(RemovalStep::Deallocate));
        removal.begin(RemovalStep::Deallocate).unwrap();
        assert_eq!(removal.state(), RemovalState::Deallocating);
        removal.succeed().unwrap();
        assert_eq!(removal.next_step(), Some(RemovalStep::Delete));
        removal.begin(RemovalStep::Delete).unwrap();
        removal.succeed().unwrap();
        assert!(removal.is_deleted());
        assert_eq!(removal.next_step(), None);
    }

    #[test]
    fn failed_deallocate_never_reaches_delete() {
        let mut removal = LineRemoval::new(1, &line(7));
        removal.begin(RemovalStep::Deallocate).unwrap();
        removal.fail("HTTP 500").unwrap();
        assert_eq!(removal.state(), RemovalState::Failed);
        assert_eq!(removal.failed_at(), Some(RemovalStep::Deallocate));
        assert!(!removal.pending_compensation());
        assert_eq!(removal.next_step(), None);
        assert_matches!(
            removal.begin(RemovalStep::Delete),
            Err(LedgerError::InvalidTransition(_))
        );
    }

    #[test]
    fn failed_delete_resumes_without_second_deallocate() {
        let mut removal = LineRemoval::new(1, &line(7));
        removal.begin(RemovalStep::Deallocate).unwrap();
        removal.succeed().unwrap();
        removal.begin(RemovalStep::Delete).unwrap();
        removal.fail("line locked").unwrap();
        assert!(removal.pending_compensation());
        assert_eq!(removal.last_error(), Some("line locked"));

        removal.resume().unwrap();
        assert_eq!(removal.state(), RemovalState::Deallocated);
        assert_eq!(removal.next_step(), Some(RemovalStep::Delete));
        removal.begin(RemovalStep::Delete).unwrap();
        removal.succeed().unwrap();
        assert!(removal.is_deleted());
        assert!(!removal.pending_compensation());
    }

    #[test]
    fn resume_requires_a_failure() {
        let mut removal = LineRemoval::new(1, &line(3));
        assert_matches!(removal.resume(), Err(LedgerError::InvalidTransition(_)));
        assert_matches!(removal.succeed(), Err(LedgerError::InvalidTransition(_)));
    }
}
