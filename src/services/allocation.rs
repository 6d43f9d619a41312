//! Allocate, deallocate, auto-allocate, line removal and part swap, driven
//! against the backend with bounds checked before anything is sent.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{Confirmation, Resynced};
use crate::client::InventoryApi;
use crate::errors::LedgerError;
use crate::ledger::{
    default_allocate_amount, default_deallocate_amount, plan_auto_allocation, validate_allocate,
    validate_deallocate, validate_swap_quantity, LineRemoval, RemovalStep, Selection,
};
use crate::models::{AliasLink, AssemblyDetail, BomLine, SwapQuantityRequest};

/// Aggregate result of an auto-allocation batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// `(part_id, message)` for every request that failed.
    pub failures: Vec<(i64, String)>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// "N/M failed"
    pub fn summary(&self) -> String {
        format!("{}/{} failed", self.failed(), self.attempted)
    }
}

/// Where a line removal ended up, and the detail re-fetched afterwards.
#[derive(Debug)]
pub struct RemovalOutcome {
    pub removal: LineRemoval,
    pub detail: Option<AssemblyDetail>,
}

impl RemovalOutcome {
    pub fn is_deleted(&self) -> bool {
        self.removal.is_deleted()
    }
}

pub struct AllocationService<A> {
    api: Arc<A>,
    confirmation: Arc<dyn Confirmation>,
}

impl<A> Clone for AllocationService<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            confirmation: Arc::clone(&self.confirmation),
        }
    }
}

fn find_line(detail: &AssemblyDetail, part_id: i64) -> Result<&BomLine, LedgerError> {
    detail.line(part_id).ok_or_else(|| {
        LedgerError::Validation(format!(
            "part {} is not on the BOM of assembly {}",
            part_id, detail.assembly.id
        ))
    })
}

impl<A: InventoryApi> AllocationService<A> {
    pub fn new(api: Arc<A>, confirmation: Arc<dyn Confirmation>) -> Self {
        Self { api, confirmation }
    }

    pub async fn load(&self, assembly_id: i64) -> Result<AssemblyDetail, LedgerError> {
        self.api.assembly_detail(assembly_id).await
    }

    fn confirm(&self, prompt: String) -> Result<(), LedgerError> {
        if self.confirmation.confirm(&prompt) {
            Ok(())
        } else {
            info!(%prompt, "operation declined");
            Err(LedgerError::Cancelled)
        }
    }

    async fn resync<T>(&self, assembly_id: i64, outcome: Result<T, LedgerError>) -> Resynced<T> {
        if let Err(err) = &outcome {
            warn!(assembly_id, error = %err, "request failed; re-fetching assembly");
        }
        let detail = match self.api.assembly_detail(assembly_id).await {
            Ok(detail) => Some(detail),
            Err(err) => {
                warn!(assembly_id, error = %err, "re-fetch after mutation failed");
                None
            }
        };
        Resynced { outcome, detail }
    }

    /// Moves `amount` units (default: the most the line can take) onto the line.
    ///
    /// Returns `Err` without contacting the backend when the amount is out of
    /// range or the confirmation is declined. A zero amount is a no-op.
    #[instrument(skip(self, detail), fields(assembly_id = detail.assembly.id))]
    pub async fn allocate(
        &self,
        detail: &AssemblyDetail,
        part_id: i64,
        amount: Option<i64>,
    ) -> Result<Resynced<i64>, LedgerError> {
        let quantity_to_build = detail.assembly.quantity_to_build;
        let line = find_line(detail, part_id)?;
        let amount = amount.unwrap_or_else(|| default_allocate_amount(line, quantity_to_build));
        let amount = validate_allocate(line, quantity_to_build, amount)?;
        if amount == 0 {
            return Ok(Resynced {
                outcome: Ok(0),
                detail: Some(detail.clone()),
            });
        }
        self.confirm(format!("Allocate {} x {}?", amount, line.part_name))?;

        let outcome = self
            .api
            .allocate(detail.assembly.id, part_id, amount)
            .await
            .map(|_| amount);
        Ok(self.resync(detail.assembly.id, outcome).await)
    }

    /// Returns `amount` units (default: everything allocated) to free stock.
    #[instrument(skip(self, detail), fields(assembly_id = detail.assembly.id))]
    pub async fn deallocate(
        &self,
        detail: &AssemblyDetail,
        part_id: i64,
        amount: Option<i64>,
    ) -> Result<Resynced<i64>, LedgerError> {
        let line = find_line(detail, part_id)?;
        let amount = amount.unwrap_or_else(|| default_deallocate_amount(line));
        let amount = validate_deallocate(line, amount)?;
        if amount == 0 {
            return Ok(Resynced {
                outcome: Ok(0),
                detail: Some(detail.clone()),
            });
        }
        self.confirm(format!("Deallocate {} x {}?", amount, line.part_name))?;

        let outcome = self
            .api
            .deallocate(detail.assembly.id, part_id, amount)
            .await
            .map(|_| amount);
        Ok(self.resync(detail.assembly.id, outcome).await)
    }

    /// Fills every selected line as far as stock allows, one concurrent request per line.
    ///
    /// Failures do not roll back the requests that succeeded.
    #[instrument(skip(self, detail), fields(assembly_id = detail.assembly.id))]
    pub async fn auto_allocate(
        &self,
        detail: &AssemblyDetail,
        selection: &Selection,
    ) -> Result<Resynced<BatchReport>, LedgerError> {
        let assembly_id = detail.assembly.id;
        let plan = plan_auto_allocation(
            &detail.parts,
            detail.assembly.quantity_to_build,
            selection,
        )?;
        let units: i64 = plan.iter().map(|r| r.amount).sum();
        self.confirm(format!(
            "Auto-allocate {} units across {} lines?",
            units,
            plan.len()
        ))?;

        let results = join_all(plan.iter().map(|request| async move {
            let result = self
                .api
                .allocate(assembly_id, request.part_id, request.amount)
                .await;
            (request.part_id, result)
        }))
        .await;

        let mut report = BatchReport {
            attempted: results.len(),
            ..BatchReport::default()
        };
        for (part_id, result) in results {
            match result {
                Ok(()) => report.succeeded += 1,
                Err(err) => report.failures.push((part_id, err.to_string())),
            }
        }
        if report.is_success() {
            info!(lines = report.attempted, units, "auto-allocation complete");
        } else {
            warn!(summary = %report.summary(), "auto-allocation partially failed");
        }

        Ok(self.resync(assembly_id, Ok(report)).await)
    }

    /// Deletes a line, returning its allocation to stock first.
    ///
    /// The delete is only sent after the deallocate succeeded. The returned
    /// removal records where it stopped; a removal that failed at the delete
    /// step can be handed to [`Self::resume_removal`].
    #[instrument(skip(self, detail), fields(assembly_id = detail.assembly.id))]
    pub async fn remove_line(
        &self,
        detail: &AssemblyDetail,
        part_id: i64,
    ) -> Result<RemovalOutcome, LedgerError> {
        let line = find_line(detail, part_id)?;
        let removal = LineRemoval::new(detail.assembly.id, line);
        let prompt = if removal.amount > 0 {
            format!(
                "Remove {} from the BOM? {} allocated units go back to stock first.",
                line.part_name, removal.amount
            )
        } else {
            format!("Remove {} from the BOM?", line.part_name)
        };
        self.confirm(prompt)?;
        Ok(self.drive_removal(removal).await)
    }

    /// Retries a failed removal from the step that failed.
    #[instrument(
        skip(self, removal),
        fields(assembly_id = removal.assembly_id, part_id = removal.part_id)
    )]
    pub async fn resume_removal(
        &self,
        mut removal: LineRemoval,
    ) -> Result<RemovalOutcome, LedgerError> {
        removal.resume()?;
        Ok(self.drive_removal(removal).await)
    }

    async fn drive_removal(&self, mut removal: LineRemoval) -> RemovalOutcome {
        let (assembly_id, part_id) = (removal.assembly_id, removal.part_id);
        while let Some(step) = removal.next_step() {
            // Only legal steps come out of next_step.
            if let Err(err) = removal.begin(step) {
                warn!(error = %err, "removal stuck");
                break;
            }
            let result = match step {
                RemovalStep::Deallocate => {
                    self.api
                        .deallocate(assembly_id, part_id, removal.amount)
                        .await
                }
                RemovalStep::Delete => self.api.delete_bom_line(assembly_id, part_id).await,
            };
            let transition = match result {
                Ok(()) => removal.succeed(),
                Err(err) => {
                    warn!(%step, error = %err, "removal step failed");
                    removal.fail(err.to_string())
                }
            };
            if let Err(err) = transition {
                warn!(error = %err, "removal stuck");
                break;
            }
        }

        if removal.pending_compensation() {
            warn!(
                assembly_id,
                part_id, "stock returned but line still present; retry the removal"
            );
        } else if removal.is_deleted() {
            info!(assembly_id, part_id, "line removed");
        }

        let detail = self.api.assembly_detail(assembly_id).await.ok();
        RemovalOutcome { removal, detail }
    }

    /// Parts in the same alias group as the line's part, excluding the part itself.
    pub async fn substitutes(
        &self,
        detail: &AssemblyDetail,
        part_id: i64,
    ) -> Result<Vec<AliasLink>, LedgerError> {
        let line = find_line(detail, part_id)?;
        let Some(alias_id) = line.alias_id else {
            return Ok(Vec::new());
        };
        let links = self.api.alias_links(alias_id).await?;
        Ok(links
            .into_iter()
            .filter(|link| link.part_id != part_id)
            .collect())
    }

    /// Moves `swap_quantity` per unit of the line onto an interchangeable part.
    #[instrument(skip(self, detail), fields(assembly_id = detail.assembly.id))]
    pub async fn swap(
        &self,
        detail: &AssemblyDetail,
        source_part_id: i64,
        target_part_id: i64,
        swap_quantity: i64,
    ) -> Result<Resynced<()>, LedgerError> {
        let line = find_line(detail, source_part_id)?;
        let swap_quantity = validate_swap_quantity(line, swap_quantity)?;
        let target = self
            .substitutes(detail, source_part_id)
            .await?
            .into_iter()
            .find(|link| link.part_id == target_part_id)
            .ok_or_else(|| {
                LedgerError::Validation(format!(
                    "part {} is not interchangeable with {}",
                    target_part_id, line.part_name
                ))
            })?;
        self.confirm(format!(
            "Swap {} of {} per unit to {}?",
            swap_quantity, line.part_name, target.part_name
        ))?;

        let outcome = self
            .api
            .swap_quantity(
                detail.assembly.id,
                SwapQuantityRequest {
                    source_part_id,
                    target_part_id,
                    swap_quantity,
                },
            )
            .await;
        Ok(self.resync(detail.assembly.id, outcome).await)
    }

    /// Points the line at another part; its allocation goes back to stock.
    #[instrument(skip(self, detail), fields(assembly_id = detail.assembly.id))]
    pub async fn replace_part(
        &self,
        detail: &AssemblyDetail,
        part_id: i64,
        new_part_id: i64,
    ) -> Result<Resynced<()>, LedgerError> {
        let line = find_line(detail, part_id)?;
        if detail.line(new_part_id).is_some() {
            return Err(LedgerError::Validation(format!(
                "part {} already has a line on this BOM",
                new_part_id
            )));
        }
        self.confirm(format!(
            "Replace {} with part {}? {} allocated units go back to stock.",
            line.part_name, new_part_id, line.allocated_quantity
        ))?;

        let outcome = self
            .api
            .replace_bom_part(detail.assembly.id, part_id, new_part_id)
            .await;
        Ok(self.resync(detail.assembly.id, outcome).await)
    }
}
