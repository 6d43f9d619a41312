use chrono::Utc;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::{next_id, InventoryStore, LineRecord};
use crate::errors::ServiceError;
use crate::ledger::quantities::required;
use crate::ledger::swap::{plan_swap, SourceOutcome, SwapPlan};
use crate::models::{
    AddBomItemRequest, Assembly, AssemblyDetail, AssemblyStatus, AssemblySummary, BomLine,
    CreateAssemblyRequest, CreatePartRequest, SwapQuantityRequest, UpdateAssemblyRequest,
    UpdateBomItemRequest,
};

impl InventoryStore {
    pub async fn list_assemblies(&self) -> Vec<Assembly> {
        let tables = self.tables.read().await;
        let mut assemblies: Vec<Assembly> = tables.assemblies.values().cloned().collect();
        assemblies.sort_by(|a, b| b.update_date.cmp(&a.update_date).then(a.id.cmp(&b.id)));
        assemblies
    }

    #[instrument(skip(self, request), fields(assembly_name = %request.assembly_name))]
    pub async fn create_assembly(
        &self,
        request: CreateAssemblyRequest,
    ) -> Result<Assembly, ServiceError> {
        request.validate()?;
        let name = request.assembly_name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "assembly_name is required".into(),
            ));
        }

        let mut tables = self.tables.write().await;
        if tables
            .assemblies
            .values()
            .any(|a| a.assembly_name == name)
        {
            return Err(ServiceError::Conflict(format!(
                "Assembly '{}' already exists",
                name
            )));
        }

        let now = Utc::now();
        let assembly = Assembly {
            id: next_id(&mut tables.next_assembly_id),
            assembly_name: name,
            quantity_to_build: request.quantity_to_build.unwrap_or(1).max(1),
            status: AssemblyStatus::Planned,
            description: request.description,
            version: request.version,
            create_date: Some(now),
            update_date: Some(now),
        };
        tables.assemblies.insert(assembly.id, assembly.clone());
        info!(assembly_id = assembly.id, "Assembly created");
        Ok(assembly)
    }

    #[instrument(skip(self, request))]
    pub async fn update_assembly(
        &self,
        assembly_id: i64,
        request: UpdateAssemblyRequest,
    ) -> Result<Assembly, ServiceError> {
        request.validate()?;
        let mut tables = self.tables.write().await;
        tables.assembly(assembly_id)?;

        if let Some(name) = request.assembly_name.as_deref().map(str::trim) {
            if tables
                .assemblies
                .values()
                .any(|a| a.id != assembly_id && a.assembly_name == name)
            {
                return Err(ServiceError::Conflict(format!(
                    "Assembly '{}' already exists",
                    name
                )));
            }
        }

        if let Some(assembly) = tables.assemblies.get_mut(&assembly_id) {
            if let Some(name) = request.assembly_name {
                assembly.assembly_name = name.trim().to_string();
            }
            if let Some(quantity) = request.quantity_to_build {
                assembly.quantity_to_build = quantity;
            }
            if request.description.is_some() {
                assembly.description = request.description;
            }
            if request.version.is_some() {
                assembly.version = request.version;
            }
        }
        tables.release_excess(assembly_id);
        tables.recalculate_status(assembly_id);
        tables.assembly(assembly_id).cloned()
    }

    /// Removes an assembly, returning every line's allocation to stock first.
    #[instrument(skip(self))]
    pub async fn delete_assembly(&self, assembly_id: i64) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        tables.assembly(assembly_id)?;

        let lines: Vec<(i64, i64)> = tables
            .lines_of(assembly_id)
            .map(|(part_id, record)| (part_id, record.allocated_quantity))
            .collect();
        for (part_id, allocated) in lines {
            if allocated > 0 {
                tables.credit_stock(part_id, allocated);
            }
            tables.bom.remove(&(assembly_id, part_id));
        }
        tables.assemblies.remove(&assembly_id);
        info!("Assembly deleted");
        Ok(())
    }

    pub async fn assembly_detail(&self, assembly_id: i64) -> Result<AssemblyDetail, ServiceError> {
        let tables = self.tables.read().await;
        let assembly = tables.assembly(assembly_id)?.clone();
        let parts = tables
            .lines_of(assembly_id)
            .map(|(part_id, record)| tables.bom_line(part_id, record))
            .collect();
        Ok(AssemblyDetail { assembly, parts })
    }

    /// Assemblies with at least one line that are not fully allocated, least allocated first.
    pub async fn low_stock_assemblies(&self) -> Vec<AssemblySummary> {
        let tables = self.tables.read().await;
        let mut rows: Vec<AssemblySummary> = tables
            .assemblies
            .values()
            .filter(|assembly| tables.lines_of(assembly.id).next().is_some())
            .filter_map(|assembly| {
                let summary = tables.summary(assembly);
                (summary.total_allocated < summary.total_needed).then(|| AssemblySummary {
                    id: assembly.id,
                    assembly_name: assembly.assembly_name.clone(),
                    quantity_to_build: assembly.quantity_to_build,
                    status: summary.status(),
                    allocation_percent: summary.percent(),
                })
            })
            .collect();
        rows.sort_by(|a, b| a.allocation_percent.total_cmp(&b.allocation_percent));
        rows
    }

    /// Adds a line for the named part, creating the part when it does not exist yet.
    #[instrument(skip(self, request), fields(part_name = %request.part_name))]
    pub async fn add_bom_item(
        &self,
        assembly_id: i64,
        request: AddBomItemRequest,
    ) -> Result<BomLine, ServiceError> {
        request.validate()?;
        let mut tables = self.tables.write().await;
        tables.assembly(assembly_id)?;

        let existing = tables.part_by_name(&request.part_name).map(|part| part.id);
        let part_id = match existing {
            Some(part_id) => part_id,
            None => {
                let part = tables.insert_part(CreatePartRequest::named(&request.part_name, 0))?;
                info!(part_id = part.id, "Part created for BOM line");
                part.id
            }
        };
        if tables.bom.contains_key(&(assembly_id, part_id)) {
            return Err(ServiceError::Conflict(format!(
                "Part {} is already on the BOM of assembly {}",
                part_id, assembly_id
            )));
        }

        let record = LineRecord {
            reference: request.reference,
            quantity_per: request.quantity_per.unwrap_or(1),
            allocated_quantity: 0,
        };
        let line = tables.bom_line(part_id, &record);
        tables.bom.insert((assembly_id, part_id), record);
        tables.recalculate_status(assembly_id);
        Ok(line)
    }

    #[instrument(skip(self, request))]
    pub async fn update_bom_item(
        &self,
        assembly_id: i64,
        part_id: i64,
        request: UpdateBomItemRequest,
    ) -> Result<BomLine, ServiceError> {
        request.validate()?;
        let mut tables = self.tables.write().await;
        tables.line(assembly_id, part_id)?;
        if let Some(record) = tables.bom.get_mut(&(assembly_id, part_id)) {
            if request.reference.is_some() {
                record.reference = request.reference;
            }
            if let Some(quantity_per) = request.quantity_per {
                record.quantity_per = quantity_per;
            }
        }
        tables.release_excess(assembly_id);
        tables.recalculate_status(assembly_id);
        let record = tables.line(assembly_id, part_id)?.clone();
        Ok(tables.bom_line(part_id, &record))
    }

    /// Deletes a line. Lines still holding allocation are refused so stock is never lost.
    #[instrument(skip(self))]
    pub async fn delete_bom_item(
        &self,
        assembly_id: i64,
        part_id: i64,
    ) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        let allocated = tables.line(assembly_id, part_id)?.allocated_quantity;
        if allocated > 0 {
            warn!(allocated, "Refusing to delete a line that still holds allocation");
            return Err(ServiceError::Conflict(format!(
                "Line still holds {} allocated units; deallocate them first",
                allocated
            )));
        }
        tables.bom.remove(&(assembly_id, part_id));
        tables.recalculate_status(assembly_id);
        info!("BOM line deleted");
        Ok(())
    }

    /// Moves `amount` units from the part's free stock onto the line.
    #[instrument(skip(self))]
    pub async fn allocate(
        &self,
        assembly_id: i64,
        part_id: i64,
        amount: i64,
    ) -> Result<BomLine, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::ValidationError(
                "amount must be a positive integer".into(),
            ));
        }

        let mut tables = self.tables.write().await;
        let quantity_to_build = tables.assembly(assembly_id)?.quantity_to_build;
        let record = tables.line(assembly_id, part_id)?.clone();
        let available = tables.part(part_id)?.quantity;

        if amount > available {
            return Err(ServiceError::InsufficientStock(format!(
                "Requested {} but only {} in stock",
                amount, available
            )));
        }
        let needed = required(quantity_to_build, record.quantity_per);
        if record.allocated_quantity + amount > needed {
            return Err(ServiceError::InvalidOperation(format!(
                "Allocating {} would exceed the required {} (already allocated {})",
                amount, needed, record.allocated_quantity
            )));
        }

        tables.part_mut(part_id)?.quantity -= amount;
        if let Some(line) = tables.bom.get_mut(&(assembly_id, part_id)) {
            line.allocated_quantity += amount;
        }
        tables.recalculate_status(assembly_id);

        let record = tables.line(assembly_id, part_id)?.clone();
        info!(
            amount,
            allocated = record.allocated_quantity,
            "Stock allocated"
        );
        Ok(tables.bom_line(part_id, &record))
    }

    /// Returns `amount` units from the line to the part's free stock.
    #[instrument(skip(self))]
    pub async fn deallocate(
        &self,
        assembly_id: i64,
        part_id: i64,
        amount: i64,
    ) -> Result<BomLine, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::ValidationError(
                "amount must be a positive integer".into(),
            ));
        }

        let mut tables = self.tables.write().await;
        tables.assembly(assembly_id)?;
        let allocated = tables.line(assembly_id, part_id)?.allocated_quantity;
        tables.part(part_id)?;
        if amount > allocated {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot deallocate {}: only {} allocated",
                amount, allocated
            )));
        }

        tables.credit_stock(part_id, amount);
        if let Some(line) = tables.bom.get_mut(&(assembly_id, part_id)) {
            line.allocated_quantity -= amount;
        }
        tables.recalculate_status(assembly_id);

        let record = tables.line(assembly_id, part_id)?.clone();
        info!(
            amount,
            allocated = record.allocated_quantity,
            "Stock deallocated"
        );
        Ok(tables.bom_line(part_id, &record))
    }

    /// Moves `swap_quantity` per unit from the source line onto the target part.
    #[instrument(skip(self))]
    pub async fn swap_quantity(
        &self,
        assembly_id: i64,
        request: SwapQuantityRequest,
    ) -> Result<SwapPlan, ServiceError> {
        let SwapQuantityRequest {
            source_part_id,
            target_part_id,
            swap_quantity,
        } = request;
        if source_part_id == target_part_id {
            return Err(ServiceError::ValidationError(
                "source and target must be different parts".into(),
            ));
        }

        let mut tables = self.tables.write().await;
        let quantity_to_build = tables.assembly(assembly_id)?.quantity_to_build;
        tables.part(target_part_id)?;
        let source = tables.line(assembly_id, source_part_id)?.clone();
        let target = tables
            .bom
            .get(&(assembly_id, target_part_id))
            .map(|line| line.quantity_per);

        let plan = plan_swap(
            quantity_to_build,
            source.quantity_per,
            source.allocated_quantity,
            target,
            swap_quantity,
        )?;

        tables
            .bom
            .entry((assembly_id, target_part_id))
            .and_modify(|line| line.quantity_per = plan.target_quantity_per)
            .or_insert(LineRecord {
                reference: None,
                quantity_per: plan.target_quantity_per,
                allocated_quantity: 0,
            });

        match plan.source {
            SourceOutcome::Keep {
                quantity_per,
                allocated_quantity,
            } => {
                if let Some(line) = tables.bom.get_mut(&(assembly_id, source_part_id)) {
                    line.quantity_per = quantity_per;
                    line.allocated_quantity = allocated_quantity;
                }
            }
            SourceOutcome::Remove => {
                tables.bom.remove(&(assembly_id, source_part_id));
            }
        }
        if plan.returned_to_stock > 0 {
            tables.credit_stock(source_part_id, plan.returned_to_stock);
        }
        tables.recalculate_status(assembly_id);

        info!(
            returned_to_stock = plan.returned_to_stock,
            target_created = plan.target_created,
            "BOM quantity swapped"
        );
        Ok(plan)
    }

    /// Points a line at a different part, keeping its reference and per-unit quantity.
    ///
    /// Allocation drawn from the old part goes back to that part's stock.
    #[instrument(skip(self))]
    pub async fn replace_bom_part(
        &self,
        assembly_id: i64,
        old_part_id: i64,
        new_part_id: i64,
    ) -> Result<BomLine, ServiceError> {
        if old_part_id == new_part_id {
            return Err(ServiceError::ValidationError(
                "new_part_id must differ from the current part".into(),
            ));
        }

        let mut tables = self.tables.write().await;
        let old = tables.line(assembly_id, old_part_id)?.clone();
        tables.part(new_part_id)?;
        if tables.bom.contains_key(&(assembly_id, new_part_id)) {
            return Err(ServiceError::Conflict(format!(
                "Part {} is already on the BOM of assembly {}",
                new_part_id, assembly_id
            )));
        }

        if old.allocated_quantity > 0 {
            tables.credit_stock(old_part_id, old.allocated_quantity);
        }
        tables.bom.remove(&(assembly_id, old_part_id));
        let record = LineRecord {
            reference: old.reference,
            quantity_per: old.quantity_per,
            allocated_quantity: 0,
        };
        let line = tables.bom_line(new_part_id, &record);
        tables.bom.insert((assembly_id, new_part_id), record);
        tables.recalculate_status(assembly_id);
        info!(returned_to_stock = old.allocated_quantity, "BOM part replaced");
        Ok(line)
    }
}
