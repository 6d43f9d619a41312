use chrono::Utc;
use tracing::{info, instrument};
use validator::Validate;

use super::{next_id, InventoryStore, Tables};
use crate::errors::ServiceError;
use crate::ledger::alias::{normalize_alias_name, plan_merge, MergePlan};
use crate::ledger::quantities::MAX_QUANTITY;
use crate::models::{
    AliasGroup, CreatePartRequest, DeletePartsRequest, MergePartsRequest, Part, UpdatePartRequest,
};

impl Tables {
    pub(super) fn insert_part(&mut self, request: CreatePartRequest) -> Result<Part, ServiceError> {
        let name = request.part_name.trim();
        if name.is_empty() {
            return Err(ServiceError::ValidationError("part_name is required".into()));
        }
        if self.part_by_name(name).is_some() {
            return Err(ServiceError::Conflict(format!(
                "Part '{}' already exists",
                name
            )));
        }

        let now = Utc::now();
        let part = Part {
            id: next_id(&mut self.next_part_id),
            part_name: name.to_string(),
            quantity: request.quantity.max(0),
            manufacturer: request.manufacturer,
            description: request.description,
            package: request.package,
            category_large: None,
            location: request.location,
            price: None,
            memo: None,
            create_date: Some(now),
            update_date: Some(now),
        };
        self.parts.insert(part.id, part.clone());
        Ok(part)
    }

    pub(super) fn insert_alias(&mut self, raw_name: &str) -> Result<AliasGroup, ServiceError> {
        let alias_name = normalize_alias_name(raw_name)
            .ok_or_else(|| ServiceError::ValidationError("alias_name is required".into()))?;
        if self.alias_by_name(&alias_name).is_some() {
            return Err(ServiceError::Conflict(format!(
                "Alias '{}' already exists",
                alias_name
            )));
        }
        let group = AliasGroup {
            id: next_id(&mut self.next_alias_id),
            alias_name,
        };
        self.aliases.insert(group.id, group.clone());
        Ok(group)
    }

    /// Group with this (normalized) name, created if missing.
    fn alias_named(&mut self, raw_name: &str) -> Result<AliasGroup, ServiceError> {
        match self.alias_by_name(raw_name.trim()) {
            Some(existing) => Ok(existing.clone()),
            None => self.insert_alias(raw_name),
        }
    }
}

impl InventoryStore {
    pub async fn list_parts(&self) -> Vec<Part> {
        let tables = self.tables.read().await;
        tables.parts.values().cloned().collect()
    }

    pub async fn get_part(&self, part_id: i64) -> Result<Part, ServiceError> {
        let tables = self.tables.read().await;
        tables.part(part_id).cloned()
    }

    #[instrument(skip(self, request), fields(part_name = %request.part_name))]
    pub async fn create_part(&self, request: CreatePartRequest) -> Result<Part, ServiceError> {
        request.validate()?;
        let mut tables = self.tables.write().await;
        let part = tables.insert_part(request)?;
        info!(part_id = part.id, quantity = part.quantity, "Part created");
        Ok(part)
    }

    /// Edits part metadata. A `quantity` overwrites free stock; allocations are untouched.
    #[instrument(skip(self, request))]
    pub async fn update_part(
        &self,
        part_id: i64,
        request: UpdatePartRequest,
    ) -> Result<Part, ServiceError> {
        request.validate()?;
        let mut tables = self.tables.write().await;
        let current = tables.part(part_id)?.quantity;

        let name = match request.part_name.as_deref().map(str::trim) {
            Some("") => {
                return Err(ServiceError::ValidationError("part_name is required".into()));
            }
            Some(name) => {
                if tables.part_by_name(name).is_some_and(|other| other.id != part_id) {
                    return Err(ServiceError::Conflict(format!(
                        "Part '{}' already exists",
                        name
                    )));
                }
                Some(name.to_string())
            }
            None => None,
        };
        if let Some(quantity) = request.quantity {
            let allocated = tables.holdings(part_id) - current;
            if allocated.saturating_add(quantity) > MAX_QUANTITY {
                return Err(ServiceError::ValidationError(format!(
                    "Part {} would hold more than {} units",
                    part_id, MAX_QUANTITY
                )));
            }
        }

        let part = tables.part_mut(part_id)?;
        if let Some(name) = name {
            part.part_name = name;
        }
        if let Some(quantity) = request.quantity {
            part.quantity = quantity;
        }
        let UpdatePartRequest {
            manufacturer,
            description,
            package,
            category_large,
            location,
            price,
            memo,
            ..
        } = request;
        for (field, value) in [
            (&mut part.manufacturer, manufacturer),
            (&mut part.description, description),
            (&mut part.package, package),
            (&mut part.category_large, category_large),
            (&mut part.location, location),
            (&mut part.memo, memo),
        ] {
            if value.is_some() {
                *field = value;
            }
        }
        if price.is_some() {
            part.price = price;
        }
        part.update_date = Some(Utc::now());
        let part = part.clone();
        if part.quantity != current {
            info!(from = current, to = part.quantity, "Free stock adjusted");
        }
        Ok(part)
    }

    /// Deletes the parts, their alias links and their open orders, all or nothing.
    ///
    /// Refused while any of them still has free stock or sits on a BOM line.
    #[instrument(skip(self), fields(count = request.ids.len()))]
    pub async fn delete_parts(&self, request: DeletePartsRequest) -> Result<usize, ServiceError> {
        request.validate()?;
        let mut ids = request.ids;
        ids.sort_unstable();
        ids.dedup();

        let mut tables = self.tables.write().await;
        let mut blocked = Vec::new();
        for &part_id in &ids {
            let quantity = tables.part(part_id)?.quantity;
            let lines = tables.bom.keys().filter(|(_, p)| *p == part_id).count();
            if quantity > 0 {
                blocked.push(format!("{} ({} in stock)", part_id, quantity));
            } else if lines > 0 {
                blocked.push(format!("{} (on {} BOM lines)", part_id, lines));
            }
        }
        if !blocked.is_empty() {
            return Err(ServiceError::Conflict(format!(
                "Parts still in use: {}",
                blocked.join(", ")
            )));
        }

        for part_id in &ids {
            tables.parts.remove(part_id);
        }
        tables.links.retain(|_, link| ids.binary_search(&link.part_id).is_err());
        tables.orders.retain(|_, order| ids.binary_search(&order.part_id).is_err());
        info!(deleted = ids.len(), "Parts deleted");
        Ok(ids.len())
    }

    /// The part's alias group, if it belongs to one.
    pub async fn part_alias(&self, part_id: i64) -> Result<Option<AliasGroup>, ServiceError> {
        let tables = self.tables.read().await;
        tables.part(part_id)?;
        Ok(tables
            .link_of_part(part_id)
            .and_then(|(_, link)| tables.aliases.get(&link.alias_id).cloned()))
    }

    /// Links the part into the group named after it, creating the group if needed.
    ///
    /// Lookup, creation and linking happen under one write lock.
    #[instrument(skip(self))]
    pub async fn link_part_to_own_alias(&self, part_id: i64) -> Result<AliasGroup, ServiceError> {
        let mut tables = self.tables.write().await;
        let part_name = tables.part(part_id)?.part_name.clone();
        if let Some((_, link)) = tables.link_of_part(part_id) {
            let current = tables.alias(link.alias_id)?;
            return Err(ServiceError::Conflict(format!(
                "Part {} already belongs to alias '{}'",
                part_id, current.alias_name
            )));
        }

        let group = tables.alias_named(&part_name)?;
        let link_id = tables.insert_link(group.id, part_id);
        info!(alias_id = group.id, link_id, "Part linked to alias");
        Ok(group)
    }

    /// Puts both parts into one alias group. Never touches stock or BOM lines.
    #[instrument(skip(self))]
    pub async fn merge_parts(
        &self,
        request: MergePartsRequest,
    ) -> Result<AliasGroup, ServiceError> {
        let MergePartsRequest {
            source_part_id,
            target_part_id,
            ..
        } = request;
        if source_part_id == target_part_id {
            return Err(ServiceError::ValidationError(
                "source and target must be different parts".into(),
            ));
        }

        let mut tables = self.tables.write().await;
        tables.part(source_part_id)?;
        let target_name = tables.part(target_part_id)?.part_name.clone();
        let source_alias = tables.link_of_part(source_part_id).map(|(_, l)| l.alias_id);
        let target_alias = tables.link_of_part(target_part_id).map(|(_, l)| l.alias_id);

        let plan = plan_merge(
            source_part_id,
            source_alias,
            target_part_id,
            &target_name,
            target_alias,
        )
        .ok_or_else(|| ServiceError::ValidationError("target part has no usable name".into()))?;

        let alias_id = match plan {
            MergePlan::CreateGroup { alias_name } => {
                let group = tables.alias_named(&alias_name)?;
                tables.insert_link(group.id, source_part_id);
                tables.insert_link(group.id, target_part_id);
                group.id
            }
            MergePlan::JoinGroup { alias_id, part_id } => {
                tables.insert_link(alias_id, part_id);
                alias_id
            }
            MergePlan::FoldGroups { from, into } => {
                for link in tables.links.values_mut().filter(|l| l.alias_id == from) {
                    link.alias_id = into;
                }
                tables.aliases.remove(&from);
                into
            }
            MergePlan::AlreadyMerged { alias_id } => alias_id,
        };

        let group = tables.alias(alias_id)?.clone();
        info!(alias_id, alias_name = %group.alias_name, "Parts merged");
        Ok(group)
    }
}
