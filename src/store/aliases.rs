use tracing::{info, instrument};

use super::InventoryStore;
use crate::errors::ServiceError;
use crate::ledger::alias::normalize_alias_name;
use crate::models::{AliasGroup, AliasLink, AliasSearchQuery};

/// Result of linking a part into a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkOutcome {
    Created(AliasLink),
    AlreadyLinked(AliasLink),
}

impl LinkOutcome {
    pub fn link(&self) -> &AliasLink {
        match self {
            LinkOutcome::Created(link) | LinkOutcome::AlreadyLinked(link) => link,
        }
    }
}

impl InventoryStore {
    #[instrument(skip(self))]
    pub async fn create_alias(&self, alias_name: &str) -> Result<AliasGroup, ServiceError> {
        let mut tables = self.tables.write().await;
        let group = tables.insert_alias(alias_name)?;
        info!(alias_id = group.id, alias_name = %group.alias_name, "Alias created");
        Ok(group)
    }

    /// Groups whose name contains `q`, case-insensitively, ordered by name.
    pub async fn search_aliases(&self, query: &AliasSearchQuery) -> Vec<AliasGroup> {
        let needle = query.q.trim().to_lowercase();
        let tables = self.tables.read().await;
        let mut hits: Vec<AliasGroup> = tables
            .aliases
            .values()
            .filter(|group| group.alias_name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.alias_name.cmp(&b.alias_name));
        hits.truncate(query.limit);
        hits
    }

    #[instrument(skip(self))]
    pub async fn rename_alias(
        &self,
        alias_id: i64,
        alias_name: &str,
    ) -> Result<AliasGroup, ServiceError> {
        let alias_name = normalize_alias_name(alias_name)
            .ok_or_else(|| ServiceError::ValidationError("alias_name is required".into()))?;
        let mut tables = self.tables.write().await;
        tables.alias(alias_id)?;
        if tables
            .alias_by_name(&alias_name)
            .is_some_and(|other| other.id != alias_id)
        {
            return Err(ServiceError::Conflict(format!(
                "Alias '{}' already exists",
                alias_name
            )));
        }
        let group = AliasGroup {
            id: alias_id,
            alias_name,
        };
        tables.aliases.insert(alias_id, group.clone());
        info!(alias_name = %group.alias_name, "Alias renamed");
        Ok(group)
    }

    /// Deletes a group together with all of its links.
    #[instrument(skip(self))]
    pub async fn delete_alias(&self, alias_id: i64) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        tables.alias(alias_id)?;
        tables.links.retain(|_, link| link.alias_id != alias_id);
        tables.aliases.remove(&alias_id);
        info!("Alias deleted");
        Ok(())
    }

    pub async fn alias_links(&self, alias_id: i64) -> Result<Vec<AliasLink>, ServiceError> {
        let tables = self.tables.read().await;
        tables.alias(alias_id)?;
        Ok(tables
            .links
            .iter()
            .filter(|(_, link)| link.alias_id == alias_id)
            .map(|(link_id, link)| {
                let part = tables.parts.get(&link.part_id);
                AliasLink {
                    link_id: *link_id,
                    alias_id,
                    part_id: link.part_id,
                    part_name: part.map(|p| p.part_name.clone()).unwrap_or_default(),
                    quantity: part.map(|p| p.quantity).unwrap_or_default(),
                }
            })
            .collect())
    }

    /// Links a part into a group. A part belongs to at most one group.
    #[instrument(skip(self))]
    pub async fn add_alias_link(
        &self,
        alias_id: i64,
        part_id: i64,
    ) -> Result<LinkOutcome, ServiceError> {
        let mut tables = self.tables.write().await;
        tables.alias(alias_id)?;
        let part = tables.part(part_id)?.clone();

        let link = |link_id| AliasLink {
            link_id,
            alias_id,
            part_id,
            part_name: part.part_name.clone(),
            quantity: part.quantity,
        };

        match tables.link_of_part(part_id) {
            Some((link_id, existing)) if existing.alias_id == alias_id => {
                Ok(LinkOutcome::AlreadyLinked(link(link_id)))
            }
            Some((_, existing)) => {
                let other = tables.alias(existing.alias_id)?;
                Err(ServiceError::Conflict(format!(
                    "Part {} already belongs to alias '{}'",
                    part_id, other.alias_name
                )))
            }
            None => {
                let link_id = tables.insert_link(alias_id, part_id);
                info!(link_id, "Alias link added");
                Ok(LinkOutcome::Created(link(link_id)))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_alias_link(&self, link_id: i64) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        tables
            .links
            .remove(&link_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Alias link {} not found", link_id)))?;
        info!("Alias link deleted");
        Ok(())
    }

    /// Removes the part's membership. The group itself is kept.
    #[instrument(skip(self))]
    pub async fn delete_part_alias_link(&self, part_id: i64) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        tables.part(part_id)?;
        let (link_id, _) = tables.link_of_part(part_id).ok_or_else(|| {
            ServiceError::NotFound(format!("Part {} has no alias link", part_id))
        })?;
        tables.links.remove(&link_id);
        info!(link_id, "Alias link deleted");
        Ok(())
    }
}
