//! Alias group workflows: enabling an alias for a part, merging parts,
//! renaming and group membership.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::client::InventoryApi;
use crate::errors::LedgerError;
use crate::ledger::alias::{find_exact, normalize_alias_name};
use crate::models::{AliasGroup, AliasLink, CreatePartRequest, MergePartsRequest, Part};

/// Limit used when looking a group up by name after a duplicate rejection.
const DUPLICATE_LOOKUP_LIMIT: usize = 50;

pub struct AliasService<A> {
    api: Arc<A>,
}

impl<A> Clone for AliasService<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

fn require_name(raw: &str) -> Result<String, LedgerError> {
    normalize_alias_name(raw)
        .ok_or_else(|| LedgerError::Validation("alias name must not be empty".to_string()))
}

impl<A: InventoryApi> AliasService<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Puts the part into the group named after it, creating the group if needed.
    #[instrument(skip(self))]
    pub async fn enable_alias(&self, part_id: i64) -> Result<AliasGroup, LedgerError> {
        let group = self.api.link_part_alias(part_id).await?;
        info!(part_id, alias_id = group.id, alias = %group.alias_name, "alias enabled");
        Ok(group)
    }

    /// Same outcome as [`Self::enable_alias`] against backends that only offer
    /// the separate create, search and link endpoints.
    ///
    /// A create rejected with 409 means the group already exists; it is then
    /// found by exact name among the search results.
    #[instrument(skip(self, part), fields(part_id = part.id))]
    pub async fn enable_alias_legacy(&self, part: &Part) -> Result<AliasGroup, LedgerError> {
        if let Some(group) = self.api.part_alias(part.id).await? {
            return Ok(group);
        }
        let name = require_name(&part.part_name)?;

        let group = match self.api.create_alias(&name).await {
            Ok(group) => group,
            Err(err) if err.is_conflict() => self.find_group(&name).await?,
            Err(err) => return Err(err),
        };

        let link = self.api.add_alias_link(group.id, part.id).await?;
        info!(alias_id = group.id, link_id = link.link_id, "alias enabled");
        Ok(group)
    }

    async fn find_group(&self, name: &str) -> Result<AliasGroup, LedgerError> {
        let candidates = self
            .api
            .search_aliases(name, DUPLICATE_LOOKUP_LIMIT)
            .await?;
        match find_exact(&candidates, name) {
            Some(group) => Ok(group.clone()),
            None => {
                warn!(alias = %name, "duplicate reported but no exact match found");
                Err(LedgerError::ImpossibleDuplicate(name.to_string()))
            }
        }
    }

    /// Removes the part from whatever group it is in. The group itself stays.
    #[instrument(skip(self))]
    pub async fn disable_alias(&self, part_id: i64) -> Result<(), LedgerError> {
        self.api.delete_part_alias_link(part_id).await
    }

    /// Marks two parts as interchangeable. Stock and BOM lines are left alone.
    #[instrument(skip(self))]
    pub async fn merge(
        &self,
        source_part_id: i64,
        target_part_id: i64,
    ) -> Result<AliasGroup, LedgerError> {
        if source_part_id == target_part_id {
            return Err(LedgerError::Validation(
                "cannot merge a part with itself".to_string(),
            ));
        }
        self.api
            .merge_parts(MergePartsRequest {
                source_part_id,
                target_part_id,
                swap_assemblies: false,
            })
            .await
    }

    pub async fn rename(&self, alias_id: i64, alias_name: &str) -> Result<AliasGroup, LedgerError> {
        let name = require_name(alias_name)?;
        self.api.rename_alias(alias_id, &name).await
    }

    pub async fn delete_group(&self, alias_id: i64) -> Result<(), LedgerError> {
        self.api.delete_alias(alias_id).await
    }

    pub async fn search(&self, q: &str, limit: usize) -> Result<Vec<AliasGroup>, LedgerError> {
        self.api.search_aliases(q.trim(), limit).await
    }

    pub async fn links(&self, alias_id: i64) -> Result<Vec<AliasLink>, LedgerError> {
        self.api.alias_links(alias_id).await
    }

    pub async fn unlink(&self, link_id: i64) -> Result<(), LedgerError> {
        self.api.delete_alias_link(link_id).await
    }

    /// Links a part into the group by name, creating the part with zero stock
    /// when no part of that name exists yet.
    #[instrument(skip(self))]
    pub async fn add_part_by_name(
        &self,
        alias_id: i64,
        part_name: &str,
    ) -> Result<AliasLink, LedgerError> {
        let part_name = part_name.trim();
        if part_name.is_empty() {
            return Err(LedgerError::Validation(
                "part name must not be empty".to_string(),
            ));
        }

        let part = match self.find_part(part_name).await? {
            Some(part) => part,
            None => match self
                .api
                .create_part(&CreatePartRequest::named(part_name, 0))
                .await
            {
                Ok(part) => part,
                // Created concurrently by someone else.
                Err(err) if err.is_conflict() => self
                    .find_part(part_name)
                    .await?
                    .ok_or_else(|| LedgerError::Validation(err.to_string()))?,
                Err(err) => return Err(err),
            },
        };

        self.api.add_alias_link(alias_id, part.id).await
    }

    async fn find_part(&self, part_name: &str) -> Result<Option<Part>, LedgerError> {
        let parts = self.api.list_parts().await?;
        Ok(parts
            .into_iter()
            .find(|part| part.name_matches(part_name)))
    }
}
