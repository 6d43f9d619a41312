//! Typed access to the inventory backend.
//!
//! [`InventoryApi`] is the seam the services are written against;
//! [`HttpInventoryClient`] implements it over the REST endpoints.

mod rest;
mod session;

pub use self::rest::{extract_error_message, HttpInventoryClient};
pub use self::session::Session;

use async_trait::async_trait;

use crate::errors::LedgerError;
use crate::models::{
    AddBomItemRequest, AliasGroup, AliasLink, AssemblyDetail, AssemblySummary, BomLine,
    CreatePartOrderRequest, CreatePartRequest, MergePartsRequest, Part, PartOrder,
    SwapQuantityRequest, UpdateBomItemRequest, UpdatePartRequest,
};

/// One method per backend endpoint. Mutations that the callers always follow
/// with a re-fetch return `()`.
#[async_trait]
pub trait InventoryApi: Send + Sync {
    async fn list_parts(&self) -> Result<Vec<Part>, LedgerError>;
    async fn create_part(&self, request: &CreatePartRequest) -> Result<Part, LedgerError>;
    async fn update_part(
        &self,
        part_id: i64,
        request: &UpdatePartRequest,
    ) -> Result<Part, LedgerError>;
    async fn delete_parts(&self, part_ids: &[i64]) -> Result<(), LedgerError>;
    async fn part_alias(&self, part_id: i64) -> Result<Option<AliasGroup>, LedgerError>;
    /// Atomic find-or-create-and-link of the group named after the part.
    async fn link_part_alias(&self, part_id: i64) -> Result<AliasGroup, LedgerError>;
    async fn merge_parts(&self, request: MergePartsRequest) -> Result<AliasGroup, LedgerError>;

    async fn place_order(&self, request: &CreatePartOrderRequest)
        -> Result<PartOrder, LedgerError>;
    async fn part_orders(&self, part_id: i64) -> Result<Vec<PartOrder>, LedgerError>;
    async fn recent_orders(&self) -> Result<Vec<PartOrder>, LedgerError>;
    /// Receives the order; returns the restocked part.
    async fn fulfill_order(&self, order_id: i64) -> Result<Part, LedgerError>;

    async fn assembly_detail(&self, assembly_id: i64) -> Result<AssemblyDetail, LedgerError>;
    async fn low_stock_assemblies(&self) -> Result<Vec<AssemblySummary>, LedgerError>;
    async fn add_bom_line(
        &self,
        assembly_id: i64,
        request: &AddBomItemRequest,
    ) -> Result<BomLine, LedgerError>;
    async fn update_bom_line(
        &self,
        assembly_id: i64,
        part_id: i64,
        request: &UpdateBomItemRequest,
    ) -> Result<BomLine, LedgerError>;
    async fn delete_bom_line(&self, assembly_id: i64, part_id: i64) -> Result<(), LedgerError>;
    async fn allocate(&self, assembly_id: i64, part_id: i64, amount: i64)
        -> Result<(), LedgerError>;
    async fn deallocate(
        &self,
        assembly_id: i64,
        part_id: i64,
        amount: i64,
    ) -> Result<(), LedgerError>;
    async fn swap_quantity(
        &self,
        assembly_id: i64,
        request: SwapQuantityRequest,
    ) -> Result<(), LedgerError>;
    async fn replace_bom_part(
        &self,
        assembly_id: i64,
        part_id: i64,
        new_part_id: i64,
    ) -> Result<(), LedgerError>;

    async fn create_alias(&self, alias_name: &str) -> Result<AliasGroup, LedgerError>;
    async fn search_aliases(&self, q: &str, limit: usize) -> Result<Vec<AliasGroup>, LedgerError>;
    async fn rename_alias(&self, alias_id: i64, alias_name: &str)
        -> Result<AliasGroup, LedgerError>;
    async fn delete_alias(&self, alias_id: i64) -> Result<(), LedgerError>;
    async fn alias_links(&self, alias_id: i64) -> Result<Vec<AliasLink>, LedgerError>;
    async fn add_alias_link(&self, alias_id: i64, part_id: i64) -> Result<AliasLink, LedgerError>;
    async fn delete_alias_link(&self, link_id: i64) -> Result<(), LedgerError>;
    async fn delete_part_alias_link(&self, part_id: i64) -> Result<(), LedgerError>;
}
