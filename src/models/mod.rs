//! Wire and domain types shared by the store, the REST handlers and the client.

pub mod alias;
pub mod assembly;
pub mod bom;
pub mod order;
pub mod part;

pub use alias::{AddLinkRequest, AliasGroup, AliasLink, AliasNameRequest, AliasSearchQuery};
pub use assembly::{
    Assembly, AssemblyStatus, AssemblySummary, CreateAssemblyRequest, UpdateAssemblyRequest,
};
pub use bom::{
    AddBomItemRequest, AmountRequest, AssemblyDetail, BomLine, MergePartsRequest,
    ReplacePartRequest, SwapQuantityRequest, SwapResponse, UpdateBomItemRequest,
};
pub use order::{CreatePartOrderRequest, PartOrder};
pub use part::{CreatePartRequest, DeletePartsRequest, Part, UpdatePartRequest};

use serde::{Deserialize, Serialize};

/// Plain acknowledgement body used by mutating endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
