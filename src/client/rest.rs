use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::{InventoryApi, Session};
use crate::errors::LedgerError;
use crate::handlers::common::OPERATOR_HEADER;
use crate::models::{
    AddBomItemRequest, AddLinkRequest, AliasGroup, AliasLink, AliasNameRequest, AmountRequest,
    AssemblyDetail, AssemblySummary, BomLine, CreatePartOrderRequest, CreatePartRequest,
    DeletePartsRequest, MergePartsRequest, Part, PartOrder, ReplacePartRequest,
    SwapQuantityRequest, UpdateBomItemRequest, UpdatePartRequest,
};

/// Message for a non-2xx response: the JSON `error` field, else the raw body,
/// else `HTTP <status>`.
pub fn extract_error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status)
    } else {
        trimmed.to_string()
    }
}

/// [`InventoryApi`] over the REST backend.
#[derive(Clone, Debug)]
pub struct HttpInventoryClient {
    http: reqwest::Client,
    session: Session,
}

impl HttpInventoryClient {
    pub fn new(session: Session) -> Self {
        Self {
            http: reqwest::Client::new(),
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let mut builder = self.http.request(method, self.session.url(path));
        if let Some(operator) = self.session.operator() {
            builder = builder.header(OPERATOR_HEADER, operator);
        }
        if let Some(timeout) = self.session.timeout() {
            builder = builder.timeout(timeout);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, LedgerError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), url = %response.url(), "backend request succeeded");
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(status.as_u16(), &body);
        warn!(status = status.as_u16(), %url, error = %message, "backend rejected request");
        Err(LedgerError::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, LedgerError> {
        let response = self.send(builder).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| LedgerError::Decode(e.to_string()))
    }

    async fn empty(&self, builder: RequestBuilder) -> Result<(), LedgerError> {
        self.send(builder).await.map(|_| ())
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.request(reqwest::Method::GET, path)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.request(reqwest::Method::POST, path)
    }

    fn put(&self, path: &str) -> RequestBuilder {
        self.request(reqwest::Method::PUT, path)
    }

    fn patch(&self, path: &str) -> RequestBuilder {
        self.request(reqwest::Method::PATCH, path)
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.request(reqwest::Method::DELETE, path)
    }
}

#[async_trait]
impl InventoryApi for HttpInventoryClient {
    async fn list_parts(&self) -> Result<Vec<Part>, LedgerError> {
        self.json(self.get("/api/parts")).await
    }

    async fn create_part(&self, request: &CreatePartRequest) -> Result<Part, LedgerError> {
        self.json(self.post("/api/parts").json(request)).await
    }

    #[instrument(skip(self, request))]
    async fn update_part(
        &self,
        part_id: i64,
        request: &UpdatePartRequest,
    ) -> Result<Part, LedgerError> {
        self.json(self.put(&format!("/api/parts/{}", part_id)).json(request))
            .await
    }

    #[instrument(skip(self))]
    async fn delete_parts(&self, part_ids: &[i64]) -> Result<(), LedgerError> {
        self.empty(self.delete("/api/parts").json(&DeletePartsRequest {
            ids: part_ids.to_vec(),
        }))
        .await
    }

    async fn part_alias(&self, part_id: i64) -> Result<Option<AliasGroup>, LedgerError> {
        self.json(self.get(&format!("/api/parts/{}/alias", part_id)))
            .await
    }

    #[instrument(skip(self))]
    async fn link_part_alias(&self, part_id: i64) -> Result<AliasGroup, LedgerError> {
        self.json(self.post(&format!("/api/parts/{}/alias", part_id)))
            .await
    }

    #[instrument(skip(self))]
    async fn merge_parts(&self, request: MergePartsRequest) -> Result<AliasGroup, LedgerError> {
        self.json(self.post("/api/parts/merge").json(&request)).await
    }

    #[instrument(skip(self, request), fields(part_id = request.part_id))]
    async fn place_order(
        &self,
        request: &CreatePartOrderRequest,
    ) -> Result<PartOrder, LedgerError> {
        self.json(self.post("/api/part_orders").json(request)).await
    }

    async fn part_orders(&self, part_id: i64) -> Result<Vec<PartOrder>, LedgerError> {
        self.json(self.get(&format!("/api/parts/{}/orders", part_id)))
            .await
    }

    async fn recent_orders(&self) -> Result<Vec<PartOrder>, LedgerError> {
        self.json(self.get("/api/part_orders/recent")).await
    }

    #[instrument(skip(self))]
    async fn fulfill_order(&self, order_id: i64) -> Result<Part, LedgerError> {
        self.json(self.patch(&format!("/api/part_orders/{}/fulfill", order_id)))
            .await
    }

    async fn assembly_detail(&self, assembly_id: i64) -> Result<AssemblyDetail, LedgerError> {
        self.json(self.get(&format!("/api/assemblies/{}/detail", assembly_id)))
            .await
    }

    async fn low_stock_assemblies(&self) -> Result<Vec<AssemblySummary>, LedgerError> {
        self.json(self.get("/api/assemblies/low_stock")).await
    }

    async fn add_bom_line(
        &self,
        assembly_id: i64,
        request: &AddBomItemRequest,
    ) -> Result<BomLine, LedgerError> {
        self.json(
            self.post(&format!("/api/assemblies/{}/bom", assembly_id))
                .json(request),
        )
        .await
    }

    async fn update_bom_line(
        &self,
        assembly_id: i64,
        part_id: i64,
        request: &UpdateBomItemRequest,
    ) -> Result<BomLine, LedgerError> {
        self.json(
            self.put(&format!("/api/assemblies/{}/bom/{}", assembly_id, part_id))
                .json(request),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_bom_line(&self, assembly_id: i64, part_id: i64) -> Result<(), LedgerError> {
        self.empty(self.delete(&format!("/api/assemblies/{}/bom/{}", assembly_id, part_id)))
            .await
    }

    #[instrument(skip(self))]
    async fn allocate(
        &self,
        assembly_id: i64,
        part_id: i64,
        amount: i64,
    ) -> Result<(), LedgerError> {
        self.empty(
            self.put(&format!(
                "/api/assemblies/{}/bom/{}/allocate",
                assembly_id, part_id
            ))
            .json(&AmountRequest { amount }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn deallocate(
        &self,
        assembly_id: i64,
        part_id: i64,
        amount: i64,
    ) -> Result<(), LedgerError> {
        self.empty(
            self.put(&format!(
                "/api/assemblies/{}/bom/{}/deallocate",
                assembly_id, part_id
            ))
            .json(&AmountRequest { amount }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn swap_quantity(
        &self,
        assembly_id: i64,
        request: SwapQuantityRequest,
    ) -> Result<(), LedgerError> {
        self.empty(
            self.post(&format!(
                "/api/assemblies/{}/bom/swap-quantity",
                assembly_id
            ))
            .json(&request),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn replace_bom_part(
        &self,
        assembly_id: i64,
        part_id: i64,
        new_part_id: i64,
    ) -> Result<(), LedgerError> {
        self.empty(
            self.put(&format!(
                "/api/assemblies/{}/bom/{}/swap",
                assembly_id, part_id
            ))
            .json(&ReplacePartRequest { new_part_id }),
        )
        .await
    }

    async fn create_alias(&self, alias_name: &str) -> Result<AliasGroup, LedgerError> {
        self.json(self.post("/api/aliases").json(&AliasNameRequest {
            alias_name: alias_name.to_string(),
        }))
        .await
    }

    async fn search_aliases(&self, q: &str, limit: usize) -> Result<Vec<AliasGroup>, LedgerError> {
        self.json(
            self.get("/api/aliases/search")
                .query(&[("q", q.to_string()), ("limit", limit.to_string())]),
        )
        .await
    }

    async fn rename_alias(
        &self,
        alias_id: i64,
        alias_name: &str,
    ) -> Result<AliasGroup, LedgerError> {
        self.json(
            self.put(&format!("/api/aliases/{}", alias_id))
                .json(&json!({ "alias_name": alias_name })),
        )
        .await
    }

    async fn delete_alias(&self, alias_id: i64) -> Result<(), LedgerError> {
        self.empty(self.delete(&format!("/api/aliases/{}", alias_id)))
            .await
    }

    async fn alias_links(&self, alias_id: i64) -> Result<Vec<AliasLink>, LedgerError> {
        self.json(self.get(&format!("/api/aliases/{}/links", alias_id)))
            .await
    }

    async fn add_alias_link(&self, alias_id: i64, part_id: i64) -> Result<AliasLink, LedgerError> {
        self.json(
            self.post(&format!("/api/aliases/{}/links", alias_id))
                .json(&AddLinkRequest { part_id }),
        )
        .await
    }

    async fn delete_alias_link(&self, link_id: i64) -> Result<(), LedgerError> {
        self.empty(self.delete(&format!("/api/aliases/links/{}", link_id)))
            .await
    }

    async fn delete_part_alias_link(&self, part_id: i64) -> Result<(), LedgerError> {
        self.empty(self.delete(&format!("/api/aliases/links/part/{}", part_id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(409, r#"{"error":"Alias 'NE555' already exists"}"#, "Alias 'NE555' already exists")]
    #[case(500, "upstream exploded\n", "upstream exploded")]
    #[case(502, "", "HTTP 502")]
    #[case(400, r#"{"detail":"no error field"}"#, r#"{"detail":"no error field"}"#)]
    fn error_message_extraction(#[case] status: u16, #[case] body: &str, #[case] expected: &str) {
        assert_eq!(extract_error_message(status, body), expected);
    }
}
