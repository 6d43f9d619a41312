use tracing::{info, instrument};
use validator::Validate;

use super::{next_id, InventoryStore, OrderRecord, Tables};
use crate::errors::ServiceError;
use crate::ledger::quantities::MAX_QUANTITY;
use crate::models::{CreatePartOrderRequest, Part, PartOrder};

/// Number of orders returned by [`InventoryStore::recent_orders`].
const RECENT_ORDER_LIMIT: usize = 10;

impl Tables {
    fn part_order(&self, order_id: i64, record: &OrderRecord) -> PartOrder {
        PartOrder {
            id: order_id,
            part_id: record.part_id,
            part_name: self
                .parts
                .get(&record.part_id)
                .map(|p| p.part_name.clone())
                .unwrap_or_default(),
            order_date: record.order_date,
            quantity_ordered: record.quantity_ordered,
        }
    }

    /// Orders matching `filter`, newest order date first.
    fn orders_where(&self, filter: impl Fn(&OrderRecord) -> bool) -> Vec<PartOrder> {
        let mut orders: Vec<PartOrder> = self
            .orders
            .iter()
            .filter(|(_, record)| filter(record))
            .map(|(id, record)| self.part_order(*id, record))
            .collect();
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date).then(b.id.cmp(&a.id)));
        orders
    }
}

impl InventoryStore {
    /// Records an order, adding to an existing order for the same part and date.
    #[instrument(skip(self, request), fields(part_id = request.part_id))]
    pub async fn place_order(
        &self,
        request: CreatePartOrderRequest,
    ) -> Result<PartOrder, ServiceError> {
        request.validate()?;
        let mut tables = self.tables.write().await;
        tables.part(request.part_id)?;

        let existing = tables
            .orders
            .iter()
            .find(|(_, o)| o.part_id == request.part_id && o.order_date == request.order_date)
            .map(|(id, o)| (*id, o.quantity_ordered));

        let (order_id, record) = match existing {
            Some((order_id, ordered)) => {
                let merged = ordered.saturating_add(request.quantity_ordered);
                if merged > MAX_QUANTITY {
                    return Err(ServiceError::ValidationError(format!(
                        "Order {} would exceed {} units",
                        order_id, MAX_QUANTITY
                    )));
                }
                let record = OrderRecord {
                    part_id: request.part_id,
                    order_date: request.order_date,
                    quantity_ordered: merged,
                };
                tables.orders.insert(order_id, record);
                info!(order_id, quantity_ordered = merged, "Order merged");
                (order_id, record)
            }
            None => {
                let order_id = next_id(&mut tables.next_order_id);
                let record = OrderRecord {
                    part_id: request.part_id,
                    order_date: request.order_date,
                    quantity_ordered: request.quantity_ordered,
                };
                tables.orders.insert(order_id, record);
                info!(order_id, quantity_ordered = request.quantity_ordered, "Order placed");
                (order_id, record)
            }
        };

        Ok(tables.part_order(order_id, &record))
    }

    pub async fn part_orders(&self, part_id: i64) -> Result<Vec<PartOrder>, ServiceError> {
        let tables = self.tables.read().await;
        tables.part(part_id)?;
        Ok(tables.orders_where(|o| o.part_id == part_id))
    }

    pub async fn recent_orders(&self) -> Vec<PartOrder> {
        let tables = self.tables.read().await;
        let mut orders = tables.orders_where(|_| true);
        orders.truncate(RECENT_ORDER_LIMIT);
        orders
    }

    /// Receives an order: its quantity joins the part's free stock and the order is closed.
    #[instrument(skip(self))]
    pub async fn fulfill_order(&self, order_id: i64) -> Result<Part, ServiceError> {
        let mut tables = self.tables.write().await;
        let order = *tables
            .orders
            .get(&order_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        tables.part(order.part_id)?;
        tables.check_holdings(order.part_id, order.quantity_ordered)?;

        tables.credit_stock(order.part_id, order.quantity_ordered);
        tables.orders.remove(&order_id);
        let part = tables.part_mut(order.part_id)?;
        part.update_date = Some(chrono::Utc::now());
        let part = part.clone();
        info!(
            part_id = part.id,
            received = order.quantity_ordered,
            quantity = part.quantity,
            "Order fulfilled"
        );
        Ok(part)
    }
}
