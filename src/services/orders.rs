//! Order fulfillment engine.
//!
//! Creating an order validates tenant scope and per-product stock, computes
//! the total from snapshot prices, persists the order with its line items
//! and optional initial deposit, decrements inventory, and records the audit
//! batch, all inside one transaction.

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::audit;
use crate::context::OperationContext;
use crate::db::DbPool;
use crate::entities::order::{self, OrderStatus};
use crate::entities::order_item;
use crate::entities::order_partial_payment;
use crate::entities::product;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::inventory;
use crate::services::resolve_warehouse_scope;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    /// Required for elevated actors, ignored for everyone else.
    pub warehouse_id: Option<Uuid>,
    pub customer: String,
    pub customer_phone: Option<String>,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub line_items: Vec<OrderLine>,
    #[serde(default)]
    pub initial_deposit: Decimal,
}

/// Service for creating and reading orders.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    tracking_id_max_attempts: u32,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        tracking_id_max_attempts: u32,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            tracking_id_max_attempts,
        }
    }

    /// Creates an order atomically: no order, line item, payment, inventory
    /// change, or audit event survives a rejected request.
    #[instrument(skip(self, ctx, request), fields(customer = %request.customer, lines = request.line_items.len()))]
    pub async fn create_order(
        &self,
        ctx: &OperationContext,
        request: CreateOrderRequest,
    ) -> Result<order::Model, ServiceError> {
        request.validate()?;

        for line in &request.line_items {
            if line.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Line item quantity must be positive for product {}",
                    line.product_id
                )));
            }
        }
        if request.initial_deposit < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "The initial deposit cannot be negative".to_string(),
            ));
        }

        let warehouse_id = resolve_warehouse_scope(ctx, request.warehouse_id)?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        // One consistent read of prices and quantities for the whole
        // validation pass; buying prices are snapshotted from it, never
        // re-read at persist time.
        let product_ids: Vec<Uuid> = request.line_items.iter().map(|l| l.product_id).collect();
        let products = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .filter(product::Column::WarehouseId.eq(warehouse_id))
            .all(&txn)
            .await?;

        if products.len() != request.line_items.len() {
            return Err(ServiceError::ValidationError(
                "All selected products must belong to the same warehouse".to_string(),
            ));
        }

        let price_map: HashMap<Uuid, (Decimal, i32)> = products
            .iter()
            .map(|p| (p.id, (p.unit_price, p.quantity)))
            .collect();

        let mut total_price = Decimal::ZERO;
        for line in &request.line_items {
            let (unit_price, available) = price_map[&line.product_id];
            if available < line.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "Insufficient stock for product {}. Available: {}, Requested: {}",
                    line.product_id, available, line.quantity
                )));
            }
            total_price += unit_price * Decimal::from(line.quantity);
        }
        let total_price = total_price.round_dp(2);

        if request.initial_deposit > total_price {
            return Err(ServiceError::ValidationError(
                "The initial deposit cannot be more than the order total cost".to_string(),
            ));
        }

        let status = if request.initial_deposit == total_price {
            OrderStatus::Completed
        } else {
            OrderStatus::Pending
        };

        let tracking_id = self.allocate_tracking_id(&txn, &request.customer).await?;
        let now = Utc::now();
        let order_model = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(warehouse_id),
            customer: Set(request.customer.clone()),
            customer_phone: Set(request.customer_phone.clone()),
            initiator_id: Set(ctx.actor_id()),
            status: Set(status),
            tracking_id: Set(tracking_id),
            total_price: Set(total_price),
            created_at: Set(now),
            modified_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let initial_payment = if request.initial_deposit > Decimal::ZERO {
            Some(
                order_partial_payment::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    order_id: Set(order_model.id),
                    amount: Set(request.initial_deposit),
                    created_at: Set(now),
                }
                .insert(&txn)
                .await?,
            )
        } else {
            None
        };

        // One bulk audit insert for the whole logical operation.
        let mut audited: Vec<&dyn audit::Auditable> = vec![&order_model];
        if let Some(payment) = &initial_payment {
            audited.push(payment);
        }
        audit::record_created_many(&txn, ctx, &audited).await?;

        let item_models: Vec<order_item::ActiveModel> = request
            .line_items
            .iter()
            .map(|line| order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_model.id),
                product_id: Set(Some(line.product_id)),
                buying_price: Set(price_map[&line.product_id].0),
                quantity: Set(line.quantity),
                created_at: Set(now),
            })
            .collect();
        order_item::Entity::insert_many(item_models).exec(&txn).await?;

        let decrements: Vec<(Uuid, i32)> = request
            .line_items
            .iter()
            .map(|l| (l.product_id, l.quantity))
            .collect();
        inventory::decrement_stock(&txn, &decrements).await?;

        txn.commit().await?;

        info!(
            order_id = %order_model.id,
            tracking_id = %order_model.tracking_id,
            total_price = %order_model.total_price,
            status = %order_model.status,
            "Order created"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderCreated(order_model.id)).await {
                warn!(error = %e, order_id = %order_model.id, "Failed to send order created event");
            }
            if let Some(payment) = &initial_payment {
                if let Err(e) = event_sender
                    .send(Event::PaymentRecorded {
                        order_id: order_model.id,
                        payment_id: payment.id,
                        amount: payment.amount,
                    })
                    .await
                {
                    warn!(error = %e, order_id = %order_model.id, "Failed to send payment recorded event");
                }
            }
        }

        Ok(order_model)
    }

    /// Retrieves an order, tenant-scoped: a non-elevated actor sees only
    /// orders of their own warehouse.
    #[instrument(skip(self, ctx), fields(order_id = %order_id))]
    pub async fn get_order(
        &self,
        ctx: &OperationContext,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;
        let mut query = order::Entity::find().filter(order::Column::Id.eq(order_id));
        if !ctx.is_elevated() {
            let home = ctx.home_warehouse().ok_or_else(|| {
                ServiceError::Forbidden("Actor has no warehouse scope".to_string())
            })?;
            query = query.filter(order::Column::WarehouseId.eq(home));
        }

        query.one(db).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("Order with id '{order_id}' was not found"))
        })
    }

    /// Lists orders newest-first, tenant-scoped the same way.
    #[instrument(skip(self, ctx))]
    pub async fn list_orders(
        &self,
        ctx: &OperationContext,
        warehouse_filter: Option<Uuid>,
    ) -> Result<Vec<order::Model>, ServiceError> {
        let db = &*self.db_pool;
        let mut query = order::Entity::find().order_by_desc(order::Column::CreatedAt);

        if ctx.is_elevated() {
            if let Some(warehouse_id) = warehouse_filter {
                query = query.filter(order::Column::WarehouseId.eq(warehouse_id));
            }
        } else {
            if warehouse_filter.is_some() {
                return Err(ServiceError::Forbidden(
                    "You do not have permission to filter by warehouse id".to_string(),
                ));
            }
            let home = ctx.home_warehouse().ok_or_else(|| {
                ServiceError::Forbidden("Actor has no warehouse scope".to_string())
            })?;
            query = query.filter(order::Column::WarehouseId.eq(home));
        }

        Ok(query.all(db).await?)
    }

    /// Line items of an order, oldest first.
    pub async fn list_order_items(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<order_item::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(db)
            .await?)
    }

    /// Picks an unused tracking id, retrying with fresh randomness a bounded
    /// number of times before giving up with a conflict.
    async fn allocate_tracking_id<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        customer: &str,
    ) -> Result<String, ServiceError> {
        for _ in 0..self.tracking_id_max_attempts {
            let candidate = generate_tracking_candidate(customer);
            let taken = order::Entity::find()
                .filter(order::Column::TrackingId.eq(&candidate))
                .count(conn)
                .await?;
            if taken == 0 {
                return Ok(candidate);
            }
        }
        Err(ServiceError::Conflict(format!(
            "Could not allocate a unique tracking id after {} attempts",
            self.tracking_id_max_attempts
        )))
    }
}

/// Builds one tracking-id candidate: `TM-` + six random digits + the first
/// letter of the customer name uppercased (`X` when empty) + two random
/// uppercase letters.
fn generate_tracking_candidate(customer: &str) -> String {
    let mut rng = rand::thread_rng();
    let number: u32 = rng.gen_range(100_000..=999_999);
    let first_letter = customer
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('X');
    let suffix: String = (0..2)
        .map(|_| rng.gen_range(b'A'..=b'Z') as char)
        .collect();
    format!("TM-{number}{first_letter}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_candidate_uses_customer_initial() {
        let candidate = generate_tracking_candidate("alice");
        assert!(candidate.starts_with("TM-"));
        assert_eq!(candidate.len(), 12);
        assert_eq!(candidate.chars().nth(9), Some('A'));
        assert!(candidate[3..9].chars().all(|c| c.is_ascii_digit()));
        assert!(candidate[10..].chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn tracking_candidate_falls_back_to_x_for_empty_customer() {
        let candidate = generate_tracking_candidate("");
        assert_eq!(candidate.chars().nth(9), Some('X'));
    }

    #[test]
    fn tracking_candidates_vary() {
        let a = generate_tracking_candidate("bob");
        let b = generate_tracking_candidate("bob");
        // Six random digits and two random letters make a collision here
        // vanishingly unlikely.
        assert_ne!(a, b);
    }
}
