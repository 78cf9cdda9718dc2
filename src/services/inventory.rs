//! Inventory ledger.
//!
//! Stock decrements happen exclusively through a conditional update
//! (`quantity = quantity - n WHERE quantity >= n`) so a row can never be
//! driven negative, even when two orders race past the same validation read.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::product;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Applies the order's decrements inside the caller's transaction. Each line
/// is a conditional update checked via `rows_affected`; a miss means the
/// stock moved underneath the order, and the whole transaction must roll
/// back.
pub async fn decrement_stock<C: ConnectionTrait>(
    conn: &C,
    lines: &[(Uuid, i32)],
) -> Result<(), ServiceError> {
    let now = Utc::now();
    for (product_id, quantity) in lines {
        let result = product::Entity::update_many()
            .col_expr(
                product::Column::Quantity,
                Expr::col(product::Column::Quantity).sub(*quantity),
            )
            .col_expr(product::Column::ModifiedAt, Expr::value(now))
            .filter(product::Column::Id.eq(*product_id))
            .filter(product::Column::Quantity.gte(*quantity))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::InsufficientStock(format!(
                "Insufficient stock for product {product_id}: quantity changed while the order was being placed"
            )));
        }
    }
    Ok(())
}

/// Service wrapper for standalone stock operations outside the order engine.
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Adds `quantity` units back to a product's stock.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn restock(&self, product_id: Uuid, quantity: i32) -> Result<(), ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Restock quantity must be positive".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let result = product::Entity::update_many()
            .col_expr(
                product::Column::Quantity,
                Expr::col(product::Column::Quantity).add(quantity),
            )
            .col_expr(product::Column::ModifiedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.eq(product_id))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product with id '{product_id}' was not found"
            )));
        }

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::InventoryRestocked {
                    product_id,
                    quantity,
                })
                .await
            {
                warn!(error = %e, product_id = %product_id, "Failed to send restock event");
            }
        }

        Ok(())
    }

    /// Whether the product currently holds at least `quantity` units.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn is_in_stock(
        &self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<bool, ServiceError> {
        let db = &*self.db_pool;
        let found = product::Entity::find()
            .filter(product::Column::Id.eq(product_id))
            .filter(product::Column::Quantity.gte(quantity))
            .one(db)
            .await?;
        Ok(found.is_some())
    }
}
