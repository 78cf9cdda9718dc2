//! Payment reconciliation.
//!
//! Additional payments land against a pending order's remainder; the payment
//! set is recomputed on every call, and the order flips to completed on the
//! payment that zeroes the remainder exactly.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::audit;
use crate::context::OperationContext;
use crate::db::DbPool;
use crate::entities::order::{self, OrderStatus};
use crate::entities::order_partial_payment;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Service for recording partial payments against pending orders.
#[derive(Clone)]
pub struct PaymentService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    /// When false, a closed order is indistinguishable from a missing one;
    /// when true, it surfaces a distinct invalid-operation error.
    strict_lookup: bool,
}

impl PaymentService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        strict_lookup: bool,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            strict_lookup,
        }
    }

    /// Records a payment against a pending order, flipping it to completed
    /// when the remainder reaches exactly zero. Rejected payments leave no
    /// trace.
    #[instrument(skip(self, ctx), fields(order_id = %order_id, amount = %amount))]
    pub async fn add_payment(
        &self,
        ctx: &OperationContext,
        order_id: Uuid,
        amount: Decimal,
    ) -> Result<order_partial_payment::Model, ServiceError> {
        if amount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Payment amount cannot be negative".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let order = order::Entity::find()
            .filter(order::Column::Id.eq(order_id))
            .one(&txn)
            .await?;

        let order = match order {
            None => {
                return Err(ServiceError::NotFound(format!(
                    "Order with id '{order_id}' was not found"
                )))
            }
            Some(order) if order.status != OrderStatus::Pending => {
                return Err(if self.strict_lookup {
                    ServiceError::InvalidOperation(format!(
                        "Order '{order_id}' is {} and can no longer accept payments",
                        order.status
                    ))
                } else {
                    ServiceError::NotFound(format!("Order with id '{order_id}' was not found"))
                });
            }
            Some(order) => order,
        };

        let paid = amount_paid(&txn, order_id).await?;
        let mut remainder = order.total_price - paid;
        if amount > remainder {
            return Err(ServiceError::PaymentError(
                "The amount entered is more than the amount left to pay for this order"
                    .to_string(),
            ));
        }

        let payment = order_partial_payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            amount: Set(amount),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        remainder -= amount;
        let completed = remainder == Decimal::ZERO;
        if completed {
            let mut order_active: order::ActiveModel = order.clone().into();
            order_active.status = Set(OrderStatus::Completed);
            order_active.modified_at = Set(Utc::now());
            order_active.update(&txn).await?;
        }

        // The payment gets an audit record; the status flip itself does not.
        audit::record_created(&txn, ctx, &payment).await?;

        txn.commit().await?;

        info!(
            order_id = %order.id,
            payment_id = %payment.id,
            remainder = %remainder,
            completed,
            "Payment recorded"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::PaymentRecorded {
                    order_id: order.id,
                    payment_id: payment.id,
                    amount,
                })
                .await
            {
                warn!(error = %e, order_id = %order.id, "Failed to send payment recorded event");
            }
            if completed {
                if let Err(e) = event_sender.send(Event::OrderCompleted(order.id)).await {
                    warn!(error = %e, order_id = %order.id, "Failed to send order completed event");
                }
            }
        }

        Ok(payment)
    }

    /// Payments recorded against an order, newest first.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn list_payments(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<order_partial_payment::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(order_partial_payment::Entity::find()
            .filter(order_partial_payment::Column::OrderId.eq(order_id))
            .order_by_desc(order_partial_payment::Column::CreatedAt)
            .all(db)
            .await?)
    }

    /// Amount still owed on an order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn remainder(&self, order_id: Uuid) -> Result<Decimal, ServiceError> {
        let db = &*self.db_pool;
        let order = order::Entity::find()
            .filter(order::Column::Id.eq(order_id))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order with id '{order_id}' was not found"))
            })?;

        let paid = amount_paid(db, order_id).await?;
        Ok(order.total_price - paid)
    }
}

/// Sums the payment set for an order; the rows are the source of truth, no
/// running total is stored anywhere.
async fn amount_paid<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Decimal, ServiceError> {
    let payments = order_partial_payment::Entity::find()
        .filter(order_partial_payment::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;
    Ok(payments.iter().map(|p| p.amount).sum())
}
