//! Product catalog operations: tenant-scoped create, patch-style update,
//! and reads. Inventory decrements live in the order engine; this service
//! owns the full-replace/patch mutation path.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::audit;
use crate::context::OperationContext;
use crate::db::DbPool;
use crate::entities::product::{self, MeasurementUnit};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::resolve_warehouse_scope;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateProductRequest {
    /// Required for elevated actors, ignored for everyone else.
    pub warehouse_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255, message = "Product name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub measurement_unit: MeasurementUnit,
    pub quantity: i32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Patch-style update: `None` fields are left untouched.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub measurement_unit: Option<MeasurementUnit>,
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
    pub is_available: Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, ctx, request), fields(name = %request.name))]
    pub async fn create_product(
        &self,
        ctx: &OperationContext,
        request: CreateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;
        if request.quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Product quantity cannot be negative".to_string(),
            ));
        }
        if request.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Unit price cannot be negative".to_string(),
            ));
        }

        let warehouse_id = resolve_warehouse_scope(ctx, request.warehouse_id)?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let now = Utc::now();
        let product_model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(warehouse_id),
            category_id: Set(request.category_id),
            name: Set(request.name.clone()),
            description: Set(request.description.clone()),
            measurement_unit: Set(request.measurement_unit),
            quantity: Set(request.quantity),
            unit_price: Set(request.unit_price.round_dp(2)),
            is_available: Set(true),
            expires_at: Set(request.expires_at),
            created_at: Set(now),
            modified_at: Set(now),
        }
        .insert(&txn)
        .await?;

        audit::record_created_best_effort(&txn, ctx, &product_model).await;
        txn.commit().await?;

        info!(product_id = %product_model.id, warehouse_id = %warehouse_id, "Product created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::ProductCreated(product_model.id))
                .await
            {
                warn!(error = %e, product_id = %product_model.id, "Failed to send product created event");
            }
        }

        Ok(product_model)
    }

    /// Applies a patch to a product and records the before/after delta. The
    /// audit write is best-effort relative to the mutation it describes.
    #[instrument(skip(self, ctx, request), fields(product_id = %product_id))]
    pub async fn update_product(
        &self,
        ctx: &OperationContext,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        if matches!(request.quantity, Some(q) if q < 0) {
            return Err(ServiceError::ValidationError(
                "Product quantity cannot be negative".to_string(),
            ));
        }
        if matches!(request.unit_price, Some(p) if p < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "Unit price cannot be negative".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let before = self.get_product(ctx, product_id).await?;

        let mut active: product::ActiveModel = before.clone().into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(description);
        }
        if let Some(category_id) = request.category_id {
            active.category_id = Set(Some(category_id));
        }
        if let Some(unit) = request.measurement_unit {
            active.measurement_unit = Set(unit);
        }
        if let Some(quantity) = request.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(unit_price) = request.unit_price {
            active.unit_price = Set(unit_price.round_dp(2));
        }
        if let Some(is_available) = request.is_available {
            active.is_available = Set(is_available);
        }
        if let Some(expires_at) = request.expires_at {
            active.expires_at = Set(Some(expires_at));
        }
        active.modified_at = Set(Utc::now());

        let updated = active.update(db).await?;
        audit::record_updated_best_effort(db, ctx, &before, &updated).await;

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::ProductUpdated(updated.id)).await {
                warn!(error = %e, product_id = %updated.id, "Failed to send product updated event");
            }
        }

        Ok(updated)
    }

    /// Tenant-scoped fetch: a missing product and one in another warehouse
    /// look the same to a non-elevated actor.
    #[instrument(skip(self, ctx), fields(product_id = %product_id))]
    pub async fn get_product(
        &self,
        ctx: &OperationContext,
        product_id: Uuid,
    ) -> Result<product::Model, ServiceError> {
        let db = &*self.db_pool;
        let mut query = product::Entity::find().filter(product::Column::Id.eq(product_id));
        if !ctx.is_elevated() {
            let home = ctx.home_warehouse().ok_or_else(|| {
                ServiceError::Forbidden("Actor has no warehouse scope".to_string())
            })?;
            query = query.filter(product::Column::WarehouseId.eq(home));
        }

        query.one(db).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("Product with id '{product_id}' was not found"))
        })
    }

    #[instrument(skip(self, ctx))]
    pub async fn list_products(
        &self,
        ctx: &OperationContext,
        warehouse_filter: Option<Uuid>,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let db = &*self.db_pool;
        let mut query = product::Entity::find().order_by_desc(product::Column::CreatedAt);

        if ctx.is_elevated() {
            if let Some(warehouse_id) = warehouse_filter {
                query = query.filter(product::Column::WarehouseId.eq(warehouse_id));
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
            query = query.filter(product::Column::WarehouseId.eq(home));
        }

        Ok(query.all(db).await?)
    }
}
