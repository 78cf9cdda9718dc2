use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::audit;
use crate::context::OperationContext;
use crate::db::DbPool;
use crate::entities::warehouse;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateWarehouseRequest {
    pub name: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateWarehouseRequest {
    pub name: Option<String>,
    pub location: Option<String>,
}

#[derive(Clone)]
pub struct WarehouseService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl WarehouseService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, ctx, request))]
    pub async fn create_warehouse(
        &self,
        ctx: &OperationContext,
        request: CreateWarehouseRequest,
    ) -> Result<warehouse::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let now = Utc::now();
        let warehouse_model = warehouse::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            location: Set(request.location),
            created_at: Set(now),
            modified_at: Set(now),
        }
        .insert(&txn)
        .await?;

        audit::record_created_best_effort(&txn, ctx, &warehouse_model).await;
        txn.commit().await?;

        info!(warehouse_id = %warehouse_model.id, "Warehouse created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::WarehouseCreated(warehouse_model.id))
                .await
            {
                warn!(error = %e, warehouse_id = %warehouse_model.id, "Failed to send warehouse created event");
            }
        }

        Ok(warehouse_model)
    }

    #[instrument(skip(self, ctx, request), fields(warehouse_id = %warehouse_id))]
    pub async fn update_warehouse(
        &self,
        ctx: &OperationContext,
        warehouse_id: Uuid,
        request: UpdateWarehouseRequest,
    ) -> Result<warehouse::Model, ServiceError> {
        let db = &*self.db_pool;
        let before = self.get_warehouse(warehouse_id).await?;

        let mut active: warehouse::ActiveModel = before.clone().into();
        if let Some(name) = request.name {
            active.name = Set(Some(name));
        }
        if let Some(location) = request.location {
            active.location = Set(Some(location));
        }
        active.modified_at = Set(Utc::now());

        let updated = active.update(db).await?;
        audit::record_updated_best_effort(db, ctx, &before, &updated).await;

        Ok(updated)
    }

    pub async fn get_warehouse(&self, warehouse_id: Uuid) -> Result<warehouse::Model, ServiceError> {
        let db = &*self.db_pool;
        warehouse::Entity::find()
            .filter(warehouse::Column::Id.eq(warehouse_id))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Warehouse with id '{warehouse_id}' was not found"
                ))
            })
    }

    pub async fn list_warehouses(&self) -> Result<Vec<warehouse::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(warehouse::Entity::find()
            .order_by_desc(warehouse::Column::CreatedAt)
            .all(db)
            .await?)
    }
}
