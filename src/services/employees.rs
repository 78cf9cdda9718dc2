//! Employee administration: tenant-scoped creation, profile updates, and
//! the block/unblock and promote/demote state machines.

use chrono::Utc;
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
use crate::entities::employee::{self, Role};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::resolve_warehouse_scope;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateEmployeeRequest {
    /// Required for elevated actors, ignored for everyone else.
    pub warehouse_id: Option<Uuid>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone_number: String,
    pub id_number: Option<String>,
    /// Honored only for elevated actors; managers always create plain
    /// employees.
    #[serde(default)]
    pub is_manager: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateEmployeeRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub id_number: Option<String>,
}

#[derive(Clone)]
pub struct EmployeeService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl EmployeeService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, ctx, request))]
    pub async fn create_employee(
        &self,
        ctx: &OperationContext,
        request: CreateEmployeeRequest,
    ) -> Result<employee::Model, ServiceError> {
        request.validate()?;

        let warehouse_id = resolve_warehouse_scope(ctx, request.warehouse_id)?;
        let is_manager = if ctx.is_elevated() {
            request.is_manager
        } else {
            false
        };
        let role = if is_manager {
            Role::Manager
        } else {
            Role::Employee
        };

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let now = Utc::now();
        let employee_model = employee::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(warehouse_id),
            first_name: Set(request.first_name.clone()),
            last_name: Set(request.last_name.clone()),
            phone_number: Set(request.phone_number.clone()),
            id_number: Set(request.id_number.clone()),
            role: Set(role),
            is_manager: Set(is_manager),
            is_active: Set(true),
            created_at: Set(now),
            modified_at: Set(now),
        }
        .insert(&txn)
        .await?;

        audit::record_created_best_effort(&txn, ctx, &employee_model).await;
        txn.commit().await?;

        info!(
            employee_id = %employee_model.id,
            warehouse_id = %warehouse_id,
            is_manager,
            "Employee created"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::EmployeeCreated(employee_model.id))
                .await
            {
                warn!(error = %e, employee_id = %employee_model.id, "Failed to send employee created event");
            }
        }

        Ok(employee_model)
    }

    #[instrument(skip(self, ctx, request), fields(employee_id = %employee_id))]
    pub async fn update_employee(
        &self,
        ctx: &OperationContext,
        employee_id: Uuid,
        request: UpdateEmployeeRequest,
    ) -> Result<employee::Model, ServiceError> {
        let db = &*self.db_pool;
        let before = self.get_employee(employee_id).await?;

        let mut active: employee::ActiveModel = before.clone().into();
        if let Some(first_name) = request.first_name {
            active.first_name = Set(Some(first_name));
        }
        if let Some(last_name) = request.last_name {
            active.last_name = Set(Some(last_name));
        }
        if let Some(phone_number) = request.phone_number {
            active.phone_number = Set(phone_number);
        }
        if let Some(id_number) = request.id_number {
            active.id_number = Set(Some(id_number));
        }
        active.modified_at = Set(Utc::now());

        let updated = active.update(db).await?;
        audit::record_updated_best_effort(db, ctx, &before, &updated).await;

        Ok(updated)
    }

    /// Blocks the employee from the platform. Returns false when already
    /// blocked, leaving the record untouched.
    #[instrument(skip(self, ctx), fields(employee_id = %employee_id))]
    pub async fn block(
        &self,
        ctx: &OperationContext,
        employee_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let changed = self.set_active(ctx, employee_id, false).await?;
        if changed {
            self.send_event(Event::EmployeeBlocked(employee_id)).await;
        }
        Ok(changed)
    }

    /// Restores a blocked employee's access. Returns false when not blocked.
    #[instrument(skip(self, ctx), fields(employee_id = %employee_id))]
    pub async fn unblock(
        &self,
        ctx: &OperationContext,
        employee_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let changed = self.set_active(ctx, employee_id, true).await?;
        if changed {
            self.send_event(Event::EmployeeUnblocked(employee_id)).await;
        }
        Ok(changed)
    }

    /// Promotes to manager. Returns false when the employee already holds
    /// the role and flag.
    #[instrument(skip(self, ctx), fields(employee_id = %employee_id))]
    pub async fn set_manager(
        &self,
        ctx: &OperationContext,
        employee_id: Uuid,
    ) -> Result<bool, ServiceError> {
        self.set_role(ctx, employee_id, Role::Manager, true).await
    }

    /// Demotes to plain employee. Returns false when already demoted.
    #[instrument(skip(self, ctx), fields(employee_id = %employee_id))]
    pub async fn set_employee(
        &self,
        ctx: &OperationContext,
        employee_id: Uuid,
    ) -> Result<bool, ServiceError> {
        self.set_role(ctx, employee_id, Role::Employee, false).await
    }

    pub async fn get_employee(&self, employee_id: Uuid) -> Result<employee::Model, ServiceError> {
        let db = &*self.db_pool;
        employee::Entity::find()
            .filter(employee::Column::Id.eq(employee_id))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Employee with id '{employee_id}' was not found"
                ))
            })
    }

    #[instrument(skip(self, ctx))]
    pub async fn list_employees(
        &self,
        ctx: &OperationContext,
    ) -> Result<Vec<employee::Model>, ServiceError> {
        let db = &*self.db_pool;
        let mut query = employee::Entity::find().order_by_desc(employee::Column::CreatedAt);
        if !ctx.is_elevated() {
            let home = ctx.home_warehouse().ok_or_else(|| {
                ServiceError::Forbidden("Actor has no warehouse scope".to_string())
            })?;
            query = query.filter(employee::Column::WarehouseId.eq(home));
        }
        Ok(query.all(db).await?)
    }

    async fn set_active(
        &self,
        ctx: &OperationContext,
        employee_id: Uuid,
        active: bool,
    ) -> Result<bool, ServiceError> {
        let db = &*self.db_pool;
        let before = self.get_employee(employee_id).await?;
        if before.is_active == active {
            return Ok(false);
        }

        let mut active_model: employee::ActiveModel = before.clone().into();
        active_model.is_active = Set(active);
        active_model.modified_at = Set(Utc::now());
        let updated = active_model.update(db).await?;

        audit::record_updated_best_effort(db, ctx, &before, &updated).await;
        Ok(true)
    }

    async fn set_role(
        &self,
        ctx: &OperationContext,
        employee_id: Uuid,
        role: Role,
        is_manager: bool,
    ) -> Result<bool, ServiceError> {
        let db = &*self.db_pool;
        let before = self.get_employee(employee_id).await?;
        if before.role == role && before.is_manager == is_manager {
            return Ok(false);
        }

        let mut active_model: employee::ActiveModel = before.clone().into();
        active_model.role = Set(role);
        active_model.is_manager = Set(is_manager);
        active_model.modified_at = Set(Utc::now());
        let updated = active_model.update(db).await?;

        audit::record_updated_best_effort(db, ctx, &before, &updated).await;
        Ok(true)
    }

    async fn send_event(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send employee event");
            }
        }
    }
}
