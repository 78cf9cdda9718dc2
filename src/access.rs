//! Role-scoped access guard.
//!
//! Answers "may this actor perform this operation in this tenant scope".
//! Consumed by service callers before they invoke the engines; the engines
//! themselves only re-derive the tenant scope, never the permission.

use uuid::Uuid;

use crate::context::OperationContext;
use crate::entities::employee::Role;
use crate::errors::ServiceError;

/// Operations the guard distinguishes between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ManageWarehouses,
    ViewWarehouse,
    ManageEmployees,
    ManageProducts,
    ViewProducts,
    CreateOrder,
    ViewOrders,
    RecordPayment,
    ViewAuditLog,
    ViewDashboard,
}

/// Checks whether the context's actor may perform `action`, optionally
/// against a specific warehouse. Superusers pass everything; managers act
/// within their own warehouse; employees read there and may create orders
/// and record payments.
pub fn authorize(
    ctx: &OperationContext,
    action: Action,
    warehouse_id: Option<Uuid>,
) -> Result<(), ServiceError> {
    let Some(actor) = ctx.actor.as_ref() else {
        return Err(ServiceError::Forbidden(
            "No authenticated actor in context".to_string(),
        ));
    };

    if actor.role == Role::Superuser {
        return Ok(());
    }

    let in_own_warehouse = match warehouse_id {
        Some(target) => actor.warehouse_id == Some(target),
        // No explicit target means "the actor's own scope".
        None => actor.warehouse_id.is_some(),
    };

    let allowed = match (actor.role, action) {
        (Role::Manager, Action::ViewWarehouse)
        | (Role::Manager, Action::ManageEmployees)
        | (Role::Manager, Action::ManageProducts)
        | (Role::Manager, Action::ViewAuditLog)
        | (Role::Manager, Action::ViewDashboard) => in_own_warehouse,
        (Role::Manager, Action::ViewProducts)
        | (Role::Manager, Action::CreateOrder)
        | (Role::Manager, Action::ViewOrders)
        | (Role::Manager, Action::RecordPayment) => in_own_warehouse,
        (Role::Employee, Action::ViewProducts)
        | (Role::Employee, Action::CreateOrder)
        | (Role::Employee, Action::ViewOrders)
        | (Role::Employee, Action::RecordPayment) => in_own_warehouse,
        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "Role {:?} may not perform {:?} in this scope",
            actor.role, action
        )))
    }
}
