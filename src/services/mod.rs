pub mod categories;
pub mod employees;
pub mod inventory;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reports;
pub mod warehouses;

use uuid::Uuid;

use crate::context::OperationContext;
use crate::errors::ServiceError;

/// Resolves the warehouse a mutating request targets. Elevated actors must
/// name one explicitly; everyone else is pinned to their home warehouse and
/// any explicit id in the request is ignored.
pub(crate) fn resolve_warehouse_scope(
    ctx: &OperationContext,
    explicit: Option<Uuid>,
) -> Result<Uuid, ServiceError> {
    if ctx.is_elevated() {
        explicit.ok_or_else(|| {
            ServiceError::ValidationError(
                "Admin must pass a warehouse id for this operation".to_string(),
            )
        })
    } else {
        ctx.home_warehouse().ok_or_else(|| {
            ServiceError::Forbidden("Actor has no warehouse scope".to_string())
        })
    }
}
