use uuid::Uuid;

use crate::entities::employee::Role;

/// Identity of whoever is driving the current operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    /// The warehouse a non-elevated actor is confined to. `None` for
    /// superusers, who address warehouses explicitly per request.
    pub warehouse_id: Option<Uuid>,
}

impl Actor {
    pub fn superuser(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Superuser,
            warehouse_id: None,
        }
    }

    pub fn manager(id: Uuid, warehouse_id: Uuid) -> Self {
        Self {
            id,
            role: Role::Manager,
            warehouse_id: Some(warehouse_id),
        }
    }

    pub fn employee(id: Uuid, warehouse_id: Uuid) -> Self {
        Self {
            id,
            role: Role::Employee,
            warehouse_id: Some(warehouse_id),
        }
    }

    pub fn is_elevated(&self) -> bool {
        self.role == Role::Superuser
    }
}

/// Explicit per-operation context, passed as an argument to every service
/// call. Nothing here lives in thread-local or global state; dropping the
/// value is the whole teardown story.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    pub actor: Option<Actor>,
}

impl OperationContext {
    pub fn for_actor(actor: Actor) -> Self {
        Self { actor: Some(actor) }
    }

    /// Context with no authenticated actor, e.g. provisioning jobs. Audit
    /// records written under it carry a null actor reference.
    pub fn system() -> Self {
        Self { actor: None }
    }

    pub fn actor_id(&self) -> Option<Uuid> {
        self.actor.as_ref().map(|a| a.id)
    }

    pub fn is_elevated(&self) -> bool {
        self.actor.as_ref().is_some_and(Actor::is_elevated)
    }

    pub fn home_warehouse(&self) -> Option<Uuid> {
        self.actor.as_ref().and_then(|a| a.warehouse_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_context_has_no_actor() {
        let ctx = OperationContext::system();
        assert_eq!(ctx.actor_id(), None);
        assert!(!ctx.is_elevated());
        assert_eq!(ctx.home_warehouse(), None);
    }

    #[test]
    fn superuser_is_elevated_and_unscoped() {
        let ctx = OperationContext::for_actor(Actor::superuser(Uuid::new_v4()));
        assert!(ctx.is_elevated());
        assert_eq!(ctx.home_warehouse(), None);
    }

    #[test]
    fn employee_is_scoped_to_home_warehouse() {
        let wh = Uuid::new_v4();
        let ctx = OperationContext::for_actor(Actor::employee(Uuid::new_v4(), wh));
        assert!(!ctx.is_elevated());
        assert_eq!(ctx.home_warehouse(), Some(wh));
    }
}
