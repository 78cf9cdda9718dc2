//! Audit recorder.
//!
//! Every entity-mutating operation records an immutable audit event with a
//! full JSON snapshot, and for updates a field-level delta. Emission is
//! always an explicit call composed into the caller's transaction; nothing
//! fires implicitly from a save.

use chrono::Utc;
use sea_orm::{ConnectionTrait, EntityTrait, IntoActiveModel};
use serde_json::{json, Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::context::OperationContext;
use crate::entities::audit_event::{self, AuditEventType};
use crate::entities::{category, employee, order, order_partial_payment, product, warehouse};
use crate::errors::ServiceError;

/// Anything the recorder can snapshot. Object-safe so one bulk call can mix
/// entity types (an order and its initial payment, say).
pub trait Auditable {
    fn entity_type(&self) -> &'static str;
    fn entity_id(&self) -> String;
    fn object_repr(&self) -> String;
    fn snapshot(&self) -> Value;
}

impl Auditable for warehouse::Model {
    fn entity_type(&self) -> &'static str {
        "warehouse"
    }
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
    fn object_repr(&self) -> String {
        self.display_name()
    }
    fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Auditable for employee::Model {
    fn entity_type(&self) -> &'static str {
        "employee"
    }
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
    fn object_repr(&self) -> String {
        format!("{} - {}", self.full_name(), self.role)
    }
    fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Auditable for category::Model {
    fn entity_type(&self) -> &'static str {
        "category"
    }
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
    fn object_repr(&self) -> String {
        self.name.clone()
    }
    fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Auditable for product::Model {
    fn entity_type(&self) -> &'static str {
        "product"
    }
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
    fn object_repr(&self) -> String {
        format!(
            "{} - {} (measured in {})",
            self.quantity, self.name, self.measurement_unit
        )
    }
    fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Auditable for order::Model {
    fn entity_type(&self) -> &'static str {
        "order"
    }
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
    fn object_repr(&self) -> String {
        format!("{} - {}", self.tracking_id, self.customer)
    }
    fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Auditable for order_partial_payment::Model {
    fn entity_type(&self) -> &'static str {
        "order_partial_payment"
    }
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
    fn object_repr(&self) -> String {
        format!("{} for order {}", self.amount, self.order_id)
    }
    fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn build_event(
    ctx: &OperationContext,
    event_type: AuditEventType,
    obj: &dyn Auditable,
    changed_fields: Option<Value>,
) -> audit_event::Model {
    audit_event::Model {
        id: Uuid::new_v4(),
        actor_id: ctx.actor_id(),
        event_type,
        entity_type: obj.entity_type().to_string(),
        entity_id: obj.entity_id(),
        object_repr: obj.object_repr(),
        snapshot: obj.snapshot(),
        changed_fields,
        created_at: Utc::now(),
    }
}

async fn insert_events<C: ConnectionTrait>(
    conn: &C,
    events: Vec<audit_event::Model>,
) -> Result<Vec<audit_event::Model>, ServiceError> {
    if events.is_empty() {
        return Ok(events);
    }
    let active_models: Vec<audit_event::ActiveModel> = events
        .iter()
        .cloned()
        .map(IntoActiveModel::into_active_model)
        .collect();
    audit_event::Entity::insert_many(active_models)
        .exec(conn)
        .await?;
    Ok(events)
}

/// Records one "create" event.
pub async fn record_created<C: ConnectionTrait>(
    conn: &C,
    ctx: &OperationContext,
    obj: &dyn Auditable,
) -> Result<audit_event::Model, ServiceError> {
    let event = build_event(ctx, AuditEventType::Create, obj, None);
    insert_events(conn, vec![event.clone()]).await?;
    Ok(event)
}

/// Records "create" events for a batch of mixed entities in one insert.
pub async fn record_created_many<C: ConnectionTrait>(
    conn: &C,
    ctx: &OperationContext,
    objects: &[&dyn Auditable],
) -> Result<Vec<audit_event::Model>, ServiceError> {
    let events = objects
        .iter()
        .map(|obj| build_event(ctx, AuditEventType::Create, *obj, None))
        .collect();
    insert_events(conn, events).await
}

/// Records one "update" event with a field-level delta between the entity as
/// it stood before and after the mutation.
pub async fn record_updated<C: ConnectionTrait>(
    conn: &C,
    ctx: &OperationContext,
    before: &dyn Auditable,
    after: &dyn Auditable,
) -> Result<audit_event::Model, ServiceError> {
    let delta = field_delta(&before.snapshot(), &after.snapshot());
    let event = build_event(ctx, AuditEventType::Update, after, Some(Value::Object(delta)));
    insert_events(conn, vec![event.clone()]).await?;
    Ok(event)
}

/// Records "update" events for a batch of (before, after) pairs.
pub async fn record_updated_many<C: ConnectionTrait>(
    conn: &C,
    ctx: &OperationContext,
    pairs: &[(&dyn Auditable, &dyn Auditable)],
) -> Result<Vec<audit_event::Model>, ServiceError> {
    let events = pairs
        .iter()
        .map(|(before, after)| {
            let delta = field_delta(&before.snapshot(), &after.snapshot());
            build_event(ctx, AuditEventType::Update, *after, Some(Value::Object(delta)))
        })
        .collect();
    insert_events(conn, events).await
}

/// Records one "delete" event snapshotting the entity as it existed just
/// before deletion.
pub async fn record_deleted<C: ConnectionTrait>(
    conn: &C,
    ctx: &OperationContext,
    obj: &dyn Auditable,
) -> Result<audit_event::Model, ServiceError> {
    let event = build_event(ctx, AuditEventType::Delete, obj, None);
    insert_events(conn, vec![event.clone()]).await?;
    Ok(event)
}

/// Records "delete" events for a batch of entities in one insert.
pub async fn record_deleted_many<C: ConnectionTrait>(
    conn: &C,
    ctx: &OperationContext,
    objects: &[&dyn Auditable],
) -> Result<Vec<audit_event::Model>, ServiceError> {
    let events = objects
        .iter()
        .map(|obj| build_event(ctx, AuditEventType::Delete, *obj, None))
        .collect();
    insert_events(conn, events).await
}

/// Best-effort variant for paths where the audit trail must not abort the
/// primary mutation: failures are logged and swallowed.
pub async fn record_created_best_effort<C: ConnectionTrait>(
    conn: &C,
    ctx: &OperationContext,
    obj: &dyn Auditable,
) {
    if let Err(e) = record_created(conn, ctx, obj).await {
        warn!(
            entity_type = obj.entity_type(),
            entity_id = %obj.entity_id(),
            error = %e,
            "Failed to record audit event"
        );
    }
}

/// Best-effort variant of [`record_updated`].
pub async fn record_updated_best_effort<C: ConnectionTrait>(
    conn: &C,
    ctx: &OperationContext,
    before: &dyn Auditable,
    after: &dyn Auditable,
) {
    if let Err(e) = record_updated(conn, ctx, before, after).await {
        warn!(
            entity_type = after.entity_type(),
            entity_id = %after.entity_id(),
            error = %e,
            "Failed to record audit event"
        );
    }
}

/// Computes `{field: {old, new}}` for every field whose value differs
/// between two JSON snapshots. Fields present on only one side count as
/// changed, with `null` standing in for the missing value.
pub fn field_delta(before: &Value, after: &Value) -> Map<String, Value> {
    let empty = Map::new();
    let before_map = before.as_object().unwrap_or(&empty);
    let after_map = after.as_object().unwrap_or(&empty);

    let mut delta = Map::new();
    for (key, old_value) in before_map {
        let new_value = after_map.get(key).unwrap_or(&Value::Null);
        if old_value != new_value {
            delta.insert(
                key.clone(),
                json!({ "old": old_value, "new": new_value }),
            );
        }
    }
    for (key, new_value) in after_map {
        if !before_map.contains_key(key) && *new_value != Value::Null {
            delta.insert(key.clone(), json!({ "old": Value::Null, "new": new_value }));
        }
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_captures_only_changed_fields() {
        let before = json!({ "name": "Bolt", "quantity": 10, "unit_price": "3.50" });
        let after = json!({ "name": "Bolt", "quantity": 7, "unit_price": "3.75" });

        let delta = field_delta(&before, &after);
        assert_eq!(delta.len(), 2);
        assert_eq!(delta["quantity"], json!({ "old": 10, "new": 7 }));
        assert_eq!(delta["unit_price"], json!({ "old": "3.50", "new": "3.75" }));
        assert!(!delta.contains_key("name"));
    }

    #[test]
    fn delta_flags_added_and_removed_fields() {
        let before = json!({ "a": 1, "b": 2 });
        let after = json!({ "b": 2, "c": 3 });

        let delta = field_delta(&before, &after);
        assert_eq!(delta["a"], json!({ "old": 1, "new": null }));
        assert_eq!(delta["c"], json!({ "old": null, "new": 3 }));
        assert!(!delta.contains_key("b"));
    }

    #[test]
    fn delta_of_identical_snapshots_is_empty() {
        let snap = json!({ "x": 1 });
        assert!(field_delta(&snap, &snap).is_empty());
    }
}
