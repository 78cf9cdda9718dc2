mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use common::TestApp;
use warehouse_api::audit;
use warehouse_api::context::OperationContext;
use warehouse_api::entities::audit_event::AuditEventType;
use warehouse_api::services::orders::{CreateOrderRequest, OrderLine};
use warehouse_api::services::products::UpdateProductRequest;
use warehouse_api::services::warehouses::CreateWarehouseRequest;

#[tokio::test]
async fn order_creation_audits_order_and_deposit_exactly_once() {
    let app = TestApp::new().await;
    let warehouse = app.seed_warehouse("Audited").await;
    let product = app
        .seed_product(warehouse.id, "Pipe", 100, dec!(10.00))
        .await;

    let ctx = app.employee_ctx(warehouse.id);
    let order = app
        .services
        .orders
        .create_order(
            &ctx,
            CreateOrderRequest {
                warehouse_id: None,
                customer: "Lena Koros".to_string(),
                customer_phone: None,
                line_items: vec![OrderLine {
                    product_id: product.id,
                    quantity: 2,
                }],
                initial_deposit: dec!(5.00),
            },
        )
        .await
        .unwrap();

    let order_events = app.audit_events_for("order").await;
    assert_eq!(order_events.len(), 1);
    let event = &order_events[0];
    assert_eq!(event.event_type, AuditEventType::Create);
    assert_eq!(event.entity_id, order.id.to_string());
    assert_eq!(event.actor_id, ctx.actor_id());
    assert!(event.changed_fields.is_none());
    // The snapshot is the full order state at creation time.
    assert_eq!(
        event.snapshot.get("tracking_id").and_then(Value::as_str),
        Some(order.tracking_id.as_str())
    );

    let payment_events = app.audit_events_for("order_partial_payment").await;
    assert_eq!(payment_events.len(), 1);
    assert_eq!(payment_events[0].event_type, AuditEventType::Create);
}

#[tokio::test]
async fn order_without_deposit_audits_only_the_order() {
    let app = TestApp::new().await;
    let warehouse = app.seed_warehouse("No Deposit").await;
    let product = app
        .seed_product(warehouse.id, "Tile", 100, dec!(4.00))
        .await;

    let ctx = app.employee_ctx(warehouse.id);
    app.services
        .orders
        .create_order(
            &ctx,
            CreateOrderRequest {
                warehouse_id: None,
                customer: "Ivy".to_string(),
                customer_phone: None,
                line_items: vec![OrderLine {
                    product_id: product.id,
                    quantity: 1,
                }],
                initial_deposit: Decimal::ZERO,
            },
        )
        .await
        .unwrap();

    assert_eq!(app.count_audit_events("order").await, 1);
    assert_eq!(app.count_audit_events("order_partial_payment").await, 0);
}

#[tokio::test]
async fn completing_payment_audits_the_payment_but_not_the_status_flip() {
    let app = TestApp::new().await;
    let warehouse = app.seed_warehouse("Flip").await;
    let product = app
        .seed_product(warehouse.id, "Door", 10, dec!(60.00))
        .await;

    let ctx = app.employee_ctx(warehouse.id);
    let order = app
        .services
        .orders
        .create_order(
            &ctx,
            CreateOrderRequest {
                warehouse_id: None,
                customer: "Kip".to_string(),
                customer_phone: None,
                line_items: vec![OrderLine {
                    product_id: product.id,
                    quantity: 1,
                }],
                initial_deposit: Decimal::ZERO,
            },
        )
        .await
        .unwrap();

    app.services
        .payments
        .add_payment(&ctx, order.id, dec!(60.00))
        .await
        .unwrap();

    // One create event for the payment; the order still has only its
    // creation event even though its status changed.
    assert_eq!(app.count_audit_events("order_partial_payment").await, 1);
    let order_events = app.audit_events_for("order").await;
    assert_eq!(order_events.len(), 1);
    assert_eq!(order_events[0].event_type, AuditEventType::Create);
}

#[tokio::test]
async fn actorless_context_yields_a_null_actor_reference() {
    let app = TestApp::new().await;

    app.services
        .warehouses
        .create_warehouse(
            &OperationContext::system(),
            CreateWarehouseRequest {
                name: Some("Unattended".to_string()),
                location: None,
            },
        )
        .await
        .unwrap();

    let events = app.audit_events_for("warehouse").await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].actor_id, None);
}

#[tokio::test]
async fn product_update_records_a_field_delta() {
    let app = TestApp::new().await;
    let warehouse = app.seed_warehouse("Deltas").await;
    let product = app
        .seed_product(warehouse.id, "Hinge", 40, dec!(2.50))
        .await;

    let ctx = app.superuser_ctx();
    app.services
        .products
        .update_product(
            &ctx,
            product.id,
            UpdateProductRequest {
                quantity: Some(35),
                unit_price: Some(dec!(2.75)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let events = app.audit_events_for("product").await;
    // One create from seeding plus one update.
    assert_eq!(events.len(), 2);
    let update = events
        .iter()
        .find(|e| e.event_type == AuditEventType::Update)
        .expect("update event should exist");

    let delta = update
        .changed_fields
        .as_ref()
        .and_then(Value::as_object)
        .expect("update should carry a delta");
    assert!(delta.contains_key("quantity"));
    assert!(delta.contains_key("unit_price"));
    assert!(!delta.contains_key("name"));
    assert_eq!(delta["quantity"]["old"], Value::from(40));
    assert_eq!(delta["quantity"]["new"], Value::from(35));
}

#[tokio::test]
async fn employee_block_and_promotion_record_updates() {
    let app = TestApp::new().await;
    let warehouse = app.seed_warehouse("HR").await;

    let ctx = app.superuser_ctx();
    let employee = app
        .services
        .employees
        .create_employee(
            &ctx,
            warehouse_api::services::employees::CreateEmployeeRequest {
                warehouse_id: Some(warehouse.id),
                first_name: Some("Ada".to_string()),
                last_name: Some("N".to_string()),
                phone_number: "+254711000000".to_string(),
                id_number: None,
                is_manager: false,
            },
        )
        .await
        .unwrap();

    assert!(app.services.employees.block(&ctx, employee.id).await.unwrap());
    // Blocking twice is a no-op and records nothing new.
    assert!(!app.services.employees.block(&ctx, employee.id).await.unwrap());
    assert!(app
        .services
        .employees
        .set_manager(&ctx, employee.id)
        .await
        .unwrap());

    let events = app.audit_events_for("employee").await;
    let updates: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == AuditEventType::Update)
        .collect();
    assert_eq!(updates.len(), 2);

    let role_update = updates
        .iter()
        .find(|e| {
            e.changed_fields
                .as_ref()
                .and_then(Value::as_object)
                .is_some_and(|d| d.contains_key("role"))
        })
        .expect("promotion delta should exist");
    let delta = role_update.changed_fields.as_ref().unwrap();
    assert_eq!(delta["role"]["old"], Value::from("employee"));
    assert_eq!(delta["role"]["new"], Value::from("manager"));
}

#[tokio::test]
async fn bulk_update_records_one_delta_per_pair() {
    let app = TestApp::new().await;
    let warehouse = app.seed_warehouse("Bulk Update").await;
    let first = app
        .seed_product(warehouse.id, "Bolt", 10, dec!(0.50))
        .await;
    let second = app
        .seed_product(warehouse.id, "Nut", 20, dec!(0.25))
        .await;

    let mut first_after = first.clone();
    first_after.quantity = 8;
    let mut second_after = second.clone();
    second_after.unit_price = dec!(0.30);

    let ctx = app.superuser_ctx();
    let events = audit::record_updated_many(
        &*app.db,
        &ctx,
        &[
            (&first as &dyn audit::Auditable, &first_after as &dyn audit::Auditable),
            (&second as &dyn audit::Auditable, &second_after as &dyn audit::Auditable),
        ],
    )
    .await
    .unwrap();

    assert_eq!(events.len(), 2);
    let first_delta = events[0].changed_fields.as_ref().unwrap();
    assert_eq!(first_delta["quantity"]["new"], Value::from(8));
    let second_delta = events[1].changed_fields.as_ref().unwrap();
    assert!(second_delta.get("unit_price").is_some());
}

#[tokio::test]
async fn delete_events_snapshot_the_entity_before_removal() {
    let app = TestApp::new().await;
    let warehouse = app.seed_warehouse("Teardown").await;
    let product = app
        .seed_product(warehouse.id, "Obsolete Part", 3, dec!(1.00))
        .await;

    let ctx = app.superuser_ctx();
    let event = audit::record_deleted(&*app.db, &ctx, &product).await.unwrap();

    assert_eq!(event.event_type, AuditEventType::Delete);
    assert_eq!(event.entity_id, product.id.to_string());
    assert_eq!(
        event.snapshot.get("name").and_then(Value::as_str),
        Some("Obsolete Part")
    );
    assert!(event.changed_fields.is_none());
}

#[tokio::test]
async fn bulk_delete_covers_every_entity_in_one_call() {
    let app = TestApp::new().await;
    let warehouse = app.seed_warehouse("Bulk").await;
    let first = app
        .seed_product(warehouse.id, "First", 1, dec!(1.00))
        .await;
    let second = app
        .seed_product(warehouse.id, "Second", 1, dec!(1.00))
        .await;

    let ctx = app.superuser_ctx();
    let events = audit::record_deleted_many(
        &*app.db,
        &ctx,
        &[&first as &dyn audit::Auditable, &second],
    )
    .await
    .unwrap();

    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.event_type == AuditEventType::Delete));
}
