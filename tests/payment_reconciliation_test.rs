mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use common::TestApp;
use warehouse_api::entities::order::OrderStatus;
use warehouse_api::errors::ServiceError;
use warehouse_api::services::orders::{CreateOrderRequest, OrderLine};
use warehouse_api::AppConfig;

/// Seeds a pending order with the given total and deposit; the product is
/// priced so one unit costs the whole total.
async fn seed_pending_order(
    app: &TestApp,
    total: Decimal,
    deposit: Decimal,
) -> (warehouse_api::entities::order::Model, warehouse_api::context::OperationContext) {
    let warehouse = app.seed_warehouse("Payments").await;
    let product = app.seed_product(warehouse.id, "Bulk Lot", 100, total).await;

    let ctx = app.employee_ctx(warehouse.id);
    let order = app
        .services
        .orders
        .create_order(
            &ctx,
            CreateOrderRequest {
                warehouse_id: None,
                customer: "Omar Said".to_string(),
                customer_phone: None,
                line_items: vec![OrderLine {
                    product_id: product.id,
                    quantity: 1,
                }],
                initial_deposit: deposit,
            },
        )
        .await
        .unwrap();
    (order, ctx)
}

#[tokio::test]
async fn partial_payment_reduces_the_remainder() {
    let app = TestApp::new().await;
    let (order, ctx) = seed_pending_order(&app, dec!(100.00), Decimal::ZERO).await;

    app.services
        .payments
        .add_payment(&ctx, order.id, dec!(40.00))
        .await
        .unwrap();

    assert_eq!(
        app.services.payments.remainder(order.id).await.unwrap(),
        dec!(60.00)
    );
    let reloaded = app.services.orders.get_order(&ctx, order.id).await.unwrap();
    assert_eq!(reloaded.status, OrderStatus::Pending);
}

#[tokio::test]
async fn overpayment_is_rejected_and_leaves_state_unchanged() {
    let app = TestApp::new().await;
    let (order, ctx) = seed_pending_order(&app, dec!(100.00), dec!(70.00)).await;

    let err = app
        .services
        .payments
        .add_payment(&ctx, order.id, dec!(30.01))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::PaymentError(_));

    // Only the initial deposit is on record and the order is still pending.
    let payments = app.services.payments.list_payments(order.id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(
        app.services.payments.remainder(order.id).await.unwrap(),
        dec!(30.00)
    );
    let reloaded = app.services.orders.get_order(&ctx, order.id).await.unwrap();
    assert_eq!(reloaded.status, OrderStatus::Pending);
}

#[tokio::test]
async fn exact_final_payment_completes_the_order_once() {
    let app = TestApp::new().await;
    let (order, ctx) = seed_pending_order(&app, dec!(5000.00), dec!(2500.00)).await;

    app.services
        .payments
        .add_payment(&ctx, order.id, dec!(2500.00))
        .await
        .unwrap();

    let reloaded = app.services.orders.get_order(&ctx, order.id).await.unwrap();
    assert_eq!(reloaded.status, OrderStatus::Completed);
    assert_eq!(
        app.services.payments.remainder(order.id).await.unwrap(),
        Decimal::ZERO
    );

    // A completed order no longer accepts payments; by default that reads
    // as "not found", exactly like a missing id.
    let err = app
        .services
        .payments
        .add_payment(&ctx, order.id, dec!(0.01))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn strict_lookup_distinguishes_closed_orders_from_missing_ones() {
    let mut config = AppConfig::for_database("sqlite::memory:");
    config.strict_payment_lookup = true;
    let app = TestApp::with_config(config).await;

    let (order, ctx) = seed_pending_order(&app, dec!(50.00), dec!(50.00)).await;

    let err = app
        .services
        .payments
        .add_payment(&ctx, order.id, dec!(1.00))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));

    // A genuinely missing id still reads as not found.
    let err = app
        .services
        .payments
        .add_payment(&ctx, Uuid::new_v4(), dec!(1.00))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn missing_order_reads_as_not_found() {
    let app = TestApp::new().await;
    let ctx = app.superuser_ctx();

    let err = app
        .services
        .payments
        .add_payment(&ctx, Uuid::new_v4(), dec!(10.00))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn negative_amounts_are_rejected() {
    let app = TestApp::new().await;
    let (order, ctx) = seed_pending_order(&app, dec!(10.00), Decimal::ZERO).await;

    let err = app
        .services
        .payments
        .add_payment(&ctx, order.id, dec!(-5.00))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn payment_sum_never_exceeds_total_over_any_sequence() {
    let app = TestApp::new().await;
    let (order, ctx) = seed_pending_order(&app, dec!(100.00), Decimal::ZERO).await;

    for amount in [dec!(30.00), dec!(30.00), dec!(30.00)] {
        app.services
            .payments
            .add_payment(&ctx, order.id, amount)
            .await
            .unwrap();
    }

    // 90 paid; 10.01 would break the invariant and is refused.
    let err = app
        .services
        .payments
        .add_payment(&ctx, order.id, dec!(10.01))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::PaymentError(_));
    assert_eq!(
        app.services.payments.remainder(order.id).await.unwrap(),
        dec!(10.00)
    );

    // The exact remainder lands and completes the order.
    app.services
        .payments
        .add_payment(&ctx, order.id, dec!(10.00))
        .await
        .unwrap();
    let reloaded = app.services.orders.get_order(&ctx, order.id).await.unwrap();
    assert_eq!(reloaded.status, OrderStatus::Completed);

    let payments = app.services.payments.list_payments(order.id).await.unwrap();
    let paid: Decimal = payments.iter().map(|p| p.amount).sum();
    assert_eq!(paid, dec!(100.00));
}

#[tokio::test]
async fn zero_amount_payment_is_recorded_without_completing() {
    let app = TestApp::new().await;
    let (order, ctx) = seed_pending_order(&app, dec!(25.00), Decimal::ZERO).await;

    app.services
        .payments
        .add_payment(&ctx, order.id, Decimal::ZERO)
        .await
        .unwrap();

    let payments = app.services.payments.list_payments(order.id).await.unwrap();
    assert_eq!(payments.len(), 1);
    let reloaded = app.services.orders.get_order(&ctx, order.id).await.unwrap();
    assert_eq!(reloaded.status, OrderStatus::Pending);
}
