mod common;

use assert_matches::assert_matches;
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::TestApp;
use warehouse_api::errors::ServiceError;
use warehouse_api::services::employees::CreateEmployeeRequest;
use warehouse_api::services::orders::{CreateOrderRequest, OrderLine};

#[tokio::test]
async fn dashboard_aggregates_products_employees_and_sales() {
    let app = TestApp::new().await;
    let warehouse = app.seed_warehouse("Main").await;

    // One healthy product, one low-stock (below the default threshold of 5),
    // one out of stock.
    let healthy = app
        .seed_product(warehouse.id, "Healthy", 100, dec!(10.00))
        .await;
    app.seed_product(warehouse.id, "Low", 2, dec!(10.00)).await;
    app.seed_product(warehouse.id, "Gone", 0, dec!(10.00)).await;

    let admin = app.superuser_ctx();
    let employee = app
        .services
        .employees
        .create_employee(
            &admin,
            CreateEmployeeRequest {
                warehouse_id: Some(warehouse.id),
                first_name: Some("Blocked".to_string()),
                last_name: None,
                phone_number: "+254722000001".to_string(),
                id_number: None,
                is_manager: false,
            },
        )
        .await
        .unwrap();
    app.services.employees.block(&admin, employee.id).await.unwrap();
    app.services
        .employees
        .create_employee(
            &admin,
            CreateEmployeeRequest {
                warehouse_id: Some(warehouse.id),
                first_name: Some("Boss".to_string()),
                last_name: None,
                phone_number: "+254722000002".to_string(),
                id_number: None,
                is_manager: true,
            },
        )
        .await
        .unwrap();

    // One completed sale and one pending one, both this month.
    let ctx = app.employee_ctx(warehouse.id);
    app.services
        .orders
        .create_order(
            &ctx,
            CreateOrderRequest {
                warehouse_id: None,
                customer: "Cash Buyer".to_string(),
                customer_phone: None,
                line_items: vec![OrderLine {
                    product_id: healthy.id,
                    quantity: 2,
                }],
                initial_deposit: dec!(20.00),
            },
        )
        .await
        .unwrap();
    app.services
        .orders
        .create_order(
            &ctx,
            CreateOrderRequest {
                warehouse_id: None,
                customer: "Credit Buyer".to_string(),
                customer_phone: None,
                line_items: vec![OrderLine {
                    product_id: healthy.id,
                    quantity: 1,
                }],
                initial_deposit: Decimal::ZERO,
            },
        )
        .await
        .unwrap();

    let dashboard = app.services.reports.dashboard(&admin, None).await.unwrap();

    assert_eq!(dashboard.products.all_products, 3);
    assert_eq!(dashboard.products.low_stock_products, 2);
    assert_eq!(dashboard.products.out_of_stock_products, 1);

    assert_eq!(dashboard.employees.all_employees, 2);
    assert_eq!(dashboard.employees.active_employees, 1);
    assert_eq!(dashboard.employees.inactive_employees, 1);
    assert_eq!(dashboard.employees.number_of_managers, 1);

    assert_eq!(dashboard.annual_sales.len(), 12);
    let this_month = &dashboard.annual_sales[Utc::now().month0() as usize];
    assert_eq!(this_month.number_of_completed_orders, 1);
    assert_eq!(this_month.number_of_pending_orders, 1);
    assert_eq!(this_month.month_total_sales, dec!(20.00));

    // Elevated actors also get the warehouse roster.
    let warehouses = dashboard.warehouses.expect("superuser sees warehouses");
    assert_eq!(warehouses.len(), 1);
    assert_eq!(warehouses[0].id, warehouse.id);
}

#[tokio::test]
async fn dashboard_is_tenant_scoped_for_non_elevated_actors() {
    let app = TestApp::new().await;
    let mine = app.seed_warehouse("Mine").await;
    let other = app.seed_warehouse("Other").await;
    app.seed_product(mine.id, "Mine Product", 10, dec!(1.00))
        .await;
    app.seed_product(other.id, "Other Product", 10, dec!(1.00))
        .await;

    let ctx = app.manager_ctx(mine.id);
    let dashboard = app.services.reports.dashboard(&ctx, None).await.unwrap();

    assert_eq!(dashboard.products.all_products, 1);
    assert!(dashboard.warehouses.is_none());

    // Asking for another warehouse explicitly is refused.
    assert_matches!(
        app.services.reports.dashboard(&ctx, Some(other.id)).await,
        Err(ServiceError::Forbidden(_))
    );
}

#[tokio::test]
async fn superuser_can_narrow_the_dashboard_to_one_warehouse() {
    let app = TestApp::new().await;
    let first = app.seed_warehouse("First").await;
    let second = app.seed_warehouse("Second").await;
    app.seed_product(first.id, "A", 10, dec!(1.00)).await;
    app.seed_product(second.id, "B", 10, dec!(1.00)).await;
    app.seed_product(second.id, "C", 10, dec!(1.00)).await;

    let admin = app.superuser_ctx();
    let all = app.services.reports.dashboard(&admin, None).await.unwrap();
    assert_eq!(all.products.all_products, 3);

    let narrowed = app
        .services
        .reports
        .dashboard(&admin, Some(second.id))
        .await
        .unwrap();
    assert_eq!(narrowed.products.all_products, 2);
}
