//! Multi-tenant warehouse backend library.
//!
//! Warehouses own employees, products, and orders. Order creation validates
//! stock across products, snapshots buying prices, decrements inventory, and
//! reconciles partial payments against a running remainder, all inside one
//! database transaction with an explicit audit trail.

pub mod access;
pub mod audit;
pub mod config;
pub mod context;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod migrator;
pub mod services;

use std::sync::Arc;

pub use crate::config::AppConfig;
pub use crate::context::{Actor, OperationContext};
pub use crate::db::DbPool;
pub use crate::errors::ServiceError;
pub use crate::events::{Event, EventSender};

use crate::services::{
    categories::CategoryService, employees::EmployeeService, inventory::InventoryService,
    orders::OrderService, payments::PaymentService, products::ProductService,
    reports::ReportService, warehouses::WarehouseService,
};

/// Bundle of all domain services sharing one connection pool and event sender.
#[derive(Clone)]
pub struct AppServices {
    pub warehouses: WarehouseService,
    pub employees: EmployeeService,
    pub categories: CategoryService,
    pub products: ProductService,
    pub inventory: InventoryService,
    pub orders: OrderService,
    pub payments: PaymentService,
    pub reports: ReportService,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        config: &AppConfig,
    ) -> Self {
        Self {
            warehouses: WarehouseService::new(db_pool.clone(), event_sender.clone()),
            employees: EmployeeService::new(db_pool.clone(), event_sender.clone()),
            categories: CategoryService::new(db_pool.clone()),
            products: ProductService::new(db_pool.clone(), event_sender.clone()),
            inventory: InventoryService::new(db_pool.clone(), event_sender.clone()),
            orders: OrderService::new(
                db_pool.clone(),
                event_sender.clone(),
                config.tracking_id_max_attempts,
            ),
            payments: PaymentService::new(
                db_pool.clone(),
                event_sender,
                config.strict_payment_lookup,
            ),
            reports: ReportService::new(db_pool, config.low_stock_threshold),
        }
    }
}
