//! Test harness: in-memory SQLite, migrated schema, and the full service
//! bundle, plus seed helpers shared by the integration suites.

#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use warehouse_api::context::{Actor, OperationContext};
use warehouse_api::db::{self, DbPool};
use warehouse_api::entities::product::MeasurementUnit;
use warehouse_api::entities::{audit_event, product, warehouse};
use warehouse_api::services::products::CreateProductRequest;
use warehouse_api::services::warehouses::CreateWarehouseRequest;
use warehouse_api::{AppConfig, AppServices};

pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    pub config: AppConfig,
}

impl TestApp {
    /// Fresh in-memory database with the full schema and service bundle.
    pub async fn new() -> Self {
        Self::with_config(AppConfig::for_database("sqlite::memory:")).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        warehouse_api::logging::init_tracing(&config.log_level);
        let db = Arc::new(
            db::init(&config)
                .await
                .expect("test database should initialize"),
        );
        let services = AppServices::new(db.clone(), None, &config);
        Self {
            db,
            services,
            config,
        }
    }

    pub fn superuser_ctx(&self) -> OperationContext {
        OperationContext::for_actor(Actor::superuser(Uuid::new_v4()))
    }

    pub fn manager_ctx(&self, warehouse_id: Uuid) -> OperationContext {
        OperationContext::for_actor(Actor::manager(Uuid::new_v4(), warehouse_id))
    }

    pub fn employee_ctx(&self, warehouse_id: Uuid) -> OperationContext {
        OperationContext::for_actor(Actor::employee(Uuid::new_v4(), warehouse_id))
    }

    pub async fn seed_warehouse(&self, name: &str) -> warehouse::Model {
        self.services
            .warehouses
            .create_warehouse(
                &self.superuser_ctx(),
                CreateWarehouseRequest {
                    name: Some(name.to_string()),
                    location: Some("Test City".to_string()),
                },
            )
            .await
            .expect("warehouse should be created")
    }

    pub async fn seed_product(
        &self,
        warehouse_id: Uuid,
        name: &str,
        quantity: i32,
        unit_price: Decimal,
    ) -> product::Model {
        self.services
            .products
            .create_product(
                &self.superuser_ctx(),
                CreateProductRequest {
                    warehouse_id: Some(warehouse_id),
                    category_id: None,
                    name: name.to_string(),
                    description: String::new(),
                    measurement_unit: MeasurementUnit::Count,
                    quantity,
                    unit_price,
                    expires_at: None,
                },
            )
            .await
            .expect("product should be created")
    }

    pub async fn product_quantity(&self, product_id: Uuid) -> i32 {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await
            .expect("product query should succeed")
            .expect("product should exist")
            .quantity
    }

    pub async fn count_audit_events(&self, entity_type: &str) -> u64 {
        audit_event::Entity::find()
            .filter(audit_event::Column::EntityType.eq(entity_type))
            .count(&*self.db)
            .await
            .expect("audit count should succeed")
    }

    pub async fn audit_events_for(&self, entity_type: &str) -> Vec<audit_event::Model> {
        audit_event::Entity::find()
            .filter(audit_event::Column::EntityType.eq(entity_type))
            .all(&*self.db)
            .await
            .expect("audit query should succeed")
    }
}
