//! Dashboard aggregation: headline product/employee counts and a 12-month
//! sales rollup, tenant-scoped exactly like the rest of the system.

use chrono::{Datelike, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::context::OperationContext;
use crate::db::DbPool;
use crate::entities::order::{self, OrderStatus};
use crate::entities::{employee, product, warehouse};
use crate::errors::ServiceError;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCounts {
    pub all_products: u64,
    pub low_stock_products: u64,
    pub out_of_stock_products: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeCounts {
    pub all_employees: u64,
    pub active_employees: u64,
    pub inactive_employees: u64,
    pub number_of_managers: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySales {
    pub month: String,
    pub number_of_completed_orders: u64,
    pub number_of_pending_orders: u64,
    pub month_total_sales: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    /// Present only for elevated actors.
    pub warehouses: Option<Vec<WarehouseSummary>>,
    pub employees: EmployeeCounts,
    pub products: ProductCounts,
    pub annual_sales: Vec<MonthlySales>,
}

#[derive(Clone)]
pub struct ReportService {
    db_pool: Arc<DbPool>,
    low_stock_threshold: i32,
}

impl ReportService {
    pub fn new(db_pool: Arc<DbPool>, low_stock_threshold: i32) -> Self {
        Self {
            db_pool,
            low_stock_threshold,
        }
    }

    /// Assembles the dashboard. Non-elevated actors see their own warehouse
    /// and may not ask for another; elevated actors may narrow to one.
    #[instrument(skip(self, ctx))]
    pub async fn dashboard(
        &self,
        ctx: &OperationContext,
        warehouse_filter: Option<Uuid>,
    ) -> Result<DashboardData, ServiceError> {
        let scope = if ctx.is_elevated() {
            warehouse_filter
        } else {
            if warehouse_filter.is_some() {
                return Err(ServiceError::Forbidden(
                    "You do not have permission to filter by warehouse id".to_string(),
                ));
            }
            Some(ctx.home_warehouse().ok_or_else(|| {
                ServiceError::Forbidden("Actor has no warehouse scope".to_string())
            })?)
        };

        let employees = self.employee_counts(scope).await?;
        let products = self.product_counts(scope).await?;
        let annual_sales = self.annual_sales(scope).await?;

        let warehouses = if ctx.is_elevated() {
            Some(self.warehouse_summaries().await?)
        } else {
            None
        };

        Ok(DashboardData {
            warehouses,
            employees,
            products,
            annual_sales,
        })
    }

    async fn product_counts(&self, scope: Option<Uuid>) -> Result<ProductCounts, ServiceError> {
        let db = &*self.db_pool;
        let mut query = product::Entity::find();
        if let Some(warehouse_id) = scope {
            query = query.filter(product::Column::WarehouseId.eq(warehouse_id));
        }

        let all_products = query.clone().count(db).await?;
        let low_stock_products = query
            .clone()
            .filter(product::Column::Quantity.lt(self.low_stock_threshold))
            .count(db)
            .await?;
        let out_of_stock_products = query
            .filter(product::Column::Quantity.lte(0))
            .count(db)
            .await?;

        Ok(ProductCounts {
            all_products,
            low_stock_products,
            out_of_stock_products,
        })
    }

    async fn employee_counts(&self, scope: Option<Uuid>) -> Result<EmployeeCounts, ServiceError> {
        let db = &*self.db_pool;
        let mut query = employee::Entity::find();
        if let Some(warehouse_id) = scope {
            query = query.filter(employee::Column::WarehouseId.eq(warehouse_id));
        }

        let all_employees = query.clone().count(db).await?;
        let active_employees = query
            .clone()
            .filter(employee::Column::IsActive.eq(true))
            .count(db)
            .await?;
        let inactive_employees = query
            .clone()
            .filter(employee::Column::IsActive.eq(false))
            .count(db)
            .await?;
        let number_of_managers = query
            .filter(employee::Column::IsManager.eq(true))
            .count(db)
            .await?;

        Ok(EmployeeCounts {
            all_employees,
            active_employees,
            inactive_employees,
            number_of_managers,
        })
    }

    /// Rolls the current year's orders into per-month counts and completed
    /// sales totals, padding months without orders with zeros.
    async fn annual_sales(&self, scope: Option<Uuid>) -> Result<Vec<MonthlySales>, ServiceError> {
        let db = &*self.db_pool;
        let year = Utc::now().year();
        let start = Utc
            .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| ServiceError::InternalError("Invalid year start".to_string()))?;
        let end = Utc
            .with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| ServiceError::InternalError("Invalid year end".to_string()))?;

        let mut query = order::Entity::find()
            .filter(order::Column::CreatedAt.gte(start))
            .filter(order::Column::CreatedAt.lt(end));
        if let Some(warehouse_id) = scope {
            query = query.filter(order::Column::WarehouseId.eq(warehouse_id));
        }
        let orders = query.all(db).await?;

        let mut completed = [0u64; 12];
        let mut pending = [0u64; 12];
        let mut totals = [Decimal::ZERO; 12];
        for order in &orders {
            let month_index = order.created_at.month0() as usize;
            match order.status {
                OrderStatus::Completed => {
                    completed[month_index] += 1;
                    totals[month_index] += order.total_price;
                }
                OrderStatus::Pending => pending[month_index] += 1,
                OrderStatus::Refunded => {}
            }
        }

        Ok(MONTH_NAMES
            .iter()
            .enumerate()
            .map(|(i, month)| MonthlySales {
                month: month.to_string(),
                number_of_completed_orders: completed[i],
                number_of_pending_orders: pending[i],
                month_total_sales: totals[i],
            })
            .collect())
    }

    async fn warehouse_summaries(&self) -> Result<Vec<WarehouseSummary>, ServiceError> {
        let db = &*self.db_pool;
        let warehouses = warehouse::Entity::find().all(db).await?;
        Ok(warehouses
            .into_iter()
            .map(|w| WarehouseSummary {
                id: w.id,
                name: w.name,
                location: w.location,
            })
            .collect())
    }
}
