use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an order. Payment reconciliation is the only path from
/// `Pending` to `Completed`; refunds happen outside this crate.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "refunded")]
    Refunded,
    #[sea_orm(string_value = "completed")]
    Completed,
}

/// The `orders` table. `total_price` is fixed at creation from snapshot
/// buying prices and never recomputed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub customer: String,
    pub customer_phone: Option<String>,
    /// Actor who created the order; kept nullable so actor deletion does not
    /// take the order with it.
    pub initiator_id: Option<Uuid>,
    pub status: OrderStatus,
    #[sea_orm(unique)]
    pub tracking_id: String,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::warehouse::Entity",
        from = "Column::WarehouseId",
        to = "super::warehouse::Column::Id"
    )]
    Warehouse,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::order_partial_payment::Entity")]
    PartialPayments,
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::order_partial_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PartialPayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
