use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unit a product quantity is measured in.
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
#[strum(serialize_all = "title_case")]
pub enum MeasurementUnit {
    #[sea_orm(string_value = "mm")]
    Millimeter,
    #[sea_orm(string_value = "cm")]
    Centimeter,
    #[sea_orm(string_value = "m")]
    Meter,
    #[sea_orm(string_value = "in")]
    Inch,
    #[sea_orm(string_value = "ft")]
    Foot,
    #[sea_orm(string_value = "kg")]
    Kilogram,
    #[sea_orm(string_value = "mg")]
    Milligram,
    #[sea_orm(string_value = "g")]
    Gram,
    #[sea_orm(string_value = "lb")]
    Pound,
    #[sea_orm(string_value = "oz")]
    Ounce,
    #[sea_orm(string_value = "l")]
    Liter,
    #[sea_orm(string_value = "ml")]
    Milliliter,
    #[sea_orm(string_value = "m³")]
    CubicMeter,
    #[sea_orm(string_value = "cm³")]
    CubicCentimeter,
    #[sea_orm(string_value = "in³")]
    CubicInch,
    #[sea_orm(string_value = "ft³")]
    CubicFoot,
    #[sea_orm(string_value = "m²")]
    SquareMeter,
    #[sea_orm(string_value = "cm²")]
    SquareCentimeter,
    #[sea_orm(string_value = "in²")]
    SquareInch,
    #[sea_orm(string_value = "ft²")]
    SquareFoot,
    #[sea_orm(string_value = "ha")]
    Hectare,
    #[sea_orm(string_value = "acre")]
    Acre,
    #[sea_orm(string_value = "°C")]
    Celsius,
    #[sea_orm(string_value = "°F")]
    Fahrenheit,
    #[sea_orm(string_value = "gal")]
    Gallon,
    #[sea_orm(string_value = "qt")]
    Quart,
    #[sea_orm(string_value = "pt")]
    Pint,
    #[sea_orm(string_value = "count")]
    Count,
    #[sea_orm(string_value = "set")]
    Set,
    #[sea_orm(string_value = "box")]
    Box,
}

/// The `products` table. `quantity` never goes below zero; the order engine
/// decrements it only through a conditional update.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub measurement_unit: MeasurementUnit,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub unit_price: Decimal,
    pub is_available: bool,
    pub expires_at: Option<DateTime<Utc>>,
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
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
