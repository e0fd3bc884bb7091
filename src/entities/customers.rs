use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Commerce platform id, e.g. `gid://shopify/Customer/123`
    #[sea_orm(unique)]
    pub external_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub total_spend: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub bonus_points: Decimal,
    /// Points already spent on rewards.
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub redeemed_points: Decimal,
    pub number_of_orders: i64,
    pub tier_id: Option<Uuid>,
    /// Set when an administrator pinned the tier; resolution never overrides it.
    pub tier_manual: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
