use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// One redemption. Removed with the customer; kept (with `reward_id` NULL)
/// when the reward itself is deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "customer_rewards")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub customer_id: i64,
    pub reward_id: Option<i64>,
    pub reward_name: String,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub points_spent: Decimal,
    pub redeemed_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
