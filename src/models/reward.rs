use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{customer_reward_entity, reward_entity};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RewardResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "500")]
    pub points_cost: Decimal,
    /// `null` means unlimited.
    pub stock_remaining: Option<i64>,
    pub is_active: bool,
    pub is_available: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<reward_entity::Model> for RewardResponse {
    fn from(model: reward_entity::Model) -> Self {
        let is_available = model.is_available();
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            points_cost: model.points_cost,
            stock_remaining: model.stock_remaining,
            is_active: model.is_active,
            is_available,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateRewardRequest {
    #[schema(example = "Signed gloves")]
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "500")]
    pub points_cost: Decimal,
    /// Omit for unlimited stock.
    pub stock_remaining: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateRewardRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub points_cost: Option<Decimal>,
    pub stock_remaining: Option<i64>,
    /// Removes the stock limit.
    #[serde(default)]
    pub unlimited_stock: bool,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RewardQuery {
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RedeemRewardRequest {
    pub reward_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerRewardResponse {
    pub id: i64,
    pub customer_id: i64,
    /// `null` once the reward has been deleted from the catalog.
    pub reward_id: Option<i64>,
    pub reward_name: String,
    #[schema(value_type = String)]
    pub points_spent: Decimal,
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl From<customer_reward_entity::Model> for CustomerRewardResponse {
    fn from(model: customer_reward_entity::Model) -> Self {
        Self {
            id: model.id,
            customer_id: model.customer_id,
            reward_id: model.reward_id,
            reward_name: model.reward_name,
            points_spent: model.points_spent,
            redeemed_at: model.redeemed_at,
        }
    }
}
