use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::customer_entity;

/// Loyalty points derived from spend: one spend point per currency unit,
/// plus any externally granted bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Points {
    #[schema(value_type = String)]
    pub spend_points: Decimal,
    #[schema(value_type = String)]
    pub bonus_points: Decimal,
    #[schema(value_type = String)]
    pub total_points: Decimal,
}

impl Points {
    pub fn from_spend(total_spend: Decimal, bonus_points: Decimal) -> Self {
        Self {
            spend_points: total_spend,
            bonus_points,
            total_points: total_spend + bonus_points,
        }
    }
}

/// The minimum a sync run needs to know about one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    /// Owner id in the external profile store.
    pub external_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub amount_spent: Decimal,
    pub number_of_orders: i64,
    pub bonus_points: Decimal,
    pub current_tier_id: Option<Uuid>,
    /// Tier name last written to the external store. Used to find the
    /// current tier when the listing carries no local id.
    pub current_tier_name: Option<String>,
    /// Administrator pinned `current_tier_id`.
    pub tier_manual: bool,
}

impl CustomerProfile {
    pub fn new(external_id: impl Into<String>, amount_spent: Decimal) -> Self {
        Self {
            external_id: external_id.into(),
            first_name: None,
            last_name: None,
            email: None,
            amount_spent,
            number_of_orders: 0,
            bonus_points: Decimal::ZERO,
            current_tier_id: None,
            current_tier_name: None,
            tier_manual: false,
        }
    }

    /// Local customers without an external id cannot be synced.
    pub fn from_model(model: &customer_entity::Model) -> Option<Self> {
        Some(Self {
            external_id: model.external_id.clone()?,
            first_name: model.first_name.clone(),
            last_name: model.last_name.clone(),
            email: model.email.clone(),
            amount_spent: model.total_spend,
            number_of_orders: model.number_of_orders,
            bonus_points: model.bonus_points,
            current_tier_id: model.tier_id,
            current_tier_name: None,
            tier_manual: model.tier_manual,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TierSummary {
    pub id: Uuid,
    pub name: String,
    pub level: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    pub id: i64,
    pub external_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[schema(value_type = String)]
    pub total_spend: Decimal,
    pub number_of_orders: i64,
    pub points: Points,
    /// Points already spent on rewards.
    #[schema(value_type = String)]
    pub redeemed_points: Decimal,
    /// `points.total_points` minus `redeemed_points`.
    #[schema(value_type = String)]
    pub available_points: Decimal,
    pub tier: Option<TierSummary>,
    pub tier_manual: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CustomerResponse {
    pub fn new(model: customer_entity::Model, tier: Option<TierSummary>) -> Self {
        let points = Points::from_spend(model.total_spend, model.bonus_points);
        Self {
            id: model.id,
            external_id: model.external_id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            phone: model.phone,
            total_spend: model.total_spend,
            number_of_orders: model.number_of_orders,
            points,
            redeemed_points: model.redeemed_points,
            available_points: points.total_points - model.redeemed_points,
            tier,
            tier_manual: model.tier_manual,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateCustomerRequest {
    #[schema(example = "gid://shopify/Customer/7008")]
    pub external_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[schema(value_type = Option<String>)]
    pub initial_spend: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    /// A paid order; counts towards `number_of_orders`.
    #[default]
    Order,
    /// Administrative correction of cumulative spend.
    Correction,
}

impl std::fmt::Display for TransactionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionSource::Order => write!(f, "order"),
            TransactionSource::Correction => write!(f, "correction"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordTransactionRequest {
    #[schema(value_type = String, example = "49.99")]
    pub amount: Decimal,
    #[serde(default)]
    pub source: TransactionSource,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignTierRequest {
    /// `null` clears a manual assignment and re-resolves from spend.
    pub tier_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdjustBonusPointsRequest {
    #[schema(value_type = String, example = "250")]
    pub delta: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_points_from_spend() {
        let points = Points::from_spend(dec!(1234.50), dec!(100));
        assert_eq!(points.spend_points, dec!(1234.50));
        assert_eq!(points.bonus_points, dec!(100));
        assert_eq!(points.total_points, dec!(1334.50));
    }

    #[test]
    fn test_profile_requires_external_id() {
        let model = customer_entity::Model {
            id: 1,
            external_id: None,
            first_name: Some("Ada".into()),
            last_name: None,
            email: None,
            phone: None,
            total_spend: dec!(10),
            bonus_points: Decimal::ZERO,
            redeemed_points: Decimal::ZERO,
            number_of_orders: 1,
            tier_id: None,
            tier_manual: false,
            created_at: None,
            updated_at: None,
        };
        assert!(CustomerProfile::from_model(&model).is_none());

        let linked = customer_entity::Model {
            external_id: Some("gid://shopify/Customer/1".into()),
            ..model
        };
        let profile = CustomerProfile::from_model(&linked).unwrap();
        assert_eq!(profile.amount_spent, dec!(10));
        assert_eq!(profile.number_of_orders, 1);
    }

    #[test]
    fn test_available_points_subtract_redemptions() {
        let model = customer_entity::Model {
            id: 2,
            external_id: None,
            first_name: None,
            last_name: None,
            email: None,
            phone: None,
            total_spend: dec!(900),
            bonus_points: dec!(100),
            redeemed_points: dec!(750),
            number_of_orders: 2,
            tier_id: None,
            tier_manual: false,
            created_at: None,
            updated_at: None,
        };
        let response = CustomerResponse::new(model, None);
        assert_eq!(response.points.total_points, dec!(1000));
        assert_eq!(response.available_points, dec!(250));
    }
}
