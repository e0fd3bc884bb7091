use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{TierType, tier_benefit_entity, tier_entity};
use crate::error::{AppError, AppResult};

/// Spend thresholds at or above this value were historically used to mark
/// invite-only tiers. Incoming tier definitions that still use it are stored
/// as [`TierKind::ManualOnly`].
pub const UNATTAINABLE_SPEND: Decimal = Decimal::from_parts(9_999_999, 0, 0, false, 0);

/// Threshold tiers may not start at the legacy invite-only spend.
pub fn check_threshold_min(min_spend: Decimal) -> AppResult<()> {
    if min_spend >= UNATTAINABLE_SPEND {
        return Err(AppError::Validation(format!(
            "min_spend {min_spend} is reserved for invite-only tiers; use kind manual_only"
        )));
    }
    Ok(())
}

/// How a customer reaches a tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TierKind {
    /// Reached automatically once cumulative spend is at least `min_spend`.
    Threshold {
        #[schema(value_type = String, example = "1500.00")]
        min_spend: Decimal,
        #[schema(value_type = Option<String>)]
        max_spend: Option<Decimal>,
    },
    /// Invite-only; assigned by an administrator, never by spend.
    ManualOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Benefit {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Tier {
    pub id: Uuid,
    pub name: String,
    pub kind: TierKind,
    pub is_active: bool,
    pub benefits: Vec<Benefit>,
}

impl Tier {
    pub fn min_spend(&self) -> Option<Decimal> {
        match self.kind {
            TierKind::Threshold { min_spend, .. } => Some(min_spend),
            TierKind::ManualOnly => None,
        }
    }

    pub fn is_manual_only(&self) -> bool {
        matches!(self.kind, TierKind::ManualOnly)
    }

    pub fn benefit_names(&self) -> Vec<String> {
        self.benefits.iter().map(|b| b.name.clone()).collect()
    }

    /// Assembles a tier from its row and benefit rows (any order).
    pub fn from_models(
        model: tier_entity::Model,
        mut benefits: Vec<tier_benefit_entity::Model>,
    ) -> AppResult<Self> {
        let kind = match model.kind {
            TierType::ManualOnly => TierKind::ManualOnly,
            TierType::Threshold => TierKind::Threshold {
                min_spend: model.min_spend.ok_or_else(|| {
                    AppError::Configuration(format!(
                        "Threshold tier {} has no min_spend",
                        model.name
                    ))
                })?,
                max_spend: model.max_spend,
            },
        };
        benefits.sort_by_key(|b| (b.position, b.id));
        Ok(Self {
            id: model.id,
            name: model.name,
            kind,
            is_active: model.is_active,
            benefits: benefits
                .into_iter()
                .map(|b| Benefit {
                    name: b.name,
                    description: b.description,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BenefitInput {
    #[schema(example = "Free gift wrapping")]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateTierRequest {
    #[schema(example = "Lightweight")]
    pub name: String,
    /// Defaults to `threshold`, or `manual_only` for legacy sentinel spends.
    pub kind: Option<TierType>,
    #[schema(value_type = Option<String>, example = "1500")]
    pub min_spend: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub max_spend: Option<Decimal>,
    #[serde(default)]
    pub benefits: Vec<BenefitInput>,
}

impl CreateTierRequest {
    /// Resolves the requested kind, mapping legacy sentinel spends to manual-only.
    pub fn to_kind(&self) -> AppResult<TierKind> {
        let kind = match self.kind {
            Some(k) => k,
            None if self.min_spend.is_some_and(|m| m >= UNATTAINABLE_SPEND) => {
                TierType::ManualOnly
            }
            None => TierType::Threshold,
        };
        match kind {
            TierType::ManualOnly => Ok(TierKind::ManualOnly),
            TierType::Threshold => {
                let min_spend = self.min_spend.ok_or_else(|| {
                    AppError::Validation("min_spend is required for threshold tiers".into())
                })?;
                check_threshold_min(min_spend)?;
                Ok(TierKind::Threshold {
                    min_spend,
                    max_spend: self.max_spend,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateTierRequest {
    pub name: Option<String>,
    #[schema(value_type = Option<String>)]
    pub min_spend: Option<Decimal>,
    /// Send an explicit value to change the upper bound; use `clear_max_spend` to remove it.
    #[schema(value_type = Option<String>)]
    pub max_spend: Option<Decimal>,
    #[serde(default)]
    pub clear_max_spend: bool,
    pub is_active: Option<bool>,
    /// Replaces the whole benefit list when present.
    pub benefits: Option<Vec<BenefitInput>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TierResponse {
    #[serde(flatten)]
    pub tier: Tier,
    /// 1-based rank; manual-only tiers rank above every threshold tier.
    pub level: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TierQuery {
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResolveTierQuery {
    #[schema(value_type = String, example = "4999.99")]
    pub spend: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResolveTierResponse {
    #[schema(value_type = String)]
    pub spend: Decimal,
    pub tier: Tier,
    pub level: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(min_spend: Option<Decimal>, kind: Option<TierType>) -> CreateTierRequest {
        CreateTierRequest {
            name: "Tier".into(),
            kind,
            min_spend,
            max_spend: None,
            benefits: vec![],
        }
    }

    #[test]
    fn test_legacy_sentinel_becomes_manual_only() {
        let kind = request(Some(dec!(9999999)), None).to_kind().unwrap();
        assert_eq!(kind, TierKind::ManualOnly);
    }

    #[test]
    fn test_threshold_requires_min_spend() {
        let err = request(None, Some(TierType::Threshold)).to_kind();
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_explicit_threshold_at_sentinel_rejected() {
        let err = request(Some(dec!(9999999)), Some(TierType::Threshold)).to_kind();
        assert!(matches!(err, Err(AppError::Validation(_))));

        let kind = request(Some(dec!(9999998)), Some(TierType::Threshold))
            .to_kind()
            .unwrap();
        assert_eq!(
            kind,
            TierKind::Threshold {
                min_spend: dec!(9999998),
                max_spend: None
            }
        );
    }

    #[test]
    fn test_from_models_orders_benefits() {
        let id = Uuid::new_v4();
        let model = tier_entity::Model {
            id,
            name: "Welterweight".into(),
            kind: TierType::Threshold,
            min_spend: Some(dec!(5000)),
            max_spend: None,
            is_active: true,
            created_at: None,
            updated_at: None,
        };
        let benefit = |bid: i64, name: &str, position: i32| tier_benefit_entity::Model {
            id: bid,
            tier_id: id,
            name: name.into(),
            description: None,
            position,
        };
        let tier = Tier::from_models(
            model,
            vec![benefit(1, "Early access", 1), benefit(2, "Free shipping", 0)],
        )
        .unwrap();
        assert_eq!(tier.benefit_names(), vec!["Free shipping", "Early access"]);
        assert_eq!(tier.min_spend(), Some(dec!(5000)));
    }
}
