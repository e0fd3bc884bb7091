use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{TierType, tier_benefit_entity as benefits, tier_entity as tiers};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::customer_service::reconcile_customers;
use crate::services::tier_resolver::{
    resolve_tier, tier_level, validate_tiers, warn_duplicate_thresholds,
};

#[derive(Clone)]
pub struct TierService {
    pool: DatabaseConnection,
}

/// Storage columns for a tier kind.
fn kind_columns(kind: &TierKind) -> (TierType, Option<Decimal>, Option<Decimal>) {
    match kind {
        TierKind::Threshold {
            min_spend,
            max_spend,
        } => (TierType::Threshold, Some(*min_spend), *max_spend),
        TierKind::ManualOnly => (TierType::ManualOnly, None, None),
    }
}

/// Checks an active tier set an administrator is about to produce.
///
/// A set with no threshold tiers at all is allowed so tiers can be created
/// one at a time; the first threshold tier must then be the floor.
fn check_active_set(active: &[Tier]) -> AppResult<()> {
    if active.iter().any(|t| !t.is_manual_only()) {
        validate_tiers(active)?;
        warn_duplicate_thresholds(active);
    } else if active.len() > 1 {
        return Err(AppError::Configuration(
            "At most one invite-only tier is allowed".into(),
        ));
    }
    Ok(())
}

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() || name.len() > 100 {
        return Err(AppError::Validation(
            "Tier name must be between 1 and 100 characters".into(),
        ));
    }
    Ok(name.to_string())
}

fn ensure_unique_name(active: &[Tier], name: &str, except: Option<Uuid>) -> AppResult<()> {
    let taken = active
        .iter()
        .any(|t| Some(t.id) != except && t.name.eq_ignore_ascii_case(name));
    if taken {
        return Err(AppError::Validation(format!(
            "An active tier named {name} already exists"
        )));
    }
    Ok(())
}

fn benefit_models(tier_id: Uuid, inputs: &[BenefitInput]) -> AppResult<Vec<benefits::ActiveModel>> {
    inputs
        .iter()
        .enumerate()
        .map(|(position, b)| {
            let name = b.name.trim();
            if name.is_empty() {
                return Err(AppError::Validation("Benefit name cannot be empty".into()));
            }
            Ok(benefits::ActiveModel {
                tier_id: Set(tier_id),
                name: Set(name.to_string()),
                description: Set(b.description.clone()),
                position: Set(position as i32),
                ..Default::default()
            })
        })
        .collect()
}

impl TierService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    async fn load<C: ConnectionTrait>(
        conn: &C,
        active_only: bool,
    ) -> AppResult<Vec<(tiers::Model, Tier)>> {
        let mut query = tiers::Entity::find()
            .order_by_asc(tiers::Column::MinSpend)
            .order_by_asc(tiers::Column::Id);
        if active_only {
            query = query.filter(tiers::Column::IsActive.eq(true));
        }
        let models = query.all(conn).await?;
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let mut by_tier: HashMap<Uuid, Vec<benefits::Model>> = HashMap::new();
        for b in benefits::Entity::find()
            .filter(benefits::Column::TierId.is_in(ids))
            .all(conn)
            .await?
        {
            by_tier.entry(b.tier_id).or_default().push(b);
        }

        models
            .into_iter()
            .map(|m| {
                let tier_benefits = by_tier.remove(&m.id).unwrap_or_default();
                let tier = Tier::from_models(m.clone(), tier_benefits)?;
                Ok((m, tier))
            })
            .collect()
    }

    /// The active tier set, as the resolver expects it.
    pub async fn active_tiers(&self) -> AppResult<Vec<Tier>> {
        Ok(Self::load(&self.pool, true)
            .await?
            .into_iter()
            .map(|(_, t)| t)
            .collect())
    }

    /// Every tier, active or not.
    pub async fn all_tiers(&self) -> AppResult<Vec<Tier>> {
        Ok(Self::load(&self.pool, false)
            .await?
            .into_iter()
            .map(|(_, t)| t)
            .collect())
    }

    fn respond(model: tiers::Model, tier: Tier, active: &[Tier]) -> TierResponse {
        let level = if tier.is_active {
            tier_level(active, tier.id)
        } else {
            None
        };
        TierResponse {
            tier,
            level,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn list_tiers(&self, include_inactive: bool) -> AppResult<Vec<TierResponse>> {
        let loaded = Self::load(&self.pool, !include_inactive).await?;
        let active: Vec<Tier> = loaded
            .iter()
            .filter(|(_, t)| t.is_active)
            .map(|(_, t)| t.clone())
            .collect();
        Ok(loaded
            .into_iter()
            .map(|(m, t)| Self::respond(m, t, &active))
            .collect())
    }

    pub async fn get_tier(&self, id: Uuid) -> AppResult<TierResponse> {
        let loaded = Self::load(&self.pool, false).await?;
        let active: Vec<Tier> = loaded
            .iter()
            .filter(|(_, t)| t.is_active)
            .map(|(_, t)| t.clone())
            .collect();
        loaded
            .into_iter()
            .find(|(m, _)| m.id == id)
            .map(|(m, t)| Self::respond(m, t, &active))
            .ok_or_else(|| AppError::NotFound("Tier not found".to_string()))
    }

    pub async fn create_tier(&self, request: CreateTierRequest) -> AppResult<TierResponse> {
        let name = validate_name(&request.name)?;
        let kind = request.to_kind()?;
        let id = Uuid::new_v4();

        let mut active = self.active_tiers().await?;
        ensure_unique_name(&active, &name, None)?;
        active.push(Tier {
            id,
            name: name.clone(),
            kind: kind.clone(),
            is_active: true,
            benefits: vec![],
        });
        check_active_set(&active)?;

        let (kind_tag, min_spend, max_spend) = kind_columns(&kind);
        let benefit_rows = benefit_models(id, &request.benefits)?;

        let txn = self.pool.begin().await?;
        tiers::ActiveModel {
            id: Set(id),
            name: Set(name.clone()),
            kind: Set(kind_tag),
            min_spend: Set(min_spend),
            max_spend: Set(max_spend),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        if !benefit_rows.is_empty() {
            benefits::Entity::insert_many(benefit_rows).exec(&txn).await?;
        }
        let moved = reconcile_customers(&txn, &active).await?;
        txn.commit().await?;

        log::info!("Created {kind_tag} tier {name} ({id}); {moved} customers re-tiered");
        self.get_tier(id).await
    }

    pub async fn update_tier(&self, id: Uuid, request: UpdateTierRequest) -> AppResult<TierResponse> {
        let model = tiers::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Tier not found".to_string()))?;

        let name = match &request.name {
            Some(n) => validate_name(n)?,
            None => model.name.clone(),
        };
        let kind = match model.kind {
            TierType::ManualOnly => {
                if request.min_spend.is_some() || request.max_spend.is_some() {
                    return Err(AppError::Validation(
                        "Invite-only tiers have no spend thresholds".into(),
                    ));
                }
                TierKind::ManualOnly
            }
            TierType::Threshold => {
                let max_spend = if request.clear_max_spend {
                    None
                } else {
                    request.max_spend.or(model.max_spend)
                };
                let min_spend = request.min_spend.or(model.min_spend).ok_or_else(|| {
                    AppError::Configuration(format!("Tier {} has no min_spend", model.name))
                })?;
                check_threshold_min(min_spend)?;
                TierKind::Threshold {
                    min_spend,
                    max_spend,
                }
            }
        };
        let is_active = request.is_active.unwrap_or(model.is_active);

        let mut active: Vec<Tier> = self
            .active_tiers()
            .await?
            .into_iter()
            .filter(|t| t.id != id)
            .collect();
        if is_active {
            ensure_unique_name(&active, &name, Some(id))?;
            active.push(Tier {
                id,
                name: name.clone(),
                kind: kind.clone(),
                is_active,
                benefits: vec![],
            });
        }
        check_active_set(&active)?;

        let benefit_rows = match &request.benefits {
            Some(inputs) => Some(benefit_models(id, inputs)?),
            None => None,
        };
        let (_, min_spend, max_spend) = kind_columns(&kind);

        let txn = self.pool.begin().await?;
        let mut am = model.into_active_model();
        am.name = Set(name);
        am.min_spend = Set(min_spend);
        am.max_spend = Set(max_spend);
        am.is_active = Set(is_active);
        am.updated_at = Set(Some(chrono::Utc::now()));
        am.update(&txn).await?;

        if let Some(rows) = benefit_rows {
            benefits::Entity::delete_many()
                .filter(benefits::Column::TierId.eq(id))
                .exec(&txn)
                .await?;
            if !rows.is_empty() {
                benefits::Entity::insert_many(rows).exec(&txn).await?;
            }
        }
        let moved = reconcile_customers(&txn, &active).await?;
        txn.commit().await?;

        log::info!("Updated tier {id}; {moved} customers re-tiered");
        self.get_tier(id).await
    }

    /// Soft-deletes a tier. Customers holding it are moved to the tier their
    /// spend resolves to.
    pub async fn deactivate_tier(&self, id: Uuid) -> AppResult<TierResponse> {
        self.update_tier(
            id,
            UpdateTierRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// Deletes a tier and, through the FK cascade, its benefits. Customers
    /// holding it are re-resolved in the same transaction.
    pub async fn delete_tier(&self, id: Uuid) -> AppResult<()> {
        let model = tiers::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Tier not found".to_string()))?;

        let remaining: Vec<Tier> = self
            .active_tiers()
            .await?
            .into_iter()
            .filter(|t| t.id != id)
            .collect();
        if model.is_active {
            check_active_set(&remaining)?;
        }

        let txn = self.pool.begin().await?;
        tiers::Entity::delete_by_id(id).exec(&txn).await?;
        let moved = reconcile_customers(&txn, &remaining).await?;
        txn.commit().await?;
        log::info!("Deleted tier {} ({id}); {moved} customers re-tiered", model.name);
        Ok(())
    }

    /// Which tier a given spend would land in, for admin previews.
    pub async fn preview(&self, spend: Decimal) -> AppResult<ResolveTierResponse> {
        let active = self.active_tiers().await?;
        let tier = resolve_tier(&active, spend)?;
        let level = tier_level(&active, tier.id).unwrap_or(1);
        Ok(ResolveTierResponse {
            spend,
            tier: tier.clone(),
            level,
        })
    }
}
