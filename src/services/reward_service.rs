use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::Expr,
};

use crate::entities::{
    customer_entity as customers, customer_reward_entity as redemptions, reward_entity as rewards,
};
use crate::error::{AppError, AppResult};
use crate::models::*;

/// Reward catalog and point redemption.
#[derive(Clone)]
pub struct RewardService {
    pool: DatabaseConnection,
}

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() || name.len() > 100 {
        return Err(AppError::Validation(
            "Reward name must be between 1 and 100 characters".into(),
        ));
    }
    Ok(name.to_string())
}

fn validate_cost(points_cost: Decimal) -> AppResult<()> {
    if points_cost <= Decimal::ZERO {
        return Err(AppError::Validation("Points cost must be positive".into()));
    }
    Ok(())
}

fn validate_stock(stock: Option<i64>) -> AppResult<()> {
    if stock.is_some_and(|s| s < 0) {
        return Err(AppError::Validation("Stock cannot be negative".into()));
    }
    Ok(())
}

/// Points a customer can still spend.
pub fn available_points(customer: &customers::Model) -> Decimal {
    Points::from_spend(customer.total_spend, customer.bonus_points).total_points
        - customer.redeemed_points
}

/// Checks a redemption and returns the customer's new `redeemed_points`.
pub fn check_redemption(customer: &customers::Model, reward: &rewards::Model) -> AppResult<Decimal> {
    if !reward.is_available() {
        return Err(AppError::Validation(format!(
            "Reward {} is not available",
            reward.name
        )));
    }
    let available = available_points(customer);
    if available < reward.points_cost {
        return Err(AppError::Validation(format!(
            "Reward {} costs {} points but only {available} are available",
            reward.name, reward.points_cost
        )));
    }
    Ok(customer.redeemed_points + reward.points_cost)
}

impl RewardService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    async fn find(&self, id: i64) -> AppResult<rewards::Model> {
        rewards::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Reward not found".to_string()))
    }

    pub async fn list_rewards(&self, include_inactive: bool) -> AppResult<Vec<RewardResponse>> {
        let mut query = rewards::Entity::find()
            .order_by_asc(rewards::Column::PointsCost)
            .order_by_asc(rewards::Column::Id);
        if !include_inactive {
            query = query.filter(rewards::Column::IsActive.eq(true));
        }
        Ok(query
            .all(&self.pool)
            .await?
            .into_iter()
            .map(RewardResponse::from)
            .collect())
    }

    pub async fn get_reward(&self, id: i64) -> AppResult<RewardResponse> {
        Ok(self.find(id).await?.into())
    }

    pub async fn create_reward(&self, request: CreateRewardRequest) -> AppResult<RewardResponse> {
        let name = validate_name(&request.name)?;
        validate_cost(request.points_cost)?;
        validate_stock(request.stock_remaining)?;

        let model = rewards::ActiveModel {
            name: Set(name),
            description: Set(request.description),
            points_cost: Set(request.points_cost),
            stock_remaining: Set(request.stock_remaining),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("Created reward {} ({})", model.name, model.id);
        Ok(model.into())
    }

    pub async fn update_reward(
        &self,
        id: i64,
        request: UpdateRewardRequest,
    ) -> AppResult<RewardResponse> {
        let model = self.find(id).await?;
        let mut am = model.into_active_model();

        if let Some(name) = &request.name {
            am.name = Set(validate_name(name)?);
        }
        if let Some(description) = request.description {
            am.description = Set(Some(description));
        }
        if let Some(cost) = request.points_cost {
            validate_cost(cost)?;
            am.points_cost = Set(cost);
        }
        if request.unlimited_stock {
            am.stock_remaining = Set(None);
        } else if let Some(stock) = request.stock_remaining {
            validate_stock(Some(stock))?;
            am.stock_remaining = Set(Some(stock));
        }
        if let Some(active) = request.is_active {
            am.is_active = Set(active);
        }
        am.updated_at = Set(Some(chrono::Utc::now()));

        let updated = am.update(&self.pool).await?;
        log::info!("Updated reward {id}");
        Ok(updated.into())
    }

    /// Deletes a reward. Past redemptions keep their name and cost.
    pub async fn delete_reward(&self, id: i64) -> AppResult<()> {
        let result = rewards::Entity::delete_by_id(id).exec(&self.pool).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Reward not found".to_string()));
        }
        log::info!("Deleted reward {id}");
        Ok(())
    }

    /// Spends a customer's points on a reward.
    ///
    /// The customer row is locked for the duration so concurrent redemptions
    /// cannot overspend. Limited stock is decremented with a guarded update.
    pub async fn redeem_reward(
        &self,
        customer_id: i64,
        request: RedeemRewardRequest,
    ) -> AppResult<CustomerRewardResponse> {
        let txn = self.pool.begin().await?;

        let customer = customers::Entity::find_by_id(customer_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;
        let reward = rewards::Entity::find_by_id(request.reward_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Reward not found".to_string()))?;

        let redeemed_points = check_redemption(&customer, &reward)?;

        if reward.stock_remaining.is_some() {
            let result = rewards::Entity::update_many()
                .col_expr(
                    rewards::Column::StockRemaining,
                    Expr::col(rewards::Column::StockRemaining).sub(1),
                )
                .filter(rewards::Column::Id.eq(reward.id))
                .filter(
                    Condition::all()
                        .add(rewards::Column::StockRemaining.is_not_null())
                        .add(rewards::Column::StockRemaining.gt(0)),
                )
                .exec(&txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(AppError::Validation(format!(
                    "Reward {} is out of stock",
                    reward.name
                )));
            }
        }

        let mut am = customer.into_active_model();
        am.redeemed_points = Set(redeemed_points);
        am.updated_at = Set(Some(chrono::Utc::now()));
        am.update(&txn).await?;

        let redemption = redemptions::ActiveModel {
            customer_id: Set(customer_id),
            reward_id: Set(Some(reward.id)),
            reward_name: Set(reward.name.clone()),
            points_spent: Set(reward.points_cost),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        log::info!(
            "Customer {customer_id} redeemed {} for {} points",
            reward.name,
            reward.points_cost
        );
        Ok(redemption.into())
    }

    pub async fn list_customer_rewards(
        &self,
        customer_id: i64,
    ) -> AppResult<Vec<CustomerRewardResponse>> {
        customers::Entity::find_by_id(customer_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;

        Ok(redemptions::Entity::find()
            .filter(redemptions::Column::CustomerId.eq(customer_id))
            .order_by_desc(redemptions::Column::RedeemedAt)
            .order_by_desc(redemptions::Column::Id)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(CustomerRewardResponse::from)
            .collect())
    }
}
