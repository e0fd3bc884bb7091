use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{customer_entity as customers, transaction_entity as transactions};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::TierService;
use crate::services::tier_resolver::{Assignment, apply_resolution, resolve_tier, tier_level};

/// Local customer records: spend ingestion and tier bookkeeping.
///
/// Writing these records never touches the external profile store; callers
/// that want the change mirrored run [`super::TierSyncService::sync_one`]
/// afterwards.
#[derive(Clone)]
pub struct CustomerService {
    pool: DatabaseConnection,
    tier_service: TierService,
}

fn summarize(all: &[Tier], tier_id: Option<Uuid>) -> Option<TierSummary> {
    let tier = all.iter().find(|t| Some(t.id) == tier_id)?;
    let level = if tier.is_active {
        let active: Vec<Tier> = all.iter().filter(|t| t.is_active).cloned().collect();
        tier_level(&active, tier.id)
    } else {
        None
    };
    Some(TierSummary {
        id: tier.id,
        name: tier.name.clone(),
        level,
    })
}

const RECONCILE_BATCH: u64 = 500;

/// Whether any active tier can be reached through spend.
fn has_ladder(active: &[Tier]) -> bool {
    active.iter().any(|t| !t.is_manual_only())
}

/// Tier a customer should hold after a spend change, and whether it is pinned.
///
/// Without threshold tiers only an active invite-only or pinned tier is kept;
/// everyone else is unassigned.
fn reassess(
    active: &[Tier],
    customer: &customers::Model,
    total_spend: Decimal,
) -> AppResult<(Option<Uuid>, bool)> {
    if !has_ladder(active) {
        let kept = active.iter().find(|t| {
            Some(t.id) == customer.tier_id && (t.is_manual_only() || customer.tier_manual)
        });
        return Ok(match kept {
            Some(tier) => (Some(tier.id), customer.tier_manual),
            None => (None, false),
        });
    }
    Ok(
        match apply_resolution(active, customer.tier_id, customer.tier_manual, total_spend)? {
            Assignment::ManualOverride(tier) => (Some(tier.id), customer.tier_manual),
            Assignment::Resolved(tier) => (Some(tier.id), false),
        },
    )
}

/// Re-resolves every stored customer against `active` and writes back the
/// ones whose tier or pin changed. Returns how many rows were updated.
///
/// Runs on whatever connection it is given, so tier mutations call it inside
/// their own transaction.
pub(crate) async fn reconcile_customers<C: ConnectionTrait>(
    conn: &C,
    active: &[Tier],
) -> AppResult<u64> {
    let mut after = 0i64;
    let mut updated = 0u64;
    loop {
        let page = customers::Entity::find()
            .filter(customers::Column::Id.gt(after))
            .order_by_asc(customers::Column::Id)
            .limit(RECONCILE_BATCH)
            .all(conn)
            .await?;
        let Some(last) = page.last() else {
            break;
        };
        after = last.id;
        let done = (page.len() as u64) < RECONCILE_BATCH;

        for customer in page {
            let (tier_id, tier_manual) = reassess(active, &customer, customer.total_spend)?;
            if tier_id == customer.tier_id && tier_manual == customer.tier_manual {
                continue;
            }
            log::info!(
                "Customer {} moved from tier {:?} to {tier_id:?} after a tier change",
                customer.id,
                customer.tier_id
            );
            let mut am = customer.into_active_model();
            am.tier_id = Set(tier_id);
            am.tier_manual = Set(tier_manual);
            am.updated_at = Set(Some(chrono::Utc::now()));
            am.update(conn).await?;
            updated += 1;
        }

        if done {
            break;
        }
    }
    Ok(updated)
}

impl CustomerService {
    pub fn new(pool: DatabaseConnection, tier_service: TierService) -> Self {
        Self { pool, tier_service }
    }

    async fn find(&self, id: i64) -> AppResult<customers::Model> {
        customers::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))
    }

    async fn respond(&self, model: customers::Model) -> AppResult<CustomerResponse> {
        let all = self.tier_service.all_tiers().await?;
        let tier = summarize(&all, model.tier_id);
        Ok(CustomerResponse::new(model, tier))
    }

    pub async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> AppResult<CustomerResponse> {
        let spend = request.initial_spend.unwrap_or(Decimal::ZERO);
        if spend < Decimal::ZERO {
            return Err(AppError::Validation(
                "Initial spend cannot be negative".into(),
            ));
        }

        if let Some(external_id) = &request.external_id {
            let existing = customers::Entity::find()
                .filter(customers::Column::ExternalId.eq(external_id.as_str()))
                .one(&self.pool)
                .await?;
            if existing.is_some() {
                return Err(AppError::Validation(format!(
                    "Customer {external_id} already exists"
                )));
            }
        }

        let active = self.tier_service.active_tiers().await?;
        let tier_id = if has_ladder(&active) {
            Some(resolve_tier(&active, spend)?.id)
        } else {
            None
        };

        let model = customers::ActiveModel {
            external_id: Set(request.external_id),
            first_name: Set(request.first_name),
            last_name: Set(request.last_name),
            email: Set(request.email),
            phone: Set(request.phone),
            total_spend: Set(spend),
            bonus_points: Set(Decimal::ZERO),
            redeemed_points: Set(Decimal::ZERO),
            number_of_orders: Set(0),
            tier_id: Set(tier_id),
            tier_manual: Set(false),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("Created customer {} with tier {:?}", model.id, tier_id);
        self.respond(model).await
    }

    pub async fn get_customer(&self, id: i64) -> AppResult<CustomerResponse> {
        let model = self.find(id).await?;
        self.respond(model).await
    }

    pub async fn list_customers(
        &self,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<CustomerResponse>> {
        let total = customers::Entity::find().count(&self.pool).await?;
        let models = customers::Entity::find()
            .order_by_desc(customers::Column::CreatedAt)
            .order_by_desc(customers::Column::Id)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;

        let all = self.tier_service.all_tiers().await?;
        let items = models
            .into_iter()
            .map(|m| {
                let tier = summarize(&all, m.tier_id);
                CustomerResponse::new(m, tier)
            })
            .collect();

        Ok(PaginatedResponse::new(items, params, total))
    }

    /// Records an order or correction and recomputes the customer's tier.
    pub async fn record_transaction(
        &self,
        id: i64,
        request: RecordTransactionRequest,
    ) -> AppResult<CustomerResponse> {
        if request.amount.is_zero() {
            return Err(AppError::Validation("Amount cannot be zero".into()));
        }
        if request.source == TransactionSource::Order && request.amount < Decimal::ZERO {
            return Err(AppError::Validation(
                "Order amounts must be positive; use a correction to reduce spend".into(),
            ));
        }

        let active = self.tier_service.active_tiers().await?;

        let txn = self.pool.begin().await?;
        let customer = customers::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;

        let total_spend = customer.total_spend + request.amount;
        if total_spend < Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "Correction would make total spend negative ({total_spend})"
            )));
        }
        let (tier_id, tier_manual) = reassess(&active, &customer, total_spend)?;

        transactions::ActiveModel {
            customer_id: Set(customer.id),
            amount: Set(request.amount),
            source: Set(request.source.to_string()),
            reference: Set(request.reference),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let previous_tier = customer.tier_id;
        let orders = customer.number_of_orders
            + i64::from(request.source == TransactionSource::Order);
        let mut am = customer.into_active_model();
        am.total_spend = Set(total_spend);
        am.number_of_orders = Set(orders);
        am.tier_id = Set(tier_id);
        am.tier_manual = Set(tier_manual);
        am.updated_at = Set(Some(chrono::Utc::now()));
        let updated = am.update(&txn).await?;
        txn.commit().await?;

        if previous_tier != tier_id {
            log::info!(
                "Customer {id} moved from tier {previous_tier:?} to {tier_id:?} at spend {total_spend}"
            );
        }
        self.respond(updated).await
    }

    /// Pins a customer to a tier, or with `None` clears the pin and
    /// re-resolves from spend.
    pub async fn assign_tier(&self, id: i64, request: AssignTierRequest) -> AppResult<CustomerResponse> {
        let customer = self.find(id).await?;
        let active = self.tier_service.active_tiers().await?;

        let (tier_id, tier_manual) = match request.tier_id {
            Some(tier_id) => {
                let tier = active
                    .iter()
                    .find(|t| t.id == tier_id)
                    .ok_or_else(|| AppError::NotFound("Active tier not found".to_string()))?;
                log::info!("Customer {id} manually assigned to tier {}", tier.name);
                (Some(tier.id), true)
            }
            None if !has_ladder(&active) => (None, false),
            None => {
                let tier = resolve_tier(&active, customer.total_spend)?;
                (Some(tier.id), false)
            }
        };

        let mut am = customer.into_active_model();
        am.tier_id = Set(tier_id);
        am.tier_manual = Set(tier_manual);
        am.updated_at = Set(Some(chrono::Utc::now()));
        let updated = am.update(&self.pool).await?;
        self.respond(updated).await
    }

    pub async fn adjust_bonus_points(
        &self,
        id: i64,
        request: AdjustBonusPointsRequest,
    ) -> AppResult<CustomerResponse> {
        let customer = self.find(id).await?;
        let bonus_points = customer.bonus_points + request.delta;
        if bonus_points < Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "Bonus points cannot go below zero ({bonus_points})"
            )));
        }

        let mut am = customer.into_active_model();
        am.bonus_points = Set(bonus_points);
        am.updated_at = Set(Some(chrono::Utc::now()));
        let updated = am.update(&self.pool).await?;
        self.respond(updated).await
    }

    /// Recomputes every stored customer's tier from the active tier set.
    pub async fn reconcile_tiers(&self) -> AppResult<u64> {
        let active = self.tier_service.active_tiers().await?;
        let txn = self.pool.begin().await?;
        let updated = reconcile_customers(&txn, &active).await?;
        txn.commit().await?;
        if updated > 0 {
            log::info!("Reconciled {updated} local customer tiers");
        }
        Ok(updated)
    }

    /// Deletes a customer; their transactions and redemptions go with them
    /// via the FK cascade.
    pub async fn delete_customer(&self, id: i64) -> AppResult<()> {
        let result = customers::Entity::delete_by_id(id).exec(&self.pool).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Customer not found".to_string()));
        }
        log::info!("Deleted customer {id}");
        Ok(())
    }

    /// The sync view of a local customer.
    pub async fn profile(&self, id: i64) -> AppResult<CustomerProfile> {
        let customer = self.find(id).await?;
        CustomerProfile::from_model(&customer).ok_or_else(|| {
            AppError::Validation(format!("Customer {id} is not linked to an external profile"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tier(name: &str, kind: TierKind) -> Tier {
        Tier {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            is_active: true,
            benefits: vec![],
        }
    }

    fn tiers() -> Vec<Tier> {
        vec![
            tier(
                "Featherweight",
                TierKind::Threshold {
                    min_spend: dec!(0),
                    max_spend: None,
                },
            ),
            tier(
                "Lightweight",
                TierKind::Threshold {
                    min_spend: dec!(1500),
                    max_spend: None,
                },
            ),
            tier("ReigningChampion", TierKind::ManualOnly),
        ]
    }

    fn customer(tier_id: Option<Uuid>, tier_manual: bool) -> customers::Model {
        customers::Model {
            id: 7,
            external_id: Some("gid://shopify/Customer/7".into()),
            first_name: None,
            last_name: None,
            email: None,
            phone: None,
            total_spend: dec!(1000),
            bonus_points: Decimal::ZERO,
            redeemed_points: Decimal::ZERO,
            number_of_orders: 3,
            tier_id,
            tier_manual,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_reassess_upgrades_on_spend() {
        let tiers = tiers();
        let c = customer(Some(tiers[0].id), false);
        let (tier_id, manual) = reassess(&tiers, &c, dec!(1600)).unwrap();
        assert_eq!(tier_id, Some(tiers[1].id));
        assert!(!manual);
    }

    #[test]
    fn test_reassess_keeps_invite_only() {
        let tiers = tiers();
        let c = customer(Some(tiers[2].id), true);
        let (tier_id, manual) = reassess(&tiers, &c, dec!(1600)).unwrap();
        assert_eq!(tier_id, Some(tiers[2].id));
        assert!(manual);
    }

    #[test]
    fn test_reassess_without_tiers_leaves_customer_alone() {
        let c = customer(None, false);
        assert_eq!(reassess(&[], &c, dec!(50)).unwrap(), (None, false));
    }

    #[test]
    fn test_reassess_with_only_invite_only_tier() {
        let champion = tier("ReigningChampion", TierKind::ManualOnly);
        let active = vec![champion.clone()];

        let holder = customer(Some(champion.id), false);
        assert_eq!(
            reassess(&active, &holder, dec!(50)).unwrap(),
            (Some(champion.id), false)
        );

        let stale = customer(Some(Uuid::new_v4()), true);
        assert_eq!(reassess(&active, &stale, dec!(50)).unwrap(), (None, false));
    }

    #[test]
    fn test_reassess_drops_stale_pin() {
        let tiers = tiers();
        let c = customer(Some(Uuid::new_v4()), true);
        let (tier_id, manual) = reassess(&tiers, &c, dec!(1600)).unwrap();
        assert_eq!(tier_id, Some(tiers[1].id));
        assert!(!manual);
    }

    #[test]
    fn test_summary_levels() {
        let mut all = tiers();
        all.push(Tier {
            is_active: false,
            ..tier(
                "Retired",
                TierKind::Threshold {
                    min_spend: dec!(800),
                    max_spend: None,
                },
            )
        });

        let light = summarize(&all, Some(all[1].id)).unwrap();
        assert_eq!(light.level, Some(2));
        let retired = summarize(&all, Some(all[3].id)).unwrap();
        assert_eq!(retired.level, None);
        assert!(summarize(&all, None).is_none());
    }

    mod db {
        use super::*;
        use crate::entities::{TierType, tier_benefit_entity as benefits, tier_entity};
        use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};

        fn tier_row(name: &str, min: Decimal) -> tier_entity::Model {
            tier_entity::Model {
                id: Uuid::new_v4(),
                name: name.into(),
                kind: TierType::Threshold,
                min_spend: Some(min),
                max_spend: None,
                is_active: true,
                created_at: None,
                updated_at: None,
            }
        }

        fn no_benefits() -> Vec<benefits::Model> {
            Vec::new()
        }

        fn service(db: &DatabaseConnection) -> CustomerService {
            CustomerService::new(db.clone(), TierService::new(db.clone()))
        }

        #[tokio::test]
        async fn test_negative_correction_rejected_before_write() {
            let feather = tier_row("Featherweight", dec!(0));
            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![feather]])
                .append_query_results([no_benefits()])
                .append_query_results([vec![customer(None, false)]])
                .into_connection();

            let err = service(&db)
                .record_transaction(
                    7,
                    RecordTransactionRequest {
                        amount: dec!(-1500),
                        source: TransactionSource::Correction,
                        reference: None,
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));

            let log = format!("{:?}", db.into_transaction_log());
            assert!(log.contains("FOR UPDATE"));
            assert!(!log.contains(r#"INSERT INTO \"transactions\""#));
        }

        #[tokio::test]
        async fn test_order_moves_customer_up() {
            let feather = tier_row("Featherweight", dec!(0));
            let light = tier_row("Lightweight", dec!(1500));
            let before = customer(Some(feather.id), false);
            let after = customers::Model {
                total_spend: dec!(1600),
                number_of_orders: 4,
                tier_id: Some(light.id),
                ..before.clone()
            };

            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![feather.clone(), light.clone()]])
                .append_query_results([no_benefits()])
                .append_query_results([vec![before]])
                .append_query_results([vec![transactions::Model {
                    id: 1,
                    customer_id: 7,
                    amount: dec!(600),
                    source: "order".into(),
                    reference: Some("#1001".into()),
                    created_at: None,
                }]])
                .append_query_results([vec![after]])
                .append_query_results([vec![feather, light.clone()]])
                .append_query_results([no_benefits()])
                .into_connection();

            let response = service(&db)
                .record_transaction(
                    7,
                    RecordTransactionRequest {
                        amount: dec!(600),
                        source: TransactionSource::Order,
                        reference: Some("#1001".into()),
                    },
                )
                .await
                .unwrap();
            assert_eq!(response.tier.unwrap().name, "Lightweight");

            let log = format!("{:?}", db.into_transaction_log());
            assert!(log.contains(r#"INSERT INTO \"transactions\""#));
            assert!(log.contains(&light.id.to_string()));
        }

        #[tokio::test]
        async fn test_clearing_stale_pin_resets_manual_flag() {
            let feather = tier_row("Featherweight", dec!(0));
            let stale = customer(Some(Uuid::new_v4()), true);
            let resolved = customers::Model {
                tier_id: Some(feather.id),
                tier_manual: false,
                ..stale.clone()
            };

            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![stale]])
                .append_query_results([vec![feather.clone()]])
                .append_query_results([no_benefits()])
                .append_query_results([vec![resolved]])
                .append_query_results([vec![feather.clone()]])
                .append_query_results([no_benefits()])
                .into_connection();

            let response = service(&db)
                .assign_tier(7, AssignTierRequest { tier_id: None })
                .await
                .unwrap();
            assert!(!response.tier_manual);

            let log = format!("{:?}", db.into_transaction_log());
            assert!(log.contains(&feather.id.to_string()));
            assert!(log.contains("Bool(Some(false))"));
        }

        #[tokio::test]
        async fn test_pin_to_inactive_tier_rejected() {
            let feather = tier_row("Featherweight", dec!(0));
            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![customer(None, false)]])
                .append_query_results([vec![feather]])
                .append_query_results([no_benefits()])
                .into_connection();

            let err = service(&db)
                .assign_tier(
                    7,
                    AssignTierRequest {
                        tier_id: Some(Uuid::new_v4()),
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)));
        }

        #[tokio::test]
        async fn test_bonus_points_cannot_go_negative() {
            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![customer(None, false)]])
                .into_connection();

            let err = service(&db)
                .adjust_bonus_points(
                    7,
                    AdjustBonusPointsRequest {
                        delta: dec!(-10),
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
            assert!(!format!("{:?}", db.into_transaction_log()).contains("UPDATE"));
        }

        #[tokio::test]
        async fn test_reconcile_updates_only_changed_rows() {
            let feather = tier_row("Featherweight", dec!(0));
            let light = tier_row("Lightweight", dec!(1500));
            let active: Vec<Tier> = [feather.clone(), light.clone()]
                .into_iter()
                .map(|m| Tier::from_models(m, vec![]).unwrap())
                .collect();
            let settled = customers::Model {
                id: 1,
                total_spend: dec!(100),
                ..customer(Some(feather.id), false)
            };
            let stale = customers::Model {
                id: 2,
                total_spend: dec!(2000),
                ..customer(Some(feather.id), false)
            };

            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![settled, stale.clone()]])
                .append_query_results([vec![customers::Model {
                    tier_id: Some(light.id),
                    ..stale
                }]])
                .into_connection();

            let updated = reconcile_customers(&db, &active).await.unwrap();
            assert_eq!(updated, 1);
            let log = format!("{:?}", db.into_transaction_log());
            assert_eq!(log.matches(r#"UPDATE \"customers\""#).count(), 1);
        }
    }
}
