use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::entities::customer_entity as customers;
use crate::error::{AppError, AppResult};
use crate::models::CustomerProfile;
use crate::services::sync_service::{CustomerPage, CustomerSource};

/// Lists customers from the local database, keyset-paginated on `id`.
///
/// Only customers linked to an external profile are returned. The cursor is
/// the last customer id of the previous page.
#[derive(Clone)]
pub struct LocalCustomerSource {
    pool: DatabaseConnection,
}

impl LocalCustomerSource {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Wraps another source so its profiles carry the local tier state.
    pub fn link<'a>(&'a self, remote: &'a dyn CustomerSource) -> LinkedCustomerSource<'a> {
        LinkedCustomerSource {
            local: self,
            remote,
        }
    }
}

/// A remote listing joined to local records by external id.
///
/// Spend and order counts come from the remote side. The current tier, the
/// manual pin and bonus points come from the matching local customer.
pub struct LinkedCustomerSource<'a> {
    local: &'a LocalCustomerSource,
    remote: &'a dyn CustomerSource,
}

fn overlay(profiles: &mut [CustomerProfile], locals: &HashMap<String, customers::Model>) {
    for profile in profiles {
        if let Some(local) = locals.get(&profile.external_id) {
            profile.current_tier_id = local.tier_id;
            profile.tier_manual = local.tier_manual;
            profile.bonus_points = local.bonus_points;
        }
    }
}

#[async_trait]
impl<'a> CustomerSource for LinkedCustomerSource<'a> {
    async fn fetch_page(&self, cursor: Option<String>, limit: u32) -> AppResult<CustomerPage> {
        let mut page = self.remote.fetch_page(cursor, limit).await?;
        if page.profiles.is_empty() {
            return Ok(page);
        }

        let ids: Vec<String> = page
            .profiles
            .iter()
            .map(|p| p.external_id.clone())
            .collect();
        let locals: HashMap<String, customers::Model> = customers::Entity::find()
            .filter(customers::Column::ExternalId.is_in(ids))
            .all(&self.local.pool)
            .await
            .map_err(|e| AppError::SourceEnumeration(format!("Customer lookup failed: {e}")))?
            .into_iter()
            .filter_map(|m| Some((m.external_id.clone()?, m)))
            .collect();

        overlay(&mut page.profiles, &locals);
        Ok(page)
    }
}

#[async_trait]
impl CustomerSource for LocalCustomerSource {
    async fn fetch_page(&self, cursor: Option<String>, limit: u32) -> AppResult<CustomerPage> {
        let after: i64 = match cursor {
            Some(c) => c
                .parse()
                .map_err(|_| AppError::SourceEnumeration(format!("Invalid cursor: {c}")))?,
            None => 0,
        };

        // One extra row tells us whether another page exists.
        let mut rows = customers::Entity::find()
            .filter(customers::Column::Id.gt(after))
            .filter(customers::Column::ExternalId.is_not_null())
            .order_by_asc(customers::Column::Id)
            .limit(limit as u64 + 1)
            .all(&self.pool)
            .await
            .map_err(|e| AppError::SourceEnumeration(format!("Customer query failed: {e}")))?;

        let has_next_page = rows.len() > limit as usize;
        rows.truncate(limit as usize);
        let next_cursor = if has_next_page {
            rows.last().map(|r| r.id.to_string())
        } else {
            None
        };

        Ok(CustomerPage {
            profiles: rows.iter().filter_map(CustomerProfile::from_model).collect(),
            next_cursor,
            has_next_page,
        })
    }
}
