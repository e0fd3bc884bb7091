use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;

use crate::config::SyncConfig;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::tier_resolver::{
    apply_resolution, tier_level, validate_tiers, warn_duplicate_thresholds,
};

pub const KEY_TIER_NAME: &str = "tier_name";
pub const KEY_TIER_LEVEL: &str = "tier_level";
pub const KEY_TOTAL_SPEND: &str = "total_spend";
pub const KEY_SPEND_POINTS: &str = "spend_points";
pub const KEY_BONUS_POINTS: &str = "bonus_points";
pub const KEY_TOTAL_POINTS: &str = "total_points";
pub const KEY_TIER_BENEFITS: &str = "tier_benefits";

const MAX_PAGE_SIZE: u32 = 250;

/// One page of customers from a [`CustomerSource`].
#[derive(Debug, Clone, Default)]
pub struct CustomerPage {
    pub profiles: Vec<CustomerProfile>,
    pub next_cursor: Option<String>,
    pub has_next_page: bool,
}

/// Cursor-paginated listing of customers to sync.
#[async_trait]
pub trait CustomerSource: Send + Sync {
    async fn fetch_page(&self, cursor: Option<String>, limit: u32) -> AppResult<CustomerPage>;
}

/// External system of record for customer profile fields.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn set_profile_fields(&self, owner_id: &str, fields: &[MetafieldInput]) -> AppResult<()>;
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub namespace: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub write_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl SyncSettings {
    pub fn from_config(config: &SyncConfig, namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            page_size: config.page_size,
            max_pages: config.max_pages,
            batch_size: config.batch_size,
            batch_delay: config.batch_delay(),
            write_timeout: config.write_timeout(),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default(), "loyalty")
    }
}

/// Pushes resolved tiers and points to an external profile store.
#[derive(Clone)]
pub struct TierSyncService {
    store: Arc<dyn ProfileStore>,
    settings: SyncSettings,
}

impl TierSyncService {
    pub fn new(store: Arc<dyn ProfileStore>, settings: SyncSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Drains `source` page by page, stopping after `max_pages`.
    ///
    /// Any listing failure aborts with [`AppError::SourceEnumeration`] and the
    /// profiles gathered so far are dropped.
    pub async fn collect_profiles(
        &self,
        source: &dyn CustomerSource,
    ) -> AppResult<Vec<CustomerProfile>> {
        let page_size = self.settings.page_size.clamp(1, MAX_PAGE_SIZE);
        let max_pages = self.settings.max_pages.max(1);
        let mut profiles = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 1..=max_pages {
            let result = source
                .fetch_page(cursor.take(), page_size)
                .await
                .map_err(|e| match e {
                    AppError::SourceEnumeration(_) => e,
                    other => AppError::SourceEnumeration(format!("page {page}: {other}")),
                })?;

            log::debug!(
                "Fetched customer page {page} with {} profiles",
                result.profiles.len()
            );
            profiles.extend(result.profiles);

            if !result.has_next_page {
                return Ok(profiles);
            }
            match result.next_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    return Err(AppError::SourceEnumeration(format!(
                        "page {page} reported more results without a cursor"
                    )));
                }
            }
        }

        log::warn!(
            "Customer listing stopped at the {max_pages} page cap; {} profiles collected, later customers are not synced",
            profiles.len()
        );
        Ok(profiles)
    }

    /// Resolves the customer's tier and builds the seven profile fields.
    ///
    /// Without a local tier id, the tier name read back from the store stands
    /// in for the current tier, so an invite-only customer keeps their tier.
    pub fn build_payload(
        &self,
        tiers: &[Tier],
        profile: &CustomerProfile,
    ) -> AppResult<ProfilePayload> {
        let current_tier_id = profile.current_tier_id.or_else(|| {
            let name = profile.current_tier_name.as_deref()?.trim();
            tiers
                .iter()
                .find(|t| t.name.eq_ignore_ascii_case(name))
                .map(|t| t.id)
        });
        let assignment = apply_resolution(
            tiers,
            current_tier_id,
            profile.tier_manual,
            profile.amount_spent,
        )?;
        let tier = assignment.tier();
        let level = tier_level(tiers, tier.id).ok_or_else(|| {
            AppError::Internal(format!("Resolved tier {} has no level", tier.name))
        })?;
        let points = Points::from_spend(profile.amount_spent, profile.bonus_points);
        let benefits = serde_json::to_string(&tier.benefit_names())?;

        let field = |key: &str, value_type: &str, value: String| MetafieldInput {
            owner_id: profile.external_id.clone(),
            namespace: self.settings.namespace.clone(),
            key: key.to_string(),
            value_type: value_type.to_string(),
            value,
        };

        let metafields = vec![
            field(KEY_TIER_NAME, "single_line_text_field", tier.name.clone()),
            field(KEY_TIER_LEVEL, "number_integer", level.to_string()),
            field(
                KEY_TOTAL_SPEND,
                "number_decimal",
                profile.amount_spent.to_string(),
            ),
            field(
                KEY_SPEND_POINTS,
                "number_decimal",
                points.spend_points.to_string(),
            ),
            field(
                KEY_BONUS_POINTS,
                "number_decimal",
                points.bonus_points.to_string(),
            ),
            field(
                KEY_TOTAL_POINTS,
                "number_decimal",
                points.total_points.to_string(),
            ),
            field(KEY_TIER_BENEFITS, "json", benefits),
        ];

        Ok(ProfilePayload {
            customer_id: profile.external_id.clone(),
            tier_id: tier.id,
            tier_name: tier.name.clone(),
            tier_level: level,
            points,
            metafields,
        })
    }

    /// Syncs a single customer.
    pub async fn sync_one(&self, tiers: &[Tier], profile: &CustomerProfile) -> AppResult<SyncAck> {
        let payload = self.build_payload(tiers, profile)?;
        self.write_with_retry(&payload).await?;
        log::debug!(
            "Synced {} as {} (level {})",
            payload.customer_id,
            payload.tier_name,
            payload.tier_level
        );
        Ok(SyncAck {
            customer_id: payload.customer_id,
            tier_name: payload.tier_name,
            tier_level: payload.tier_level,
            fields_written: payload.metafields.len(),
        })
    }

    async fn write_with_retry(&self, payload: &ProfilePayload) -> AppResult<()> {
        let mut attempt = 0u32;
        loop {
            let result = match tokio::time::timeout(
                self.settings.write_timeout,
                self.store
                    .set_profile_fields(&payload.customer_id, &payload.metafields),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(AppError::ExternalApi(format!(
                    "write timed out after {:?}",
                    self.settings.write_timeout
                ))),
            };

            match result {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.settings.max_retries && is_retryable(&e) => {
                    let delay = self.settings.retry_backoff * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    log::warn!(
                        "Write for {} failed ({e}); retry {attempt}/{} in {delay:?}",
                        payload.customer_id,
                        self.settings.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(AppError::ProfileWrite {
                        customer_id: payload.customer_id.clone(),
                        message: failure_message(e),
                    });
                }
            }
        }
    }

    /// Runs a full sync over every customer `source` lists.
    ///
    /// Per-customer failures are collected into the report; only an invalid
    /// tier set or a listing failure aborts the run.
    pub async fn sync_all(
        &self,
        tiers: &[Tier],
        source: &dyn CustomerSource,
    ) -> AppResult<SyncReport> {
        validate_tiers(tiers)?;
        warn_duplicate_thresholds(tiers);

        let profiles = self.collect_profiles(source).await?;
        let batch_size = self.settings.batch_size.max(1);
        let batch_count = profiles.len().div_ceil(batch_size);
        let mut report = SyncReport {
            total: profiles.len(),
            ..Default::default()
        };

        log::info!(
            "Tier sync started: {} customers in {batch_count} batches of {batch_size}",
            report.total
        );

        for (index, batch) in profiles.chunks(batch_size).enumerate() {
            let results = join_all(batch.iter().map(|p| self.sync_one(tiers, p))).await;

            for (profile, result) in batch.iter().zip(results) {
                match result {
                    Ok(_) => report.successful += 1,
                    Err(e) => {
                        log::error!("Tier sync failed for {}: {e}", profile.external_id);
                        report.failed += 1;
                        report.errors.push(SyncFailure {
                            customer_id: profile.external_id.clone(),
                            error: failure_message(e),
                        });
                    }
                }
            }

            if index + 1 < batch_count && !self.settings.batch_delay.is_zero() {
                tokio::time::sleep(self.settings.batch_delay).await;
            }
        }

        log::info!(
            "Tier sync finished: {} total, {} successful, {} failed",
            report.total,
            report.successful,
            report.failed
        );
        Ok(report)
    }
}

/// Transport and upstream failures may succeed on retry; rejected input will not.
fn is_retryable(error: &AppError) -> bool {
    matches!(error, AppError::ExternalApi(_) | AppError::Reqwest(_))
}

fn failure_message(error: AppError) -> String {
    match error {
        AppError::ProfileWrite { message, .. } => message,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn tier(name: &str, kind: TierKind, benefits: &[&str]) -> Tier {
        Tier {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            is_active: true,
            benefits: benefits
                .iter()
                .map(|b| Benefit {
                    name: b.to_string(),
                    description: None,
                })
                .collect(),
        }
    }

    fn threshold(min: Decimal) -> TierKind {
        TierKind::Threshold {
            min_spend: min,
            max_spend: None,
        }
    }

    fn tiers() -> Vec<Tier> {
        vec![
            tier("Featherweight", threshold(dec!(0)), &[]),
            tier("Lightweight", threshold(dec!(1500)), &["Free shipping"]),
            tier(
                "Welterweight",
                threshold(dec!(5000)),
                &["Free shipping", "Early access"],
            ),
            tier("Heavyweight", threshold(dec!(25000)), &["Personal shopper"]),
            tier("ReigningChampion", TierKind::ManualOnly, &["Everything"]),
        ]
    }

    fn profiles(n: usize) -> Vec<CustomerProfile> {
        (1..=n)
            .map(|i| {
                CustomerProfile::new(
                    format!("gid://shopify/Customer/{i}"),
                    Decimal::from(i as i64 * 1000),
                )
            })
            .collect()
    }

    fn settings() -> SyncSettings {
        SyncSettings {
            batch_delay: Duration::ZERO,
            retry_backoff: Duration::ZERO,
            ..SyncSettings::default()
        }
    }

    /// Serves fixed profiles in pages of `limit`, optionally failing one page.
    struct VecSource {
        profiles: Vec<CustomerProfile>,
        fail_on_page: Option<usize>,
        endless: bool,
        calls: AtomicUsize,
    }

    impl VecSource {
        fn new(profiles: Vec<CustomerProfile>) -> Self {
            Self {
                profiles,
                fail_on_page: None,
                endless: false,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CustomerSource for VecSource {
        async fn fetch_page(&self, cursor: Option<String>, limit: u32) -> AppResult<CustomerPage> {
            let page = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on_page == Some(page) {
                return Err(AppError::ExternalApi("listing throttled".into()));
            }
            let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
            let end = (start + limit as usize).min(self.profiles.len());
            let has_next_page = self.endless || end < self.profiles.len();
            let profiles = if self.endless {
                self.profiles.clone()
            } else {
                self.profiles[start..end].to_vec()
            };
            Ok(CustomerPage {
                profiles,
                next_cursor: has_next_page.then(|| end.to_string()),
                has_next_page,
            })
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        rejected: HashSet<String>,
        transient: Mutex<HashMap<String, u32>>,
        writes: Mutex<Vec<(String, Vec<MetafieldInput>)>>,
        attempts: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        latency: Duration,
    }

    #[async_trait]
    impl ProfileStore for RecordingStore {
        async fn set_profile_fields(
            &self,
            owner_id: &str,
            fields: &[MetafieldInput],
        ) -> AppResult<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.rejected.contains(owner_id) {
                return Err(AppError::Validation(format!("{owner_id} is invalid")));
            }
            if let Some(remaining) = self.transient.lock().unwrap().get_mut(owner_id)
                && *remaining > 0
            {
                *remaining -= 1;
                return Err(AppError::ExternalApi("Throttled".into()));
            }
            self.writes
                .lock()
                .unwrap()
                .push((owner_id.to_string(), fields.to_vec()));
            Ok(())
        }
    }

    fn service(store: Arc<RecordingStore>, settings: SyncSettings) -> TierSyncService {
        TierSyncService::new(store, settings)
    }

    #[tokio::test]
    async fn test_single_failure_is_reported_not_raised() {
        let batch = profiles(3);
        let store = Arc::new(RecordingStore {
            rejected: HashSet::from([batch[1].external_id.clone()]),
            ..Default::default()
        });
        let svc = service(store.clone(), settings());

        let report = svc
            .sync_all(&tiers(), &VecSource::new(batch.clone()))
            .await
            .unwrap();

        assert_eq!(
            report,
            SyncReport {
                total: 3,
                successful: 2,
                failed: 1,
                errors: vec![SyncFailure {
                    customer_id: batch[1].external_id.clone(),
                    error: format!("Validation error: {} is invalid", batch[1].external_id),
                }],
                local_updates: 0,
            }
        );
        assert_eq!(store.writes.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_partial_failures_across_batches() {
        let batch = profiles(25);
        let rejected: HashSet<String> = batch
            .iter()
            .step_by(4)
            .map(|p| p.external_id.clone())
            .collect();
        let store = Arc::new(RecordingStore {
            rejected: rejected.clone(),
            ..Default::default()
        });
        let svc = service(store, settings());

        let report = svc
            .sync_all(&tiers(), &VecSource::new(batch))
            .await
            .unwrap();

        assert_eq!(report.total, 25);
        assert_eq!(report.failed, rejected.len());
        assert_eq!(report.successful + report.failed, report.total);
        let failed_ids: HashSet<String> =
            report.errors.iter().map(|e| e.customer_id.clone()).collect();
        assert_eq!(failed_ids, rejected);
    }

    #[tokio::test]
    async fn test_rerun_writes_identical_payloads() {
        let tiers = tiers();
        let batch = profiles(12);
        let first = Arc::new(RecordingStore::default());
        let second = Arc::new(RecordingStore::default());

        service(first.clone(), settings())
            .sync_all(&tiers, &VecSource::new(batch.clone()))
            .await
            .unwrap();
        service(second.clone(), settings())
            .sync_all(&tiers, &VecSource::new(batch))
            .await
            .unwrap();

        let mut a = first.writes.lock().unwrap().clone();
        let mut b = second.writes.lock().unwrap().clone();
        a.sort_by(|x, y| x.0.cmp(&y.0));
        b.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(a.len(), 12);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_source_failure_aborts_run() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(
            store.clone(),
            SyncSettings {
                page_size: 5,
                ..settings()
            },
        );
        let source = VecSource {
            fail_on_page: Some(2),
            ..VecSource::new(profiles(12))
        };

        let err = svc.sync_all(&tiers(), &source).await.unwrap_err();
        assert!(matches!(err, AppError::SourceEnumeration(_)));
        assert!(store.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pagination_drains_all_pages() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(
            store,
            SyncSettings {
                page_size: 4,
                ..settings()
            },
        );
        let source = VecSource::new(profiles(10));

        let collected = svc.collect_profiles(&source).await.unwrap();
        assert_eq!(collected.len(), 10);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(collected, profiles(10));
    }

    #[tokio::test]
    async fn test_page_cap_bounds_runaway_source() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(
            store,
            SyncSettings {
                page_size: 2,
                max_pages: 3,
                ..settings()
            },
        );
        let source = VecSource {
            endless: true,
            ..VecSource::new(profiles(2))
        };

        let collected = svc.collect_profiles(&source).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(collected.len(), 6);
    }

    #[tokio::test]
    async fn test_invalid_tier_set_aborts_before_listing() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(store, settings());
        let source = VecSource::new(profiles(3));
        let no_floor = vec![tier("Lightweight", threshold(dec!(1500)), &[])];

        let err = svc.sync_all(&no_floor, &source).await.unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let profile = CustomerProfile::new("gid://shopify/Customer/9", dec!(100));
        let store = Arc::new(RecordingStore {
            transient: Mutex::new(HashMap::from([(profile.external_id.clone(), 2)])),
            ..Default::default()
        });
        let svc = service(store.clone(), settings());

        let ack = svc.sync_one(&tiers(), &profile).await.unwrap();
        assert_eq!(ack.fields_written, 7);
        assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let profile = CustomerProfile::new("gid://shopify/Customer/9", dec!(100));
        let store = Arc::new(RecordingStore {
            transient: Mutex::new(HashMap::from([(profile.external_id.clone(), 10)])),
            ..Default::default()
        });
        let svc = service(
            store.clone(),
            SyncSettings {
                max_retries: 1,
                ..settings()
            },
        );

        let err = svc.sync_one(&tiers(), &profile).await.unwrap_err();
        match err {
            AppError::ProfileWrite {
                customer_id,
                message,
            } => {
                assert_eq!(customer_id, profile.external_id);
                assert!(message.contains("Throttled"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_slow_write_times_out() {
        let profile = CustomerProfile::new("gid://shopify/Customer/5", dec!(100));
        let store = Arc::new(RecordingStore {
            latency: Duration::from_millis(200),
            ..Default::default()
        });
        let svc = service(
            store,
            SyncSettings {
                write_timeout: Duration::from_millis(20),
                max_retries: 0,
                ..settings()
            },
        );

        let err = svc.sync_one(&tiers(), &profile).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_in_flight_writes_bounded_by_batch_size() {
        let store = Arc::new(RecordingStore {
            latency: Duration::from_millis(10),
            ..Default::default()
        });
        let svc = service(
            store.clone(),
            SyncSettings {
                batch_size: 3,
                ..settings()
            },
        );

        let report = svc
            .sync_all(&tiers(), &VecSource::new(profiles(8)))
            .await
            .unwrap();
        assert_eq!(report.successful, 8);
        assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_payload_fields() {
        let tiers = tiers();
        let svc = service(Arc::new(RecordingStore::default()), settings());
        let profile = CustomerProfile {
            bonus_points: dec!(250),
            ..CustomerProfile::new("gid://shopify/Customer/42", dec!(5000.50))
        };

        let payload = svc.build_payload(&tiers, &profile).unwrap();
        assert_eq!(payload.tier_name, "Welterweight");
        assert_eq!(payload.tier_level, 3);

        let values: HashMap<&str, (&str, &str)> = payload
            .metafields
            .iter()
            .map(|m| (m.key.as_str(), (m.value_type.as_str(), m.value.as_str())))
            .collect();
        assert_eq!(values.len(), 7);
        assert_eq!(
            values[KEY_TIER_NAME],
            ("single_line_text_field", "Welterweight")
        );
        assert_eq!(values[KEY_TIER_LEVEL], ("number_integer", "3"));
        assert_eq!(values[KEY_TOTAL_SPEND], ("number_decimal", "5000.50"));
        assert_eq!(values[KEY_SPEND_POINTS], ("number_decimal", "5000.50"));
        assert_eq!(values[KEY_BONUS_POINTS], ("number_decimal", "250"));
        assert_eq!(values[KEY_TOTAL_POINTS], ("number_decimal", "5250.50"));
        assert_eq!(
            values[KEY_TIER_BENEFITS],
            ("json", r#"["Free shipping","Early access"]"#)
        );
        assert!(payload.metafields.iter().all(|m| m.namespace == "loyalty"
            && m.owner_id == "gid://shopify/Customer/42"));
    }

    #[test]
    fn test_payload_keeps_invite_only_tier() {
        let tiers = tiers();
        let champion = tiers.iter().find(|t| t.is_manual_only()).unwrap();
        let svc = service(Arc::new(RecordingStore::default()), settings());
        let profile = CustomerProfile {
            current_tier_id: Some(champion.id),
            ..CustomerProfile::new("gid://shopify/Customer/7", dec!(20))
        };

        let payload = svc.build_payload(&tiers, &profile).unwrap();
        assert_eq!(payload.tier_name, "ReigningChampion");
        assert_eq!(payload.tier_level, 5);
    }

    #[tokio::test]
    async fn test_shopify_listed_invite_only_customer_keeps_tier() {
        let tiers = tiers();
        let store = Arc::new(RecordingStore::default());
        let svc = service(store.clone(), settings());
        let champion = CustomerProfile {
            current_tier_name: Some("ReigningChampion".into()),
            ..CustomerProfile::new("gid://shopify/Customer/1", dec!(30000))
        };
        let contender = CustomerProfile {
            current_tier_name: Some("Lightweight".into()),
            ..CustomerProfile::new("gid://shopify/Customer/2", dec!(30000))
        };

        let report = svc
            .sync_all(&tiers, &VecSource::new(vec![champion, contender]))
            .await
            .unwrap();
        assert_eq!(report.successful, 2);

        let written: HashMap<String, String> = store
            .writes
            .lock()
            .unwrap()
            .iter()
            .map(|(owner, fields)| {
                let name = fields.iter().find(|f| f.key == KEY_TIER_NAME).unwrap();
                (owner.clone(), name.value.clone())
            })
            .collect();
        assert_eq!(written["gid://shopify/Customer/1"], "ReigningChampion");
        // A threshold tier read back is not a pin; spend decides.
        assert_eq!(written["gid://shopify/Customer/2"], "Heavyweight");
    }

    #[test]
    fn test_local_tier_id_wins_over_read_back_name() {
        let tiers = tiers();
        let svc = service(Arc::new(RecordingStore::default()), settings());
        let profile = CustomerProfile {
            current_tier_id: Some(tiers[1].id),
            tier_manual: true,
            current_tier_name: Some("ReigningChampion".into()),
            ..CustomerProfile::new("gid://shopify/Customer/3", dec!(30000))
        };

        let payload = svc.build_payload(&tiers, &profile).unwrap();
        assert_eq!(payload.tier_name, "Lightweight");
    }
}
