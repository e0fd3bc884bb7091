use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::error::AppResult;
use crate::external::ShopifyAdminClient;
use crate::models::*;
use crate::services::{
    CustomerService, CustomerSource, LocalCustomerSource, TierService, TierSyncService,
};

/// Brings local tiers in line with the active tier set, then syncs.
async fn run_sync(
    tier_service: &TierService,
    customer_service: &CustomerService,
    sync_service: &TierSyncService,
    source: &dyn CustomerSource,
) -> AppResult<SyncReport> {
    let local_updates = customer_service.reconcile_tiers().await?;
    let tiers = tier_service.active_tiers().await?;
    let mut report = sync_service.sync_all(&tiers, source).await?;
    report.local_updates = local_updates;
    Ok(report)
}

#[utoipa::path(
    post,
    path = "/admin/sync/tiers",
    tag = "admin",
    params(
        ("source" = Option<SyncSource>, Query, description = "Where to list customers from: local (default) or shopify")
    ),
    responses(
        (status = 200, description = "Sync finished; per-customer failures are listed in the report", body = SyncReport),
        (status = 409, description = "Tier configuration is invalid"),
        (status = 502, description = "Listing customers failed")
    )
)]
pub async fn sync_tiers(
    tier_service: web::Data<TierService>,
    customer_service: web::Data<CustomerService>,
    sync_service: web::Data<TierSyncService>,
    local_source: web::Data<LocalCustomerSource>,
    shopify: web::Data<ShopifyAdminClient>,
    query: web::Query<SyncQuery>,
) -> Result<HttpResponse> {
    // Shopify listings carry no local tier state; join it in by external id.
    let linked = local_source.link(shopify.get_ref());
    let source: &dyn CustomerSource = match query.source.unwrap_or_default() {
        SyncSource::Local => local_source.get_ref(),
        SyncSource::Shopify => &linked,
    };

    match run_sync(&tier_service, &customer_service, &sync_service, source).await {
        Ok(report) => {
            let message = format!("Synced {} of {} customers", report.successful, report.total);
            Ok(ApiResponse::success_with_message(report, message).ok())
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/sync/customers/{id}",
    tag = "admin",
    params(("id" = i64, Path, description = "Local customer id")),
    responses(
        (status = 200, description = "Customer synced", body = SyncAck),
        (status = 400, description = "Customer has no external profile"),
        (status = 404, description = "Customer not found"),
        (status = 502, description = "Profile write failed")
    )
)]
pub async fn sync_customer(
    tier_service: web::Data<TierService>,
    customer_service: web::Data<CustomerService>,
    sync_service: web::Data<TierSyncService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    let result = async {
        let profile = customer_service.profile(id).await?;
        let tiers = tier_service.active_tiers().await?;
        sync_service.sync_one(&tiers, &profile).await
    }
    .await;

    match result {
        Ok(ack) => Ok(ApiResponse::success(ack).ok()),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/sync/tiers", web::post().to(sync_tiers))
            .route("/sync/customers/{id}", web::post().to(sync_customer)),
    );
}
