use actix_web::{HttpResponse, ResponseError, Result, web};
use uuid::Uuid;

use crate::models::*;
use crate::services::TierService;

#[utoipa::path(
    get,
    path = "/tiers",
    tag = "tier",
    params(("include_inactive" = Option<bool>, Query, description = "Include soft-deleted tiers")),
    responses((status = 200, description = "Tiers in ascending spend order", body = [TierResponse]))
)]
pub async fn list_tiers(
    tier_service: web::Data<TierService>,
    query: web::Query<TierQuery>,
) -> Result<HttpResponse> {
    match tier_service
        .list_tiers(query.include_inactive.unwrap_or(false))
        .await
    {
        Ok(tiers) => Ok(ApiResponse::success(tiers).ok()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/tiers",
    tag = "tier",
    request_body = CreateTierRequest,
    responses(
        (status = 201, description = "Tier created", body = TierResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Resulting tier set would be invalid")
    )
)]
pub async fn create_tier(
    tier_service: web::Data<TierService>,
    request: web::Json<CreateTierRequest>,
) -> Result<HttpResponse> {
    match tier_service.create_tier(request.into_inner()).await {
        Ok(tier) => Ok(ApiResponse::success(tier).created()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/tiers/resolve",
    tag = "tier",
    params(("spend" = String, Query, description = "Cumulative spend to preview")),
    responses(
        (status = 200, description = "Tier the spend qualifies for", body = ResolveTierResponse),
        (status = 409, description = "Tier configuration is invalid")
    )
)]
pub async fn resolve_tier(
    tier_service: web::Data<TierService>,
    query: web::Query<ResolveTierQuery>,
) -> Result<HttpResponse> {
    match tier_service.preview(query.spend).await {
        Ok(preview) => Ok(ApiResponse::success(preview).ok()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/tiers/{id}",
    tag = "tier",
    params(("id" = Uuid, Path, description = "Tier id")),
    responses(
        (status = 200, description = "Tier", body = TierResponse),
        (status = 404, description = "Tier not found")
    )
)]
pub async fn get_tier(
    tier_service: web::Data<TierService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match tier_service.get_tier(path.into_inner()).await {
        Ok(tier) => Ok(ApiResponse::success(tier).ok()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/tiers/{id}",
    tag = "tier",
    params(("id" = Uuid, Path, description = "Tier id")),
    request_body = UpdateTierRequest,
    responses(
        (status = 200, description = "Tier updated", body = TierResponse),
        (status = 404, description = "Tier not found"),
        (status = 409, description = "Resulting tier set would be invalid")
    )
)]
pub async fn update_tier(
    tier_service: web::Data<TierService>,
    path: web::Path<Uuid>,
    request: web::Json<UpdateTierRequest>,
) -> Result<HttpResponse> {
    match tier_service
        .update_tier(path.into_inner(), request.into_inner())
        .await
    {
        Ok(tier) => Ok(ApiResponse::success(tier).ok()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/tiers/{id}/deactivate",
    tag = "tier",
    params(("id" = Uuid, Path, description = "Tier id")),
    responses(
        (status = 200, description = "Tier deactivated", body = TierResponse),
        (status = 404, description = "Tier not found"),
        (status = 409, description = "Remaining tier set would be invalid")
    )
)]
pub async fn deactivate_tier(
    tier_service: web::Data<TierService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match tier_service.deactivate_tier(path.into_inner()).await {
        Ok(tier) => Ok(ApiResponse::success(tier).ok()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/tiers/{id}",
    tag = "tier",
    params(("id" = Uuid, Path, description = "Tier id")),
    responses(
        (status = 204, description = "Tier and its benefits deleted"),
        (status = 404, description = "Tier not found"),
        (status = 409, description = "Remaining tier set would be invalid")
    )
)]
pub async fn delete_tier(
    tier_service: web::Data<TierService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match tier_service.delete_tier(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn tier_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tiers")
            .route("", web::get().to(list_tiers))
            .route("", web::post().to(create_tier))
            .route("/resolve", web::get().to(resolve_tier))
            .route("/{id}", web::get().to(get_tier))
            .route("/{id}", web::put().to(update_tier))
            .route("/{id}", web::delete().to(delete_tier))
            .route("/{id}/deactivate", web::post().to(deactivate_tier)),
    );
}
