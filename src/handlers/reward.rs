use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::models::*;
use crate::services::RewardService;

#[utoipa::path(
    get,
    path = "/rewards",
    tag = "reward",
    params(("include_inactive" = Option<bool>, Query, description = "Include retired rewards")),
    responses((status = 200, description = "Rewards, cheapest first", body = [RewardResponse]))
)]
pub async fn list_rewards(
    reward_service: web::Data<RewardService>,
    query: web::Query<RewardQuery>,
) -> Result<HttpResponse> {
    match reward_service
        .list_rewards(query.include_inactive.unwrap_or(false))
        .await
    {
        Ok(rewards) => Ok(ApiResponse::success(rewards).ok()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/rewards",
    tag = "reward",
    request_body = CreateRewardRequest,
    responses(
        (status = 201, description = "Reward created", body = RewardResponse),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_reward(
    reward_service: web::Data<RewardService>,
    request: web::Json<CreateRewardRequest>,
) -> Result<HttpResponse> {
    match reward_service.create_reward(request.into_inner()).await {
        Ok(reward) => Ok(ApiResponse::success(reward).created()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/rewards/{id}",
    tag = "reward",
    params(("id" = i64, Path, description = "Reward id")),
    responses(
        (status = 200, description = "Reward", body = RewardResponse),
        (status = 404, description = "Reward not found")
    )
)]
pub async fn get_reward(
    reward_service: web::Data<RewardService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match reward_service.get_reward(path.into_inner()).await {
        Ok(reward) => Ok(ApiResponse::success(reward).ok()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/rewards/{id}",
    tag = "reward",
    params(("id" = i64, Path, description = "Reward id")),
    request_body = UpdateRewardRequest,
    responses(
        (status = 200, description = "Reward updated", body = RewardResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Reward not found")
    )
)]
pub async fn update_reward(
    reward_service: web::Data<RewardService>,
    path: web::Path<i64>,
    request: web::Json<UpdateRewardRequest>,
) -> Result<HttpResponse> {
    match reward_service
        .update_reward(path.into_inner(), request.into_inner())
        .await
    {
        Ok(reward) => Ok(ApiResponse::success(reward).ok()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/rewards/{id}",
    tag = "reward",
    params(("id" = i64, Path, description = "Reward id")),
    responses(
        (status = 204, description = "Reward deleted; redemptions keep its name"),
        (status = 404, description = "Reward not found")
    )
)]
pub async fn delete_reward(
    reward_service: web::Data<RewardService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match reward_service.delete_reward(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/customers/{id}/rewards",
    tag = "reward",
    params(("id" = i64, Path, description = "Customer id")),
    request_body = RedeemRewardRequest,
    responses(
        (status = 201, description = "Reward redeemed", body = CustomerRewardResponse),
        (status = 400, description = "Not enough points or reward unavailable"),
        (status = 404, description = "Customer or reward not found")
    )
)]
pub async fn redeem_reward(
    reward_service: web::Data<RewardService>,
    path: web::Path<i64>,
    request: web::Json<RedeemRewardRequest>,
) -> Result<HttpResponse> {
    match reward_service
        .redeem_reward(path.into_inner(), request.into_inner())
        .await
    {
        Ok(redemption) => Ok(ApiResponse::success(redemption).created()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/customers/{id}/rewards",
    tag = "reward",
    params(("id" = i64, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Redemptions, newest first", body = [CustomerRewardResponse]),
        (status = 404, description = "Customer not found")
    )
)]
pub async fn list_customer_rewards(
    reward_service: web::Data<RewardService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match reward_service.list_customer_rewards(path.into_inner()).await {
        Ok(redemptions) => Ok(ApiResponse::success(redemptions).ok()),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn reward_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/rewards")
            .route("", web::get().to(list_rewards))
            .route("", web::post().to(create_reward))
            .route("/{id}", web::get().to(get_reward))
            .route("/{id}", web::put().to(update_reward))
            .route("/{id}", web::delete().to(delete_reward)),
    );
}
