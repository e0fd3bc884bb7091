use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::models::*;
use crate::services::CustomerService;

use super::reward::{list_customer_rewards, redeem_reward};

#[utoipa::path(
    get,
    path = "/customers",
    tag = "customer",
    params(
        ("page" = Option<u64>, Query, description = "Page number, from 1"),
        ("page_size" = Option<u64>, Query, description = "Page size, up to 100")
    ),
    responses((status = 200, description = "Customers, newest first"))
)]
pub async fn list_customers(
    customer_service: web::Data<CustomerService>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    match customer_service.list_customers(&query).await {
        Ok(page) => Ok(ApiResponse::success(page).ok()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/customers",
    tag = "customer",
    request_body = CreateCustomerRequest,
    responses(
        (status = 201, description = "Customer created with an initial tier", body = CustomerResponse),
        (status = 400, description = "Invalid request or duplicate external id")
    )
)]
pub async fn create_customer(
    customer_service: web::Data<CustomerService>,
    request: web::Json<CreateCustomerRequest>,
) -> Result<HttpResponse> {
    match customer_service.create_customer(request.into_inner()).await {
        Ok(customer) => Ok(ApiResponse::success(customer).created()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/customers/{id}",
    tag = "customer",
    params(("id" = i64, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer", body = CustomerResponse),
        (status = 404, description = "Customer not found")
    )
)]
pub async fn get_customer(
    customer_service: web::Data<CustomerService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match customer_service.get_customer(path.into_inner()).await {
        Ok(customer) => Ok(ApiResponse::success(customer).ok()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/customers/{id}",
    tag = "customer",
    params(("id" = i64, Path, description = "Customer id")),
    responses(
        (status = 204, description = "Customer, their transactions and redemptions deleted"),
        (status = 404, description = "Customer not found")
    )
)]
pub async fn delete_customer(
    customer_service: web::Data<CustomerService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match customer_service.delete_customer(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/customers/{id}/transactions",
    tag = "customer",
    params(("id" = i64, Path, description = "Customer id")),
    request_body = RecordTransactionRequest,
    responses(
        (status = 200, description = "Spend recorded and tier recomputed", body = CustomerResponse),
        (status = 400, description = "Invalid amount"),
        (status = 404, description = "Customer not found")
    )
)]
pub async fn record_transaction(
    customer_service: web::Data<CustomerService>,
    path: web::Path<i64>,
    request: web::Json<RecordTransactionRequest>,
) -> Result<HttpResponse> {
    match customer_service
        .record_transaction(path.into_inner(), request.into_inner())
        .await
    {
        Ok(customer) => Ok(ApiResponse::success(customer).ok()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/customers/{id}/tier",
    tag = "customer",
    params(("id" = i64, Path, description = "Customer id")),
    request_body = AssignTierRequest,
    responses(
        (status = 200, description = "Tier assigned", body = CustomerResponse),
        (status = 404, description = "Customer or tier not found")
    )
)]
pub async fn assign_tier(
    customer_service: web::Data<CustomerService>,
    path: web::Path<i64>,
    request: web::Json<AssignTierRequest>,
) -> Result<HttpResponse> {
    match customer_service
        .assign_tier(path.into_inner(), request.into_inner())
        .await
    {
        Ok(customer) => Ok(ApiResponse::success(customer).ok()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/customers/{id}/bonus-points",
    tag = "customer",
    params(("id" = i64, Path, description = "Customer id")),
    request_body = AdjustBonusPointsRequest,
    responses(
        (status = 200, description = "Bonus points adjusted", body = CustomerResponse),
        (status = 400, description = "Balance would go negative"),
        (status = 404, description = "Customer not found")
    )
)]
pub async fn adjust_bonus_points(
    customer_service: web::Data<CustomerService>,
    path: web::Path<i64>,
    request: web::Json<AdjustBonusPointsRequest>,
) -> Result<HttpResponse> {
    match customer_service
        .adjust_bonus_points(path.into_inner(), request.into_inner())
        .await
    {
        Ok(customer) => Ok(ApiResponse::success(customer).ok()),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn customer_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/customers")
            .route("", web::get().to(list_customers))
            .route("", web::post().to(create_customer))
            .route("/{id}", web::get().to(get_customer))
            .route("/{id}", web::delete().to(delete_customer))
            .route("/{id}/transactions", web::post().to(record_transaction))
            .route("/{id}/tier", web::put().to(assign_tier))
            .route("/{id}/bonus-points", web::post().to(adjust_bonus_points))
            .route("/{id}/rewards", web::post().to(redeem_reward))
            .route("/{id}/rewards", web::get().to(list_customer_rewards)),
    );
}
