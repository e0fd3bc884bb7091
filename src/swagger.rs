use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::admin::sync_tiers,
        handlers::admin::sync_customer,
        handlers::tier::list_tiers,
        handlers::tier::create_tier,
        handlers::tier::resolve_tier,
        handlers::tier::get_tier,
        handlers::tier::update_tier,
        handlers::tier::delete_tier,
        handlers::tier::deactivate_tier,
        handlers::customer::list_customers,
        handlers::customer::create_customer,
        handlers::customer::get_customer,
        handlers::customer::delete_customer,
        handlers::customer::record_transaction,
        handlers::customer::assign_tier,
        handlers::customer::adjust_bonus_points,
        handlers::reward::list_rewards,
        handlers::reward::create_reward,
        handlers::reward::get_reward,
        handlers::reward::update_reward,
        handlers::reward::delete_reward,
        handlers::reward::redeem_reward,
        handlers::reward::list_customer_rewards,
    ),
    components(
        schemas(
            TierKind,
            Benefit,
            Tier,
            BenefitInput,
            CreateTierRequest,
            UpdateTierRequest,
            TierResponse,
            TierQuery,
            ResolveTierQuery,
            ResolveTierResponse,
            Points,
            TierSummary,
            CustomerResponse,
            CreateCustomerRequest,
            TransactionSource,
            RecordTransactionRequest,
            AssignTierRequest,
            AdjustBonusPointsRequest,
            RewardResponse,
            CreateRewardRequest,
            UpdateRewardRequest,
            RewardQuery,
            RedeemRewardRequest,
            CustomerRewardResponse,
            PaginationParams,
            MetafieldInput,
            SyncAck,
            SyncFailure,
            SyncReport,
            SyncSource,
            SyncQuery,
            ApiError,
        )
    ),
    tags(
        (name = "admin", description = "Loyalty sync API"),
        (name = "tier", description = "Tier management API"),
        (name = "customer", description = "Customer spend and tier API"),
        (name = "reward", description = "Reward catalog and redemption API"),
    ),
    info(
        title = "Loyalty Backend API",
        version = "1.0.0",
        description = "Loyalty tier resolution and Shopify metafield sync"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_sync_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/admin/sync/tiers"));
        assert!(doc.paths.paths.contains_key("/admin/sync/customers/{id}"));
        assert!(doc.paths.paths.contains_key("/tiers/resolve"));
        assert!(doc.paths.paths.contains_key("/customers/{id}/rewards"));
        assert!(doc.paths.paths.contains_key("/rewards/{id}"));
    }
}
