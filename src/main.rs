use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use loyalty_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::ShopifyAdminClient,
    handlers,
    middlewares::create_cors,
    services::*,
    swagger::swagger_config,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    if config.shopify.shop_domain.is_empty() {
        log::warn!("SHOPIFY_SHOP_DOMAIN is not set; profile writes will fail until it is");
    }
    let shopify = ShopifyAdminClient::new(config.shopify.clone());

    let tier_service = TierService::new(pool.clone());
    let customer_service = CustomerService::new(pool.clone(), tier_service.clone());
    let reward_service = RewardService::new(pool.clone());
    let local_source = LocalCustomerSource::new(pool.clone());
    let sync_service = TierSyncService::new(
        Arc::new(shopify.clone()),
        SyncSettings::from_config(&config.sync, &config.shopify.metafield_namespace),
    );

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .app_data(web::Data::new(tier_service.clone()))
            .app_data(web::Data::new(customer_service.clone()))
            .app_data(web::Data::new(reward_service.clone()))
            .app_data(web::Data::new(local_source.clone()))
            .app_data(web::Data::new(shopify.clone()))
            .app_data(web::Data::new(sync_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::tier_config)
                    .configure(handlers::customer_config)
                    .configure(handlers::reward_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
