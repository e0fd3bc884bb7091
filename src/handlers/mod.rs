pub mod admin;
pub mod customer;
pub mod reward;
pub mod tier;

pub use admin::admin_config;
pub use customer::customer_config;
pub use reward::reward_config;
pub use tier::tier_config;
