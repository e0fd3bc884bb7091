pub mod customer_rewards;
pub mod customers;
pub mod rewards;
pub mod tier_benefits;
pub mod tiers;
pub mod transactions;

pub use customer_rewards as customer_reward_entity;
pub use customers as customer_entity;
pub use rewards as reward_entity;
pub use tier_benefits as tier_benefit_entity;
pub use tiers as tier_entity;
pub use tiers::TierType;
pub use transactions as transaction_entity;
