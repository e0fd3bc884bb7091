pub mod customer_service;
pub mod local_source;
pub mod reward_service;
pub mod sync_service;
pub mod tier_resolver;
pub mod tier_service;

pub use customer_service::*;
pub use local_source::*;
pub use reward_service::*;
pub use sync_service::*;
pub use tier_service::*;
