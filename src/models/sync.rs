use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Points;

/// One key/value attribute written to the external profile store.
/// Values are always strings regardless of the declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetafieldInput {
    pub owner_id: String,
    pub namespace: String,
    pub key: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: String,
}

/// Everything written for one customer in one sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfilePayload {
    pub customer_id: String,
    pub tier_id: Uuid,
    pub tier_name: String,
    pub tier_level: u32,
    pub points: Points,
    pub metafields: Vec<MetafieldInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SyncAck {
    pub customer_id: String,
    pub tier_name: String,
    pub tier_level: u32,
    pub fields_written: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SyncFailure {
    pub customer_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SyncReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<SyncFailure>,
    /// Local customers whose stored tier was corrected before the run.
    #[serde(default)]
    pub local_updates: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
    /// Customers stored in this service's database.
    #[default]
    Local,
    /// Customers listed from the Shopify Admin API.
    Shopify,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SyncQuery {
    pub source: Option<SyncSource>,
}
