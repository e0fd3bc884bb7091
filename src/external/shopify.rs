use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use crate::config::ShopifyConfig;
use crate::error::{AppError, AppResult};
use crate::models::{CustomerProfile, MetafieldInput};
use crate::services::sync_service::{CustomerPage, CustomerSource, ProfileStore};

const CUSTOMERS_QUERY: &str = r#"
query Customers($first: Int!, $after: String, $namespace: String!) {
  customers(first: $first, after: $after) {
    edges {
      node {
        id
        firstName
        lastName
        email
        numberOfOrders
        amountSpent { amount currencyCode }
        tierName: metafield(namespace: $namespace, key: "tier_name") { value }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}
"#;

const METAFIELDS_SET_MUTATION: &str = r#"
mutation MetafieldsSet($metafields: [MetafieldsSetInput!]!) {
  metafieldsSet(metafields: $metafields) {
    metafields { key namespace }
    userErrors { field message code }
  }
}
"#;

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub extensions: Option<serde_json::Value>,
}

impl GraphQlError {
    fn is_throttled(&self) -> bool {
        self.extensions
            .as_ref()
            .and_then(|e| e["code"].as_str())
            .is_some_and(|code| code == "THROTTLED")
    }
}

#[derive(Debug, Deserialize)]
pub struct CustomersData {
    pub customers: CustomerConnection,
}

#[derive(Debug, Deserialize)]
pub struct CustomerConnection {
    pub edges: Vec<CustomerEdge>,
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct CustomerEdge {
    pub node: CustomerNode,
}

#[derive(Debug, Deserialize)]
pub struct PageInfo {
    #[serde(rename = "hasNextPage")]
    pub has_next_page: bool,
    #[serde(rename = "endCursor")]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerNode {
    pub id: String,
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// UnsignedInt64 arrives as a JSON string.
    #[serde(rename = "numberOfOrders", deserialize_with = "count_from_str_or_int")]
    pub number_of_orders: i64,
    #[serde(rename = "amountSpent")]
    pub amount_spent: MoneyV2,
    /// The tier name written by the previous sync, if any.
    #[serde(rename = "tierName", default)]
    pub tier_name: Option<MetafieldValue>,
}

#[derive(Debug, Deserialize)]
pub struct MetafieldValue {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct MoneyV2 {
    pub amount: Decimal,
    #[serde(rename = "currencyCode")]
    pub currency_code: Option<String>,
}

impl From<CustomerNode> for CustomerProfile {
    fn from(node: CustomerNode) -> Self {
        Self {
            first_name: node.first_name,
            last_name: node.last_name,
            email: node.email,
            number_of_orders: node.number_of_orders,
            current_tier_name: node.tier_name.map(|m| m.value),
            ..CustomerProfile::new(node.id, node.amount_spent.amount)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MetafieldsSetData {
    #[serde(rename = "metafieldsSet")]
    pub metafields_set: MetafieldsSetPayload,
}

#[derive(Debug, Deserialize)]
pub struct MetafieldsSetPayload {
    #[serde(rename = "userErrors", default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a, V: Serialize> {
    query: &'a str,
    variables: V,
}

fn count_from_str_or_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match &value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid count: {n}"))),
        serde_json::Value::String(s) => s.parse().map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!("invalid count: {other}"))),
    }
}

/// Shopify Admin GraphQL API client: lists customers and writes metafields.
#[derive(Clone)]
pub struct ShopifyAdminClient {
    client: Client,
    config: ShopifyConfig,
}

impl ShopifyAdminClient {
    pub fn new(config: ShopifyConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://{}/admin/api/{}/graphql.json",
            self.config.shop_domain, self.config.api_version
        )
    }

    async fn execute<T, V>(&self, query: &str, variables: V) -> AppResult<T>
    where
        T: for<'de> Deserialize<'de>,
        V: Serialize,
    {
        if self.config.shop_domain.is_empty() || self.config.access_token.is_empty() {
            return Err(AppError::ExternalApi(
                "Shopify shop domain or access token is not configured".to_string(),
            ));
        }

        let response = self
            .client
            .post(self.endpoint())
            .header("X-Shopify-Access-Token", &self.config.access_token)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApi(format!(
                "Shopify returned {status}: {body}"
            )));
        }

        let result: GraphQlResponse<T> = response.json().await?;
        unwrap_graphql(result)
    }

    pub async fn list_customers(
        &self,
        after: Option<String>,
        first: u32,
    ) -> AppResult<CustomerConnection> {
        let data: CustomersData = self
            .execute(
                CUSTOMERS_QUERY,
                json!({
                    "first": first,
                    "after": after,
                    "namespace": self.config.metafield_namespace,
                }),
            )
            .await?;
        Ok(data.customers)
    }

    pub async fn set_metafields(&self, metafields: &[MetafieldInput]) -> AppResult<()> {
        let data: MetafieldsSetData = self
            .execute(METAFIELDS_SET_MUTATION, json!({ "metafields": metafields }))
            .await?;
        check_user_errors(&data.metafields_set.user_errors)
    }
}

fn unwrap_graphql<T>(result: GraphQlResponse<T>) -> AppResult<T> {
    if !result.errors.is_empty() {
        let message = result
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        // Only throttling is worth retrying; other top-level errors mean a bad request.
        return if result.errors.iter().any(GraphQlError::is_throttled) {
            Err(AppError::ExternalApi(format!("Throttled: {message}")))
        } else {
            Err(AppError::Validation(format!("GraphQL error: {message}")))
        };
    }
    result
        .data
        .ok_or_else(|| AppError::ExternalApi("Shopify response has no data".to_string()))
}

fn check_user_errors(errors: &[UserError]) -> AppResult<()> {
    if errors.is_empty() {
        return Ok(());
    }
    let message = errors
        .iter()
        .map(|e| match &e.field {
            Some(field) => format!("{}: {}", field.join("."), e.message),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ");
    Err(AppError::Validation(message))
}

#[async_trait]
impl CustomerSource for ShopifyAdminClient {
    async fn fetch_page(&self, cursor: Option<String>, limit: u32) -> AppResult<CustomerPage> {
        let connection = self.list_customers(cursor, limit).await?;
        Ok(CustomerPage {
            profiles: connection
                .edges
                .into_iter()
                .map(|edge| CustomerProfile::from(edge.node))
                .collect(),
            next_cursor: connection.page_info.end_cursor,
            has_next_page: connection.page_info.has_next_page,
        })
    }
}

#[async_trait]
impl ProfileStore for ShopifyAdminClient {
    async fn set_profile_fields(&self, owner_id: &str, fields: &[MetafieldInput]) -> AppResult<()> {
        log::debug!("Writing {} metafields for {owner_id}", fields.len());
        self.set_metafields(fields).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_customers_page() {
        let raw = r#"{
            "data": {
                "customers": {
                    "edges": [
                        {"node": {
                            "id": "gid://shopify/Customer/1",
                            "firstName": "Rocky",
                            "lastName": "Balboa",
                            "email": "rocky@example.com",
                            "numberOfOrders": "12",
                            "amountSpent": {"amount": "4999.99", "currencyCode": "USD"}
                        }}
                    ],
                    "pageInfo": {"hasNextPage": true, "endCursor": "abc"}
                }
            }
        }"#;
        let result: GraphQlResponse<CustomersData> = serde_json::from_str(raw).unwrap();
        let data = unwrap_graphql(result).unwrap();
        assert!(data.customers.page_info.has_next_page);

        let node = data.customers.edges.into_iter().next().unwrap().node;
        let profile = CustomerProfile::from(node);
        assert_eq!(profile.external_id, "gid://shopify/Customer/1");
        assert_eq!(profile.amount_spent, dec!(4999.99));
        assert_eq!(profile.number_of_orders, 12);
        assert_eq!(profile.bonus_points, Decimal::ZERO);
        assert_eq!(profile.current_tier_name, None);
    }

    #[test]
    fn test_parse_previously_synced_tier_name() {
        let raw = r#"{
            "id": "gid://shopify/Customer/9",
            "firstName": "Apollo",
            "lastName": "Creed",
            "email": null,
            "numberOfOrders": 40,
            "amountSpent": {"amount": "30000.00", "currencyCode": "USD"},
            "tierName": {"value": "ReigningChampion"}
        }"#;
        let node: CustomerNode = serde_json::from_str(raw).unwrap();
        let profile = CustomerProfile::from(node);
        assert_eq!(profile.current_tier_name.as_deref(), Some("ReigningChampion"));
        assert_eq!(profile.current_tier_id, None);

        let raw = raw.replace(r#""tierName": {"value": "ReigningChampion"}"#, r#""tierName": null"#);
        let node: CustomerNode = serde_json::from_str(&raw).unwrap();
        assert_eq!(CustomerProfile::from(node).current_tier_name, None);
    }

    #[test]
    fn test_throttled_errors_are_retryable() {
        let raw = r#"{"errors": [{"message": "Throttled", "extensions": {"code": "THROTTLED"}}]}"#;
        let result: GraphQlResponse<CustomersData> = serde_json::from_str(raw).unwrap();
        assert!(matches!(unwrap_graphql(result), Err(AppError::ExternalApi(_))));

        let raw = r#"{"errors": [{"message": "Field 'nope' doesn't exist"}]}"#;
        let result: GraphQlResponse<CustomersData> = serde_json::from_str(raw).unwrap();
        assert!(matches!(unwrap_graphql(result), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_user_errors_reported() {
        let errors = vec![UserError {
            field: Some(vec!["metafields".into(), "0".into(), "value".into()]),
            message: "Value must be an integer".into(),
            code: Some("INVALID_VALUE".into()),
        }];
        let err = check_user_errors(&errors).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: metafields.0.value: Value must be an integer"
        );
        assert!(check_user_errors(&[]).is_ok());
    }

    #[test]
    fn test_metafield_input_wire_shape() {
        let input = MetafieldInput {
            owner_id: "gid://shopify/Customer/1".into(),
            namespace: "loyalty".into(),
            key: "tier_level".into(),
            value_type: "number_integer".into(),
            value: "2".into(),
        };
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["ownerId"], "gid://shopify/Customer/1");
        assert_eq!(value["type"], "number_integer");
        assert_eq!(value["value"], "2");
    }
}
