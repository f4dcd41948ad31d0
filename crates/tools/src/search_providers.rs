//! `searchProviders`: look up businesses and provider users.
//!
//! Businesses come first, then providers; the combined list is cut to
//! `maxResults`. A directory failure yields an empty list.

use std::sync::Arc;

use async_trait::async_trait;
use concierge_core::error::ToolError;
use concierge_core::store::UserProfile;
use concierge_core::tool::Tool;
use serde::Serialize;
use tracing::{debug, warn};

use crate::directory::{Business, Directory};

const DEFAULT_MAX_RESULTS: usize = 5;

pub struct SearchProvidersTool {
    directory: Arc<dyn Directory>,
}

impl SearchProvidersTool {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }
}

/// One search hit, shaped for the client's result cards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub business_name: String,
    pub rating: f32,
    pub review_count: u32,
    pub services: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl From<Business> for SearchResult {
    fn from(business: Business) -> Self {
        let name = business.name.unwrap_or_else(|| "Business".into());
        let city = business.location.as_ref().and_then(|l| l.city.clone());
        let address = business
            .location
            .as_ref()
            .and_then(|l| l.address.clone())
            .or_else(|| city.clone());
        Self {
            id: business.id,
            business_name: name.clone(),
            name,
            kind: "business",
            rating: business.rating,
            review_count: business.review_count,
            services: Vec::new(),
            location: city,
            address,
        }
    }
}

impl From<UserProfile> for SearchResult {
    fn from(user: UserProfile) -> Self {
        let name = user.business_name.unwrap_or_else(|| "Provider".into());
        let city = user.location.as_ref().and_then(|l| l.city.clone());
        let address = user
            .location
            .as_ref()
            .and_then(|l| l.address.clone())
            .or_else(|| city.clone());
        Self {
            id: user.id,
            business_name: name.clone(),
            name,
            kind: "provider",
            rating: 0.0,
            review_count: 0,
            services: Vec::new(),
            location: city,
            address,
        }
    }
}

/// Accepts numbers and numeric strings; anything else falls back to the default.
fn max_results(input: &serde_json::Value) -> usize {
    match &input["maxResults"] {
        serde_json::Value::Number(n) => n.as_u64().map(|n| n as usize),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .unwrap_or(DEFAULT_MAX_RESULTS)
}

#[async_trait]
impl Tool for SearchProvidersTool {
    fn name(&self) -> &str {
        "searchProviders"
    }

    fn description(&self) -> &str {
        "Search for service providers or businesses by service type, location, or industry. Returns top matching results with ratings and basic info."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Service name or keywords (e.g., \"haircut\", \"massage\", \"plumber\")"
                },
                "location": {
                    "type": "string",
                    "description": "City or area preference"
                },
                "industryId": {
                    "type": "string",
                    "description": "Industry/category ID if known"
                },
                "maxResults": {
                    "type": "number",
                    "description": "Maximum number of results to return",
                    "default": DEFAULT_MAX_RESULTS
                }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    fn side_effect_free(&self) -> bool {
        true
    }

    async fn execute(&self, input: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let query = input["query"].as_str().unwrap_or_default();
        let location = input["location"].as_str();
        let industry_id = input["industryId"].as_str();
        let limit = max_results(&input);
        debug!(query, location, industry_id, limit, "Searching providers");

        let results = match self.search(industry_id, limit).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "Provider search failed");
                Vec::new()
            }
        };
        debug!(count = results.len(), "Provider search finished");

        serde_json::to_value(results).map_err(|e| ToolError::Handler(e.to_string()))
    }
}

impl SearchProvidersTool {
    async fn search(
        &self,
        industry_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchResult>, concierge_core::StoreError> {
        let businesses = self.directory.businesses(industry_id, limit).await?;
        let providers = self.directory.providers(industry_id, limit).await?;

        Ok(businesses
            .into_iter()
            .map(SearchResult::from)
            .chain(providers.into_iter().map(SearchResult::from))
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::test_support::seeded;
    use serde_json::json;

    async fn tool() -> SearchProvidersTool {
        SearchProvidersTool::new(Arc::new(seeded().await))
    }

    #[tokio::test]
    async fn businesses_come_before_providers() {
        let output = tool().await.execute(json!({"query": "haircut"})).await.unwrap();
        let results = output.as_array().unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0]["type"], "business");
        assert_eq!(results[0]["businessName"], "Glow Spa");
        assert_eq!(results[1]["name"], "Business");
        assert_eq!(results[2]["type"], "provider");
        assert_eq!(results[2]["address"], "12 Main St");
        assert_eq!(results[3]["name"], "Provider");
    }

    #[tokio::test]
    async fn results_are_truncated() {
        let output = tool()
            .await
            .execute(json!({"query": "anything", "maxResults": 3}))
            .await
            .unwrap();
        assert_eq!(output.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn industry_filter_narrows_results() {
        let output = tool()
            .await
            .execute(json!({"query": "spa", "industryId": "beauty"}))
            .await
            .unwrap();
        let ids: Vec<&str> = output
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|r| r["id"].as_str())
            .collect();
        assert_eq!(ids, vec!["b1", "p1"]);
    }

    #[test]
    fn max_results_coercion() {
        assert_eq!(max_results(&json!({"maxResults": 2})), 2);
        assert_eq!(max_results(&json!({"maxResults": "7"})), 7);
        assert_eq!(max_results(&json!({"maxResults": 2.5})), DEFAULT_MAX_RESULTS);
        assert_eq!(max_results(&json!({})), DEFAULT_MAX_RESULTS);
    }
}
