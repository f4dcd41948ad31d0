//! `checkAvailability`: open time slots for a provider on a date.
//!
//! Slots are a fixed business-hours grid; only the provider name is looked up.

use std::sync::Arc;

use async_trait::async_trait;
use concierge_core::error::ToolError;
use concierge_core::tool::Tool;
use tracing::{debug, warn};

use crate::directory::Directory;

/// The bookable hours offered for every provider.
pub const DEFAULT_SLOTS: [&str; 6] = ["09:00", "10:00", "11:00", "14:00", "15:00", "16:00"];

pub struct CheckAvailabilityTool {
    directory: Arc<dyn Directory>,
}

impl CheckAvailabilityTool {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for CheckAvailabilityTool {
    fn name(&self) -> &str {
        "checkAvailability"
    }

    fn description(&self) -> &str {
        "Check available time slots for a provider on a specific date. Returns list of available times."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "providerId": { "type": "string", "description": "Provider ID" },
                "date": { "type": "string", "description": "Date in YYYY-MM-DD format" },
                "serviceId": { "type": "string", "description": "Service ID if specific service" }
            },
            "required": ["providerId", "date"]
        })
    }

    fn output_schema(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "type": "object",
            "properties": {
                "date": { "type": "string" },
                "slots": { "type": "array", "items": { "type": "string" } },
                "providerName": { "type": "string" }
            },
            "required": ["date", "slots", "providerName"]
        }))
    }

    fn side_effect_free(&self) -> bool {
        true
    }

    async fn execute(&self, input: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let provider_id = input["providerId"].as_str().unwrap_or_default();
        let date = input["date"].as_str().unwrap_or_default();
        debug!(provider_id, date, service_id = input["serviceId"].as_str(), "Checking availability");

        let output = match self.directory.user(provider_id).await {
            Ok(provider) => {
                let provider_name = provider
                    .and_then(|p| p.business_name)
                    .unwrap_or_else(|| "Provider".into());
                serde_json::json!({
                    "date": date,
                    "slots": DEFAULT_SLOTS,
                    "providerName": provider_name,
                })
            }
            Err(e) => {
                warn!(error = %e, provider_id, "Availability lookup failed");
                serde_json::json!({
                    "date": date,
                    "slots": [],
                    "providerName": "Unknown",
                })
            }
        };
        Ok(output)
    }
}
