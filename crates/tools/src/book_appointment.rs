//! `bookAppointment`: create a pending appointment.
//!
//! Unknown client, provider or service ids and directory failures are
//! reported in the output (`status: "error"`), not as tool errors.

use std::sync::Arc;

use async_trait::async_trait;
use concierge_core::error::{StoreError, ToolError};
use concierge_core::tool::Tool;
use serde::Serialize;
use tracing::{info, warn};

use crate::directory::{Appointment, Directory};

pub struct BookAppointmentTool {
    directory: Arc<dyn Directory>,
}

impl BookAppointmentTool {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BookingOutcome {
    appointment_id: String,
    status: &'static str,
    message: String,
}

impl BookingOutcome {
    fn error(message: &str) -> Self {
        Self {
            appointment_id: String::new(),
            status: "error",
            message: message.into(),
        }
    }
}

struct BookingRequest<'a> {
    client_id: &'a str,
    provider_id: &'a str,
    service_id: &'a str,
    date: &'a str,
    time: &'a str,
    notes: Option<&'a str>,
}

impl BookAppointmentTool {
    async fn book(&self, req: BookingRequest<'_>) -> Result<BookingOutcome, StoreError> {
        let (client, provider, service) = tokio::try_join!(
            self.directory.user(req.client_id),
            self.directory.user(req.provider_id),
            self.directory.service(req.service_id),
        )?;

        let (Some(client), Some(provider), Some(service)) = (client, provider, service) else {
            return Ok(BookingOutcome::error("Invalid client, provider, or service ID"));
        };

        let appointment = Appointment {
            id: String::new(),
            client_id: client.id.clone(),
            client_name: client.business_name.clone().unwrap_or_else(|| "Client".into()),
            client_email: client.email.clone(),
            client_phone: client.phone_number.clone().unwrap_or_default(),
            provider_id: provider.id.clone(),
            provider_name: provider.business_name.clone().unwrap_or_else(|| "Provider".into()),
            service_id: service.id.clone(),
            service_name: service.name.clone(),
            service_price: service.price,
            service_duration: service.duration_minutes,
            appointment_date: req.date.to_string(),
            appointment_time: req.time.to_string(),
            status: "pending".into(),
            notes: req.notes.map(String::from),
            created_at: chrono::Utc::now(),
        };

        let id = self.directory.create_appointment(appointment).await?;
        info!(appointment_id = %id, "Appointment created");

        Ok(BookingOutcome {
            message: format!("Appointment booked successfully! Confirmation ID: {id}"),
            appointment_id: id,
            status: "success",
        })
    }
}

#[async_trait]
impl Tool for BookAppointmentTool {
    fn name(&self) -> &str {
        "bookAppointment"
    }

    fn description(&self) -> &str {
        "Create a new appointment booking. Requires all details to be confirmed first."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "clientId": { "type": "string", "description": "Client user ID" },
                "providerId": { "type": "string", "description": "Provider ID" },
                "serviceId": { "type": "string", "description": "Service ID" },
                "date": { "type": "string", "description": "Appointment date (YYYY-MM-DD)" },
                "time": { "type": "string", "description": "Appointment time (HH:mm)" },
                "notes": { "type": "string", "description": "Special requests or notes" }
            },
            "required": ["clientId", "providerId", "serviceId", "date", "time"]
        })
    }

    fn output_schema(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "type": "object",
            "properties": {
                "appointmentId": { "type": "string" },
                "status": { "type": "string", "enum": ["success", "error"] },
                "message": { "type": "string" }
            },
            "required": ["appointmentId", "status", "message"]
        }))
    }

    async fn execute(&self, input: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let request = BookingRequest {
            client_id: input["clientId"].as_str().unwrap_or_default(),
            provider_id: input["providerId"].as_str().unwrap_or_default(),
            service_id: input["serviceId"].as_str().unwrap_or_default(),
            date: input["date"].as_str().unwrap_or_default(),
            time: input["time"].as_str().unwrap_or_default(),
            notes: input["notes"].as_str(),
        };
        info!(
            client_id = request.client_id,
            provider_id = request.provider_id,
            service_id = request.service_id,
            date = request.date,
            time = request.time,
            "Booking appointment"
        );

        let outcome = self.book(request).await.unwrap_or_else(|e| {
            warn!(error = %e, "Appointment booking failed");
            BookingOutcome::error("Failed to create appointment. Please try again.")
        });

        serde_json::to_value(outcome).map_err(|e| ToolError::Handler(e.to_string()))
    }
}
