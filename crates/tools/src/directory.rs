//! Directory: the business data the reference tools read and write.
//!
//! Businesses, provider users, services and appointments sit behind the
//! [`Directory`] trait so the tools stay swappable. [`InMemoryDirectory`]
//! backs tests and the CLI; it can be seeded from a JSON document.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::error::StoreError;
use concierge_core::store::{Location, UserProfile};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// A listed business.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry_id: Option<String>,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

/// A bookable service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub duration_minutes: u32,
}

/// A booked appointment. New bookings start as `pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub provider_id: String,
    pub provider_name: String,
    pub service_id: String,
    pub service_name: String,
    pub service_price: f64,
    pub service_duration: u32,
    pub appointment_date: String,
    pub appointment_time: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Read/write access to business data.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Businesses, optionally in one industry, at most `limit`.
    async fn businesses(&self, industry_id: Option<&str>, limit: usize) -> Result<Vec<Business>, StoreError>;

    /// Users with role `provider`, optionally serving one industry, at most `limit`.
    async fn providers(&self, industry_id: Option<&str>, limit: usize) -> Result<Vec<UserProfile>, StoreError>;

    async fn user(&self, id: &str) -> Result<Option<UserProfile>, StoreError>;

    async fn service(&self, id: &str) -> Result<Option<Service>, StoreError>;

    /// Persist an appointment and return its id.
    async fn create_appointment(&self, appointment: Appointment) -> Result<String, StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DirectoryData {
    #[serde(default)]
    businesses: Vec<Business>,
    #[serde(default)]
    users: Vec<UserProfile>,
    #[serde(default)]
    services: Vec<Service>,
    #[serde(default)]
    appointments: Vec<Appointment>,
}

/// An in-process directory.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    data: Arc<RwLock<DirectoryData>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a JSON document with `businesses`, `users`, `services`
    /// and `appointments` arrays (all optional).
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Storage(format!("Failed to read {}: {e}", path.display())))?;
        let data: DirectoryData = serde_json::from_str(&content)
            .map_err(|e| StoreError::Storage(format!("Failed to parse {}: {e}", path.display())))?;
        Ok(Self {
            data: Arc::new(RwLock::new(data)),
        })
    }

    pub async fn add_business(&self, business: Business) {
        self.data.write().await.businesses.push(business);
    }

    pub async fn add_user(&self, user: UserProfile) {
        self.data.write().await.users.push(user);
    }

    pub async fn add_service(&self, service: Service) {
        self.data.write().await.services.push(service);
    }

    pub async fn appointments(&self) -> Vec<Appointment> {
        self.data.read().await.appointments.clone()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn businesses(&self, industry_id: Option<&str>, limit: usize) -> Result<Vec<Business>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .businesses
            .iter()
            .filter(|b| industry_id.is_none_or(|id| b.industry_id.as_deref() == Some(id)))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn providers(&self, industry_id: Option<&str>, limit: usize) -> Result<Vec<UserProfile>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .users
            .iter()
            .filter(|u| u.role.as_deref() == Some("provider"))
            .filter(|u| industry_id.is_none_or(|id| u.industries.iter().any(|i| i == id)))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn user(&self, id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.data.read().await.users.iter().find(|u| u.id == id).cloned())
    }

    async fn service(&self, id: &str) -> Result<Option<Service>, StoreError> {
        Ok(self.data.read().await.services.iter().find(|s| s.id == id).cloned())
    }

    async fn create_appointment(&self, mut appointment: Appointment) -> Result<String, StoreError> {
        if appointment.id.is_empty() {
            appointment.id = uuid::Uuid::new_v4().to_string();
        }
        let id = appointment.id.clone();
        self.data.write().await.appointments.push(appointment);
        Ok(id)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn industry_filter_applies_to_both_collections() {
        let directory = test_support::seeded().await;
        let businesses = directory.businesses(Some("beauty"), 10).await.unwrap();
        assert_eq!(businesses.len(), 1);
        assert_eq!(businesses[0].id, "b1");

        let providers = directory.providers(Some("home"), 10).await.unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].id, "p2");
    }

    #[tokio::test]
    async fn providers_exclude_clients() {
        let directory = test_support::seeded().await;
        let providers = directory.providers(None, 10).await.unwrap();
        assert!(providers.iter().all(|p| p.role.as_deref() == Some("provider")));
        assert_eq!(providers.len(), 2);
    }

    #[tokio::test]
    async fn seed_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        std::fs::write(
            &path,
            r#"{"services": [{"id": "s1", "name": "Massage", "price": 80, "durationMinutes": 60}]}"#,
        )
        .unwrap();

        let directory = InMemoryDirectory::from_json_file(&path).unwrap();
        let service = directory.service("s1").await.unwrap().unwrap();
        assert_eq!(service.duration_minutes, 60);
        assert!(directory.businesses(None, 5).await.unwrap().is_empty());
    }

    #[test]
    fn missing_seed_file_is_storage_error() {
        let result = InMemoryDirectory::from_json_file(Path::new("/nonexistent/directory.json"));
        assert!(matches!(result, Err(StoreError::Storage(_))));
    }
}
