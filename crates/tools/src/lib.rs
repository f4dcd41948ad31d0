//! Reference tool implementations for Concierge.
//!
//! The receptionist can search the business directory, check a provider's
//! open slots, and book appointments. All three read and write through a
//! swappable [`Directory`].

pub mod book_appointment;
pub mod check_availability;
pub mod directory;
pub mod search_providers;

use std::sync::Arc;

use concierge_core::error::ToolError;
use concierge_core::tool::ToolRegistry;

pub use book_appointment::BookAppointmentTool;
pub use check_availability::CheckAvailabilityTool;
pub use directory::{Appointment, Business, Directory, InMemoryDirectory, Service};
pub use search_providers::SearchProvidersTool;

/// Create a registry with the three reference tools over `directory`.
pub fn default_registry(directory: Arc<dyn Directory>) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SearchProvidersTool::new(directory.clone())))?;
    registry.register(Box::new(CheckAvailabilityTool::new(directory.clone())))?;
    registry.register(Box::new(BookAppointmentTool::new(directory)))?;
    Ok(registry)
}
