//! Model provider implementations for Concierge.
//!
//! All providers implement the `concierge_core::Provider` trait.
//! The router selects the correct provider based on configuration.

pub mod gemini;
pub mod router;

pub use gemini::GeminiProvider;
pub use router::{build_from_config, ProviderRouter};
