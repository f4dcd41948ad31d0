//! # Concierge Core
//!
//! Domain types, traits, and error definitions for the Concierge assistant.
//! This crate has **zero framework dependencies**: it defines the canonical
//! message model and the seams every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the turn orchestrator is a trait here:
//! - [`Provider`] for the remote generative model
//! - [`Tool`] for anything the model may ask to run
//! - [`HistoryStore`] and [`ProfileStore`] for persisted conversation and user facts
//!
//! Implementations live in their respective crates and are injected at
//! construction time; nothing in the core reaches for a global.

pub mod error;
pub mod message;
pub mod provider;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, StoreError, ToolError};
pub use message::{ContentPart, ConversationHistory, Message, Role, ToolRequest};
pub use provider::{GenerateRequest, GenerationConfig, Provider, ProviderResponse, Usage};
pub use store::{HistoryStore, Location, ProfileStore, SessionInfo, StoredMessage, UserProfile};
pub use tool::{Tool, ToolCallRecord, ToolDeclaration, ToolRegistry};
