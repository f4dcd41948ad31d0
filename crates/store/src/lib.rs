//! History and profile store implementations for Concierge.

pub mod file_backend;
pub mod in_memory;

pub use file_backend::FileStore;
pub use in_memory::InMemoryStore;

use concierge_core::store::StoredMessage;

/// The last `limit` messages of one session, oldest first.
pub(crate) fn most_recent(messages: &[StoredMessage], limit: usize) -> Vec<StoredMessage> {
    let start = messages.len().saturating_sub(limit);
    messages[start..].to_vec()
}
