//! File-based store: persistent JSON-lines chat history plus a JSON
//! profile document.
//!
//! Layout under the data directory:
//! - `history.jsonl`: one `StoredMessage` per line, in append order
//! - `profiles.json`: `{ "users": {...}, "sessions": {...} }`
//!
//! Everything is loaded on creation and written through on every mutation.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use concierge_core::error::StoreError;
use concierge_core::store::{HistoryStore, ProfileStore, SessionInfo, StoredMessage, UserProfile};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

const HISTORY_FILE: &str = "history.jsonl";
const PROFILES_FILE: &str = "profiles.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Profiles {
    #[serde(default)]
    users: HashMap<String, UserProfile>,
    #[serde(default)]
    sessions: HashMap<String, SessionInfo>,
}

/// A file-backed History and Profile store.
#[derive(Clone)]
pub struct FileStore {
    dir: PathBuf,
    history: Arc<RwLock<HashMap<String, Vec<StoredMessage>>>>,
    profiles: Arc<RwLock<Profiles>>,
}

impl FileStore {
    /// Open (or lazily create) a store rooted at `dir`.
    ///
    /// Missing files start empty; corrupted history lines are skipped.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let history = Self::load_history(&dir.join(HISTORY_FILE));
        let profiles = Self::load_profiles(&dir.join(PROFILES_FILE));
        debug!(
            path = %dir.display(),
            sessions = history.len(),
            users = profiles.users.len(),
            "File store loaded"
        );
        Self {
            dir,
            history: Arc::new(RwLock::new(history)),
            profiles: Arc::new(RwLock::new(profiles)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load_history(path: &Path) -> HashMap<String, Vec<StoredMessage>> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return HashMap::new(), // File doesn't exist yet; start empty
        };

        let mut history: HashMap<String, Vec<StoredMessage>> = HashMap::new();
        for line in content.lines().filter(|line| !line.trim().is_empty()) {
            match serde_json::from_str::<StoredMessage>(line) {
                Ok(message) => history.entry(message.session_id.clone()).or_default().push(message),
                Err(e) => warn!(error = %e, "Skipping corrupted history line"),
            }
        }
        history
    }

    fn load_profiles(path: &Path) -> Profiles {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Profiles::default(),
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(error = %e, path = %path.display(), "Ignoring unreadable profiles file");
            Profiles::default()
        })
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::Storage(format!("Failed to create data directory: {e}")))
    }

    /// Append one line to the history file.
    fn append_line(&self, message: &StoredMessage) -> Result<(), StoreError> {
        self.ensure_dir()?;
        let line = serde_json::to_string(message)
            .map_err(|e| StoreError::Storage(format!("Failed to serialize message: {e}")))?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(HISTORY_FILE))
            .map_err(|e| StoreError::Storage(format!("Failed to open history file: {e}")))?;
        writeln!(file, "{line}")
            .map_err(|e| StoreError::Storage(format!("Failed to write history file: {e}")))
    }

    /// Rewrite the profiles document.
    fn flush_profiles(&self, profiles: &Profiles) -> Result<(), StoreError> {
        self.ensure_dir()?;
        let content = serde_json::to_string_pretty(profiles)
            .map_err(|e| StoreError::Storage(format!("Failed to serialize profiles: {e}")))?;
        std::fs::write(self.dir.join(PROFILES_FILE), content)
            .map_err(|e| StoreError::Storage(format!("Failed to write profiles file: {e}")))
    }
}

#[async_trait]
impl HistoryStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn load_recent(&self, session_id: &str, limit: usize) -> Result<Vec<StoredMessage>, StoreError> {
        let history = self.history.read().await;
        Ok(history
            .get(session_id)
            .map(|messages| crate::most_recent(messages, limit))
            .unwrap_or_default())
    }

    async fn append(&self, message: StoredMessage) -> Result<(), StoreError> {
        let mut history = self.history.write().await;
        self.append_line(&message)?;
        history.entry(message.session_id.clone()).or_default().push(message);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for FileStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles.read().await.users.get(user_id).cloned())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionInfo>, StoreError> {
        Ok(self.profiles.read().await.sessions.get(session_id).cloned())
    }

    async fn put_user(&self, user: UserProfile) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().await;
        profiles.users.insert(user.id.clone(), user);
        self.flush_profiles(&profiles)
    }

    async fn put_session(&self, session: SessionInfo) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().await;
        profiles.sessions.insert(session.id.clone(), session);
        self.flush_profiles(&profiles)
    }
}
