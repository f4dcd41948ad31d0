//! Wiring shared by every trigger: provider, stores, tools and the
//! orchestrator, built once from configuration.

use std::sync::Arc;

use concierge_agent::{ContextBuilder, TurnOrchestrator, TurnResult};
use concierge_config::AppConfig;
use concierge_core::error::{StoreError, ToolError};
use concierge_core::store::{HistoryStore, ProfileStore, StoredMessage};
use concierge_store::{FileStore, InMemoryStore};
use concierge_tools::{Directory, InMemoryDirectory};
use tracing::{info, warn};

/// Optional directory seed, looked up in the data directory.
pub const DIRECTORY_FILE: &str = "directory.json";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("No provider available: {0}")]
    NoProvider(String),

    #[error("Tool registration failed: {0}")]
    Tools(#[from] ToolError),

    #[error("Store setup failed: {0}")]
    Store(#[from] StoreError),
}

/// The assembled runtime.
#[derive(Clone)]
pub struct Services {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub history: Arc<dyn HistoryStore>,
    pub profiles: Arc<dyn ProfileStore>,
}

impl Services {
    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let router = concierge_providers::build_from_config(config);
        let provider = router
            .default()
            .ok_or_else(|| ServiceError::NoProvider(router.default_name().to_string()))?;
        let model = config
            .providers
            .get(router.default_name())
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| config.default_model.clone());

        let (history, profiles) = match config.store.backend.as_str() {
            "memory" => shared(Arc::new(InMemoryStore::new())),
            _ => shared(Arc::new(FileStore::new(config.store.data_dir()))),
        };

        let directory = load_directory(config)?;
        let tools = concierge_tools::default_registry(directory)?;

        info!(
            provider = router.default_name(),
            model = %model,
            store = history.name(),
            tools = tools.len(),
            "Services ready"
        );

        Ok(Self::new(provider, Arc::new(tools), history, profiles, model, config))
    }

    /// Assemble from explicit parts (tests and embedding).
    pub fn new(
        provider: Arc<dyn concierge_core::Provider>,
        tools: Arc<concierge_core::ToolRegistry>,
        history: Arc<dyn HistoryStore>,
        profiles: Arc<dyn ProfileStore>,
        model: impl Into<String>,
        config: &AppConfig,
    ) -> Self {
        let orchestrator = TurnOrchestrator::new(
            provider,
            tools,
            history.clone(),
            ContextBuilder::new(profiles.clone()),
            model,
        )
        .configured(config);
        Self {
            orchestrator: Arc::new(orchestrator),
            history,
            profiles,
        }
    }

    /// Run one turn and persist the exchange.
    pub async fn chat(&self, user_id: &str, session_id: &str, message: &str) -> TurnResult {
        let result = self.orchestrator.run_turn(user_id, session_id, message).await;
        record_exchange(self.history.as_ref(), user_id, session_id, message, &result).await;
        result
    }
}

/// One store serving both roles.
fn shared<S>(store: Arc<S>) -> (Arc<dyn HistoryStore>, Arc<dyn ProfileStore>)
where
    S: HistoryStore + ProfileStore + 'static,
{
    (store.clone(), store)
}

fn load_directory(config: &AppConfig) -> Result<Arc<dyn Directory>, StoreError> {
    let path = config.store.data_dir().join(DIRECTORY_FILE);
    if !path.exists() {
        return Ok(Arc::new(InMemoryDirectory::new()));
    }
    let directory = InMemoryDirectory::from_json_file(&path)?;
    info!(path = %path.display(), "Directory seeded");
    Ok(Arc::new(directory))
}

/// Append the user message and the assistant reply to the history.
///
/// Failures are logged; the reply has already been produced.
pub async fn record_exchange(
    history: &dyn HistoryStore,
    user_id: &str,
    session_id: &str,
    message: &str,
    result: &TurnResult,
) {
    let rows = [
        StoredMessage::new(session_id, "user", message).with_user(user_id),
        StoredMessage::new(session_id, "assistant", result.text.as_str())
            .with_user(user_id)
            .with_tool_calls(result.tool_calls.clone()),
    ];
    for row in rows {
        if let Err(e) = history.append(row).await {
            warn!(session_id, error = %e, "Failed to persist chat message");
        }
    }
}
