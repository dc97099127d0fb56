pub mod config;
pub mod context;
pub mod identity;
pub mod models;
pub mod paths;
pub mod session;
pub mod storage;

pub use models::*;

use std::sync::Arc;

use lara_ai::LlmClient;
use tracing::info;

use config::LaraConfig;
use context::ContextWindowPolicy;
use session::{SessionRegistry, SessionServices};
use storage::{ConversationStore, Storage};

/// Core application state shared between the server and the CLI.
pub struct AppCore {
    pub storage: Arc<Storage>,
    pub llm: Arc<dyn LlmClient>,
    pub policy: Arc<ContextWindowPolicy>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppCore {
    pub async fn new(config: &LaraConfig) -> anyhow::Result<Self> {
        Self::with_llm(config, config.completion.build_client()).await
    }

    /// Build with an explicit completion client.
    pub async fn with_llm(config: &LaraConfig, llm: Arc<dyn LlmClient>) -> anyhow::Result<Self> {
        let db_path = config.storage.resolve_db_path()?;
        let storage = Arc::new(Storage::new(&db_path)?);
        let policy = Arc::new(ContextWindowPolicy::new(config.context.clone()));

        let store: Arc<dyn ConversationStore> = Arc::new(storage.conversations.clone());
        let services = SessionServices {
            llm: llm.clone(),
            store,
            policy: policy.clone(),
        };

        info!(
            db_path = %db_path.display(),
            provider = llm.provider(),
            model = llm.model(),
            "Initializing Lara"
        );

        Ok(Self {
            storage,
            llm,
            policy,
            sessions: Arc::new(SessionRegistry::new(services)),
        })
    }

    /// Services for sessions outside the registry, such as the CLI lifecycle.
    pub fn session_services(&self) -> SessionServices {
        self.sessions.services().clone()
    }
}
