use lara_core::AppCore;
use std::sync::Arc;

/// Application state shared across all API handlers
#[derive(Clone)]
pub struct AppState {
    pub core: Arc<AppCore>,
    /// Secret for verifying conversation API tokens; the API is disabled without it.
    pub jwt_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(core: Arc<AppCore>, jwt_secret: Option<String>) -> Self {
        Self {
            core,
            jwt_secret: jwt_secret.map(Arc::from),
        }
    }
}
