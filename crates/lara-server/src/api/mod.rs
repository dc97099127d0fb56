pub mod conversation;
pub mod error;
pub mod relay;
pub mod response;
pub mod state;

pub use response::ApiResponse;

use axum::{
    Json, Router,
    http::{Method, header},
    routing::{delete, get, post},
};
use serde::Serialize;
use state::AppState;
use tower_http::cors::CorsLayer;

#[derive(Serialize)]
struct Health {
    status: String,
    time: String,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "lara is working!".to_string(),
        time: chrono::Utc::now().to_rfc3339(),
    })
}

/// Build the HTTP application.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health))
        // Stateless relay
        .route("/api/lara", post(relay::relay))
        // Authenticated per-user conversation
        .route("/api/conversation", get(conversation::get_conversation))
        .route("/api/conversation/messages", post(conversation::send_message))
        .route(
            "/api/conversation/session",
            delete(conversation::close_session),
        )
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{body::Body, http::Request, response::Response};
    use lara_ai::{MockLlmClient, MockStep};
    use lara_core::{AppCore, config::LaraConfig};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    pub(crate) async fn test_state(
        steps: Vec<MockStep>,
        jwt_secret: Option<&str>,
    ) -> (Router, MockLlmClient, TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = LaraConfig::default();
        config.storage.db_path = Some(
            temp_dir
                .path()
                .join("lara.db")
                .to_string_lossy()
                .into_owned(),
        );

        let llm = MockLlmClient::from_steps("mock", steps);
        let core = AppCore::with_llm(&config, Arc::new(llm.clone()))
            .await
            .unwrap();
        let state = AppState::new(Arc::new(core), jwt_secret.map(str::to_string));
        (router(state), llm, temp_dir)
    }

    pub(crate) async fn body_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _llm, _temp_dir) = test_state(vec![], None).await;

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "lara is working!");
    }
}
