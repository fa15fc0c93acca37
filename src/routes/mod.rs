use axum::Router;

use crate::state::SharedState;

pub mod admin;
pub mod docs;
pub mod health;
pub mod players;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(players::router())
        .merge(admin::router())
        .merge(sse::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::{dao::game_store::memory::MemoryGameStore, state::AppState};

    async fn send(app: &Router<()>, method: Method, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn memory_app() -> (Router<()>, MemoryGameStore) {
        let store = MemoryGameStore::new();
        let state = AppState::with_store(Arc::new(store.clone())).await;
        (router(state), store)
    }

    #[tokio::test]
    async fn full_race_over_http() {
        let (app, _) = memory_app().await;

        let (status, body) = send(&app, Method::POST, "/players").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 1);
        assert_eq!(body["name"], "Player 1");
        let (status, body) = send(&app, Method::POST, "/players").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 2);

        send(&app, Method::POST, "/players/1/run").await;
        send(&app, Method::POST, "/players/1/run").await;
        let (status, body) = send(&app, Method::POST, "/players/2/run").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["player"]["steps"], 1);
        assert_eq!(body["winner"], Value::Null);

        let (_, body) = send(&app, Method::POST, "/players/1/run").await;
        assert_eq!(body["player"]["steps"], 3);
        assert_eq!(body["winner"], 1);
        assert_eq!(body["message"], "You won!");

        let (status, body) = send(&app, Method::POST, "/players/2/run").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["player"]["steps"], 1);
        assert_eq!(body["concluded"], true);
        assert_eq!(body["message"], "Game Over - Player 1 won!");

        let (_, body) = send(&app, Method::GET, "/players/2").await;
        assert_eq!(body["steps"], 1);
        assert_eq!(body["winner"], 1);

        let (_, body) = send(&app, Method::GET, "/admin/state").await;
        assert_eq!(body["phase"], "concluded");
        assert_eq!(body["winning_steps"], 3);
    }

    #[tokio::test]
    async fn rejections_map_to_status_codes() {
        let (app, _) = memory_app().await;

        let (status, body) = send(&app, Method::GET, "/players/99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].as_str().unwrap().contains("99"));

        let (status, _) = send(&app, Method::POST, "/players/99/run").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        send(&app, Method::POST, "/players").await;
        send(&app, Method::POST, "/players").await;
        let (status, _) = send(&app, Method::POST, "/players").await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, body) = send(&app, Method::GET, "/players").await;
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reset_clears_players() {
        let (app, _) = memory_app().await;
        send(&app, Method::POST, "/players").await;

        let (status, body) = send(&app, Method::POST, "/admin/reset").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _) = send(&app, Method::GET, "/players/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, body) = send(&app, Method::GET, "/players").await;
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn degraded_backend_answers_503() {
        let app = router(AppState::new());

        let (status, body) = send(&app, Method::GET, "/healthcheck").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");

        let (status, _) = send(&app, Method::POST, "/players").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, _) = send(&app, Method::POST, "/admin/reset").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn storage_outage_answers_503() {
        let (app, store) = memory_app().await;
        store.set_online(false);

        let (status, _) = send(&app, Method::GET, "/admin/state").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (app, _) = memory_app().await;
        let (status, body) = send(&app, Method::GET, "/api-doc/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/players/{id}/run"].is_object());
    }
}
