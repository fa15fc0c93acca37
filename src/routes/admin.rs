use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::admin::GameStateView,
    error::{AppError, ErrorBody},
    services::session_service,
    state::SharedState,
};

/// Operator endpoints for inspecting and clearing the game.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/admin/state", get(game_state))
        .route("/admin/reset", post(reset))
}

/// Full game state: phase, players, winner and revision.
#[utoipa::path(
    get,
    path = "/admin/state",
    tag = "admin",
    responses(
        (status = 200, description = "Current game state", body = GameStateView),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn game_state(State(state): State<SharedState>) -> Result<Json<GameStateView>, AppError> {
    Ok(Json(session_service::snapshot(&state).await?))
}

/// Remove every player and the winner.
#[utoipa::path(
    post,
    path = "/admin/reset",
    tag = "admin",
    responses(
        (status = 204, description = "Game reset"),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn reset(State(state): State<SharedState>) -> Result<StatusCode, AppError> {
    session_service::reset(&state).await?;
    Ok(StatusCode::NO_CONTENT)
}
