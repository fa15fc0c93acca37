use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::player::{PlayerView, RunResponse},
    error::{AppError, ErrorBody},
    services::session_service,
    state::{SharedState, session::PlayerId},
};

/// Player-facing endpoints: registration, lookup and the run action.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/players", get(list_players).post(register_player))
        .route("/players/{id}", get(get_player))
        .route("/players/{id}/run", post(run))
}

/// Register the next player.
#[utoipa::path(
    post,
    path = "/players",
    tag = "players",
    responses(
        (status = 201, description = "Player registered", body = PlayerView),
        (status = 409, description = "Two players already registered or the game is over", body = ErrorBody),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn register_player(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<PlayerView>), AppError> {
    let player = session_service::register_player(&state).await?;
    Ok((StatusCode::CREATED, Json(player)))
}

/// List registered players in registration order.
#[utoipa::path(
    get,
    path = "/players",
    tag = "players",
    responses(
        (status = 200, description = "Registered players", body = [PlayerView]),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn list_players(
    State(state): State<SharedState>,
) -> Result<Json<Vec<PlayerView>>, AppError> {
    Ok(Json(session_service::list_players(&state).await?))
}

/// Fetch a player and the current winner.
#[utoipa::path(
    get,
    path = "/players/{id}",
    tag = "players",
    params(("id" = u32, Path, description = "Player identifier")),
    responses(
        (status = 200, description = "Player found", body = PlayerView),
        (status = 404, description = "Unknown player", body = ErrorBody),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn get_player(
    State(state): State<SharedState>,
    Path(id): Path<PlayerId>,
) -> Result<Json<PlayerView>, AppError> {
    Ok(Json(session_service::get_player(&state, id).await?))
}

/// Advance a player by one step.
#[utoipa::path(
    post,
    path = "/players/{id}/run",
    tag = "players",
    params(("id" = u32, Path, description = "Player identifier")),
    responses(
        (status = 200, description = "Run applied, or ignored once the game is over", body = RunResponse),
        (status = 404, description = "Unknown player", body = ErrorBody),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn run(
    State(state): State<SharedState>,
    Path(id): Path<PlayerId>,
) -> Result<Json<RunResponse>, AppError> {
    Ok(Json(session_service::advance(&state, id).await?))
}
