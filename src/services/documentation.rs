use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Step Race Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::players::register_player,
        crate::routes::players::list_players,
        crate::routes::players::get_player,
        crate::routes::players::run,
        crate::routes::admin::game_state,
        crate::routes::admin::reset,
        crate::routes::sse::admin_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::player::PlayerView,
            crate::dto::player::RunResponse,
            crate::dto::admin::GameStateView,
            crate::dto::phase::VisibleSessionPhase,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::error::ErrorBody,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "players", description = "Player registration and the run action"),
        (name = "admin", description = "Game inspection and reset"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
