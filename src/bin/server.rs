use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use goal_match_engine::error::MatchEngineError;
use goal_match_engine::store::{CardFilter, Page, PageRequest, RelistToken, StoreStats};
use goal_match_engine::{
    EngineConfig, GoalCard, GoalType, MatchEngine, MatchResponse, NewGoalCard, SkillLevel,
    SubmittedCard,
};

/// Header carrying the caller identity resolved by the upstream auth layer
const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
struct AppState {
    engine: Arc<MatchEngine>,
}

#[derive(Debug, Deserialize)]
struct ListParams {
    goal_type: Option<String>,
    skill_level: Option<String>,
    tech: Option<String>,
    owner_id: Option<String>,
    max_age_days: Option<i64>,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_page() -> u32 { 1 }
fn default_per_page() -> u32 { 10 }

#[derive(Debug, Deserialize)]
struct RelistParams {
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct RelistResponse {
    card_id: Uuid,
    relisted: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "goal_match_server=debug,goal_match_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env()?;

    tracing::info!("Starting Goal Match Server");
    tracing::info!("Database: {}", config.db_path);
    tracing::info!("Port: {}", config.port);

    let engine = MatchEngine::from_config(&config).await?;

    let state = AppState {
        engine: Arc::new(engine),
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/cards", post(create_card_handler).get(list_cards_handler))
        .route(
            "/v1/cards/:id",
            get(get_card_handler)
                .put(update_card_handler)
                .delete(delete_card_handler),
        )
        .route("/v1/cards/:id/relist-token", post(relist_token_handler))
        .route("/v1/relist", get(relist_handler))
        .route("/v1/matches", post(matches_handler))
        .route("/v1/stats", get(stats_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn require_user(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(AppError::Unauthorized)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: goal_match_engine::VERSION.to_string(),
    })
}

async fn create_card_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(card): Json<NewGoalCard>,
) -> Result<(StatusCode, Json<SubmittedCard>), AppError> {
    let owner_id = require_user(&headers)?;
    let submitted = state.engine.submit_card(&owner_id, card).await?;

    tracing::info!(
        "Card {} posted -> {}",
        submitted.card.id,
        submitted.matches.display()
    );

    Ok((StatusCode::CREATED, Json(submitted)))
}

async fn list_cards_handler(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<GoalCard>>, AppError> {
    let filter = CardFilter {
        goal_type: params.goal_type.as_deref().map(GoalType::from),
        skill_level: params.skill_level.as_deref().map(SkillLevel::from),
        tech_tag: params.tech,
        owner_id: params.owner_id,
        max_age_days: params.max_age_days,
    };
    let page = PageRequest::new(params.page, params.per_page);

    Ok(Json(state.engine.list_cards(&filter, &page).await?))
}

async fn get_card_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GoalCard>, AppError> {
    Ok(Json(state.engine.get_card(id).await?))
}

async fn update_card_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(card): Json<NewGoalCard>,
) -> Result<Json<GoalCard>, AppError> {
    let owner_id = require_user(&headers)?;
    Ok(Json(state.engine.update_card(id, &owner_id, card).await?))
}

async fn delete_card_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let owner_id = require_user(&headers)?;
    state.engine.delete_card(id, &owner_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn relist_token_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<RelistToken>, AppError> {
    let owner_id = require_user(&headers)?;
    Ok(Json(state.engine.issue_relist_token(id, &owner_id).await?))
}

async fn relist_handler(
    State(state): State<AppState>,
    Query(params): Query<RelistParams>,
) -> Result<Json<RelistResponse>, AppError> {
    let token = params.token.ok_or(MatchEngineError::InvalidRelistToken)?;
    let card_id = state.engine.relist(&token).await?;

    Ok(Json(RelistResponse { card_id, relisted: true }))
}

async fn matches_handler(
    State(state): State<AppState>,
    Json(card): Json<NewGoalCard>,
) -> Result<Json<MatchResponse>, AppError> {
    tracing::debug!("Match preview request: {:?}", card);
    Ok(Json(state.engine.preview_matches(card).await?))
}

async fn stats_handler(
    State(state): State<AppState>,
) -> Result<Json<StoreStats>, AppError> {
    Ok(Json(state.engine.stats().await?))
}

// Error handling
enum AppError {
    Engine(MatchEngineError),
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                format!("Missing {} header", USER_ID_HEADER),
            ),
            AppError::Engine(e) => {
                let status = match &e {
                    MatchEngineError::Validation(_) => StatusCode::BAD_REQUEST,
                    MatchEngineError::Forbidden(_) => StatusCode::FORBIDDEN,
                    MatchEngineError::NotFound(_) => StatusCode::NOT_FOUND,
                    MatchEngineError::InvalidRelistToken | MatchEngineError::ExpiredRelistToken => {
                        StatusCode::GONE
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!("Error: {} - {}", status, message);
        } else {
            tracing::debug!("Request rejected: {} - {}", status, message);
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<MatchEngineError>,
{
    fn from(err: E) -> Self {
        Self::Engine(err.into())
    }
}
