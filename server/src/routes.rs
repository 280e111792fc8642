use axum::{middleware, Json, Router};
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::auth::middleware::JwtSecret;
use crate::auth::{login, registration};
use crate::challenges::crud as challenge_crud;
use crate::chat::{conversations, messages};
use crate::friends::requests as friend_requests;
use crate::recipes::{crud as recipe_crud, engagement, feed as recipe_feed};
use crate::state::AppState;
use crate::stories::{crud as story_crud, feed as story_feed};
use crate::users::{follow, profile, search};
use crate::ws::handler as ws_handler;

/// Inject the JWT secret into request extensions so the Claims extractor can find it.
async fn inject_jwt_secret(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(JwtSecret(state.jwt_secret.clone()));
    next.run(req).await
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Rate limiting: 5 requests per minute per IP on auth endpoints
    // Uses PeerIpKeyExtractor which reads from ConnectInfo<SocketAddr>
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(12) // 1 token every 12 seconds = 5 per minute
            .burst_size(5)
            .finish()
            .expect("Failed to build governor config"),
    );

    // Spawn background task to clean up rate limiter state
    let limiter_for_cleanup = governor_config.limiter().clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            limiter_for_cleanup.retain_recent();
        }
    });

    let auth_routes = Router::new()
        .route("/api/auth/signup", axum::routing::post(registration::signup))
        .route("/api/auth/login", axum::routing::post(login::login))
        .layer(GovernorLayer {
            config: governor_config,
        });

    // Note: static segments (profile, search, followers, suggestions) MUST be
    // registered alongside /api/users/{id}; axum prefers the static match.
    let user_routes = Router::new()
        .route("/api/users/profile", axum::routing::get(profile::get_profile))
        .route("/api/users/profile", axum::routing::put(profile::update_profile))
        .route("/api/users/followers", axum::routing::get(follow::list_followers))
        .route("/api/users/search/{query}", axum::routing::get(search::search_users))
        .route("/api/users/suggestions/new", axum::routing::get(search::suggested_users))
        .route("/api/users/{id}", axum::routing::get(profile::get_user))
        .route("/api/users/{id}/follow", axum::routing::post(follow::toggle_follow));

    let friend_routes = Router::new()
        .route("/api/friends", axum::routing::get(friend_requests::list_friends))
        .route("/api/friends/requests", axum::routing::get(friend_requests::list_requests))
        .route("/api/friends/request/{id}", axum::routing::post(friend_requests::send_request))
        .route("/api/friends/accept/{id}", axum::routing::post(friend_requests::accept_request))
        .route("/api/friends/reject/{id}", axum::routing::post(friend_requests::reject_request));

    let recipe_routes = Router::new()
        .route("/api/recipes", axum::routing::post(recipe_crud::create_recipe))
        .route("/api/recipes/feed", axum::routing::get(recipe_feed::feed))
        .route("/api/recipes/popular", axum::routing::get(recipe_feed::popular))
        .route(
            "/api/recipes/recommendations",
            axum::routing::get(recipe_feed::recommendations),
        )
        .route("/api/recipes/liked", axum::routing::get(engagement::liked_recipes))
        .route("/api/recipes/saved", axum::routing::get(engagement::saved_recipes))
        .route("/api/recipes/user/{id}", axum::routing::get(recipe_crud::user_recipes))
        .route("/api/recipes/{id}", axum::routing::get(recipe_crud::get_recipe))
        .route("/api/recipes/{id}", axum::routing::put(recipe_crud::update_recipe))
        .route("/api/recipes/{id}", axum::routing::delete(recipe_crud::delete_recipe))
        .route("/api/recipes/{id}/like", axum::routing::post(engagement::toggle_like))
        .route("/api/recipes/{id}/comment", axum::routing::post(engagement::add_comment))
        .route("/api/recipes/{id}/comments", axum::routing::get(engagement::list_comments))
        .route("/api/recipes/{id}/save", axum::routing::post(engagement::toggle_save));

    let story_routes = Router::new()
        .route("/api/stories", axum::routing::post(story_crud::create_story))
        .route("/api/stories/feed", axum::routing::get(story_feed::story_feed))
        .route("/api/stories/mine", axum::routing::get(story_feed::my_stories))
        .route("/api/stories/{id}", axum::routing::get(story_crud::get_story))
        .route("/api/stories/{id}", axum::routing::delete(story_crud::delete_story))
        .route("/api/stories/{id}/view", axum::routing::post(story_crud::view_story))
        .route("/api/stories/{id}/views", axum::routing::get(story_crud::story_views));

    let challenge_routes = Router::new()
        .route("/api/challenges", axum::routing::get(challenge_crud::list_challenges))
        .route("/api/challenges", axum::routing::post(challenge_crud::create_challenge))
        .route(
            "/api/challenges/current",
            axum::routing::get(challenge_crud::current_challenge),
        )
        .route(
            "/api/challenges/{id}/join",
            axum::routing::post(challenge_crud::join_challenge),
        );

    let chat_routes = Router::new()
        .route(
            "/api/chat/conversations",
            axum::routing::get(conversations::list_conversations),
        )
        .route(
            "/api/chat/messages/{user_id}",
            axum::routing::get(messages::message_history),
        )
        .route("/api/chat/send", axum::routing::post(messages::send_message))
        .route("/api/chat/read/{user_id}", axum::routing::put(messages::mark_read));

    // WebSocket endpoint (auth via query param, not JWT header)
    let ws_routes = Router::new().route("/ws", axum::routing::get(ws_handler::ws_upgrade));

    let health = Router::new()
        .route("/", axum::routing::get(banner))
        .route("/api/health", axum::routing::get(health_check));

    Router::new()
        .merge(auth_routes)
        .merge(user_routes)
        .merge(friend_routes)
        .merge(recipe_routes)
        .merge(story_routes)
        .merge(challenge_routes)
        .merge(chat_routes)
        .merge(ws_routes)
        .merge(health)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_jwt_secret,
        ))
        .with_state(state)
}

async fn banner() -> &'static str {
    "RecipeShare API is running"
}

/// GET /api/health — Status, current time and process uptime.
async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}
